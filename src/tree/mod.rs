//! Directory tree capture
//!
//! Walks a directory tree and records, for every directory, a listing fingerprint
//! and the content fingerprints of its direct files.

pub mod builder;
pub mod hasher;
pub mod path;
pub mod walker;

pub use builder::SnapshotBuilder;
pub use walker::WalkerConfig;
