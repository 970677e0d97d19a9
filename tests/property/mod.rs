//! Property-based tests for fingerprint and classification guarantees

mod determinism;
