//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources replace scalar values and whole arrays; tables merge key by key.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("period_secs", 30)?
        .set_default("initial_mirror", true)?
        .set_default("walker.follow_symlinks", false)?
        .set_default("classifier.match_policy", "lenient")?
        .set_default("classifier.commit_policy", "optimistic")?
        .set_default("logging.level", "info")
}
