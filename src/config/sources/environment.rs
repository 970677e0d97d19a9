//! Environment source: TREESYNC_PERIOD_SECS, TREESYNC_WALKER__MAX_DEPTH, ...

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("TREESYNC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("walker.ignore_patterns"),
    )
}
