//! Configuration loading.
//!
//! Three layers are merged in order:
//! 1. Built-in defaults for optional keys
//! 2. The config file (`./kbuild.toml` or `~/.config/kbuild.toml`)
//! 3. CLI flags

mod merge;
mod settings;

pub use merge::{deep_merge, merge_layers, toml_to_json};
pub use settings::{
    default_search_paths, locate, ConfigError, ConfigOrigin, ConfigSource, KbuildConfig,
    PathsConfig, SettingsConfig, CONFIG_FILE_NAME, DEFAULT_LOCAL_VERSION,
};
