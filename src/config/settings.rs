//! The kbuild configuration file.
//!
//! ```toml
//! [paths]
//! install_path = "/boot"
//! kernel_source_path = "/usr/src/linux"
//! kernel_modules_path = "/lib/modules"
//!
//! [settings]
//! versions_to_keep = 2
//! regenerate_grub_config = true
//! emerge_module_rebuild = true
//! local_version = "gentoo"   # optional
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use kbuild_registry::{KernelLayout, NamingScheme};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::merge::{merge_layers, toml_to_json};
use crate::retention::RetentionPolicy;

/// File name searched for when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "kbuild.toml";

/// Default `CONFIG_LOCALVERSION` tag of managed kernels.
pub const DEFAULT_LOCAL_VERSION: &str = "gentoo";

/// Where a configuration layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Where `make install` puts images, symbol maps and configs.
    pub install_path: PathBuf,
    /// The `/usr/src/linux` symlink of the kernel being built.
    pub kernel_source_path: PathBuf,
    pub kernel_modules_path: PathBuf,
}

/// `[settings]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    pub versions_to_keep: usize,
    pub regenerate_grub_config: bool,
    pub emerge_module_rebuild: bool,
    pub local_version: String,
}

/// Fully merged and validated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KbuildConfig {
    pub paths: PathsConfig,
    pub settings: SettingsConfig,

    /// Layers that contributed, lowest precedence first.
    #[serde(skip)]
    pub sources: Vec<ConfigSource>,
}

impl KbuildConfig {
    /// Built-in layer. Only optional keys have defaults; everything else must
    /// come from the file.
    pub fn builtin_defaults() -> Value {
        serde_json::json!({
            "settings": {
                "local_version": DEFAULT_LOCAL_VERSION
            }
        })
    }

    /// Command-line layer overriding the retention count.
    pub fn keep_override(versions_to_keep: usize) -> Value {
        serde_json::json!({
            "settings": {
                "versions_to_keep": versions_to_keep
            }
        })
    }

    /// Load `path` and apply `overrides` on top of it.
    pub fn load(path: &Path, overrides: Option<Value>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    searched: vec![path.to_path_buf()],
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let config = Self::build(&content, Some(path), overrides)?;
        tracing::info!(path = %path.display(), "using configuration file");
        Ok(config)
    }

    /// Parse a configuration document that did not come from a file.
    pub fn from_toml_str(content: &str, overrides: Option<Value>) -> Result<Self, ConfigError> {
        Self::build(content, None, overrides)
    }

    fn build(content: &str, path: Option<&Path>, overrides: Option<Value>) -> Result<Self, ConfigError> {
        let document: toml::Value = toml::from_str(content).map_err(|e| {
            ConfigError::Parse(format!("{}: {}", display_origin(path), e))
        })?;

        let mut layers = vec![Self::builtin_defaults(), toml_to_json(document)];
        let mut sources = vec![
            ConfigSource {
                origin: ConfigOrigin::Builtin,
                path: None,
            },
            ConfigSource {
                origin: ConfigOrigin::File,
                path: path.map(Path::to_path_buf),
            },
        ];
        if let Some(cli) = overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        let merged = merge_layers(layers);
        let mut config: KbuildConfig = serde_json::from_value(merged).map_err(|e| {
            ConfigError::Parse(format!("{}: {}", display_origin(path), e))
        })?;
        config.sources = sources;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.versions_to_keep == 0 {
            return Err(ConfigError::Validation(
                "settings.versions_to_keep must be at least 1".to_string(),
            ));
        }

        let tag = &self.settings.local_version;
        let scheme = NamingScheme::default();
        if tag.is_empty() || tag.contains(scheme.delimiter) || tag.ends_with(&scheme.old_suffix) {
            return Err(ConfigError::Validation(format!(
                "settings.local_version '{}' must be non-empty and contain no '{}'",
                tag, scheme.delimiter
            )));
        }

        for (key, path) in [
            ("paths.install_path", &self.paths.install_path),
            ("paths.kernel_source_path", &self.paths.kernel_source_path),
            ("paths.kernel_modules_path", &self.paths.kernel_modules_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }

    pub fn layout(&self) -> KernelLayout {
        KernelLayout::new(
            &self.paths.install_path,
            &self.paths.kernel_source_path,
            &self.paths.kernel_modules_path,
        )
    }

    pub fn naming(&self) -> NamingScheme {
        NamingScheme::with_local_version(&self.settings.local_version)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::keep_last_n(self.settings.versions_to_keep)
    }
}

/// Candidate locations, in search order: `./kbuild.toml`, then
/// `$HOME/.config/kbuild.toml`.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Resolve the configuration file to use.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let candidates = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => default_search_paths(),
    };

    match candidates.iter().position(|p| p.is_file()) {
        Some(index) => Ok(candidates[index].clone()),
        None => Err(ConfigError::NotFound {
            searched: candidates,
        }),
    }
}

fn display_origin(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not find any {} in {}", CONFIG_FILE_NAME, display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[paths]
install_path = "/boot"
kernel_source_path = "/usr/src/linux"
kernel_modules_path = "/lib/modules"

[settings]
versions_to_keep = 2
regenerate_grub_config = true
emerge_module_rebuild = false
"#;

    #[test]
    fn test_parse_full_config() {
        let config = KbuildConfig::from_toml_str(FULL, None).unwrap();

        assert_eq!(config.paths.install_path, PathBuf::from("/boot"));
        assert_eq!(config.settings.versions_to_keep, 2);
        assert!(config.settings.regenerate_grub_config);
        assert!(!config.settings.emerge_module_rebuild);
        assert_eq!(config.settings.local_version, DEFAULT_LOCAL_VERSION);
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn test_missing_required_key_names_it() {
        let content = FULL.replace("versions_to_keep = 2\n", "");
        let err = KbuildConfig::from_toml_str(&content, None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("versions_to_keep"), "{}", err);
    }

    #[test]
    fn test_missing_paths_section() {
        let content = "[settings]\nversions_to_keep = 2\nregenerate_grub_config = true\nemerge_module_rebuild = true\n";
        let err = KbuildConfig::from_toml_str(content, None).unwrap_err();
        assert!(err.to_string().contains("paths"), "{}", err);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let content = format!("{}trash_path = \"/tmp\"\n", FULL);
        let err = KbuildConfig::from_toml_str(&content, None).unwrap_err();
        assert!(err.to_string().contains("trash_path"), "{}", err);
    }

    #[test]
    fn test_zero_versions_to_keep_rejected() {
        let content = FULL.replace("versions_to_keep = 2", "versions_to_keep = 0");
        let err = KbuildConfig::from_toml_str(&content, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_negative_versions_to_keep_rejected() {
        let content = FULL.replace("versions_to_keep = 2", "versions_to_keep = -1");
        assert!(KbuildConfig::from_toml_str(&content, None).is_err());
    }

    #[test]
    fn test_local_version_with_delimiter_rejected() {
        let content = format!("{}local_version = \"my-kernel\"\n", FULL);
        let err = KbuildConfig::from_toml_str(&content, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_cli_override_wins() {
        let config =
            KbuildConfig::from_toml_str(FULL, Some(KbuildConfig::keep_override(5))).unwrap();
        assert_eq!(config.settings.versions_to_keep, 5);
        assert_eq!(config.sources.last().unwrap().origin, ConfigOrigin::Cli);
        assert_eq!(config.retention_policy().keep_count, 5);
    }

    #[test]
    fn test_layout_and_naming() {
        let content = format!("{}local_version = \"dist\"\n", FULL);
        let config = KbuildConfig::from_toml_str(&content, None).unwrap();

        let layout = config.layout();
        assert_eq!(layout.install_dir, PathBuf::from("/boot"));
        assert_eq!(layout.source_root, PathBuf::from("/usr/src/linux"));
        assert_eq!(layout.modules_root, PathBuf::from("/lib/modules"));
        assert_eq!(config.naming().local_version, "dist");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = KbuildConfig::load(file.path(), None).unwrap();
        assert_eq!(config.sources[1].path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KbuildConfig::load(&dir.path().join("kbuild.toml"), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_locate_explicit_path() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(locate(Some(file.path())).unwrap(), file.path());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = locate(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
