//! Configuration management.
//!
//! RegSweep configuration is loaded from multiple sources with the
//! following priority:
//!
//! 1. Environment variables (`REGSWEEP_*`, `__` separating nested keys)
//! 2. Extra configuration file passed via `--config`
//! 3. User configuration file (`~/.config/regsweep/config.toml`)
//! 4. System configuration file (`/etc/regsweep/config.toml`)
//! 5. Default values
//!
//! Command-line flags override all of the above (see the command modules).
//!
//! ## Example Configuration File
//!
//! ```toml
//! [registry]
//! url = "registry.example.com"
//! repository = "team/app"
//!
//! [convention]
//! pattern = '^(?P<project>.+?)-(?P<environment>[a-zA-Z]+)$'
//!
//! [retention]
//! keep_count = 3
//! recency = "tag-timestamp"
//! ```

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regsweep_core::{convention::DEFAULT_PATTERN, RetentionPolicy};
use serde::{Deserialize, Serialize};

/// RegSweep configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry connection settings.
    pub registry: RegistrySettings,
    /// Tag convention settings.
    pub convention: ConventionSettings,
    /// Retention policy.
    pub retention: RetentionPolicy,
}

/// Registry connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Registry hostname or base URL.
    pub url: String,
    /// Username for registries requiring credentials.
    pub username: Option<String>,
    /// Password or token.
    pub password: Option<String>,
    /// Default repository to operate on.
    pub repository: Option<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: "docker.io".to_string(),
            username: None,
            password: None,
            repository: None,
        }
    }
}

/// Tag convention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionSettings {
    /// Named-capture pattern defining the tag convention.
    pub pattern: String,
}

impl Default for ConventionSettings {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from files and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source cannot be parsed.
    pub fn load(extra_file: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(system_config_path()))
            .merge(Toml::file(user_config_path()));

        if let Some(path) = extra_file {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("REGSWEEP_").split("__"))
            .extract()
    }
}

/// Returns the system-wide configuration file path.
fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/regsweep/config.toml")
}

/// Returns the per-user configuration file path.
fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regsweep")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsweep_core::RecencyPolicy;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.url, "docker.io");
        assert!(config.registry.repository.is_none());
        assert_eq!(config.convention.pattern, DEFAULT_PATTERN);
        assert_eq!(config.retention.keep_count, 3);
        assert_eq!(config.retention.recency, RecencyPolicy::TagTimestamp);
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [registry]
                url = "registry.example.com"
                repository = "team/app"

                [retention]
                keep_count = 5
                recency = "push-time"
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.registry.url, "registry.example.com");
        assert_eq!(config.registry.repository.as_deref(), Some("team/app"));
        assert_eq!(config.retention.keep_count, 5);
        assert_eq!(config.retention.recency, RecencyPolicy::PushTime);
        // Unset sections keep their defaults.
        assert_eq!(config.convention.pattern, DEFAULT_PATTERN);
    }
}
