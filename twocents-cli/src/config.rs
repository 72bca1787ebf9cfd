use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use twocents_client::{ClientConfig, ClientConfigBuilder};

const APP_NAME: &str = "twocents";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the REST API
    pub base_url: String,

    /// Bearer token used when none is given on the command line
    pub token: Option<String>,

    /// Media cache directory; the system temp dir is used when unset
    pub cache_dir: Option<PathBuf>,

    /// Maximum media cache size in megabytes (0 = unlimited)
    pub max_cache_size_mb: u64,

    /// Files unused for this many days are evicted (0 = never)
    pub max_cache_age_days: u64,

    /// Default request timeout in seconds (0 = none)
    pub timeout: u64,

    /// User agent string for requests
    pub user_agent: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: twocents_client::config::DEFAULT_BASE_URL.to_string(),
            token: None,
            cache_dir: None,
            max_cache_size_mb: 500,
            max_cache_age_days: 7,
            timeout: 30,
            user_agent: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file, or from the confy location
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Current configuration as TOML, with the token masked
    pub fn show(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.token.is_some() {
            shown.token = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).context("Failed to serialize configuration for display")
    }

    /// Client configuration derived from this file plus command line overrides
    pub fn client_config(&self, base_url: Option<&str>, timeout: Option<u64>) -> ClientConfig {
        let mut builder = ClientConfigBuilder::new()
            .with_base_url(base_url.unwrap_or(&self.base_url))
            .with_max_cache_size(self.max_cache_size_mb * 1024 * 1024)
            .with_timeout(Duration::from_secs(timeout.unwrap_or(self.timeout)));

        if self.max_cache_age_days > 0 {
            builder =
                builder.with_max_cache_age(Duration::from_secs(self.max_cache_age_days * 86_400));
        }
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent);
        }

        let mut config = builder.build();
        if self.max_cache_age_days == 0 {
            config.cache_config.max_age = None;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("twocents.toml");

        let config = AppConfig {
            token: Some("secret".into()),
            max_cache_size_mb: 64,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), config);

        std::fs::write(&path, "timeout = 5\n").unwrap();
        let partial = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(partial.timeout, 5);
        assert_eq!(partial.max_cache_size_mb, 500);
    }

    #[test]
    fn test_show_masks_token() {
        let config = AppConfig {
            token: Some("secret".into()),
            ..Default::default()
        };
        let shown = config.show().unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("********"));
    }

    #[test]
    fn test_client_config_applies_overrides() {
        let config = AppConfig {
            max_cache_age_days: 0,
            cache_dir: Some(PathBuf::from("/tmp/tc")),
            ..Default::default()
        };
        let client = config.client_config(Some("http://localhost:8080/v1/"), Some(3));

        assert_eq!(client.base_url, "http://localhost:8080/v1/");
        assert_eq!(client.timeout, Duration::from_secs(3));
        assert_eq!(client.cache_config.max_size_bytes, 500 * 1024 * 1024);
        assert_eq!(client.cache_config.max_age, None);
        assert_eq!(client.cache_config.cache_dir, Some(PathBuf::from("/tmp/tc")));
    }
}
