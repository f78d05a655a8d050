use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dataset::DatasetSource;
use crate::hazard::LoadPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub geolocation: GeolocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// IP to geolocate when a request carries none
    pub default_ip: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Reload interval; 0 disables reloading
    pub refresh_secs: u64,
    pub strict: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeolocationConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            default_ip: "8.8.8.8".to_string(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: None,
            timeout_secs: 30,
            max_attempts: 3,
            refresh_secs: 0,
            strict: false,
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ipapi.co/".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl DatasetConfig {
    /// A local path takes precedence over a URL
    pub fn source(&self) -> Option<DatasetSource> {
        match (&self.path, &self.url) {
            (Some(path), _) => Some(DatasetSource::File(path.clone())),
            (None, Some(url)) => Some(DatasetSource::parse(url)),
            (None, None) => None,
        }
    }

    pub fn policy(&self) -> LoadPolicy {
        LoadPolicy::from_strict(self.strict)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs))
    }
}

impl GeolocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file_content() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:3000");
        assert_eq!(config.server.default_ip, "8.8.8.8");
        assert_eq!(config.dataset.policy(), LoadPolicy::Lenient);
        assert!(config.dataset.source().is_none());
        assert!(config.dataset.refresh_interval().is_none());
        assert_eq!(config.geolocation.endpoint, "https://ipapi.co/");
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(
            r#"
            [server]
            listen = "127.0.0.1:8080"

            [dataset]
            url = "https://example.com/flood_hazard_data.json"
            refresh_secs = 3600
            strict = true

            [geolocation]
            timeout_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.server.default_ip, "8.8.8.8");
        assert_eq!(config.dataset.policy(), LoadPolicy::Strict);
        assert_eq!(config.dataset.max_attempts, 3);
        assert_eq!(
            config.dataset.refresh_interval(),
            Some(Duration::from_secs(3600))
        );
        assert!(matches!(
            config.dataset.source(),
            Some(DatasetSource::Url(_))
        ));
        assert_eq!(config.geolocation.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_path_beats_url() {
        let config = Config::from_toml_str(
            r#"
            [dataset]
            url = "https://example.com/flood.json"
            path = "/var/lib/flood.json.gz"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.dataset.source(),
            Some(DatasetSource::File(PathBuf::from("/var/lib/flood.json.gz")))
        );
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(Config::from_toml_str("[dataset\nurl = ").is_err());
    }
}
