use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use serde_derive::Deserialize;
use thiserror::Error;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub scan: Option<ScanConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
    pub discovery_prefix: Option<String>,
    pub keep_alive_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ScanConfig {
    pub interval_seconds: Option<u64>,
    /// Overrides the FindMy cache directory, mainly for testing off-macOS.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        toml::de::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config_str = r#"
            [mqtt]
            host = "localhost"
            port = 1883
            username = "user"
            password = "pass"

            [scan]
            interval_seconds = 10
            cache_dir = "/tmp/findmy"
        "#;
        let config: AppConfig = toml::de::from_str(&config_str).unwrap();
        assert!(config.mqtt.host == "localhost");
        assert!(config.mqtt.discovery_prefix.is_none());
        let scan = config.scan.unwrap();
        assert_eq!(scan.interval_seconds, Some(10));
        assert_eq!(scan.cache_dir.as_deref(), Some(Path::new("/tmp/findmy")));
    }

    #[test]
    fn scan_section_is_optional() {
        let config: AppConfig = toml::de::from_str("[mqtt]\nhost = \"broker\"").unwrap();
        assert!(config.scan.is_none());
        assert!(config.mqtt.port.is_none());
    }
}
