//! Configuration module for gateway-server.
//!
//! Handles loading configuration from an optional TOML file, CLI
//! arguments, and environment variables. CLI and environment values win
//! over the file.

pub mod file;

use crate::config::file::FileConfig;
use gateway_core::{AdapterConfig, ExecutorRegistry, StreamAdapter};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable carrying the port to bind.
pub const PORT_ENV: &str = "GATEWAY_SERVER_PORT";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("port is not provided, set {PORT_ENV} or --port")]
    MissingPort,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub adapter: AdapterConfig,
    pub enabled_sources: Option<Vec<String>>,
}

impl GatewayConfig {
    /// Build the executor registry this configuration asks for.
    pub fn build_registry(&self) -> ExecutorRegistry {
        let mut registry = ExecutorRegistry::with_builtin(StreamAdapter::new(self.adapter));
        if let Some(enabled) = &self.enabled_sources {
            registry.retain(enabled);
        }
        registry
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: CliOverrides,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: Option<impl AsRef<Path>>, overrides: CliOverrides) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
            overrides,
        }
    }

    /// Load and resolve the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if one was given
    /// 2. Apply CLI/environment overrides
    /// 3. Validate the result
    pub fn load(&self) -> Result<GatewayConfig, ConfigError> {
        let file_config = match &self.config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => FileConfig::default(),
        };
        self.resolve(file_config)
    }

    fn resolve(&self, file_config: FileConfig) -> Result<GatewayConfig, ConfigError> {
        let host = self.overrides.host.unwrap_or(file_config.server.host);
        let port = self
            .overrides
            .port
            .or(file_config.server.port)
            .ok_or(ConfigError::MissingPort)?;

        if let Some(enabled) = &file_config.sources.enabled {
            let known = ExecutorRegistry::with_builtin(StreamAdapter::default());
            if let Some(unknown) = enabled.iter().find(|kind| !known.contains(kind)) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown source type {unknown} in [sources].enabled"
                )));
            }
        }

        Ok(GatewayConfig {
            listen: SocketAddr::new(host, port),
            adapter: AdapterConfig {
                shutdown_grace: Duration::from_secs(file_config.listener.shutdown_grace_secs),
            },
            enabled_sources: file_config.sources.enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn loader(overrides: CliOverrides) -> ConfigLoader {
        ConfigLoader::new(None::<PathBuf>, overrides)
    }

    #[test]
    fn test_port_is_required() {
        assert!(matches!(
            loader(CliOverrides::default()).load(),
            Err(ConfigError::MissingPort)
        ));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file_config = FileConfig::default();
        file_config.server.port = Some(9000);
        file_config.server.host = IpAddr::V4(Ipv4Addr::LOCALHOST);

        let config = loader(CliOverrides {
            host: None,
            port: Some(9300),
        })
        .resolve(file_config)
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:9300".parse().unwrap());
        assert_eq!(config.adapter.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_enabled_source_is_rejected() {
        let mut file_config = FileConfig::default();
        file_config.sources.enabled = Some(vec!["calendar".into(), "carrier-pigeon".into()]);

        let result = loader(CliOverrides {
            host: None,
            port: Some(9300),
        })
        .resolve(file_config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_registry_respects_enabled_sources() {
        let mut file_config = FileConfig::default();
        file_config.sources.enabled = Some(vec!["amqp".into()]);

        let config = loader(CliOverrides {
            host: None,
            port: Some(9300),
        })
        .resolve(file_config)
        .unwrap();
        assert_eq!(config.build_registry().kinds(), vec!["amqp"]);
    }
}
