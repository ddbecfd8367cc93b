//! Configuration loading and management.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use gantry_proto::ports;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Bridge identity and startup configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Host program this server is embedded in; selects the default port.
    #[serde(default)]
    pub host_program: Option<String>,
    /// Explicit port, overriding the host program's well-known one.
    #[serde(default)]
    pub port: Option<u16>,
    /// Modules to load at startup, in order.
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Designated-thread executor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Route invocations through the designated-thread executor.
    #[serde(default)]
    pub enabled: bool,
    /// How long a dispatch waits for the designated thread, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Port to bind: an explicit port wins, else the host program's
    /// well-known port, else the undefined fallback.
    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or_else(|| {
            ports::for_host_program(self.server.host_program.as_deref().unwrap_or(""))
        })
    }

    pub fn executor_timeout(&self) -> Duration {
        Duration::from_millis(self.executor.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host_program = "blender"
            modules = ["blender"]

            [executor]
            enabled = true
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.port(), ports::BLENDER);
        assert_eq!(config.server.modules, vec!["blender"]);
        assert!(config.executor.enabled);
        assert_eq!(config.executor_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn explicit_port_wins_over_host_program() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host_program = "maya"
            port = 12345
            "#,
        )
        .unwrap();
        assert_eq!(config.port(), 12345);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.port(), ports::UNDEFINED);
        assert!(!config.executor.enabled);
        assert_eq!(config.executor_timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4242").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port(), 4242);

        assert!(Config::load("/definitely/not/here.toml").is_err());
    }
}
