use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use toolbridge_mcp::protocol::{ServerInfo, DEFAULT_PROTOCOL_VERSION};
use toolbridge_mcp::transport::DEFAULT_MAX_FRAME_BYTES;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Answered when a client's `initialize` names no version
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Per-call handler timeout; 0 disables it
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory the file tools are confined to
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    #[serde(default = "default_enable_files")]
    pub enable_files: bool,
}

fn default_name() -> String {
    "toolbridge".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_enable_files() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            protocol_version: default_protocol_version(),
            call_timeout_secs: default_call_timeout_secs(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            enable_files: default_enable_files(),
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read configuration file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse configuration file")?;

        if config.server.max_frame_bytes == 0 {
            anyhow::bail!("server.max_frame_bytes must be greater than zero");
        }

        Ok(config)
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo::new(&self.server.name, &self.server.version)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        match self.server.call_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.server.name, "toolbridge");
        assert_eq!(config.server.protocol_version, "2024-11-05");
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.tools.root_dir, PathBuf::from("."));
        assert!(config.tools.enable_files);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("toolbridge.toml");
        std::fs::write(
            &path,
            r#"
[server]
name = "weather_mcp"
call_timeout_secs = 0

[tools]
enable_files = false
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server_info(), ServerInfo::new("weather_mcp", env!("CARGO_PKG_VERSION")));
        assert_eq!(config.call_timeout(), None);
        assert_eq!(config.server.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
        assert!(!config.tools.enable_files);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("toolbridge.toml");
        std::fs::write(&path, "[server]\nmax_frame_bytes = 0\n").unwrap();
        assert!(Config::load(&path).is_err());

        std::fs::write(&path, "[server\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
