//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ENCORE_CONFIG";

/// Media host connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Base URL of the media host API
    #[serde(default = "default_media_base_url")]
    pub base_url: String,

    /// API key sent with every request
    #[serde(default)]
    pub api_key: String,

    /// Secret used to sign requests
    #[serde(default)]
    pub api_secret: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: default_media_base_url(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the HTTP server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// MongoDB connection string
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,

    /// Database name
    #[serde(default = "default_database")]
    pub database: String,

    /// Session lifetime in minutes
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,

    /// Media host settings
    #[serde(default)]
    pub media: MediaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            mongodb_uri: default_mongodb_uri(),
            database: default_database(),
            session_ttl_minutes: default_session_ttl(),
            media: MediaConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:5750".to_string()
}

fn default_mongodb_uri() -> String {
    "mongodb://127.0.0.1:27017".to_string()
}

fn default_database() -> String {
    "encore".to_string()
}

fn default_session_ttl() -> i64 {
    12 * 60
}

fn default_media_base_url() -> String {
    "https://media.invalid/v1".to_string()
}

/// Resolve and load the service configuration
///
/// The config file is located with the standard priority order. A missing
/// file is not an error (defaults apply); a file that exists but does not
/// parse is.
///
/// After the file is loaded, `ENCORE_BIND_ADDR` and `ENCORE_MONGODB_URI`
/// override the corresponding fields so deployments can adjust the two
/// settings that vary per host without editing the file.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match locate_config_file(cli_path) {
        Some(path) => load_config_file(&path)?,
        None => ServerConfig::default(),
    };

    if let Ok(addr) = std::env::var("ENCORE_BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Ok(uri) = std::env::var("ENCORE_MONGODB_URI") {
        config.mongodb_uri = uri;
    }

    if config.session_ttl_minutes <= 0 {
        return Err(Error::Config(format!(
            "session_ttl_minutes must be positive (got {})",
            config.session_ttl_minutes
        )));
    }

    Ok(config)
}

/// Locate the config file following the priority order
///
/// 1. Explicit path from the command line
/// 2. `ENCORE_CONFIG` environment variable
/// 3. `<user config dir>/encore/config.toml`
/// 4. `/etc/encore/config.toml` (non-Windows)
fn locate_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = dirs::config_dir().map(|d| d.join("encore").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    if !cfg!(target_os = "windows") {
        let system_config = PathBuf::from("/etc/encore/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file into a [`ServerConfig`]
pub fn load_config_file(path: &Path) -> Result<ServerConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:5750");
        assert_eq!(config.database, "encore");
        assert_eq!(config.session_ttl_minutes, 720);
        assert!(config.media.api_key.is_empty());
    }

    #[test]
    fn full_config_file_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_addr = "0.0.0.0:8080"
mongodb_uri = "mongodb://db.internal:27017"
database = "fansite"
session_ttl_minutes = 60

[media]
base_url = "https://media.example.com/v1"
api_key = "key123"
api_secret = "secret456"
"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.database, "fansite");
        assert_eq!(config.session_ttl_minutes, 60);
        assert_eq!(config.media.api_key, "key123");
    }

    #[test]
    fn partial_config_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database = \"fansite\"").unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.database, "fansite");
        // Everything else keeps its default
        assert_eq!(config.bind_addr, "127.0.0.1:5750");
        assert_eq!(config.mongodb_uri, "mongodb://127.0.0.1:27017");
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = [not toml").unwrap();

        assert!(load_config_file(file.path()).is_err());
    }

    #[test]
    fn cli_path_takes_priority() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database = \"from_cli_file\"").unwrap();

        let located = locate_config_file(Some(file.path())).unwrap();
        assert_eq!(located, file.path());
    }

    #[test]
    fn nonpositive_session_ttl_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "session_ttl_minutes = 0").unwrap();

        let result = resolve_config(Some(file.path()));
        assert!(result.is_err());
    }
}
