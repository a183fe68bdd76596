//! Daemon configuration.
//!
//! Settings load from an `edld.toml` file with four optional tables:
//!
//! - `[server]` - bind address and port
//! - `[database]` - SQLite file location
//! - `[edl]` - base URL advertised in list metadata
//! - `[limits]` - bulk batch cap, search and paging limits
//!
//! Every field has a default, so a missing file or an empty one yields a
//! working development configuration under `~/.edld/`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_BULK_MAX: usize = 500;
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// edld.toml configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub edl: EdlConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path. Defaults to `~/.edld/edld.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EdlConfig {
    /// Base URL firewalls reach this daemon at, e.g. `https://edl.example.com`.
    /// Used only for the URLs reported in list metadata.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_bulk_max")]
    pub bulk_max: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            bulk_max: default_bulk_max(),
            search_limit: default_search_limit(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bulk_max() -> usize {
    DEFAULT_BULK_MAX
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an optional path: a named file must exist, the default
    /// location (`~/.edld/edld.toml`) may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default = data_dir().join("edld.toml");
                if default.exists() {
                    Self::load_from(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The SQLite file to open, honoring `[database] path`.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("edld.db"))
    }

    /// Validate configuration, collecting errors and warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails:
    /// - Port 0
    /// - A zero bulk, search, or page limit
    /// - A base URL missing a scheme
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port cannot be 0; use a valid port number (1-65535)".to_string());
        }
        if self.server.port > 0 && self.server.port < 1024 {
            warnings.push(format!(
                "server.port {} is a privileged port (< 1024); ports >= 1024 avoid \
                 permission issues",
                self.server.port
            ));
        }

        if self.limits.bulk_max == 0 {
            errors.push("limits.bulk_max cannot be 0".to_string());
        }
        if self.limits.bulk_max > DEFAULT_BULK_MAX {
            warnings.push(format!(
                "limits.bulk_max {} exceeds the recommended maximum of {DEFAULT_BULK_MAX}; \
                 large batches hold the write lock for a long time",
                self.limits.bulk_max
            ));
        }
        if self.limits.search_limit == 0 {
            errors.push("limits.search_limit cannot be 0".to_string());
        }
        if self.limits.page_limit == 0 {
            errors.push("limits.page_limit cannot be 0".to_string());
        }

        if let Some(base_url) = &self.edl.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                errors.push(format!(
                    "edl.base_url must start with http:// or https:// (got: '{base_url}')"
                ));
            }
            if base_url.ends_with('/') {
                warnings.push("edl.base_url has a trailing slash; it will be stripped".to_string());
            }
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
        Ok(ValidationResult { warnings })
    }

    /// Base URL with any trailing slash removed, if configured.
    #[must_use]
    pub fn edl_base_url(&self) -> Option<&str> {
        self.edl
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
    }
}

/// `~/.edld`, falling back to the current directory when the home
/// directory cannot be determined.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".edld"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.limits.bulk_max, DEFAULT_BULK_MAX);
        assert!(config.database.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_full_config() {
        let toml_str = r#"
[server]
bind = "0.0.0.0"
port = 9090

[database]
path = "/var/lib/edld/edld.db"

[edl]
base_url = "https://edl.example.com"

[limits]
bulk_max = 250
search_limit = 25
page_limit = 50
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.database.path.as_deref(),
            Some(Path::new("/var/lib/edld/edld.db"))
        );
        assert_eq!(config.edl_base_url(), Some("https://edl.example.com"));
        assert_eq!(config.limits.bulk_max, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_port_zero() {
        let config: Config = toml::from_str("[server]\nport = 0").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port cannot be 0"));
    }

    #[test]
    fn validate_zero_limits() {
        let config: Config = toml::from_str("[limits]\nbulk_max = 0").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bulk_max"));
    }

    #[test]
    fn validate_base_url_scheme() {
        let config: Config = toml::from_str("[edl]\nbase_url = \"edl.example.com\"").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let config: Config =
            toml::from_str("[edl]\nbase_url = \"https://edl.example.com/\"").unwrap();
        let result = config.validate().unwrap();
        assert!(result.has_warnings());
        assert_eq!(config.edl_base_url(), Some("https://edl.example.com"));
    }

    #[test]
    fn oversized_bulk_max_warns() {
        let config: Config = toml::from_str("[limits]\nbulk_max = 10000").unwrap();
        let result = config.validate().unwrap();
        assert!(result.has_warnings());
    }

    #[test]
    fn load_or_default_requires_named_file() {
        let err = Config::load_or_default(Some(Path::new("/nonexistent/edld.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8080").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
