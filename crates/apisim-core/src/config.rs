//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//! 1. Built-in defaults (the `Default` impls below)
//! 2. An optional TOML file (`APISIM_CONFIG`, else `apisim.toml`)
//! 3. Environment overrides prefixed with `APISIM_`, using `__` between
//!    section and key, e.g. `APISIM_SERVER__PORT=8080`
//!
//! The merged result is validated before it is returned.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "APISIM_CONFIG";

/// Configuration file used when `APISIM_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "apisim.toml";

const ENV_PREFIX: &str = "APISIM";

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file or environment could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A single field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path, e.g. `server.port`.
        field: String,
        /// What is wrong with the value.
        message: String,
    },

    /// Several fields are invalid.
    #[error("Configuration has {} invalid fields: {}", .0.len(), join_errors(.0))]
    MultipleValidationErrors(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Default directory for the database and logs.
///
/// Uses the platform data directory (e.g. `~/.local/share/apisim`) and falls
/// back to `./data` when no home directory is available.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "apisim")
        .map_or_else(|| PathBuf::from("./data"), |dirs| dirs.data_dir().to_path_buf())
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// SQLite database.
    pub database: DatabaseConfig,
    /// Bearer token checks.
    pub auth: AuthConfig,
    /// List endpoint limits.
    pub pagination: PaginationConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Simulated workspace defaults.
    pub simulation: SimulationConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file.
    pub path: PathBuf,
    /// Drop and recreate every table on startup.
    pub reset_on_start: bool,
    /// Fill an empty database with sample data on startup.
    pub populate_sample_data: bool,
    /// Seed for reproducible sample data.
    pub sample_seed: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("database.db"),
            reset_on_start: false,
            populate_sample_data: true,
            sample_seed: None,
        }
    }
}

/// Bearer token settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Tokens shorter than this are rejected as `invalid_auth`.
    pub min_token_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_token_length: 10,
        }
    }
}

/// Pagination limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size when the request gives no limit.
    pub default_limit: usize,
    /// Largest page size honoured.
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON file logs plus compact stdout instead of pretty stdout.
    pub production: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rolling log files; defaults to `<data dir>/logs`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            production: false,
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Directory that rolling log files are written to.
    #[must_use]
    pub fn log_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| default_data_dir().join("logs"))
    }
}

/// Defaults for the simulated workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// User that acts when a request names none.
    pub bot_user_id: String,
    /// Workspace URL reported by `auth.test`.
    pub workspace_url: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            bot_user_id: "USLACKBOT".to_string(),
            workspace_url: "https://myteam.slack.com/".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the file named by `APISIM_CONFIG` (or `apisim.toml`) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        Self::load_from(&path)
    }

    /// Load from a specific file (which may be absent) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a single problem or
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.server.host.trim().is_empty() {
            errors.push(ConfigError::invalid("server.host", "must not be empty"));
        }
        if self.server.port == 0 {
            errors.push(ConfigError::invalid("server.port", "must be between 1 and 65535"));
        }
        if self.database.path.as_os_str().is_empty() {
            errors.push(ConfigError::invalid("database.path", "must not be empty"));
        }
        if self.auth.min_token_length == 0 {
            errors.push(ConfigError::invalid("auth.min_token_length", "must be at least 1"));
        }
        if self.pagination.default_limit == 0 {
            errors.push(ConfigError::invalid("pagination.default_limit", "must be at least 1"));
        }
        if self.pagination.max_limit < self.pagination.default_limit {
            errors.push(ConfigError::invalid(
                "pagination.max_limit",
                format!(
                    "must be at least default_limit ({})",
                    self.pagination.default_limit
                ),
            ));
        }
        if self.logging.level.trim().is_empty() {
            errors.push(ConfigError::invalid("logging.level", "must not be empty"));
        }
        if !self.simulation.bot_user_id.starts_with(['U', 'W']) {
            errors.push(ConfigError::invalid(
                "simulation.bot_user_id",
                "must be a user id starting with 'U' or 'W'",
            ));
        }
        if !(self.simulation.workspace_url.starts_with("http://")
            || self.simulation.workspace_url.starts_with("https://"))
        {
            errors.push(ConfigError::invalid(
                "simulation.workspace_url",
                "must be an http(s) URL",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.pagination.default_limit, 100);
        assert_eq!(config.simulation.bot_user_id, "USLACKBOT");
        assert!(config.database.path.ends_with("database.db"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.auth.min_token_length, 10);
    }

    #[test]
    fn test_load_from_file_overrides_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apisim.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[database]\npath = \"/tmp/sim.db\"\nsample_seed = 7\n"
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.path, PathBuf::from("/tmp/sim.db"));
        assert_eq!(config.database.sample_seed, Some(7));
        assert!(config.database.populate_sample_data);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.pagination.default_limit = 50;
        config.pagination.max_limit = 10;
        config.simulation.bot_user_id = "bot".into();

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_single_validation_error() {
        let mut config = AppConfig::default();
        config.auth.min_token_length = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth.min_token_length"));
    }
}
