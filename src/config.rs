//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/insurance-dashboard/config.toml`).
//! Every field has a default, so a missing section or an empty file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::AppError;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "INSURANCE_CONFIG";

/// Default config file path (`<config dir>/insurance-dashboard/config.toml`).
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("insurance-dashboard")
        .join("config.toml")
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub data: DataConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            shutdown_timeout: 30,
        }
    }
}

/// Which user store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Three-column CSV file, rewritten in full on every signup
    Csv,
    /// Embedded SQLite database through SeaORM
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Path of the CSV user store (csv backend)
    pub users_csv: PathBuf,
    /// Database URL (sqlite backend), e.g. `sqlite://./users.db?mode=rwc`
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            users_csv: PathBuf::from("users.csv"),
            database_url: "sqlite://./users.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Insurance dataset (CSV)
    pub dataset_path: PathBuf,
    /// Trained model artifact (JSON)
    pub model_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/insurance.csv"),
            model_path: PathBuf::from("data/model.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
    pub session_cookie: String,
    /// Idle sessions older than this are dropped by the sweeper
    pub session_ttl_minutes: i64,
    /// Set the `Secure` attribute on the session cookie
    pub secure_cookie: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_cookie: "session_id".to_string(),
            session_ttl_minutes: 120,
            secure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub preview_rows: usize,
    pub histogram_bins: usize,
    /// Points sampled along each KDE curve
    pub kde_points: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            preview_rows: 20,
            histogram_bins: 30,
            kde_points: 100,
        }
    }
}

impl AppConfig {
    /// Load and validate the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        let cfg: Self = toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(AppError::Config(format!(
                "security.bcrypt_cost must be within 4..=31, got {}",
                self.security.bcrypt_cost
            )));
        }
        if self.security.session_ttl_minutes <= 0 {
            return Err(AppError::Config(
                "security.session_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.security.session_cookie.is_empty() {
            return Err(AppError::Config(
                "security.session_cookie must not be empty".to_string(),
            ));
        }
        if self.dashboard.histogram_bins == 0 || self.dashboard.kde_points < 2 {
            return Err(AppError::Config(
                "dashboard.histogram_bins must be >= 1 and dashboard.kde_points >= 2".to_string(),
            ));
        }
        match self.logging.format.to_lowercase().as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(AppError::Config(format!(
                "logging.format must be `pretty` or `json`, got `{}`",
                other
            ))),
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.server.port, 8501);
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert_eq!(cfg.dashboard.histogram_bins, 30);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [storage]
            backend = "csv"
            users_csv = "/tmp/users.csv"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.backend, StorageBackend::Csv);
        assert_eq!(cfg.storage.users_csv, PathBuf::from("/tmp/users.csv"));
        assert_eq!(cfg.logging.format, "json");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn rejects_out_of_range_bcrypt_cost() {
        let err = AppConfig::from_toml("[security]\nbcrypt_cost = 2").unwrap_err();
        assert!(err.to_string().contains("bcrypt_cost"));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(AppConfig::from_toml("[logging]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let cfg = AppConfig::load(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(cfg.listen_address(), "127.0.0.1:8501");
    }
}
