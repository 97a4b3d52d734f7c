//! Runtime configuration.
//!
//! Loaded from the TOML file named by `CRUD_TELEMETRY_CONFIG`; every field
//! has a default, so the variable may be unset and the file may be partial.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::metrics::collector::DEFAULT_RESERVOIR_CAPACITY;

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "CRUD_TELEMETRY_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Recent samples kept per operation for percentiles.
    pub reservoir_capacity: usize,

    /// Calls slower than this are logged at warn level.
    pub slow_threshold_ms: u64,

    /// Directory export files are written to.
    pub export_dir: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            reservoir_capacity: DEFAULT_RESERVOIR_CAPACITY,
            slow_threshold_ms: 1000,
            export_dir: PathBuf::from("logs"),
        }
    }
}

impl TelemetryConfig {
    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, TelemetryError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, TelemetryError> {
        let content = fs::read_to_string(path).map_err(|e| TelemetryError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Load from `CRUD_TELEMETRY_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> Result<Self, TelemetryError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.server.bind_address.trim().is_empty() {
            return Err(TelemetryError::InvalidConfig(
                "server.bind_address must not be empty".into(),
            ));
        }
        if self.telemetry.reservoir_capacity == 0 {
            return Err(TelemetryError::InvalidConfig(
                "telemetry.reservoir_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let c = AppConfig::from_toml("").unwrap();
        assert_eq!(c.server.bind_address, "0.0.0.0:3000");
        assert_eq!(c.telemetry.reservoir_capacity, 1000);
        assert_eq!(c.telemetry.slow_threshold(), Duration::from_secs(1));
        assert_eq!(c.telemetry.export_dir, PathBuf::from("logs"));
    }

    #[test]
    fn partial_sections_override() {
        let c = AppConfig::from_toml(
            r#"
            [telemetry]
            reservoir_capacity = 2000
            slow_threshold_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(c.telemetry.reservoir_capacity, 2000);
        assert_eq!(c.telemetry.slow_threshold_ms, 250);
        assert_eq!(c.telemetry.export_dir, PathBuf::from("logs"));
        assert_eq!(c.server.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = AppConfig::from_toml("[telemetry]\nreservoir_capacity = 0\n").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = AppConfig::from_toml("[server\nbind_address = ").unwrap_err();
        assert!(matches!(err, TelemetryError::ConfigParse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.toml");
        fs::write(&path, "[server]\nbind_address = \"127.0.0.1:9000\"\n").unwrap();

        let c = AppConfig::load(&path).unwrap();
        assert_eq!(c.server.bind_address, "127.0.0.1:9000");

        let missing = AppConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, TelemetryError::Io { .. }));
    }
}
