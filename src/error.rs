use std::path::PathBuf;

use thiserror::Error;

/// Failures internal to the telemetry engine.
///
/// None of these ever reach a caller of the interception boundary; export
/// failures are logged and swallowed, config failures stop startup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl TelemetryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
