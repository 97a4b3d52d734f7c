pub mod collector;
pub mod export;
pub mod percentiles;
pub mod registry;
pub mod reservoir;
pub mod stream;

pub use collector::{OperationMetrics, OperationStats};
pub use percentiles::PercentileSet;
pub use registry::MetricsRegistry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between the layer and the operation name in a composite key.
pub const KEY_SEPARATOR: &str = "::";

/// One of the two instrumented tiers of the host service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layer {
    Service,
    Repository,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "SERVICE",
            Self::Repository => "REPOSITORY",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SERVICE" => Ok(Self::Service),
            "REPOSITORY" => Ok(Self::Repository),
            other => Err(format!("unknown layer '{other}'")),
        }
    }
}

/// Builds the `"<LAYER>::<operationName>"` key an operation is tracked under.
pub fn operation_key(layer: Layer, operation: &str) -> String {
    format!("{layer}{KEY_SEPARATOR}{operation}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_upper_case_layer() {
        assert_eq!(operation_key(Layer::Service, "createUser"), "SERVICE::createUser");
        assert_eq!(
            operation_key(Layer::Repository, "findById"),
            "REPOSITORY::findById"
        );
    }

    #[test]
    fn layer_parses_case_insensitively() {
        assert_eq!("service".parse::<Layer>(), Ok(Layer::Service));
        assert_eq!("Repository".parse::<Layer>(), Ok(Layer::Repository));
        assert!("controller".parse::<Layer>().is_err());
    }
}
