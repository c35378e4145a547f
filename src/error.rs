//! Error types for the depreciation and capital-stock engine

use thiserror::Error;

/// Errors raised while configuring or running the engine
#[derive(Debug, Error)]
pub enum ModelError {
    /// Malformed policy parameters, data tables or timeline
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A formula was invoked outside the domain it is defined on
    #[error("Domain error: {0}")]
    Domain(String),

    /// A computed value violates a modeling invariant
    #[error("Numeric anomaly in {context}: {detail}")]
    NumericAnomaly { context: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn config(msg: impl Into<String>) -> Self {
        ModelError::Configuration(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        ModelError::Domain(msg.into())
    }
}

/// A numeric anomaly recorded during a run rather than raised
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Anomaly {
    /// Where it happened (e.g. "capital stock", "deduction fraction")
    pub context: String,
    /// Asset index, if the anomaly belongs to a single asset
    pub asset: Option<usize>,
    /// Calendar year the anomaly belongs to
    pub year: i32,
    /// Offending value
    pub value: f64,
}

impl Anomaly {
    pub fn into_error(self) -> ModelError {
        let detail = match self.asset {
            Some(asset) => format!("asset {} in {} has value {}", asset, self.year, self.value),
            None => format!("{} has value {}", self.year, self.value),
        };
        ModelError::NumericAnomaly {
            context: self.context,
            detail,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
