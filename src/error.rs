//! Error types for ec2-price
//!
//! There are two error types: `PricingError` (main error enum) and
//! `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `PricingError`.
//! The CLI uses `anyhow::Result<T>` and converts at the boundary so the full
//! source chain is kept.
//!
//! Nothing in this crate retries. Every failure is logged once where it is
//! detected and then returned to the caller, who owns retry policy and
//! presentation.
//!
//! ## When to Use Which Error
//!
//! - `Identity`: the STS exchange failed, or succeeded without a usable
//!   access key id / secret access key
//! - `CatalogTransport`: the Price List call failed, or produced no response
//! - `Shape`: a price-list entry parsed fine but carries no usable `USD` leaf
//!   under `terms.OnDemand`
//! - `Json`: a price-list entry is not valid JSON
//! - `Config`: configuration is missing or inconsistent
//!
//! An empty price list is not an error: the resolver returns `0.0`.

use thiserror::Error;

/// Main error type for ec2-price
#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity error: {message}")]
    Identity {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Pricing catalog error: {message}")]
    CatalogTransport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unexpected price document for {instance_type}: {reason}")]
    Shape {
        instance_type: String,
        reason: String,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PricingError {
    pub fn identity(message: impl Into<String>) -> Self {
        PricingError::Identity {
            message: message.into(),
            source: None,
        }
    }

    pub fn identity_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PricingError::Identity {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        PricingError::CatalogTransport {
            message: message.into(),
            source: None,
        }
    }

    pub fn catalog_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PricingError::CatalogTransport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PricingError>;
