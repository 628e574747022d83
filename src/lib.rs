//! ec2-price library
//!
//! Looks up the on-demand hourly USD price of an EC2 instance type from the
//! AWS Price List API, assuming a cross-account role once if configured.

pub mod aws;
pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod provider;
pub mod query;
pub mod resolver;
pub mod value_search;

// Re-export commonly used types
pub use credentials::Credentials;
pub use error::{PricingError, Result};
pub use resolver::{PriceResolver, ResolverSettings, RoleState};
