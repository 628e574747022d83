//! Seams between the price resolver and the services it talks to
//!
//! The resolver only sees these traits. `crate::aws` implements them on top
//! of the AWS SDK; tests implement them with in-memory fakes.

use crate::credentials::Credentials;
use crate::error::Result;
use crate::query::PricingQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Credentials granted by the identity broker, exactly as returned.
///
/// Any field may be missing; the resolver decides whether the grant is usable.
#[derive(Debug, Clone, Default)]
pub struct AssumedRoleGrant {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

/// Exchanges the caller's identity for a delegated one.
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Assume `role_arn` under `session_name`.
    ///
    /// `Ok(None)` means the broker answered without any credentials block.
    async fn assume_role(
        &self,
        base: &Credentials,
        role_arn: &str,
        session_name: &str,
    ) -> Result<Option<AssumedRoleGrant>>;
}

/// Pricing catalog client bound to one set of credentials.
#[async_trait]
pub trait PricingCatalog: Send + Sync {
    /// Run a product query.
    ///
    /// `Ok(None)` means the transport produced no response object at all;
    /// `Ok(Some(vec![]))` is a valid response with an empty price list.
    async fn get_products(&self, query: &PricingQuery) -> Result<Option<Vec<String>>>;
}

/// Builds catalog clients bound to given credentials.
#[async_trait]
pub trait CatalogConnector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn PricingCatalog>>;
}
