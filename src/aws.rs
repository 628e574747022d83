//! AWS SDK implementations of the identity broker and pricing catalog
//!
//! ## Regions
//!
//! The Price List API is only served from a handful of regions, so the
//! pricing client always talks to `us-east-1`. The region being priced is
//! passed as the `regionCode` filter instead. STS calls use the configured
//! region.
//!
//! ## Endpoints and timeouts
//!
//! A custom endpoint (for example a local mock) applies to both clients.
//! Every call runs under the SDK operation timeout from configuration.

use crate::config::PricingConfig;
use crate::credentials::Credentials;
use crate::error::{PricingError, Result};
use crate::provider::{AssumedRoleGrant, CatalogConnector, IdentityBroker, PricingCatalog};
use crate::query::PricingQuery;
use crate::resolver::{PriceResolver, ResolverSettings};
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_pricing::types::{Filter, FilterType};
use aws_sdk_sts::error::{DisplayErrorContext, SdkError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Region hosting the Price List API endpoint
pub const CATALOG_REGION: &str = "us-east-1";

const PROVIDER_NAME: &str = "ec2-price";

/// Transport settings shared by the STS and pricing clients.
#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub ignore_ssl_errors: bool,
}

impl AwsSettings {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            ignore_ssl_errors: config.ignore_ssl_errors,
        }
    }

    async fn sdk_config(&self, credentials: &Credentials, region: &str) -> SdkConfig {
        let provider = aws_sdk_sts::config::Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token().map(str::to_string),
            None,
            PROVIDER_NAME,
        );

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(self.timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(provider)
            .timeout_config(timeouts);
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        loader.load().await
    }
}

// The SDK error travels as the source; its full context only goes to debug logs.
fn identity_failure<E, R>(e: SdkError<E, R>) -> PricingError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    debug!("AssumeRole error: {}", DisplayErrorContext(&e));
    PricingError::identity_with_source("STS assume role failed", e)
}

fn catalog_failure<E, R>(e: SdkError<E, R>) -> PricingError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    debug!("GetProducts error: {}", DisplayErrorContext(&e));
    PricingError::catalog_with_source("getProducts failed", e)
}

/// STS-backed identity broker.
pub struct StsBroker {
    settings: AwsSettings,
}

impl StsBroker {
    pub fn new(settings: AwsSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl IdentityBroker for StsBroker {
    async fn assume_role(
        &self,
        base: &Credentials,
        role_arn: &str,
        session_name: &str,
    ) -> Result<Option<AssumedRoleGrant>> {
        let sdk_config = self.settings.sdk_config(base, &self.settings.region).await;
        let client = aws_sdk_sts::Client::new(&sdk_config);

        let output = client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(identity_failure)?;

        Ok(output.credentials().map(|c| AssumedRoleGrant {
            access_key_id: Some(c.access_key_id().to_string()),
            secret_access_key: Some(c.secret_access_key().to_string()),
            session_token: Some(c.session_token().to_string()),
            expiration: chrono::DateTime::from_timestamp(
                c.expiration().secs(),
                c.expiration().subsec_nanos(),
            ),
        }))
    }
}

/// Builds Price List clients for a given set of credentials.
pub struct PricingConnector {
    settings: AwsSettings,
}

impl PricingConnector {
    pub fn new(settings: AwsSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl CatalogConnector for PricingConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn PricingCatalog>> {
        let sdk_config = self.settings.sdk_config(credentials, CATALOG_REGION).await;
        debug!(
            provenance = ?credentials.provenance(),
            endpoint = ?self.settings.endpoint,
            "Building pricing client"
        );
        Ok(Arc::new(AwsPricingCatalog {
            client: aws_sdk_pricing::Client::new(&sdk_config),
        }))
    }
}

/// Price List `GetProducts` over the AWS SDK.
pub struct AwsPricingCatalog {
    client: aws_sdk_pricing::Client,
}

impl AwsPricingCatalog {
    fn sdk_filters(query: &PricingQuery) -> Result<Vec<Filter>> {
        query
            .filters()
            .into_iter()
            .map(|term| {
                Filter::builder()
                    .r#type(FilterType::TermMatch)
                    .field(term.field)
                    .value(term.value)
                    .build()
                    .map_err(|e| PricingError::catalog_with_source("Invalid pricing filter", e))
            })
            .collect()
    }
}

#[async_trait]
impl PricingCatalog for AwsPricingCatalog {
    async fn get_products(&self, query: &PricingQuery) -> Result<Option<Vec<String>>> {
        let output = self
            .client
            .get_products()
            .service_code(query.service_code)
            .set_filters(Some(Self::sdk_filters(query)?))
            .format_version(query.format_version)
            .max_results(query.max_results)
            .send()
            .await
            .map_err(catalog_failure)?;

        Ok(Some(output.price_list().to_vec()))
    }
}

/// Build a resolver wired to the real AWS services.
pub async fn resolver_from_config(config: &PricingConfig) -> Result<PriceResolver> {
    config.validate()?;

    let settings = AwsSettings::from_config(config);
    if settings.ignore_ssl_errors {
        // The SDK's default rustls connector has no switch for this
        warn!("ignore_ssl_errors is set but certificate verification stays enabled");
    }

    let credentials = config.static_credentials()?;
    PriceResolver::new(
        ResolverSettings::from_config(config),
        credentials,
        Arc::new(StsBroker::new(settings.clone())),
        Arc::new(PricingConnector::new(settings)),
    )
    .await
}
