//! On-demand price resolution with lazy, one-time role assumption
//!
//! ## Credential state
//!
//! ```text
//! Unassumed --(first ensure_client, role configured, assume ok)--> Assumed
//! ```
//!
//! `Assumed` is terminal for the lifetime of the resolver: credentials are
//! never re-checked or refreshed. A failed assumption leaves the resolver
//! `Unassumed`, so the next call tries again. Without a role configured the
//! resolver stays on its static credentials forever.
//!
//! The check-and-set runs under one async mutex, so concurrent first callers
//! share a single STS exchange.

use crate::config::PricingConfig;
use crate::credentials::Credentials;
use crate::error::{PricingError, Result};
use crate::provider::{AssumedRoleGrant, CatalogConnector, IdentityBroker, PricingCatalog};
use crate::query::PricingQuery;
use crate::value_search::find_first;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Prefix of every STS session name issued by this crate
pub const SESSION_NAME_PREFIX: &str = "ec2-action-builder";

/// STS rejects session names longer than this
pub const MAX_SESSION_NAME_LEN: usize = 64;

/// Where the resolver is in the role assumption lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    Unassumed,
    Assumed,
}

/// Settings the resolver needs, split out from the full configuration.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Region used in the `regionCode` filter
    pub region: String,
    /// Role to assume before the first lookup, if any
    pub role_arn: Option<String>,
    /// Identifier embedded in STS session names
    pub job_id: String,
}

impl ResolverSettings {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            region: config.region.clone(),
            role_arn: config.role_to_assume().map(str::to_string),
            job_id: config.job_id.clone(),
        }
    }
}

struct ResolverState {
    credentials: Credentials,
    client: Arc<dyn PricingCatalog>,
    role: RoleState,
}

pub struct PriceResolver {
    settings: ResolverSettings,
    broker: Arc<dyn IdentityBroker>,
    connector: Arc<dyn CatalogConnector>,
    state: Mutex<ResolverState>,
}

impl PriceResolver {
    /// Create a resolver whose initial client is bound to `credentials`.
    pub async fn new(
        settings: ResolverSettings,
        credentials: Credentials,
        broker: Arc<dyn IdentityBroker>,
        connector: Arc<dyn CatalogConnector>,
    ) -> Result<Self> {
        let client = connector.connect(&credentials).await?;
        Ok(Self {
            settings,
            broker,
            connector,
            state: Mutex::new(ResolverState {
                credentials,
                client,
                role: RoleState::Unassumed,
            }),
        })
    }

    pub async fn role_state(&self) -> RoleState {
        self.state.lock().await.role
    }

    /// Credentials the active client is bound to.
    pub async fn credentials(&self) -> Credentials {
        self.state.lock().await.credentials.clone()
    }

    /// Return a catalog client, assuming the configured role first if that
    /// has not happened yet.
    pub async fn ensure_client(&self) -> Result<Arc<dyn PricingCatalog>> {
        let mut state = self.state.lock().await;

        let role_arn = match (&self.settings.role_arn, state.role) {
            (Some(arn), RoleState::Unassumed) => arn.clone(),
            _ => return Ok(Arc::clone(&state.client)),
        };

        let credentials = self.assume_role(&state.credentials, &role_arn).await?;
        let client = match self.connector.connect(&credentials).await {
            Ok(client) => client,
            Err(e) => {
                error!("Building pricing client for assumed role failed: {}", e);
                return Err(e);
            }
        };

        state.credentials = credentials;
        state.client = client;
        state.role = RoleState::Assumed;
        info!(role_arn = %role_arn, "Pricing client now uses assumed role credentials");

        Ok(Arc::clone(&state.client))
    }

    /// Obtain delegated credentials for `role_arn`.
    ///
    /// Credentials that already carry a session token are treated as
    /// delegated and returned unchanged without contacting the broker.
    pub async fn assume_role(&self, current: &Credentials, role_arn: &str) -> Result<Credentials> {
        if current.has_session_token() {
            debug!("Credentials already carry a session token, skipping role assumption");
            return Ok(current.clone());
        }

        let session_name =
            session_name(&self.settings.job_id, chrono::Utc::now().timestamp_millis());
        debug!(role_arn = %role_arn, session_name = %session_name, "Assuming role");

        let grant = match self
            .broker
            .assume_role(current, role_arn, &session_name)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                error!("Role assumption for {} failed: {}", role_arn, e);
                return Err(e);
            }
        };

        let credentials = grant.and_then(credentials_from_grant).ok_or_else(|| {
            error!("STS returned empty response");
            PricingError::identity("STS returned empty response")
        })?;

        if let Some(expires_at) = credentials.expires_at() {
            debug!(%expires_at, "Assumed role credentials expire (not enforced)");
        }
        Ok(credentials)
    }

    /// On-demand hourly price in USD for `instance_type`.
    ///
    /// Returns `0.0` when the catalog answers with an empty price list.
    pub async fn get_price_usd(&self, instance_type: &str) -> Result<f64> {
        let client = self.ensure_client().await?;
        let query = PricingQuery::on_demand_linux(&self.settings.region, instance_type);
        debug!(
            region = %query.region_code,
            instance_type = %query.instance_type,
            "Querying pricing catalog"
        );

        let price_list = match client.get_products(&query).await {
            Ok(Some(list)) => list,
            Ok(None) => {
                error!("getProducts returned no response");
                return Err(PricingError::catalog("getProducts returned no response"));
            }
            Err(e) => {
                error!("Pricing query for {} failed: {}", instance_type, e);
                return Err(e);
            }
        };

        let Some(first) = price_list.first() else {
            info!(instance_type, region = %query.region_code, "No price found");
            return Ok(0.0);
        };

        let document: Value = serde_json::from_str(first).map_err(|e| {
            error!("Price list entry for {} is not valid JSON: {}", instance_type, e);
            PricingError::Json(e)
        })?;

        extract_on_demand_usd(&document, instance_type).inspect_err(|e| error!("{}", e))
    }
}

/// Session name of the form `<prefix>-<job id>-<unix ms>`, restricted to the
/// STS character set and length. Long job ids are cut so the timestamp survives.
pub fn session_name(job_id: &str, timestamp_ms: i64) -> String {
    let timestamp = timestamp_ms.to_string();
    let job_budget =
        MAX_SESSION_NAME_LEN.saturating_sub(SESSION_NAME_PREFIX.len() + timestamp.len() + 2);
    let job: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "_+=,.@-".contains(c) {
                c
            } else {
                '-'
            }
        })
        .take(job_budget)
        .collect();
    format!("{}-{}-{}", SESSION_NAME_PREFIX, job, timestamp)
}

fn credentials_from_grant(grant: AssumedRoleGrant) -> Option<Credentials> {
    let access_key_id = grant.access_key_id.filter(|s| !s.is_empty())?;
    let secret_access_key = grant.secret_access_key.filter(|s| !s.is_empty())?;
    Some(Credentials::assumed(
        access_key_id,
        secret_access_key,
        grant.session_token,
        grant.expiration,
    ))
}

/// First `USD` value under `terms.OnDemand`, as a number.
pub fn extract_on_demand_usd(document: &Value, instance_type: &str) -> Result<f64> {
    let shape = |reason: String| PricingError::Shape {
        instance_type: instance_type.to_string(),
        reason,
    };

    let on_demand = document
        .get("terms")
        .and_then(|terms| terms.get("OnDemand"))
        .ok_or_else(|| shape("missing terms.OnDemand".to_string()))?;

    let usd = find_first(on_demand, "USD")
        .ok_or_else(|| shape("no USD price under terms.OnDemand".to_string()))?;

    let price = match usd {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| shape(format!("USD price {:?} is not a number", s)))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| shape(format!("USD price {} is out of range", n)))?,
        other => return Err(shape(format!("USD price has unexpected type: {}", other))),
    };

    // parse::<f64> also accepts "NaN", "inf" and negative values
    if !price.is_finite() || price < 0.0 {
        return Err(shape(format!("USD price {} is not a valid hourly rate", usd)));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_name_format() {
        let name = session_name("build", 1_700_000_000_000);
        assert_eq!(name, "ec2-action-builder-build-1700000000000");
    }

    #[test]
    fn test_session_name_sanitized_and_truncated() {
        let name = session_name(
            "my job/with spaces and a very long identifier indeed",
            1_700_000_000_000,
        );
        assert!(name.len() <= MAX_SESSION_NAME_LEN);
        assert!(!name.contains(' '));
        assert!(!name.contains('/'));
        assert!(name.starts_with("ec2-action-builder-my-job-with-spaces"));
        assert!(name.ends_with("-1700000000000"));
    }

    #[test]
    fn test_extract_on_demand_usd() {
        let doc = json!({
            "product": { "attributes": { "instanceType": "m5.large" } },
            "terms": {
                "OnDemand": {
                    "ABC.JRTCKXETXF": {
                        "priceDimensions": {
                            "ABC.JRTCKXETXF.6YS6EN2CT7": {
                                "pricePerUnit": { "USD": "0.0960000000" }
                            }
                        }
                    }
                }
            }
        });
        assert_eq!(extract_on_demand_usd(&doc, "m5.large").unwrap(), 0.096);
    }

    #[test]
    fn test_extract_ignores_reserved_terms() {
        let doc = json!({
            "terms": {
                "OnDemand": { "x": { "pricePerUnit": { "USD": "0.5" } } },
                "Reserved": { "y": { "pricePerUnit": { "USD": "0.1" } } }
            }
        });
        assert_eq!(extract_on_demand_usd(&doc, "t3.micro").unwrap(), 0.5);
    }

    #[test]
    fn test_extract_missing_usd_is_shape_error() {
        let doc = json!({ "terms": { "OnDemand": { "x": { "pricePerUnit": {} } } } });
        let err = extract_on_demand_usd(&doc, "m5.large").unwrap_err();
        assert!(matches!(err, PricingError::Shape { .. }));

        let doc = json!({ "terms": {} });
        let err = extract_on_demand_usd(&doc, "m5.large").unwrap_err();
        assert!(matches!(err, PricingError::Shape { .. }));
    }

    #[test]
    fn test_extract_non_numeric_usd_is_shape_error() {
        let doc = json!({ "terms": { "OnDemand": { "USD": "n/a" } } });
        assert!(matches!(
            extract_on_demand_usd(&doc, "m5.large"),
            Err(PricingError::Shape { .. })
        ));
    }

    #[test]
    fn test_extract_rejects_nan_infinite_and_negative_usd() {
        for bad in ["NaN", "inf", "-infinity", "-1", "-0.096"] {
            let doc = json!({ "terms": { "OnDemand": { "x": { "pricePerUnit": { "USD": bad } } } } });
            assert!(
                matches!(
                    extract_on_demand_usd(&doc, "m5.large"),
                    Err(PricingError::Shape { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_extract_accepts_numeric_json_and_zero() {
        let doc = json!({ "terms": { "OnDemand": { "USD": 0.25 } } });
        assert_eq!(extract_on_demand_usd(&doc, "m5.large").unwrap(), 0.25);

        let doc = json!({ "terms": { "OnDemand": { "USD": "0.0000000000" } } });
        assert_eq!(extract_on_demand_usd(&doc, "m5.large").unwrap(), 0.0);
    }

    #[test]
    fn test_grant_without_secret_is_rejected() {
        let grant = AssumedRoleGrant {
            access_key_id: Some("ASIA".to_string()),
            secret_access_key: Some(String::new()),
            session_token: Some("tok".to_string()),
            expiration: None,
        };
        assert!(credentials_from_grant(grant).is_none());
    }
}
