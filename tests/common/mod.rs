//! In-memory identity broker and pricing catalog for resolver tests

#![allow(dead_code)]

use async_trait::async_trait;
use ec2_price::error::{PricingError, Result};
use ec2_price::provider::{AssumedRoleGrant, CatalogConnector, IdentityBroker, PricingCatalog};
use ec2_price::query::PricingQuery;
use ec2_price::resolver::{PriceResolver, ResolverSettings};
use ec2_price::Credentials;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/pricing-reader";

#[derive(Clone)]
pub enum BrokerBehavior {
    Grant(AssumedRoleGrant),
    NoCredentials,
    Fail,
}

pub struct FakeBroker {
    behavior: Mutex<BrokerBehavior>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub session_names: Mutex<Vec<String>>,
}

impl FakeBroker {
    pub fn new(behavior: BrokerBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            session_names: Mutex::new(Vec::new()),
        }
    }

    pub fn granting() -> Self {
        Self::new(BrokerBehavior::Grant(assumed_grant()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_behavior(&self, behavior: BrokerBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityBroker for FakeBroker {
    async fn assume_role(
        &self,
        _base: &Credentials,
        role_arn: &str,
        session_name: &str,
    ) -> Result<Option<AssumedRoleGrant>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(role_arn, ROLE_ARN);
        self.session_names
            .lock()
            .unwrap()
            .push(session_name.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            BrokerBehavior::Grant(grant) => Ok(Some(grant)),
            BrokerBehavior::NoCredentials => Ok(None),
            BrokerBehavior::Fail => Err(PricingError::identity("AccessDenied")),
        }
    }
}

#[derive(Clone)]
pub enum CatalogBehavior {
    Prices(Vec<String>),
    Absent,
    Fail,
}

/// Hands out catalogs and remembers which credentials each was bound to.
pub struct FakeConnector {
    behavior: CatalogBehavior,
    fail_from: Option<usize>,
    pub bound: Mutex<Vec<Credentials>>,
    pub queries: Arc<Mutex<Vec<PricingQuery>>>,
}

impl FakeConnector {
    pub fn new(behavior: CatalogBehavior) -> Self {
        Self {
            behavior,
            fail_from: None,
            bound: Mutex::new(Vec::new()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Refuse the `n`th connection (0-based) and every one after it.
    pub fn failing_from(mut self, n: usize) -> Self {
        self.fail_from = Some(n);
        self
    }

    pub fn connections(&self) -> usize {
        self.bound.lock().unwrap().len()
    }

    pub fn last_bound(&self) -> Option<Credentials> {
        self.bound.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CatalogConnector for FakeConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn PricingCatalog>> {
        if self.fail_from.is_some_and(|n| self.connections() >= n) {
            return Err(PricingError::catalog("could not build pricing client"));
        }
        self.bound.lock().unwrap().push(credentials.clone());
        Ok(Arc::new(FakeCatalog {
            behavior: self.behavior.clone(),
            credentials: credentials.clone(),
            queries: Arc::clone(&self.queries),
        }))
    }
}

pub struct FakeCatalog {
    behavior: CatalogBehavior,
    pub credentials: Credentials,
    queries: Arc<Mutex<Vec<PricingQuery>>>,
}

#[async_trait]
impl PricingCatalog for FakeCatalog {
    async fn get_products(&self, query: &PricingQuery) -> Result<Option<Vec<String>>> {
        self.queries.lock().unwrap().push(query.clone());
        match &self.behavior {
            CatalogBehavior::Prices(list) => Ok(Some(list.clone())),
            CatalogBehavior::Absent => Ok(None),
            CatalogBehavior::Fail => Err(PricingError::catalog("ThrottlingException")),
        }
    }
}

pub fn static_credentials() -> Credentials {
    Credentials::from_static("AKIDEXAMPLE", "static-secret", None)
}

pub fn federated_credentials() -> Credentials {
    Credentials::from_static("ASIAFEDERATED", "federated-secret", Some("oidc-token".to_string()))
}

pub fn assumed_grant() -> AssumedRoleGrant {
    AssumedRoleGrant {
        access_key_id: Some("ASIAASSUMED".to_string()),
        secret_access_key: Some("assumed-secret".to_string()),
        session_token: Some("assumed-token".to_string()),
        expiration: None,
    }
}

pub fn settings(role_arn: Option<&str>) -> ResolverSettings {
    ResolverSettings {
        region: "us-east-1".to_string(),
        role_arn: role_arn.map(str::to_string),
        job_id: "build".to_string(),
    }
}

/// One Price List entry in the `aws_v1` shape, priced at `usd`.
pub fn price_document(instance_type: &str, usd: &str) -> String {
    json!({
        "product": {
            "productFamily": "Compute Instance",
            "attributes": {
                "instanceType": instance_type,
                "operatingSystem": "Linux",
                "regionCode": "us-east-1"
            },
            "sku": "4C7N4APU9GEUZ6H6"
        },
        "serviceCode": "AmazonEC2",
        "terms": {
            "OnDemand": {
                "4C7N4APU9GEUZ6H6.JRTCKXETXF": {
                    "offerTermCode": "JRTCKXETXF",
                    "priceDimensions": {
                        "4C7N4APU9GEUZ6H6.JRTCKXETXF.6YS6EN2CT7": {
                            "unit": "Hrs",
                            "pricePerUnit": { "USD": usd },
                            "appliesTo": []
                        }
                    }
                }
            },
            "Reserved": {
                "4C7N4APU9GEUZ6H6.38NPMPTW36": {
                    "priceDimensions": {
                        "4C7N4APU9GEUZ6H6.38NPMPTW36.2TG2D8R56U": {
                            "unit": "Quantity",
                            "pricePerUnit": { "USD": "1234" }
                        }
                    }
                }
            }
        },
        "version": "20240101000000",
        "publicationDate": "2024-01-01T00:00:00Z"
    })
    .to_string()
}

pub async fn resolver(
    role_arn: Option<&str>,
    credentials: Credentials,
    broker: Arc<FakeBroker>,
    connector: Arc<FakeConnector>,
) -> PriceResolver {
    PriceResolver::new(settings(role_arn), credentials, broker, connector)
        .await
        .unwrap()
}
