use crate::credentials::Credentials;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Region used for the `regionCode` filter and the STS client
    pub region: String,
    /// Custom endpoint for both STS and Price List calls (e.g. a local mock)
    pub endpoint: Option<String>,
    /// Accepted for compatibility but not enforced: the SDK connector always
    /// verifies certificates, setting this only logs a warning
    pub ignore_ssl_errors: bool,
    /// Assume `iam_role_arn` once before the first price lookup
    pub assume_role: bool,
    pub iam_role_arn: Option<String>,
    /// Identifier embedded in STS session names
    pub job_id: String,
    /// Per-operation timeout for STS and Price List calls
    pub timeout_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            ignore_ssl_errors: false,
            assume_role: false,
            iam_role_arn: None,
            job_id: "local".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PricingConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .ec2-price.toml in current dir, then ~/.config/ec2-price/config.toml
            let local = PathBuf::from(".ec2-price.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("ec2-price").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".ec2-price.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: PricingConfig = toml::from_str(&content).with_context(|| {
                format!(
                    "Failed to parse config: {}\n  Tip: Run 'ec2-price init' to create a new config file",
                    config_path.display()
                )
            })?;
            Ok(config)
        } else {
            if path.is_some() {
                tracing::warn!(
                    "Config file not found: {}, using defaults",
                    config_path.display()
                );
            }
            Ok(PricingConfig::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Check that the fields needed by the resolver are present and consistent.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "region".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if is_blank(&self.access_key_id) {
            return Err(ConfigError::MissingField("access_key_id".to_string()));
        }
        if is_blank(&self.secret_access_key) {
            return Err(ConfigError::MissingField("secret_access_key".to_string()));
        }
        if self.assume_role && is_blank(&self.iam_role_arn) {
            return Err(ConfigError::MissingField("iam_role_arn".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Static credentials as supplied by configuration.
    pub fn static_credentials(&self) -> std::result::Result<Credentials, ConfigError> {
        let access_key_id = self
            .access_key_id
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingField("access_key_id".to_string()))?;
        let secret_access_key = self
            .secret_access_key
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingField("secret_access_key".to_string()))?;
        Ok(Credentials::from_static(
            access_key_id,
            secret_access_key,
            self.session_token.clone(),
        ))
    }

    /// Role ARN when role assumption is switched on.
    pub fn role_to_assume(&self) -> Option<&str> {
        if self.assume_role {
            self.iam_role_arn.as_deref().filter(|arn| !arn.is_empty())
        } else {
            None
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = PricingConfig::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
