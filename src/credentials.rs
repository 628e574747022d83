//! AWS credential values
//!
//! Credentials are immutable. Assuming a role produces a new value that is
//! handed to a new catalog client; nothing is updated in place.

use chrono::{DateTime, Utc};
use std::fmt;

/// Where a set of credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Supplied by configuration (possibly already federated, see `has_session_token`)
    Static,
    /// Granted by an STS `AssumeRole` exchange
    Assumed,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    provenance: Provenance,
    // Reported by STS but never enforced
    expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn from_static(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            provenance: Provenance::Static,
            expires_at: None,
        }
    }

    pub fn assumed(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            provenance: Provenance::Assumed,
            expires_at,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// A non-empty session token marks credentials that are already delegated
    /// (for example obtained through an OIDC federation flow).
    pub fn has_session_token(&self) -> bool {
        self.session_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("provenance", &self.provenance)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
