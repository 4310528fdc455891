use crate::error::CredentialError;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Tokens this close to expiry are treated as expired
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Bearer token plus expiry, borrowed read-only by a session
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    expiry: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expiry: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expiry,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Value of the `authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Whether the token expires within the safety margin of `now`
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Supplies a non-expired token, refreshing transparently
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Credential, CredentialError>;
}

/// Fixed token, e.g. one minted outside this program
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    credential: Credential,
}

impl StaticTokenSource {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Credential, CredentialError> {
        if self.credential.is_expired_at(Utc::now()) {
            return Err(CredentialError::Refresh(
                "static token expired and cannot be refreshed".to_string(),
            ));
        }
        Ok(self.credential.clone())
    }
}
