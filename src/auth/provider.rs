use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::cache::{CachedToken, TokenCache};
use super::completer::AuthorizationCompleter;
use super::oauth::OAuthClient;
use super::token::{Credential, TokenSource};
use crate::error::CredentialError;

/// Token source backed by the OAuth flow and an on-disk cache
pub struct OAuthTokenProvider {
    oauth: OAuthClient,
    cache: TokenCache,
    current: RwLock<Option<CachedToken>>,
}

impl OAuthTokenProvider {
    pub fn new(oauth: OAuthClient, cache: TokenCache) -> Self {
        Self {
            oauth,
            cache,
            current: RwLock::new(None),
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Load the cached token, or run the interactive flow when there is none
    pub async fn bootstrap(
        &self,
        completer: &dyn AuthorizationCompleter,
    ) -> Result<(), CredentialError> {
        match self.cache.load() {
            Ok(Some(token)) => {
                info!(
                    "Using cached credentials from {}",
                    self.cache.path().display()
                );
                *self.current.write().await = Some(token);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to load the token cache: {:#}", e);
                warn!("Continuing without cached credentials");
            }
        }

        self.authorize(completer).await
    }

    /// Run the authorization-code flow and persist the result
    pub async fn authorize(
        &self,
        completer: &dyn AuthorizationCompleter,
    ) -> Result<(), CredentialError> {
        let state = uuid::Uuid::new_v4().to_string();
        let url = self.oauth.authorization_url(&state)?;

        let code = completer
            .complete(&url, &state)
            .await
            .map_err(|e| CredentialError::Authorization(format!("{e:#}")))?;

        let token = self.oauth.exchange_code(&code).await?;
        self.cache
            .store(&token)
            .map_err(|e| CredentialError::Cache(format!("{e:#}")))?;

        *self.current.write().await = Some(token);
        Ok(())
    }

    async fn refresh(&self, stale: &CachedToken) -> Result<CachedToken, CredentialError> {
        let refresh_token = stale.refresh_token.as_deref().ok_or_else(|| {
            CredentialError::Refresh("token expired and has no refresh token".to_string())
        })?;

        let mut refreshed = self.oauth.refresh(refresh_token).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = stale.refresh_token.clone();
        }

        // A cache write failure only costs a refresh on the next run
        if let Err(e) = self.cache.store(&refreshed) {
            warn!("Failed to persist refreshed token: {:#}", e);
        }

        Ok(refreshed)
    }
}

#[async_trait::async_trait]
impl TokenSource for OAuthTokenProvider {
    async fn token(&self) -> Result<Credential, CredentialError> {
        {
            let current = self.current.read().await;
            match current.as_ref() {
                Some(token) if token.is_fresh_at(Utc::now()) => return Ok(token.credential()),
                Some(_) => {}
                None => return Err(CredentialError::Missing),
            }
        }

        let mut current = self.current.write().await;
        let stale = current.clone().ok_or(CredentialError::Missing)?;
        // Another caller may have refreshed while we waited for the lock
        if stale.is_fresh_at(Utc::now()) {
            return Ok(stale.credential());
        }

        let refreshed = self.refresh(&stale).await?;
        let credential = refreshed.credential();
        *current = Some(refreshed);
        Ok(credential)
    }
}
