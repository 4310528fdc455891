//! OAuth 2.0 authorization-code flow for installed applications

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::cache::CachedToken;
use super::secrets::InstalledApp;
use crate::error::CredentialError;

/// The API scope for the assistant
pub const SCOPE_ASSISTANT_SDK: &str = "https://www.googleapis.com/auth/assistant-sdk-prototype";

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_cached(self) -> CachedToken {
        CachedToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        }
    }
}

/// Talks to the OAuth consent page and token endpoint
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(app: &InstalledApp, redirect_uri: impl Into<String>) -> Result<Self, CredentialError> {
        // A stalled token endpoint must not hang the CLI
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            client_id: app.client_id.clone(),
            client_secret: app.client_secret.clone(),
            auth_uri: app.auth_uri.clone(),
            token_uri: app.token_uri.clone(),
            redirect_uri: redirect_uri.into(),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Consent page URL asking for offline access to the assistant scope
    pub fn authorization_url(&self, state: &str) -> Result<String, CredentialError> {
        let url = Url::parse_with_params(
            &self.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE_ASSISTANT_SDK),
                ("state", state),
            ],
        )
        .map_err(|e| CredentialError::Authorization(format!("invalid auth_uri: {e}")))?;

        Ok(url.into())
    }

    /// Trade an authorization code for a token
    pub async fn exchange_code(&self, code: &str) -> Result<CachedToken, CredentialError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CredentialError::Exchange("empty authorization code".to_string()));
        }

        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await
            .map_err(CredentialError::Exchange)?;

        info!("Exchanged authorization code for an access token");
        Ok(token)
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<CachedToken, CredentialError> {
        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .await
            .map_err(CredentialError::Refresh)?;

        debug!(expiry = ?token.expiry, "Refreshed access token");
        Ok(token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<CachedToken, String> {
        let response = self
            .http
            .post(&self.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("request to token endpoint failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("token endpoint returned {status}: {body}"));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse token response: {e}"))?;

        Ok(token.into_cached())
    }
}
