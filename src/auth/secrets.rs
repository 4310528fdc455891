use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client secrets file downloaded from the cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub installed: InstalledApp,
}

/// Installed-application OAuth client
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledApp {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecrets {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid client secrets {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let secrets: ClientSecrets =
            serde_json::from_str(raw).context("Failed to decode client secrets JSON")?;
        anyhow::ensure!(
            !secrets.installed.client_id.is_empty(),
            "client_id must not be empty"
        );
        Ok(secrets)
    }
}
