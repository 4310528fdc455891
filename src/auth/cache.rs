use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::token::Credential;

/// Default cache file name in the user's home directory
pub const DEFAULT_CACHE_FILE: &str = "oauthTokenCache";

/// Persisted OAuth token record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// RFC 3339 expiry; absent for non-expiring tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl CachedToken {
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone(), self.expiry)
    }

    /// Usable without a refresh at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        !self.credential().is_expired_at(now)
    }
}

/// JSON token cache on disk
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache at `path`, with a leading `~` expanded to the home directory
    pub fn expanded(path: &str) -> Self {
        Self::new(shellexpand::tilde(path).into_owned())
    }

    /// `~/oauthTokenCache`
    pub fn default_location() -> Self {
        Self::expanded(&format!("~/{DEFAULT_CACHE_FILE}"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the cached token, if any
    pub fn load(&self) -> Result<Option<CachedToken>> {
        if !self.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token cache {}", self.path.display()))?;
        let token = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse token cache {}", self.path.display()))?;

        Ok(Some(token))
    }

    /// Write the token, replacing any previous record
    pub fn store(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create token cache directory")?;
        }

        let json = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write token cache {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .context("Failed to restrict token cache permissions")?;
        }

        info!("Stored OAuth token in {}", self.path.display());
        Ok(())
    }

    /// Delete the cache file; returns whether one existed
    pub fn remove(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to delete token cache {}", self.path.display()))?;
        Ok(true)
    }
}
