use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

use super::callback::LoopbackCompleter;

/// Redirect URI for copy/paste (out-of-band) authorization
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Finishes the interactive part of the authorization-code flow
///
/// Implementations get the user to the consent page and hand back the code
/// the authorization server issued.
#[async_trait::async_trait]
pub trait AuthorizationCompleter: Send + Sync {
    /// Redirect URI registered with the consent request
    fn redirect_uri(&self) -> String;

    /// Present `authorization_url` and wait for the code
    async fn complete(&self, authorization_url: &str, state: &str) -> Result<String>;
}

/// Pick the completer for the current environment
///
/// Remote sessions (e.g., over SSH) cannot receive a browser redirect on
/// localhost, so they paste the code instead.
pub fn completer_for(remote: bool) -> Box<dyn AuthorizationCompleter> {
    if remote {
        Box::new(ManualCompleter::stdin())
    } else {
        Box::new(LoopbackCompleter::default())
    }
}

/// Print the consent URL, opening it directly where that is possible
pub(crate) fn present_url(url: &str) {
    if cfg!(target_os = "macos") {
        match std::process::Command::new("open").arg(url).status() {
            Ok(status) if status.success() => return,
            Ok(status) => debug!("open exited with {}", status),
            Err(e) => debug!("failed to launch browser: {}", e),
        }
    }
    println!("Copy and paste the following url into your browser to authenticate:\n{url}");
}

/// Reads a pasted authorization code from an input stream
pub struct ManualCompleter {
    input: Mutex<Box<dyn AsyncBufRead + Send + Unpin>>,
}

impl ManualCompleter {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(reader)),
        }
    }
}

#[async_trait::async_trait]
impl AuthorizationCompleter for ManualCompleter {
    fn redirect_uri(&self) -> String {
        OOB_REDIRECT_URI.to_string()
    }

    async fn complete(&self, authorization_url: &str, _state: &str) -> Result<String> {
        present_url(authorization_url);
        println!("Enter the auth code followed by enter");

        let mut line = String::new();
        let mut input = self.input.lock().await;
        input
            .read_line(&mut line)
            .await
            .context("Failed to read authorization code")?;

        let code = line.trim();
        anyhow::ensure!(!code.is_empty(), "no authorization code entered");
        Ok(code.to_string())
    }
}
