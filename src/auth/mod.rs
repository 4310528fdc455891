//! Credential provider
//!
//! This module supplies bearer tokens to the session manager:
//! - Client secrets and the OAuth authorization-code flow
//! - Interactive completion (loopback redirect or pasted code)
//! - On-disk token cache and transparent refresh

mod cache;
mod callback;
mod completer;
mod oauth;
mod provider;
mod secrets;
mod token;

pub use cache::{CachedToken, TokenCache, DEFAULT_CACHE_FILE};
pub use callback::{serve_callback, LoopbackCompleter, DEFAULT_CALLBACK_PORT};
pub use completer::{completer_for, AuthorizationCompleter, ManualCompleter, OOB_REDIRECT_URI};
pub use oauth::{OAuthClient, SCOPE_ASSISTANT_SDK};
pub use provider::OAuthTokenProvider;
pub use secrets::{ClientSecrets, InstalledApp};
pub use token::{Credential, StaticTokenSource, TokenSource, EXPIRY_MARGIN_SECS};
