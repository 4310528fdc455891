//! Loopback redirect server for the OAuth consent flow
//!
//! Serves a single route on localhost:
//! - GET /?code=..&state=.. - receive the authorization code, then shut down

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::completer::{present_url, AuthorizationCompleter};

/// Port the redirect URI points at
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// Shared state for the callback handler
#[derive(Clone)]
struct CallbackState {
    /// `state` value sent with the consent request
    expected_state: Arc<String>,

    /// Delivers the first code (or error) back to the completer
    outcome: Arc<Mutex<Option<oneshot::Sender<Result<String, String>>>>>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /
/// Receive the redirect from the consent page
async fn receive_code(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let outcome = match params {
        CallbackParams {
            error: Some(error), ..
        } => Err(format!("consent denied: {error}")),
        CallbackParams {
            state: Some(ref received),
            ..
        } if received.as_str() != state.expected_state.as_str() => {
            Err("state mismatch in authorization redirect".to_string())
        }
        CallbackParams {
            code: Some(code),
            state: Some(_),
            ..
        } if !code.is_empty() => Ok(code),
        _ => Err("authorization redirect carried no code".to_string()),
    };

    // Query values are never echoed back into the page
    let (status, body) = match &outcome {
        Ok(_) => (
            StatusCode::OK,
            "<h1>Authorization received</h1><p>You can close this window.</p>",
        ),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            "<h1>Authorization failed</h1><p>Return to the terminal for details.</p>",
        ),
    };

    if let Some(sender) = state.outcome.lock().await.take() {
        let _ = sender.send(outcome);
    }

    (status, Html(body))
}

fn callback_router(state: CallbackState) -> Router {
    Router::new()
        .route("/", get(receive_code))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Receives the authorization code through a local HTTP redirect
#[derive(Debug, Clone)]
pub struct LoopbackCompleter {
    port: u16,
}

impl LoopbackCompleter {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for LoopbackCompleter {
    fn default() -> Self {
        Self::new(DEFAULT_CALLBACK_PORT)
    }
}

#[async_trait::async_trait]
impl AuthorizationCompleter for LoopbackCompleter {
    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    async fn complete(&self, authorization_url: &str, state: &str) -> Result<String> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .with_context(|| format!("Failed to bind callback server on port {}", self.port))?;

        present_url(authorization_url);
        serve_callback(listener, state).await
    }
}

/// Serve the redirect route on `listener` until the first code arrives
pub async fn serve_callback(listener: TcpListener, expected_state: &str) -> Result<String> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let router = callback_router(CallbackState {
        expected_state: Arc::new(expected_state.to_string()),
        outcome: Arc::new(Mutex::new(Some(outcome_tx))),
    });

    info!(
        "Waiting for the authorization redirect on {}",
        listener.local_addr()?
    );

    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let outcome = outcome_rx
        .await
        .context("Callback server stopped before receiving a code");

    let _ = stop_tx.send(());
    match tokio::time::timeout(Duration::from_secs(2), &mut server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("Callback server error: {}", e),
        Ok(Err(e)) => warn!("Callback server task failed: {}", e),
        Err(_) => {
            warn!("Callback server did not shut down in time");
            server.abort();
        }
    }

    outcome?.map_err(|reason| anyhow!(reason))
}
