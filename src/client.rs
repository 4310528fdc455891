//! Client facade
//!
//! `AssistantClient` owns everything a conversation needs between turns:
//! the session settings (including the conversation state), the token
//! source, the streaming session and the timeout.

use crate::auth::TokenSource;
use crate::error::SessionError;
use crate::session::{SessionConfig, SessionStats, StreamingSession};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default session-wide timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(240);

/// What a successful call returns to the caller
#[derive(Debug, Clone)]
pub struct CallReport {
    /// Supplemental text shown alongside the spoken response
    pub display_text: Option<String>,

    /// The assistant expects an immediate follow-up turn
    pub follow_on: bool,

    pub stats: SessionStats,
}

pub struct AssistantClient {
    config: SessionConfig,
    tokens: Arc<dyn TokenSource>,
    session: StreamingSession,
    timeout: Duration,
    cancel: CancellationToken,
}

impl AssistantClient {
    pub fn new(
        config: SessionConfig,
        tokens: Arc<dyn TokenSource>,
        session: StreamingSession,
    ) -> Self {
        Self {
            config,
            tokens,
            session,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token that cancels whichever call is in flight
    ///
    /// Once cancelled, every later call ends as `Cancelled` too.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Send one text query and play the spoken response
    ///
    /// The conversation state and the requested volume are only carried into
    /// the next turn when the session completes.
    pub async fn call(&mut self, query: &str) -> Result<CallReport, SessionError> {
        info!("Asking: {}", query);

        let result = self
            .session
            .run(
                &self.cancel,
                &self.config,
                self.tokens.as_ref(),
                Some(query),
                self.timeout,
            )
            .await;

        if let Some(error) = result.error {
            return Err(error);
        }

        if let Some(state) = result.conversation_state {
            debug!(bytes = state.len(), "Carrying conversation state into the next turn");
            self.config.advance_conversation(state);
        }
        if let Some(volume) = result.volume_percent {
            self.config.volume_percent = volume.min(100);
        }

        Ok(CallReport {
            display_text: result.display_text,
            follow_on: result.follow_on,
            stats: result.stats,
        })
    }

    /// Start a new conversation on the next call
    pub fn reset_conversation(&mut self) {
        info!("Starting a new conversation");
        self.config.reset_conversation();
    }
}
