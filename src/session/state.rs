use super::stats::SessionStats;
use crate::error::SessionError;
use std::fmt;
use tracing::debug;

/// Lifecycle of one streaming session
///
/// `Idle -> Connecting -> Streaming -> {Completed | Failed | TimedOut | Cancelled}`.
/// `Connecting` may also end directly in any failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Connecting) => true,
            (Connecting, Streaming | Failed | TimedOut | Cancelled) => true,
            (Streaming, Completed | Failed | TimedOut | Cancelled) => true,
            _ => false,
        }
    }

    /// Terminal state a session error ends in
    pub fn for_error(error: &SessionError) -> Self {
        match error {
            SessionError::TimedOut(_) => Self::TimedOut,
            SessionError::Cancelled => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Tracks the current state and logs every transition
#[derive(Debug)]
pub(crate) struct StateTracker {
    current: SessionState,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: SessionState::Idle,
        }
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> SessionState {
        self.current
    }

    pub(crate) fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "invalid session transition {} -> {}",
            self.current,
            next
        );
        debug!(from = %self.current, to = %next, "session state");
        self.current = next;
    }
}

/// Outcome of one session, handed back to the caller
#[derive(Debug)]
pub struct SessionResult {
    /// Terminal state the session ended in
    pub state: SessionState,

    /// Latest conversation state received before the session ended
    pub conversation_state: Option<Vec<u8>>,

    /// Latest supplemental display text from the assistant
    pub display_text: Option<String>,

    /// Volume the assistant asked the device to use from now on
    pub volume_percent: Option<u8>,

    /// The assistant expects an immediate follow-up turn
    pub follow_on: bool,

    /// Terminal error, present unless `state` is `Completed`
    pub error: Option<SessionError>,

    pub stats: SessionStats,
}

impl SessionResult {
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }
}
