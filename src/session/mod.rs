//! Streaming session management
//!
//! This module provides the `StreamingSession` that drives one exchange:
//! - Token retrieval and channel setup
//! - The single outbound config request
//! - Event fan-out and frame-by-frame audio playback
//! - Timeout, cancellation and the terminal state report

mod config;
mod session;
mod state;
mod stats;

pub use config::{
    AudioInEncoding, AudioOutEncoding, ScreenMode, SessionConfig, ASSISTANT_SAMPLE_RATE,
};
pub use session::StreamingSession;
pub use state::{SessionResult, SessionState};
pub use stats::SessionStats;
