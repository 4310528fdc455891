use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters collected while a session streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Events received from the assistant
    pub events: usize,

    /// AudioOut events among them
    pub audio_events: usize,

    /// Frames accepted by the audio sink
    pub frames_written: usize,

    /// Frames the sink failed to accept
    pub frames_failed: usize,

    /// Trailing bytes too short for a full frame, summed over all payloads
    pub residual_bytes: usize,

    /// Bytes of visual (screen-out) responses
    pub screen_out_bytes: usize,

    /// Whether the assistant signalled the end of the user's utterance
    pub end_of_utterance: bool,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_secs: 0.0,
            events: 0,
            audio_events: 0,
            frames_written: 0,
            frames_failed: 0,
            residual_bytes: 0,
            screen_out_bytes: 0,
            end_of_utterance: false,
        }
    }

    /// Stamp the elapsed time since `started_at`
    pub fn finish(&mut self) {
        let duration = Utc::now().signed_duration_since(self.started_at);
        self.duration_secs = duration.num_milliseconds() as f64 / 1000.0;
    }
}
