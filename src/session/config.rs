use serde::{Deserialize, Serialize};

/// Sample rate used by the assistant for both directions
pub const ASSISTANT_SAMPLE_RATE: u32 = 16000;

/// Encoding of audio sent to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioInEncoding {
    Linear16,
    #[default]
    Flac,
}

/// Encoding of audio returned by the assistant
///
/// Only `Linear16` can be framed for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioOutEncoding {
    #[default]
    Linear16,
    Mp3,
    OpusInOgg,
}

/// Whether the assistant should return visual (HTML) responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMode {
    #[default]
    Off,
    Playing,
}

/// Conversation and audio settings for one assist session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// BCP-47 language code (e.g., "en-US")
    pub language_code: String,

    /// Registered device instance identifier
    pub device_id: String,

    /// Registered device model identifier
    pub device_model_id: String,

    pub audio_in_encoding: AudioInEncoding,

    pub audio_out_encoding: AudioOutEncoding,

    /// Sample rate for both audio directions
    pub sample_rate_hz: u32,

    /// Output volume, 0-100
    pub volume_percent: u8,

    /// Ask the assistant to attach debug info to its responses
    pub return_debug_info: bool,

    pub screen_mode: ScreenMode,

    /// Opaque continuation bytes from the previous turn, replayed verbatim
    pub conversation_state: Option<Vec<u8>>,

    pub is_new_conversation: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            device_id: "assist-client".to_string(),
            device_model_id: "assist-client-rust".to_string(),
            audio_in_encoding: AudioInEncoding::Flac,
            audio_out_encoding: AudioOutEncoding::Linear16,
            sample_rate_hz: ASSISTANT_SAMPLE_RATE,
            volume_percent: 60,
            return_debug_info: true,
            screen_mode: ScreenMode::Off,
            conversation_state: None,
            is_new_conversation: false,
        }
    }
}

impl SessionConfig {
    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    /// Set the output volume, clamped to 100
    pub fn with_volume_percent(mut self, volume_percent: u8) -> Self {
        self.volume_percent = volume_percent.min(100);
        self
    }

    pub fn with_conversation_state(mut self, state: Option<Vec<u8>>) -> Self {
        self.conversation_state = state;
        self
    }

    /// Replace the continuation bytes after a completed turn
    pub fn advance_conversation(&mut self, state: Vec<u8>) {
        self.conversation_state = Some(state);
        self.is_new_conversation = false;
    }

    /// Forget the continuation bytes and start over on the next turn
    pub fn reset_conversation(&mut self) {
        self.conversation_state = None;
        self.is_new_conversation = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_assistant_expectations() {
        let config = SessionConfig::default();
        assert_eq!(config.language_code, "en-US");
        assert_eq!(config.sample_rate_hz, 16000);
        assert_eq!(config.volume_percent, 60);
        assert_eq!(config.audio_out_encoding, AudioOutEncoding::Linear16);
        assert_eq!(config.screen_mode, ScreenMode::Off);
        assert!(config.conversation_state.is_none());
        assert!(!config.is_new_conversation);
    }

    #[test]
    fn test_same_inputs_build_equal_configs() {
        let a = SessionConfig::default().with_language_code("fr-FR");
        let b = SessionConfig::default()
            .with_language_code("fr-FR")
            .with_conversation_state(Some(vec![9, 9]));

        assert_ne!(a, b);
        assert_eq!(a, b.clone().with_conversation_state(None));
    }

    #[test]
    fn test_volume_is_clamped() {
        let config = SessionConfig::default().with_volume_percent(250);
        assert_eq!(config.volume_percent, 100);
    }

    #[test]
    fn test_advance_and_reset_conversation() {
        let mut config = SessionConfig::default();
        config.reset_conversation();
        assert!(config.is_new_conversation);

        config.advance_conversation(vec![1, 2, 3]);
        assert_eq!(config.conversation_state.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(!config.is_new_conversation);

        config.reset_conversation();
        assert!(config.conversation_state.is_none());
        assert!(config.is_new_conversation);
    }

    #[test]
    fn test_screen_mode_deserializes_from_lowercase() {
        let mode: ScreenMode = serde_json::from_str("\"playing\"").unwrap();
        assert_eq!(mode, ScreenMode::Playing);
    }
}
