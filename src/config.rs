use crate::audio::DEFAULT_FRAME_SIZE;
use crate::session::{ScreenMode, SessionConfig, ASSISTANT_SAMPLE_RATE};
use crate::transport::grpc::DEFAULT_ENDPOINT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `ASSIST_ASSISTANT__TIMEOUT_SECS=30`
pub const ENV_PREFIX: &str = "ASSIST";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assistant: AssistantSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub endpoint: String,
    pub language_code: String,
    pub device_id: String,
    pub device_model_id: String,
    pub volume_percent: u8,
    pub return_debug_info: bool,
    pub screen_mode: ScreenMode,
    pub timeout_secs: u64,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language_code: session.language_code,
            device_id: session.device_id,
            device_model_id: session.device_model_id,
            volume_percent: session.volume_percent,
            return_debug_info: session.return_debug_info,
            screen_mode: session.screen_mode,
            timeout_secs: 240,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate_hz: u32,
    pub channels: u16,
    /// Samples per playback frame
    pub frame_size: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: ASSISTANT_SAMPLE_RATE,
            channels: 1,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

impl AppConfig {
    /// Load defaults, then the optional file at `path`, then `ASSIST_*` env vars
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Settings for the first turn of a new client
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            language_code: self.assistant.language_code.clone(),
            device_id: self.assistant.device_id.clone(),
            device_model_id: self.assistant.device_model_id.clone(),
            sample_rate_hz: self.audio.sample_rate_hz,
            return_debug_info: self.assistant.return_debug_info,
            screen_mode: self.assistant.screen_mode,
            ..SessionConfig::default()
        }
        .with_volume_percent(self.assistant.volume_percent)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.assistant.timeout_secs)
    }
}
