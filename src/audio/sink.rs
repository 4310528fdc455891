use super::frame::{AudioFrame, DEFAULT_FRAME_SIZE};
use super::wav::WavSink;
use crate::error::SinkError;
use crate::session::ASSISTANT_SAMPLE_RATE;
use std::path::PathBuf;

/// Format of the frames a sink will receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSpec {
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Samples per frame
    pub frame_size: usize,
}

impl Default for SinkSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate_hz: ASSISTANT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

/// Playback destination for response audio
///
/// A sink is opened for one session, receives frames in order from a single
/// writer, and is closed exactly once when the session ends.
#[async_trait::async_trait]
pub trait AudioSink: Send {
    /// Write one frame; returns once the sink has accepted it
    async fn write(&mut self, frame: &AudioFrame) -> Result<(), SinkError>;

    /// Flush and release the output
    async fn close(&mut self) -> Result<(), SinkError>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Opens a fresh sink for each session
#[async_trait::async_trait]
pub trait SinkOpener: Send + Sync {
    async fn open(&self, spec: &SinkSpec) -> Result<Box<dyn AudioSink>, SinkError>;
}

/// Where response audio goes
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Default output device (requires the `device-playback` feature)
    Device,
    /// 16-bit PCM WAV file, overwritten per session
    Wav(PathBuf),
}

#[async_trait::async_trait]
impl SinkOpener for OutputTarget {
    async fn open(&self, spec: &SinkSpec) -> Result<Box<dyn AudioSink>, SinkError> {
        match self {
            OutputTarget::Device => {
                #[cfg(feature = "device-playback")]
                {
                    use super::device::DevicePlayback;
                    let sink = DevicePlayback::open(spec).await?;
                    Ok(Box::new(sink))
                }

                #[cfg(not(feature = "device-playback"))]
                {
                    let _ = spec;
                    Err(SinkError::Device(
                        "built without the device-playback feature; use --wav-out".to_string(),
                    ))
                }
            }

            OutputTarget::Wav(path) => {
                let sink = WavSink::create(path, spec)?;
                Ok(Box::new(sink))
            }
        }
    }
}
