use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::frame::AudioFrame;
use super::sink::{AudioSink, SinkSpec};
use crate::error::SinkError;

/// Writes response frames to a WAV file
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    frames_written: usize,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, spec: &SinkSpec) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let wav_spec = hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, wav_spec)?;

        info!(
            "WAV output opened: {} ({}Hz, {} channels)",
            path.display(),
            spec.sample_rate_hz,
            spec.channels
        );

        Ok(Self {
            writer: Some(writer),
            path,
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

#[async_trait::async_trait]
impl AudioSink for WavSink {
    async fn write(&mut self, frame: &AudioFrame) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        for &sample in &frame.samples {
            writer.write_sample(sample)?;
        }
        self.frames_written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let writer = self.writer.take().ok_or(SinkError::Closed)?;
        writer.finalize()?;
        info!(
            "WAV output closed: {} ({} frames)",
            self.path.display(),
            self.frames_written
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "wav"
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
