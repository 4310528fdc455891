//! Fixed-size PCM framing of assistant audio
//!
//! AudioOut payloads are raw LINEAR16 (signed 16-bit little-endian) audio.
//! Each payload is sliced into frames of `frame_size` samples on its own;
//! nothing carries over between payloads. Trailing bytes too short for a full
//! frame are dropped, not padded: the assistant's encoder output does not line
//! up with our frame boundaries, and playback devices take whole frames only.

use std::slice::ChunksExact;

/// Bytes per LINEAR16 sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Samples per frame written to the playback device
pub const DEFAULT_FRAME_SIZE: usize = 799;

/// Block of PCM samples written to a sink in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Mono i16 samples in playback order
    pub samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of this frame at the given sample rate
    pub fn duration_ms(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / sample_rate as f64
    }
}

/// Lazy frame iterator over one payload
#[derive(Debug, Clone)]
pub struct FrameDemuxer<'a> {
    windows: ChunksExact<'a, u8>,
    residual: usize,
}

impl<'a> FrameDemuxer<'a> {
    /// Bytes at the end of the payload that will be discarded
    pub fn residual_bytes(&self) -> usize {
        self.residual
    }
}

impl Iterator for FrameDemuxer<'_> {
    type Item = AudioFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.windows.next().map(decode_frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

impl ExactSizeIterator for FrameDemuxer<'_> {}

/// Split `payload` into frames of `frame_size` samples
///
/// Yields `payload.len() / (frame_size * 2)` frames. A zero frame size, or one
/// too large to express in bytes, yields nothing and treats the whole payload
/// as residual.
pub fn demux(payload: &[u8], frame_size: usize) -> FrameDemuxer<'_> {
    let frame_bytes = frame_size.checked_mul(BYTES_PER_SAMPLE).unwrap_or(0);
    if frame_bytes == 0 {
        return FrameDemuxer {
            windows: payload[..0].chunks_exact(BYTES_PER_SAMPLE),
            residual: payload.len(),
        };
    }

    let windows = payload.chunks_exact(frame_bytes);
    let residual = windows.remainder().len();
    FrameDemuxer { windows, residual }
}

fn decode_frame(window: &[u8]) -> AudioFrame {
    let samples = window
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    AudioFrame { samples }
}
