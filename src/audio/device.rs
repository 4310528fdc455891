// Default output device playback using cpal

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::frame::AudioFrame;
use super::sink::{AudioSink, SinkSpec};
use crate::error::SinkError;

/// Frames queued between the session and the playback thread
const FRAME_QUEUE_DEPTH: usize = 2;

/// Frames buffered ahead of the device before writes start blocking
const DEVICE_BUFFER_FRAMES: usize = 4;

/// Plays frames on the default output device
///
/// The cpal stream lives on a dedicated thread; `write` hands frames over a
/// bounded channel so a slow device pushes back on the receive loop.
pub struct DevicePlayback {
    frames: Option<mpsc::Sender<Vec<i16>>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DevicePlayback {
    pub async fn open(spec: &SinkSpec) -> Result<Self, SinkError> {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();
        let spec = *spec;

        let worker = thread::Builder::new()
            .name("assist-playback".to_string())
            .spawn(move || run_playback(spec, frame_rx, ready_tx))
            .map_err(|e| SinkError::Device(format!("failed to spawn playback thread: {e}")))?;

        ready_rx
            .await
            .map_err(|_| SinkError::Device("playback thread exited during setup".to_string()))??;

        Ok(Self {
            frames: Some(frame_tx),
            worker: Some(worker),
        })
    }
}

#[async_trait::async_trait]
impl AudioSink for DevicePlayback {
    async fn write(&mut self, frame: &AudioFrame) -> Result<(), SinkError> {
        let frames = self.frames.as_ref().ok_or(SinkError::Closed)?;
        frames
            .send(frame.samples.clone())
            .await
            .map_err(|_| SinkError::Write("playback thread stopped".to_string()))
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        // Dropping the sender lets the thread drain what is queued and exit
        self.frames.take().ok_or(SinkError::Closed)?;

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| SinkError::Device(format!("join failed: {e}")))?
                .map_err(|_| SinkError::Device("playback thread panicked".to_string()))?;
        }

        debug!("Device playback closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "device"
    }
}

fn run_playback(
    spec: SinkSpec,
    mut frames: mpsc::Receiver<Vec<i16>>,
    ready: oneshot::Sender<Result<(), SinkError>>,
) {
    let queue = Arc::new(Mutex::new(VecDeque::<f32>::new()));

    let stream = match build_stream(&spec, Arc::clone(&queue)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(SinkError::Device(e.to_string())));
        return;
    }

    let _ = ready.send(Ok(()));

    let high_water = spec.frame_size.max(1).saturating_mul(DEVICE_BUFFER_FRAMES);
    while let Some(samples) = frames.blocking_recv() {
        while queued(&queue) > high_water {
            thread::sleep(Duration::from_millis(5));
        }
        if let Ok(mut buffer) = queue.lock() {
            buffer.extend(samples.iter().map(|&s| f32::from(s) / 32768.0));
        }
    }

    // Let the device finish what is buffered, bounded by its own length
    let pending = queued(&queue);
    let budget = Duration::from_millis(
        (pending as u64 * 1000) / u64::from(spec.sample_rate_hz.max(1)) + 250,
    );
    let start = Instant::now();
    while queued(&queue) > 0 && start.elapsed() < budget {
        thread::sleep(Duration::from_millis(10));
    }

    drop(stream);
    debug!("Playback thread finished");
}

fn queued(queue: &Mutex<VecDeque<f32>>) -> usize {
    queue.lock().map(|q| q.len()).unwrap_or(0)
}

fn build_stream(spec: &SinkSpec, queue: Arc<Mutex<VecDeque<f32>>>) -> Result<Stream, SinkError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SinkError::Device("no output device available".to_string()))?;

    let rate = SampleRate(spec.sample_rate_hz);
    let supports = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels
            && c.sample_format() == SampleFormat::F32
            && c.min_sample_rate() <= rate
            && c.max_sample_rate() >= rate
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| SinkError::Device(e.to_string()))?
        .find(|c| supports(c, spec.channels))
        .or_else(|| {
            // Fallback: upmix to stereo
            device
                .supported_output_configs()
                .ok()?
                .find(|c| supports(c, 2))
        })
        .ok_or_else(|| {
            SinkError::Device(format!(
                "no output config for {}Hz f32",
                spec.sample_rate_hz
            ))
        })?;

    let config: StreamConfig = supported.with_sample_rate(rate).config();
    let device_channels = config.channels as usize;

    info!(
        "Using output device: {} ({}Hz, {} channels)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        spec.sample_rate_hz,
        device_channels
    );

    device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut buffer) = queue.lock() else {
                    data.fill(0.0);
                    return;
                };
                for out_frame in data.chunks_mut(device_channels) {
                    let sample = buffer.pop_front().unwrap_or(0.0);
                    out_frame.fill(sample);
                }
            },
            |err| {
                error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| {
            warn!("Failed to build output stream: {}", e);
            SinkError::Device(e.to_string())
        })
}
