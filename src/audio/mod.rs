pub mod frame;
pub mod sink;
pub mod wav;

#[cfg(feature = "device-playback")]
pub mod device;

pub use frame::{demux, AudioFrame, FrameDemuxer, BYTES_PER_SAMPLE, DEFAULT_FRAME_SIZE};
pub use sink::{AudioSink, OutputTarget, SinkOpener, SinkSpec};
pub use wav::WavSink;

#[cfg(feature = "device-playback")]
pub use device::DevicePlayback;
