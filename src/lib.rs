pub mod audio;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use audio::{demux, AudioFrame, AudioSink, FrameDemuxer, OutputTarget, SinkOpener, SinkSpec, WavSink};
pub use auth::{Credential, OAuthTokenProvider, StaticTokenSource, TokenSource};
pub use client::{AssistantClient, CallReport};
pub use config::AppConfig;
pub use error::{CredentialError, SessionError, SinkError, TransportError};
pub use session::{SessionConfig, SessionResult, SessionState, SessionStats, StreamingSession};
pub use transport::{AssistantTransport, GrpcTransport, StreamEvent, StreamRequest};
