//! Duplex transport to the assistant service
//!
//! The session manager only sees the types in this module: it pushes
//! `StreamRequest`s into `Duplex::requests` and reads `StreamEvent`s from
//! `Duplex::events` until the stream ends. `GrpcTransport` implements the
//! channel over the Embedded Assistant gRPC API.

pub mod grpc;
pub mod proto;

use crate::auth::Credential;
use crate::error::TransportError;
use crate::session::SessionConfig;
use futures::stream::BoxStream;
use tokio::sync::mpsc;

pub use grpc::GrpcTransport;

/// Outbound message of a session
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRequest {
    /// Session settings, optionally carrying the text query for this turn.
    /// Always the first (and for text turns, the only) message.
    Config {
        config: SessionConfig,
        text_query: Option<String>,
    },
    /// Raw microphone audio following a config without a text query
    AudioChunk(Vec<u8>),
}

/// Dialog facts returned by the assistant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogState {
    /// Continuation bytes for the next turn; empty means unchanged
    pub conversation_state: Vec<u8>,
    /// Text shown alongside the spoken response
    pub display_text: String,
    /// New output volume, 0 when unchanged
    pub volume_percent: u8,
    /// The assistant expects an immediate follow-up turn
    pub follow_on: bool,
}

/// Inbound event, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// LINEAR16 response audio
    AudioOut(Vec<u8>),
    /// The assistant stopped listening to the user
    EndOfUtterance,
    DialogState(DialogState),
    /// Recognized user speech
    SpeechResult { transcript: String, stability: f32 },
    /// Visual response (HTML)
    ScreenOut(Vec<u8>),
    DebugInfo(String),
    /// Error reported in-band by the remote party
    Error(String),
}

/// Inbound half of the duplex channel
pub type EventStream = BoxStream<'static, Result<StreamEvent, TransportError>>;

/// An open duplex channel
///
/// Dropping `requests` closes the send half. `events` ends with `None` on a
/// clean close by the remote party.
pub struct Duplex {
    pub requests: mpsc::Sender<StreamRequest>,
    pub events: EventStream,
}

/// Opens authenticated duplex channels to the assistant
#[async_trait::async_trait]
pub trait AssistantTransport: Send + Sync {
    async fn open(&self, credential: &Credential) -> Result<Duplex, TransportError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}
