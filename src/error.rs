//! Error types shared by the session manager and its collaborators

use std::time::Duration;
use thiserror::Error;

/// Terminal failure of one streaming session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token unavailable or refresh failed; raised before any transport attempt
    #[error("credential unavailable: {0}")]
    Credential(#[from] CredentialError),

    /// The duplex channel could not be established
    #[error("failed to connect to the assistant: {0}")]
    Connection(TransportError),

    /// The single outbound request could not be transmitted
    #[error("could not send the assist request: {0}")]
    Send(TransportError),

    /// The response stream failed before a clean end
    #[error("cannot get a response from the assistant: {0}")]
    Recv(TransportError),

    /// The audio output could not be opened
    #[error("failed to open audio output: {0}")]
    SinkOpen(SinkError),

    /// The session-wide timeout elapsed
    #[error("session timed out after {0:?}")]
    TimedOut(Duration),

    /// The caller cancelled the session
    #[error("session cancelled")]
    Cancelled,
}

/// Failures of the duplex transport
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("bearer token is not a valid header value")]
    InvalidToken,

    #[error("failed to transmit request: {0}")]
    Send(String),

    #[error("rpc failed ({code:?}): {message}")]
    Rpc { code: tonic::Code, message: String },

    /// The server refused the Assist call before any response arrived
    #[error("assist call rejected ({code:?}): {message}")]
    Rejected { code: tonic::Code, message: String },

    #[error("remote reported an error: {0}")]
    Remote(String),
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl TransportError {
    pub fn rejected(status: &tonic::Status) -> Self {
        Self::Rejected {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Failures of the credential provider
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no cached token; authorization required")]
    Missing,

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("token cache error: {0}")]
    Cache(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Failures of an audio sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("audio device unavailable: {0}")]
    Device(String),

    #[error("failed to write frame: {0}")]
    Write(String),

    #[error("audio output already closed")]
    Closed,

    #[error(transparent)]
    Wav(#[from] hound::Error),
}
