// In-memory fakes for the transport, the audio sink and the token source
#![allow(dead_code)]

use assist_client::audio::{AudioFrame, AudioSink, SinkOpener, SinkSpec};
use assist_client::auth::{Credential, StaticTokenSource, TokenSource};
use assist_client::error::{CredentialError, SinkError, TransportError};
use assist_client::transport::{AssistantTransport, Duplex, StreamEvent, StreamRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Little-endian LINEAR16 bytes for `samples`
pub fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn tokens() -> Arc<dyn TokenSource> {
    Arc::new(StaticTokenSource::new(Credential::new("test-token", None)))
}

/// Token source that never has a token
pub struct NoTokens;

#[async_trait::async_trait]
impl TokenSource for NoTokens {
    async fn token(&self) -> Result<Credential, CredentialError> {
        Err(CredentialError::Missing)
    }
}

/// Scripted remote party
///
/// Waits for the client to close its send half, then replays `events` and
/// either ends the stream or keeps it open forever.
#[derive(Default)]
pub struct FakeTransport {
    pub events: Vec<Result<StreamEvent, TransportError>>,
    pub hang: bool,
    pub refuse: Option<TransportError>,
    pub reject_requests: bool,
    pub opened: AtomicUsize,
    pub requests: Arc<Mutex<Vec<StreamRequest>>>,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn replying(events: Vec<Result<StreamEvent, TransportError>>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AssistantTransport for FakeTransport {
    async fn open(&self, credential: &Credential) -> Result<Duplex, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(credential.access_token().to_string());

        if let Some(e) = &self.refuse {
            return Err(e.clone());
        }

        let (request_tx, request_rx) = mpsc::channel::<StreamRequest>(1);
        let (event_tx, event_rx) = mpsc::channel(16);
        let events = self.events.clone();
        let requests = Arc::clone(&self.requests);
        let hang = self.hang;

        // A rejected send half is closed before the client ever writes to it
        let mut request_rx = (!self.reject_requests).then_some(request_rx);

        tokio::spawn(async move {
            if let Some(request_rx) = request_rx.as_mut() {
                while let Some(request) = request_rx.recv().await {
                    requests.lock().unwrap().push(request);
                }
            }

            for event in events {
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }

            if hang {
                event_tx.closed().await;
            }
        });

        Ok(Duplex {
            requests: request_tx,
            events: Box::pin(ReceiverStream::new(event_rx)),
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Everything the recording sinks saw
#[derive(Debug, Default)]
pub struct SinkLog {
    pub opens: usize,
    pub closes: usize,
    pub frames: Vec<Vec<i16>>,
    pub specs: Vec<SinkSpec>,
}

/// Opens sinks that record frames into a shared log
#[derive(Default)]
pub struct RecordingOpener {
    pub log: Arc<Mutex<SinkLog>>,
    /// Zero-based write indexes that fail
    pub failing_writes: Vec<usize>,
    pub refuse: bool,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes(failing_writes: Vec<usize>) -> Self {
        Self {
            failing_writes,
            ..Default::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }

    pub fn frames(&self) -> Vec<Vec<i16>> {
        self.log.lock().unwrap().frames.clone()
    }

    pub fn opens(&self) -> usize {
        self.log.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

#[async_trait::async_trait]
impl SinkOpener for RecordingOpener {
    async fn open(&self, spec: &SinkSpec) -> Result<Box<dyn AudioSink>, SinkError> {
        if self.refuse {
            return Err(SinkError::Device("no output device".to_string()));
        }

        let mut log = self.log.lock().unwrap();
        log.opens += 1;
        log.specs.push(*spec);

        Ok(Box::new(RecordingSink {
            log: Arc::clone(&self.log),
            failing_writes: self.failing_writes.clone(),
            writes: 0,
        }))
    }
}

struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
    failing_writes: Vec<usize>,
    writes: usize,
}

#[async_trait::async_trait]
impl AudioSink for RecordingSink {
    async fn write(&mut self, frame: &AudioFrame) -> Result<(), SinkError> {
        let index = self.writes;
        self.writes += 1;
        if self.failing_writes.contains(&index) {
            return Err(SinkError::Write("device underrun".to_string()));
        }
        self.log.lock().unwrap().frames.push(frame.samples.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
