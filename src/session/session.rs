use super::config::{AudioOutEncoding, SessionConfig};
use super::state::{SessionResult, SessionState, StateTracker};
use super::stats::SessionStats;
use crate::audio::{demux, AudioSink, SinkOpener, SinkSpec, DEFAULT_FRAME_SIZE};
use crate::auth::TokenSource;
use crate::error::{SessionError, TransportError};
use crate::transport::{AssistantTransport, DialogState, Duplex, EventStream, StreamEvent, StreamRequest};
use chrono::Utc;
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs one request/response exchange with the assistant
///
/// A session fetches a token, opens the duplex channel and the audio output,
/// sends a single config request and plays every `AudioOut` payload frame by
/// frame until the remote side closes the stream. A timeout or cancellation
/// stops both directions at once.
pub struct StreamingSession {
    /// Opens the duplex channel
    transport: Arc<dyn AssistantTransport>,

    /// Opens the audio output for each session
    output: Arc<dyn SinkOpener>,

    /// Output channel count
    channels: u16,

    /// Samples per playback frame
    frame_size: usize,
}

impl StreamingSession {
    pub fn new(transport: Arc<dyn AssistantTransport>, output: Arc<dyn SinkOpener>) -> Self {
        Self {
            transport,
            output,
            channels: 1,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Run a session to a terminal state
    ///
    /// Never returns early with an error: failures are reported through
    /// `SessionResult::error` together with whatever progress was made.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        config: &SessionConfig,
        tokens: &dyn TokenSource,
        text_query: Option<&str>,
        timeout: Duration,
    ) -> SessionResult {
        let scope = cancel.child_token();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut tracker = StateTracker::new();
        let mut progress = Progress::new();

        if config.audio_out_encoding != AudioOutEncoding::Linear16 {
            warn!(
                "Output encoding {:?} is not LINEAR16; playback will be noise",
                config.audio_out_encoding
            );
        }

        tracker.advance(SessionState::Connecting);
        let prepared = tokio::select! {
            biased;
            _ = scope.cancelled() => Err(SessionError::Cancelled),
            _ = &mut deadline => Err(SessionError::TimedOut(timeout)),
            prepared = self.prepare(config, tokens) => prepared,
        };

        let (duplex, mut sink) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return finish(tracker, progress, Err(e)),
        };

        tracker.advance(SessionState::Streaming);
        info!(
            transport = self.transport.name(),
            sink = sink.name(),
            "Streaming session started"
        );

        let Duplex {
            requests,
            mut events,
        } = duplex;

        let request = StreamRequest::Config {
            config: config.clone(),
            text_query: text_query.map(str::to_string),
        };
        let mut sender = tokio::spawn(send_request(requests, request));
        let mut send_pending = true;

        let outcome = {
            let receive = receive_loop(&mut events, sink.as_mut(), self.frame_size, &mut progress);
            tokio::pin!(receive);

            loop {
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => break Err(SessionError::Cancelled),
                    _ = &mut deadline => break Err(SessionError::TimedOut(timeout)),
                    joined = &mut sender, if send_pending => {
                        send_pending = false;
                        let sent = joined.unwrap_or_else(|e| Err(TransportError::Send(e.to_string())));
                        if let Err(e) = sent {
                            break Err(SessionError::Send(e));
                        }
                        debug!("Assist request sent, send half closed");
                    }
                    received = &mut receive => break received,
                }
            }
        };

        if send_pending {
            sender.abort();
        }
        drop(events);

        if let Err(e) = sink.close().await {
            warn!(sink = sink.name(), "Failed to close audio output: {}", e);
        }

        finish(tracker, progress, outcome)
    }

    async fn prepare(
        &self,
        config: &SessionConfig,
        tokens: &dyn TokenSource,
    ) -> Result<(Duplex, Box<dyn AudioSink>), SessionError> {
        let credential = tokens.token().await?;

        debug!(transport = self.transport.name(), "Opening duplex channel");
        let duplex = self
            .transport
            .open(&credential)
            .await
            .map_err(SessionError::Connection)?;

        let spec = SinkSpec {
            channels: self.channels,
            sample_rate_hz: config.sample_rate_hz,
            frame_size: self.frame_size,
        };
        let sink = self
            .output
            .open(&spec)
            .await
            .map_err(SessionError::SinkOpen)?;

        Ok((duplex, sink))
    }
}

/// What the receive loop learned before the session ended
struct Progress {
    conversation_state: Option<Vec<u8>>,
    display_text: Option<String>,
    volume_percent: Option<u8>,
    follow_on: bool,
    stats: SessionStats,
}

impl Progress {
    fn new() -> Self {
        Self {
            conversation_state: None,
            display_text: None,
            volume_percent: None,
            follow_on: false,
            stats: SessionStats::new(Utc::now()),
        }
    }

    fn apply_dialog_state(&mut self, dialog: DialogState) {
        if !dialog.conversation_state.is_empty() {
            debug!(
                bytes = dialog.conversation_state.len(),
                "Conversation state updated"
            );
            self.conversation_state = Some(dialog.conversation_state);
        }
        if !dialog.display_text.is_empty() {
            info!("Assistant: {}", dialog.display_text);
            self.display_text = Some(dialog.display_text);
        }
        if dialog.volume_percent > 0 {
            info!("Assistant set volume to {}%", dialog.volume_percent);
            self.volume_percent = Some(dialog.volume_percent);
        }
        self.follow_on |= dialog.follow_on;
    }

    fn into_result(mut self, state: SessionState, error: Option<SessionError>) -> SessionResult {
        self.stats.finish();
        SessionResult {
            state,
            conversation_state: self.conversation_state,
            display_text: self.display_text,
            volume_percent: self.volume_percent,
            follow_on: self.follow_on,
            error,
            stats: self.stats,
        }
    }
}

fn finish(
    mut tracker: StateTracker,
    progress: Progress,
    outcome: Result<(), SessionError>,
) -> SessionResult {
    match outcome {
        Ok(()) => {
            tracker.advance(SessionState::Completed);
            info!(
                "Session completed: {} events, {} frames played",
                progress.stats.events, progress.stats.frames_written
            );
            progress.into_result(SessionState::Completed, None)
        }
        Err(e) => {
            let terminal = SessionState::for_error(&e);
            tracker.advance(terminal);
            match &e {
                SessionError::Cancelled => info!("Session cancelled"),
                SessionError::TimedOut(_) => warn!("{}", e),
                _ => error!("Session failed: {}", e),
            }
            progress.into_result(terminal, Some(e))
        }
    }
}

/// Transmit the single request; dropping `requests` closes the send half
async fn send_request(
    requests: mpsc::Sender<StreamRequest>,
    request: StreamRequest,
) -> Result<(), TransportError> {
    requests
        .send(request)
        .await
        .map_err(|_| TransportError::Send("request channel closed by the transport".to_string()))
}

/// Consume events until the remote side closes the stream
async fn receive_loop(
    events: &mut EventStream,
    sink: &mut dyn AudioSink,
    frame_size: usize,
    progress: &mut Progress,
) -> Result<(), SessionError> {
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| match e {
            TransportError::Rejected { .. } => SessionError::Connection(e),
            other => SessionError::Recv(other),
        })?;
        progress.stats.events += 1;

        match event {
            StreamEvent::EndOfUtterance => {
                info!("End of audio request detected");
                progress.stats.end_of_utterance = true;
            }
            StreamEvent::AudioOut(payload) => {
                progress.stats.audio_events += 1;
                play_audio(&payload, sink, frame_size, &mut progress.stats).await;
            }
            StreamEvent::DialogState(dialog) => progress.apply_dialog_state(dialog),
            StreamEvent::SpeechResult {
                transcript,
                stability,
            } => {
                debug!(stability, "Recognized: {}", transcript);
            }
            StreamEvent::ScreenOut(html) => {
                debug!(bytes = html.len(), "Screen output received");
                progress.stats.screen_out_bytes += html.len();
            }
            StreamEvent::DebugInfo(details) => debug!("Debug info: {}", details),
            StreamEvent::Error(message) => {
                return Err(SessionError::Recv(TransportError::Remote(message)));
            }
        }
    }

    Ok(())
}

/// Split one payload into frames and write them in order
///
/// A frame the sink rejects is counted and skipped; playback continues.
async fn play_audio(
    payload: &[u8],
    sink: &mut dyn AudioSink,
    frame_size: usize,
    stats: &mut SessionStats,
) {
    let frames = demux(payload, frame_size);
    let residual = frames.residual_bytes();
    if residual > 0 {
        debug!(residual, "Dropping trailing bytes shorter than one frame");
    }
    stats.residual_bytes += residual;

    for frame in frames {
        match sink.write(&frame).await {
            Ok(()) => stats.frames_written += 1,
            Err(e) => {
                stats.frames_failed += 1;
                warn!("Failed to write to audio out: {}", e);
            }
        }
    }
}
