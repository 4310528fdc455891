//! Embedded Assistant gRPC transport
//!
//! Opens the bidirectional `Assist` stream with tonic. Requests are fed from
//! an mpsc channel; responses are fanned out into `StreamEvent`s by a
//! forwarding task so the caller can start sending before the server answers.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Request, Status, Streaming};
use tracing::{debug, info, warn};

use super::proto::{self, assist_config, assist_request, assist_response, dialog_state_out};
use super::{AssistantTransport, DialogState, Duplex, StreamEvent, StreamRequest};
use crate::auth::Credential;
use crate::error::TransportError;
use crate::session::{AudioInEncoding, AudioOutEncoding, ScreenMode, SessionConfig};

/// Google Assistant API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://embeddedassistant.googleapis.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Responses buffered between the forwarding task and the session
const EVENT_BUFFER: usize = 32;

/// Duplex transport over the Embedded Assistant gRPC API
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    endpoint: String,
}

impl GrpcTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Channel, TransportError> {
        let invalid = |reason: String| TransportError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let mut endpoint = Endpoint::from_shared(self.endpoint.clone())
            .map_err(|e| invalid(e.to_string()))?
            .connect_timeout(CONNECT_TIMEOUT);

        if endpoint.uri().scheme_str() == Some("https") {
            let host = endpoint
                .uri()
                .host()
                .ok_or_else(|| invalid("missing host".to_string()))?
                .to_string();
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().domain_name(host))
                .map_err(|e| TransportError::Connect(format!("TLS config error: {e}")))?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| TransportError::Connect(format!("{e:?}")))?;

        info!("Connected to assistant endpoint {}", self.endpoint);
        Ok(channel)
    }
}

impl Default for GrpcTransport {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait::async_trait]
impl AssistantTransport for GrpcTransport {
    async fn open(&self, credential: &Credential) -> Result<Duplex, TransportError> {
        let channel = self.connect().await?;

        let bearer: AsciiMetadataValue = credential
            .authorization_header()
            .parse()
            .map_err(|_| TransportError::InvalidToken)?;

        let (request_tx, request_rx) = mpsc::channel::<StreamRequest>(1);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let outbound = ReceiverStream::new(request_rx).map(wire_request);
        let mut request = Request::new(outbound);
        request.metadata_mut().insert("authorization", bearer);

        tokio::spawn(async move {
            let opened = tokio::select! {
                _ = event_tx.closed() => {
                    debug!("Session went away before the assist call was answered");
                    return;
                }
                opened = assist(channel, request) => opened,
            };

            match opened {
                Ok(responses) => forward_responses(responses, event_tx).await,
                Err(status) => {
                    warn!(code = ?status.code(), "Assist call rejected: {}", status.message());
                    let _ = event_tx.send(Err(TransportError::rejected(&status))).await;
                }
            }
        });

        Ok(Duplex {
            requests: request_tx,
            events: ReceiverStream::new(event_rx).boxed(),
        })
    }

    fn name(&self) -> &str {
        "grpc"
    }
}

/// Perform the Assist call using tonic's low-level Grpc client
async fn assist<S>(
    channel: Channel,
    request: Request<S>,
) -> Result<Streaming<proto::AssistResponse>, Status>
where
    S: Stream<Item = proto::AssistRequest> + Send + 'static,
{
    let mut grpc = tonic::client::Grpc::new(channel);

    grpc.ready()
        .await
        .map_err(|e| Status::unavailable(format!("Service not ready: {e}")))?;

    let codec = tonic::codec::ProstCodec::<proto::AssistRequest, proto::AssistResponse>::default();
    let path = PathAndQuery::from_static(proto::ASSIST_PATH);

    let response = grpc.streaming(request, path, codec).await?;
    Ok(response.into_inner())
}

/// Pump responses into the session until the stream ends or the session
/// drops its receiver
async fn forward_responses<S>(
    mut responses: S,
    events: mpsc::Sender<Result<StreamEvent, TransportError>>,
) where
    S: Stream<Item = Result<proto::AssistResponse, Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = events.closed() => {
                debug!("Event receiver dropped, abandoning response stream");
                return;
            }
            next = responses.next() => next,
        };

        match next {
            Some(Ok(response)) => {
                for event in events_from_response(response) {
                    if events.send(Ok(event)).await.is_err() {
                        debug!("Event receiver dropped, abandoning response stream");
                        return;
                    }
                }
            }
            None => break,
            Some(Err(status)) => {
                warn!(code = ?status.code(), "Response stream failed: {}", status.message());
                let _ = events.send(Err(status.into())).await;
                return;
            }
        }
    }

    debug!("Response stream ended");
}

/// Build the wire request for one outbound message
pub fn wire_request(request: StreamRequest) -> proto::AssistRequest {
    let r#type = match request {
        StreamRequest::Config { config, text_query } => {
            assist_request::Type::Config(wire_config(&config, text_query))
        }
        StreamRequest::AudioChunk(audio) => assist_request::Type::AudioIn(audio),
    };

    proto::AssistRequest {
        r#type: Some(r#type),
    }
}

fn wire_config(config: &SessionConfig, text_query: Option<String>) -> proto::AssistConfig {
    let sample_rate_hertz = i32::try_from(config.sample_rate_hz).unwrap_or(i32::MAX);

    let r#type = match text_query {
        Some(query) => assist_config::Type::TextQuery(query),
        None => assist_config::Type::AudioInConfig(proto::AudioInConfig {
            encoding: match config.audio_in_encoding {
                AudioInEncoding::Linear16 => proto::audio_in_config::Encoding::Linear16,
                AudioInEncoding::Flac => proto::audio_in_config::Encoding::Flac,
            } as i32,
            sample_rate_hertz,
        }),
    };

    proto::AssistConfig {
        audio_out_config: Some(proto::AudioOutConfig {
            encoding: match config.audio_out_encoding {
                AudioOutEncoding::Linear16 => proto::audio_out_config::Encoding::Linear16,
                AudioOutEncoding::Mp3 => proto::audio_out_config::Encoding::Mp3,
                AudioOutEncoding::OpusInOgg => proto::audio_out_config::Encoding::OpusInOgg,
            } as i32,
            sample_rate_hertz,
            volume_percentage: i32::from(config.volume_percent.min(100)),
        }),
        screen_out_config: Some(proto::ScreenOutConfig {
            screen_mode: match config.screen_mode {
                ScreenMode::Off => proto::screen_out_config::ScreenMode::Off,
                ScreenMode::Playing => proto::screen_out_config::ScreenMode::Playing,
            } as i32,
        }),
        dialog_state_in: Some(proto::DialogStateIn {
            conversation_state: config.conversation_state.clone().unwrap_or_default(),
            language_code: config.language_code.clone(),
            is_new_conversation: config.is_new_conversation,
        }),
        device_config: Some(proto::DeviceConfig {
            device_id: config.device_id.clone(),
            device_model_id: config.device_model_id.clone(),
        }),
        debug_config: Some(proto::DebugConfig {
            return_debug_info: config.return_debug_info,
        }),
        r#type: Some(r#type),
    }
}

/// Fan one response out into events
///
/// Order: speech results, end of utterance, dialog state, audio, screen,
/// debug info.
pub fn events_from_response(response: proto::AssistResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    for result in response.speech_results {
        events.push(StreamEvent::SpeechResult {
            transcript: result.transcript,
            stability: result.stability,
        });
    }

    if response.event_type == assist_response::EventType::EndOfUtterance as i32 {
        events.push(StreamEvent::EndOfUtterance);
    }

    if let Some(dialog) = response.dialog_state_out {
        events.push(StreamEvent::DialogState(DialogState {
            conversation_state: dialog.conversation_state,
            display_text: dialog.supplemental_display_text,
            volume_percent: dialog.volume_percentage.clamp(0, 100) as u8,
            follow_on: dialog.microphone_mode
                == dialog_state_out::MicrophoneMode::DialogFollowOn as i32,
        }));
    }

    if let Some(audio) = response.audio_out {
        events.push(StreamEvent::AudioOut(audio.audio_data));
    }

    if let Some(screen) = response.screen_out {
        events.push(StreamEvent::ScreenOut(screen.data));
    }

    if let Some(debug) = response.debug_info {
        if !debug.aog_agent_to_assistant_json.is_empty() {
            events.push(StreamEvent::DebugInfo(debug.aog_agent_to_assistant_json));
        }
    }

    events
}
