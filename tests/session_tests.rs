// Integration tests for the streaming session manager
//
// These run the session against an in-memory duplex and a recording sink,
// covering the happy path, every failure class and the sink lifecycle.

mod common;

use anyhow::Result;
use assist_client::error::{SessionError, TransportError};
use assist_client::session::{SessionConfig, SessionState, StreamingSession};
use assist_client::transport::{DialogState, StreamEvent, StreamRequest};
use common::{pcm, tokens, FakeTransport, NoTokens, RecordingOpener};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

fn session(transport: &Arc<FakeTransport>, opener: &Arc<RecordingOpener>) -> StreamingSession {
    StreamingSession::new(transport.clone(), opener.clone())
}

fn dialog(state: &[u8], text: &str) -> StreamEvent {
    StreamEvent::DialogState(DialogState {
        conversation_state: state.to_vec(),
        display_text: text.to_string(),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_text_query_without_audio_completes() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(vec![
        Ok(StreamEvent::EndOfUtterance),
        Ok(dialog(&[7, 7], "Hello there")),
    ]));
    let opener = Arc::new(RecordingOpener::new());
    let config = SessionConfig::default();

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &config,
            tokens().as_ref(),
            Some("hi"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Completed);
    assert!(result.error.is_none());
    assert_eq!(result.conversation_state, Some(vec![7, 7]));
    assert_eq!(result.display_text.as_deref(), Some("Hello there"));
    assert!(result.stats.end_of_utterance);
    assert_eq!(result.stats.events, 2);
    assert_eq!(result.stats.frames_written, 0);

    assert_eq!(opener.opens(), 1);
    assert_eq!(opener.closes(), 1);
    assert!(opener.frames().is_empty());

    // Exactly one request: the config carrying the query
    let requests = transport.recorded_requests();
    assert_eq!(
        requests,
        vec![StreamRequest::Config {
            config: config.clone(),
            text_query: Some("hi".to_string()),
        }]
    );
    assert_eq!(*transport.tokens_seen.lock().unwrap(), vec!["test-token"]);

    Ok(())
}

#[tokio::test]
async fn test_audio_is_played_frame_by_frame_in_order() -> Result<()> {
    let first: Vec<i16> = (1..=10).collect();
    let transport = Arc::new(FakeTransport::replying(vec![
        Ok(StreamEvent::AudioOut(pcm(&first))),
        Ok(StreamEvent::AudioOut(pcm(&[11, 12, 13, 14]))),
    ]));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .with_frame_size(4)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("play"),
            TIMEOUT,
        )
        .await;

    assert!(result.is_completed());
    // Samples 9 and 10 do not fill a frame and carry nothing into the next payload
    assert_eq!(
        opener.frames(),
        vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8], vec![11, 12, 13, 14]]
    );
    assert_eq!(result.stats.audio_events, 2);
    assert_eq!(result.stats.frames_written, 3);
    assert_eq!(result.stats.residual_bytes, 4);
    assert_eq!(opener.log.lock().unwrap().specs[0].frame_size, 4);

    Ok(())
}

#[tokio::test]
async fn test_default_frame_size_drops_short_tail() -> Result<()> {
    // 800 samples: one 799-sample frame plus one leftover sample
    let samples: Vec<i16> = (0..800).map(|i| i as i16).collect();
    let transport = Arc::new(FakeTransport::replying(vec![Ok(StreamEvent::AudioOut(
        pcm(&samples),
    ))]));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("long answer"),
            TIMEOUT,
        )
        .await;

    assert!(result.is_completed());
    let frames = opener.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], samples[..799].to_vec());
    assert_eq!(result.stats.residual_bytes, 2);

    Ok(())
}

#[tokio::test]
async fn test_receive_error_fails_after_partial_playback() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(vec![
        Ok(StreamEvent::AudioOut(pcm(&[1, 2, 3, 4]))),
        Ok(dialog(&[1], "")),
        Err(TransportError::Rpc {
            code: tonic::Code::Unavailable,
            message: "connection reset".to_string(),
        }),
        Ok(StreamEvent::AudioOut(pcm(&[5, 6, 7, 8]))),
    ]));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .with_frame_size(4)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    assert!(matches!(
        result.error,
        Some(SessionError::Recv(TransportError::Rpc { .. }))
    ));
    // Progress made before the failure is still reported
    assert_eq!(opener.frames(), vec![vec![1, 2, 3, 4]]);
    assert_eq!(result.conversation_state, Some(vec![1]));
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_in_band_error_is_fatal() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(vec![Ok(StreamEvent::Error(
        "quota exceeded".to_string(),
    ))]));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    match result.error {
        Some(SessionError::Recv(TransportError::Remote(message))) => {
            assert_eq!(message, "quota exceeded")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_sink_write_failure_does_not_end_session() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(vec![Ok(StreamEvent::AudioOut(
        pcm(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
    ))]));
    let opener = Arc::new(RecordingOpener::failing_writes(vec![1]));

    let result = session(&transport, &opener)
        .with_frame_size(4)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Completed);
    assert_eq!(opener.frames(), vec![vec![1, 2, 3, 4], vec![9, 10, 11, 12]]);
    assert_eq!(result.stats.frames_written, 2);
    assert_eq!(result.stats.frames_failed, 1);

    Ok(())
}

#[tokio::test]
async fn test_timeout_stops_a_silent_remote() -> Result<()> {
    let transport = Arc::new(FakeTransport::hanging());
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            Duration::from_millis(50),
        )
        .await;

    assert_eq!(result.state, SessionState::TimedOut);
    assert!(matches!(result.error, Some(SessionError::TimedOut(d)) if d == Duration::from_millis(50)));
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_timeout_keeps_progress_received_before_expiry() -> Result<()> {
    let transport = Arc::new(FakeTransport {
        events: vec![
            Ok(StreamEvent::AudioOut(pcm(&[1, 2]))),
            Ok(dialog(&[5], "")),
        ],
        hang: true,
        ..Default::default()
    });
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .with_frame_size(2)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            Duration::from_millis(100),
        )
        .await;

    assert_eq!(result.state, SessionState::TimedOut);
    assert!(matches!(result.error, Some(SessionError::TimedOut(_))));
    assert_eq!(result.conversation_state, Some(vec![5]));
    assert_eq!(opener.frames(), vec![vec![1, 2]]);
    assert_eq!(result.stats.frames_written, 1);
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_cancel_during_streaming() -> Result<()> {
    let transport = Arc::new(FakeTransport {
        events: vec![Ok(StreamEvent::AudioOut(pcm(&[1, 2, 3, 4])))],
        hang: true,
        ..Default::default()
    });
    let opener = Arc::new(RecordingOpener::new());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = session(&transport, &opener)
        .with_frame_size(4)
        .run(
            &cancel,
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Cancelled);
    assert!(matches!(result.error, Some(SessionError::Cancelled)));
    assert_eq!(opener.frames(), vec![vec![1, 2, 3, 4]]);
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_already_cancelled_never_connects() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(Vec::new()));
    let opener = Arc::new(RecordingOpener::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = session(&transport, &opener)
        .run(
            &cancel,
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Cancelled);
    assert_eq!(transport.open_count(), 0);
    assert_eq!(opener.opens(), 0);

    Ok(())
}

#[tokio::test]
async fn test_missing_token_fails_before_transport() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(Vec::new()));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            &NoTokens,
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    assert!(matches!(result.error, Some(SessionError::Credential(_))));
    assert_eq!(transport.open_count(), 0);
    assert_eq!(opener.opens(), 0);

    Ok(())
}

#[tokio::test]
async fn test_connection_failure_opens_no_sink() -> Result<()> {
    let transport = Arc::new(FakeTransport {
        refuse: Some(TransportError::Connect("dns error".to_string())),
        ..Default::default()
    });
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    assert!(matches!(result.error, Some(SessionError::Connection(_))));
    assert_eq!(opener.opens(), 0);
    assert_eq!(opener.closes(), 0);

    Ok(())
}

#[tokio::test]
async fn test_rejected_call_is_a_connection_failure() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(vec![Err(TransportError::Rejected {
        code: tonic::Code::Unauthenticated,
        message: "invalid credentials".to_string(),
    })]));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    match result.error {
        Some(SessionError::Connection(TransportError::Rejected { code, .. })) => {
            assert_eq!(code, tonic::Code::Unauthenticated)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_sink_open_failure_is_fatal() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(Vec::new()));
    let opener = Arc::new(RecordingOpener::refusing());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    assert!(matches!(result.error, Some(SessionError::SinkOpen(_))));
    assert!(transport.recorded_requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_send_failure_is_fatal() -> Result<()> {
    let transport = Arc::new(FakeTransport {
        hang: true,
        reject_requests: true,
        ..Default::default()
    });
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert_eq!(result.state, SessionState::Failed);
    assert!(matches!(
        result.error,
        Some(SessionError::Send(TransportError::Send(_)))
    ));
    assert_eq!(opener.closes(), 1);

    Ok(())
}

#[tokio::test]
async fn test_latest_non_empty_conversation_state_wins() -> Result<()> {
    let transport = Arc::new(FakeTransport::replying(vec![
        Ok(dialog(&[1], "")),
        Ok(dialog(&[2, 2], "")),
        Ok(dialog(&[], "")),
    ]));
    let opener = Arc::new(RecordingOpener::new());

    let result = session(&transport, &opener)
        .run(
            &CancellationToken::new(),
            &SessionConfig::default(),
            tokens().as_ref(),
            Some("q"),
            TIMEOUT,
        )
        .await;

    assert!(result.is_completed());
    assert_eq!(result.conversation_state, Some(vec![2, 2]));
    assert!(result.display_text.is_none());

    Ok(())
}
