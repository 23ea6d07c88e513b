//! The two relay pumps and the outbound event dispatcher.
//!
//! The inbound pump owns the [`TurnController`]; the outbound pump owns the
//! [`OutboundDispatcher`]. They share only the [`ResponseState`] flags.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::session::PumpExit;
use crate::core::functions::FunctionRegistry;
use crate::core::realtime::openai::{ApiError, ServerEvent, UpstreamReceiver};
use crate::core::realtime::{RealtimeError, RealtimeResult, UpstreamEvent};
use crate::core::turn::{ResponseState, TurnController};

/// Work items for the local sender task.
#[derive(Debug)]
pub enum LocalRoute {
    /// Raw PCM16 for the client
    Audio(Bytes),
    /// Close frame, sent last
    Close { code: u16, reason: String },
}

/// Read local frames until the client leaves.
///
/// Binary frames drive the turn controller; everything else is ignored.
pub async fn inbound_pump<St>(mut stream: St, mut controller: TurnController) -> RealtimeResult<PumpExit>
where
    St: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Binary(data)) => controller.on_chunk(&data).await?,
            Ok(Message::Text(text)) => {
                debug!("Ignoring text frame from client: {} bytes", text.len());
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                info!(frame = ?frame, "Client closed relay WebSocket");
                return Ok(PumpExit::ClientDisconnected);
            }
            Err(e) => {
                warn!("Relay WebSocket error: {}", e);
                return Err(RealtimeError::LocalDisconnect);
            }
        }
    }

    info!("Relay WebSocket stream ended");
    Ok(PumpExit::ClientDisconnected)
}

/// Read upstream events until upstream closes or fails.
pub async fn outbound_pump(
    mut receiver: UpstreamReceiver,
    mut dispatcher: OutboundDispatcher,
) -> RealtimeResult<PumpExit> {
    while let Some(item) = receiver.receive().await {
        match item {
            Ok(UpstreamEvent::Audio(data)) => dispatcher.forward_audio(data).await?,
            Ok(UpstreamEvent::Control(event)) => dispatcher.dispatch(event).await?,
            Err(RealtimeError::MalformedControlEvent(e)) => {
                warn!(session_id = %dispatcher.session_id, "Skipping malformed upstream event: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    info!(session_id = %dispatcher.session_id, "Upstream closed the session");
    Ok(PumpExit::UpstreamClosed)
}

/// Function call announced by `response.output_item.added`.
#[derive(Debug)]
struct PendingCall {
    response_id: Option<String>,
    name: String,
}

/// Applies upstream control events to the session.
pub struct OutboundDispatcher {
    session_id: Uuid,
    state: Arc<ResponseState>,
    local_tx: mpsc::Sender<LocalRoute>,
    functions: Arc<FunctionRegistry>,
    /// call_id -> announced call
    pending_calls: HashMap<String, PendingCall>,
    /// Response whose audio is currently forwarded
    current_response: Option<String>,
    /// Responses cancelled by barge-in whose terminal event is still due
    cancelled_responses: HashSet<String>,
    assistant_transcript: String,
}

impl OutboundDispatcher {
    pub fn new(
        session_id: Uuid,
        state: Arc<ResponseState>,
        local_tx: mpsc::Sender<LocalRoute>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        Self {
            session_id,
            state,
            local_tx,
            functions,
            pending_calls: HashMap::new(),
            current_response: None,
            cancelled_responses: HashSet::new(),
            assistant_transcript: String::new(),
        }
    }

    /// Send assistant audio from a binary frame to the client.
    ///
    /// Fails only when the local sender task is gone.
    pub async fn forward_audio(&mut self, data: Bytes) -> RealtimeResult<()> {
        self.retire_cancelled();
        self.play(data).await
    }

    pub async fn dispatch(&mut self, event: ServerEvent) -> RealtimeResult<()> {
        self.retire_cancelled();

        match event {
            ServerEvent::AudioDelta {
                response_id, delta, ..
            } => {
                let response_id = response_id.filter(|id| !id.is_empty());
                if self.is_cancelled(response_id.as_deref()) {
                    trace!(session_id = %self.session_id, response_id = ?response_id, "Dropping audio of cancelled response");
                    return Ok(());
                }
                match ServerEvent::decode_audio_delta(&delta) {
                    Ok(audio) => {
                        if response_id.is_some() {
                            self.current_response = response_id;
                        }
                        self.play(Bytes::from(audio)).await?;
                    }
                    Err(e) => warn!(session_id = %self.session_id, "Undecodable audio delta: {}", e),
                }
            }
            ServerEvent::ResponseDone { response } => {
                let response_id = Some(response.id).filter(|id| !id.is_empty());
                self.finish_response(response_id, &response.status);
            }
            ServerEvent::ResponseCancelled { response_id } => {
                let response_id = response_id.filter(|id| !id.is_empty());
                self.finish_response(response_id, "cancelled");
            }
            ServerEvent::ResponseCreated { response } => {
                debug!(session_id = %self.session_id, response_id = %response.id, "Response created");
                if !response.id.is_empty() {
                    self.current_response = Some(response.id);
                }
            }
            ServerEvent::TranscriptionCompleted { transcript, .. } => {
                info!(session_id = %self.session_id, "User: {}", transcript);
            }
            ServerEvent::AudioTranscriptDelta { delta, .. } => {
                debug!(session_id = %self.session_id, "Assistant (partial): {}", delta);
                self.assistant_transcript.push_str(&delta);
            }
            ServerEvent::AudioTranscriptDone { transcript, .. } => {
                let accumulated = std::mem::take(&mut self.assistant_transcript);
                let full = if transcript.is_empty() {
                    accumulated
                } else {
                    transcript
                };
                info!(session_id = %self.session_id, "Assistant: {}", full);
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!(session_id = %self.session_id, audio_start_ms, "Speech started");
            }
            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                debug!(session_id = %self.session_id, audio_end_ms, "Speech stopped");
            }
            ServerEvent::OutputItemAdded { response_id, item } => {
                if item.item_type == "function_call"
                    && let (Some(call_id), Some(name)) = (item.call_id, item.name)
                {
                    debug!(session_id = %self.session_id, call_id = %call_id, function = %name, "Function call started");
                    self.pending_calls.insert(
                        call_id,
                        PendingCall {
                            response_id: response_id.filter(|id| !id.is_empty()),
                            name,
                        },
                    );
                }
            }
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                let remembered = self.pending_calls.remove(&call_id).map(|call| call.name);
                match name.or(remembered) {
                    Some(name) => {
                        if self.functions.dispatch(&name, &arguments) {
                            info!(session_id = %self.session_id, call_id = %call_id, function = %name, "Function call dispatched");
                        }
                    }
                    None => {
                        debug!(session_id = %self.session_id, call_id = %call_id, "Function call without a name, ignoring");
                    }
                }
            }
            ServerEvent::Error { error } => match classify_upstream_error(&error) {
                RealtimeError::BenignCommit => {
                    debug!(session_id = %self.session_id, "Upstream rejected empty commit");
                }
                e => warn!(session_id = %self.session_id, "{}", e),
            },
            ServerEvent::SessionCreated { session } | ServerEvent::SessionUpdated { session } => {
                debug!(session_id = %self.session_id, upstream_session_id = %session.id, "Upstream session event");
            }
            other => {
                trace!(session_id = %self.session_id, event_type = other.event_type(), "Unhandled upstream event");
            }
        }
        Ok(())
    }

    async fn play(&mut self, data: Bytes) -> RealtimeResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        self.local_tx
            .send(LocalRoute::Audio(data))
            .await
            .map_err(|_| RealtimeError::LocalDisconnect)?;

        if self.state.mark_speaking() {
            debug!(session_id = %self.session_id, "Assistant started speaking");
        }
        Ok(())
    }

    /// Move the playing response to the cancelled set after a barge-in.
    fn retire_cancelled(&mut self) {
        if !self.state.take_cancelled() {
            return;
        }
        if let Some(id) = self.current_response.take() {
            debug!(session_id = %self.session_id, response_id = %id, "Response cancelled by barge-in");
            self.cancelled_responses.insert(id);
        }
    }

    fn is_cancelled(&self, response_id: Option<&str>) -> bool {
        response_id.is_some_and(|id| self.cancelled_responses.contains(id))
    }

    /// Terminal event for a response: drop its unfinished calls and, unless
    /// a barge-in already retired it, clear the flags.
    fn finish_response(&mut self, response_id: Option<String>, status: &str) {
        match response_id.as_deref() {
            Some(id) => self
                .pending_calls
                .retain(|_, call| call.response_id.as_deref().is_some_and(|r| r != id)),
            None => self.pending_calls.clear(),
        }

        if let Some(id) = response_id.as_deref()
            && self.cancelled_responses.remove(id)
        {
            debug!(session_id = %self.session_id, response_id = %id, status, "Cancelled response ended");
            return;
        }

        if response_id.is_none() || self.current_response == response_id {
            self.current_response = None;
        }
        if self.state.clear() {
            debug!(
                session_id = %self.session_id,
                response_id = ?response_id,
                status,
                "Response finished"
            );
        }
    }
}

/// Map an upstream `error` event onto the error taxonomy.
pub fn classify_upstream_error(error: &ApiError) -> RealtimeError {
    if error.is_benign_commit() {
        return RealtimeError::BenignCommit;
    }
    let code = error.code.as_deref().unwrap_or(&error.error_type);
    RealtimeError::UpstreamProtocol(format!("{}: {}", code, error.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::FunctionHandler;
    use crate::core::realtime::openai::{
        ResponseConfig, UpstreamCommand, UpstreamSender, decode_control,
    };
    use crate::core::turn::TurnPolicy;
    use async_trait::async_trait;
    use base64::prelude::*;
    use futures::stream;
    use serde_json::Value;

    fn dispatcher() -> (
        OutboundDispatcher,
        Arc<ResponseState>,
        mpsc::Receiver<LocalRoute>,
    ) {
        dispatcher_with(FunctionRegistry::new())
    }

    fn dispatcher_with(
        functions: FunctionRegistry,
    ) -> (
        OutboundDispatcher,
        Arc<ResponseState>,
        mpsc::Receiver<LocalRoute>,
    ) {
        let state = Arc::new(ResponseState::new());
        let (tx, rx) = mpsc::channel(64);
        let dispatcher =
            OutboundDispatcher::new(Uuid::new_v4(), state.clone(), tx, Arc::new(functions));
        (dispatcher, state, rx)
    }

    fn event(json: &str) -> ServerEvent {
        decode_control(json).unwrap()
    }

    #[tokio::test]
    async fn test_audio_delta_forwarded_and_marks_speaking() {
        let (mut dispatcher, state, mut rx) = dispatcher();
        let pcm = vec![1u8, 2, 3, 4];
        let json = format!(
            r#"{{"type":"response.audio.delta","response_id":"r1","item_id":"i1","delta":"{}"}}"#,
            BASE64_STANDARD.encode(&pcm)
        );

        dispatcher.dispatch(event(&json)).await.unwrap();

        match rx.try_recv().unwrap() {
            LocalRoute::Audio(data) => assert_eq!(&data[..], &pcm[..]),
            other => panic!("unexpected route: {other:?}"),
        }
        assert!(state.is_speaking());
    }

    #[tokio::test]
    async fn test_undecodable_audio_delta_skipped() {
        let (mut dispatcher, state, mut rx) = dispatcher();
        dispatcher
            .dispatch(event(r#"{"type":"response.audio.delta","delta":"***"}"#))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
        assert!(!state.is_speaking());
    }

    #[tokio::test]
    async fn test_binary_audio_forwarded() {
        let (mut dispatcher, state, mut rx) = dispatcher();
        dispatcher
            .forward_audio(Bytes::from_static(&[0, 1]))
            .await
            .unwrap();
        assert!(matches!(rx.try_recv().unwrap(), LocalRoute::Audio(_)));
        assert!(state.is_speaking());
    }

    #[tokio::test]
    async fn test_forward_fails_when_local_sender_gone() {
        let (mut dispatcher, _state, rx) = dispatcher();
        drop(rx);
        let err = dispatcher
            .forward_audio(Bytes::from_static(&[0, 1]))
            .await
            .unwrap_err();
        assert!(matches!(err, RealtimeError::LocalDisconnect));
    }

    #[tokio::test]
    async fn test_response_done_and_cancelled_clear_flags() {
        let (mut dispatcher, state, _rx) = dispatcher();
        assert!(state.try_begin_response());
        state.mark_speaking();

        dispatcher
            .dispatch(event(r#"{"type":"response.done","response":{"id":"r1"}}"#))
            .await
            .unwrap();
        assert!(state.is_idle());

        assert!(state.try_begin_response());
        dispatcher
            .dispatch(event(r#"{"type":"response.cancelled","response_id":"r2"}"#))
            .await
            .unwrap();
        assert!(state.is_idle());

        // No-op on clear flags.
        dispatcher
            .dispatch(event(r#"{"type":"response.done"}"#))
            .await
            .unwrap();
        assert!(state.is_idle());
    }

    fn audio_delta(response_id: &str, pcm: &[u8]) -> ServerEvent {
        event(&format!(
            r#"{{"type":"response.audio.delta","response_id":"{}","delta":"{}"}}"#,
            response_id,
            BASE64_STANDARD.encode(pcm)
        ))
    }

    fn voiced_chunk() -> Vec<u8> {
        std::iter::repeat_n(3000i16, 800)
            .flat_map(|s| s.to_le_bytes())
            .collect()
    }

    fn count_sent(commands: &mut mpsc::Receiver<UpstreamCommand>, name: &str) -> usize {
        let mut count = 0;
        while let Ok(command) = commands.try_recv() {
            if let UpstreamCommand::Event(event) = command
                && event.event_type() == name
            {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_late_audio_of_cancelled_response_is_dropped() {
        let (mut dispatcher, state, mut local) = dispatcher();
        let (upstream, mut commands) = UpstreamSender::channel(1024);
        let mut controller = TurnController::new(
            TurnPolicy::default(),
            ResponseConfig::default(),
            state.clone(),
            upstream,
        );

        assert!(state.try_begin_response());
        dispatcher.dispatch(audio_delta("r1", &[1, 2])).await.unwrap();
        assert!(matches!(local.try_recv().unwrap(), LocalRoute::Audio(_)));

        // Barge-in, then the batch commits and requests the next response.
        for _ in 0..20 {
            controller.on_chunk(&voiced_chunk()).await.unwrap();
        }
        dispatcher.dispatch(audio_delta("r1", &[3, 4])).await.unwrap();
        assert!(local.try_recv().is_err(), "cancelled audio must not reach the client");
        assert!(!state.is_speaking());
        assert!(state.is_in_progress());

        for _ in 0..20 {
            controller.on_chunk(&voiced_chunk()).await.unwrap();
        }
        let mut cancels = 0;
        let mut creates = 0;
        while let Ok(UpstreamCommand::Event(event)) = commands.try_recv() {
            match event.event_type() {
                "response.cancel" => cancels += 1,
                "response.create" => creates += 1,
                _ => {}
            }
        }
        assert_eq!(cancels, 1);
        assert_eq!(creates, 1);

        // The cancelled response ending does not release the new request.
        dispatcher
            .dispatch(event(r#"{"type":"response.done","response":{"id":"r1","status":"cancelled"}}"#))
            .await
            .unwrap();
        assert!(state.is_in_progress());

        dispatcher.dispatch(audio_delta("r2", &[5, 6])).await.unwrap();
        assert!(matches!(local.try_recv().unwrap(), LocalRoute::Audio(_)));
        assert!(state.is_speaking());

        dispatcher
            .dispatch(event(r#"{"type":"response.done","response":{"id":"r2","status":"completed"}}"#))
            .await
            .unwrap();
        assert!(state.is_idle());
        assert!(dispatcher.cancelled_responses.is_empty());
    }

    #[tokio::test]
    async fn test_barge_in_retired_before_next_response_created() {
        let (mut dispatcher, state, _local) = dispatcher();
        let (upstream, mut commands) = UpstreamSender::channel(1024);
        let mut controller = TurnController::new(
            TurnPolicy::default(),
            ResponseConfig::default(),
            state.clone(),
            upstream,
        );

        assert!(state.try_begin_response());
        dispatcher.dispatch(audio_delta("r1", &[1, 2])).await.unwrap();
        controller.on_chunk(&voiced_chunk()).await.unwrap();
        assert_eq!(count_sent(&mut commands, "response.cancel"), 1);

        dispatcher
            .dispatch(event(r#"{"type":"response.created","response":{"id":"r2"}}"#))
            .await
            .unwrap();
        assert_eq!(dispatcher.current_response.as_deref(), Some("r2"));
        assert!(dispatcher.cancelled_responses.contains("r1"));

        dispatcher
            .dispatch(event(r#"{"type":"response.cancelled","response_id":"r1"}"#))
            .await
            .unwrap();
        assert!(dispatcher.cancelled_responses.is_empty());
        assert_eq!(dispatcher.current_response.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_unfinished_function_calls_dropped_with_response() {
        let (mut dispatcher, _state, _rx) = dispatcher();
        dispatcher
            .dispatch(event(
                r#"{"type":"response.output_item.added","response_id":"r1","item":{"type":"function_call","call_id":"call_1","name":"lookup"}}"#,
            ))
            .await
            .unwrap();
        dispatcher
            .dispatch(event(
                r#"{"type":"response.output_item.added","response_id":"r2","item":{"type":"function_call","call_id":"call_2","name":"lookup"}}"#,
            ))
            .await
            .unwrap();

        dispatcher
            .dispatch(event(r#"{"type":"response.cancelled","response_id":"r1"}"#))
            .await
            .unwrap();
        assert!(!dispatcher.pending_calls.contains_key("call_1"));
        assert!(dispatcher.pending_calls.contains_key("call_2"));

        dispatcher
            .dispatch(event(r#"{"type":"response.done","response":{"id":"r2"}}"#))
            .await
            .unwrap();
        assert!(dispatcher.pending_calls.is_empty());
    }

    #[tokio::test]
    async fn test_errors_do_not_end_session() {
        let (mut dispatcher, state, _rx) = dispatcher();
        assert!(state.try_begin_response());

        dispatcher
            .dispatch(event(
                r#"{"type":"error","error":{"type":"invalid_request_error","code":"input_audio_buffer_commit_empty","message":"buffer too small"}}"#,
            ))
            .await
            .unwrap();
        dispatcher
            .dispatch(event(
                r#"{"type":"error","error":{"type":"server_error","message":"boom"}}"#,
            ))
            .await
            .unwrap();

        assert!(state.is_in_progress());
    }

    #[test]
    fn test_classify_upstream_error() {
        let benign = ApiError {
            code: Some("input_audio_buffer_commit_empty".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            classify_upstream_error(&benign),
            RealtimeError::BenignCommit
        ));

        let other = ApiError {
            error_type: "invalid_request_error".to_string(),
            message: "bad".to_string(),
            ..Default::default()
        };
        match classify_upstream_error(&other) {
            RealtimeError::UpstreamProtocol(msg) => {
                assert_eq!(msg, "invalid_request_error: bad")
            }
            e => panic!("unexpected: {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_transcript_accumulates() {
        let (mut dispatcher, _state, _rx) = dispatcher();
        dispatcher
            .dispatch(event(r#"{"type":"response.audio_transcript.delta","delta":"Hel"}"#))
            .await
            .unwrap();
        dispatcher
            .dispatch(event(r#"{"type":"response.audio_transcript.delta","delta":"lo"}"#))
            .await
            .unwrap();
        assert_eq!(dispatcher.assistant_transcript, "Hello");

        dispatcher
            .dispatch(event(r#"{"type":"response.audio_transcript.done","transcript":""}"#))
            .await
            .unwrap();
        assert!(dispatcher.assistant_transcript.is_empty());
    }

    struct Recorder {
        tx: mpsc::UnboundedSender<Value>,
    }

    #[async_trait]
    impl FunctionHandler for Recorder {
        async fn handle(&self, arguments: Value) {
            let _ = self.tx.send(arguments);
        }
    }

    #[tokio::test]
    async fn test_function_call_resolves_name_from_output_item() {
        let (tx, mut calls) = mpsc::unbounded_channel();
        let mut registry = FunctionRegistry::new();
        registry.register("get_weather", Arc::new(Recorder { tx }));
        let (mut dispatcher, _state, _rx) = dispatcher_with(registry);

        dispatcher
            .dispatch(event(
                r#"{"type":"response.output_item.added","response_id":"r1","item":{"id":"item_1","type":"function_call","call_id":"call_1","name":"get_weather"}}"#,
            ))
            .await
            .unwrap();
        dispatcher
            .dispatch(event(
                r#"{"type":"response.function_call_arguments.done","call_id":"call_1","arguments":"{\"city\":\"Oslo\"}"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(calls.recv().await.unwrap()["city"], "Oslo");
        assert!(dispatcher.pending_calls.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_function_ignored() {
        let (mut dispatcher, _state, _rx) = dispatcher();
        dispatcher
            .dispatch(event(
                r#"{"type":"response.function_call_arguments.done","call_id":"c","name":"nope","arguments":"{}"}"#,
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_event_ignored() {
        let (mut dispatcher, state, mut rx) = dispatcher();
        dispatcher
            .dispatch(event(r#"{"type":"rate_limits.updated","rate_limits":[]}"#))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn test_inbound_pump_feeds_controller_until_close() {
        let (upstream, mut commands) = UpstreamSender::channel(64);
        let controller = TurnController::new(
            TurnPolicy::default(),
            ResponseConfig::default(),
            Arc::new(ResponseState::new()),
            upstream,
        );
        let frames = stream::iter(vec![
            Ok::<_, axum::Error>(Message::Binary(Bytes::from(vec![0u8; 320]))),
            Ok(Message::Text("hello".into())),
            Ok(Message::Binary(Bytes::from(vec![0u8; 320]))),
            Ok(Message::Close(None)),
            Ok(Message::Binary(Bytes::from(vec![0u8; 320]))),
        ]);

        let exit = inbound_pump(frames, controller).await.unwrap();
        assert_eq!(exit, PumpExit::ClientDisconnected);

        let mut appends = 0;
        while let Ok(UpstreamCommand::Event(event)) = commands.try_recv() {
            assert_eq!(event.event_type(), "input_audio_buffer.append");
            appends += 1;
        }
        assert_eq!(appends, 2);
    }

    #[tokio::test]
    async fn test_inbound_pump_transport_error_is_local_disconnect() {
        let (upstream, _commands) = UpstreamSender::channel(64);
        let controller = TurnController::new(
            TurnPolicy::default(),
            ResponseConfig::default(),
            Arc::new(ResponseState::new()),
            upstream,
        );
        let frames = stream::iter(vec![Err::<Message, _>(axum::Error::new(
            std::io::Error::other("reset"),
        ))]);

        let err = inbound_pump(frames, controller).await.unwrap_err();
        assert!(matches!(err, RealtimeError::LocalDisconnect));
        assert_eq!(err.close_code(), 1000);
    }

    #[tokio::test]
    async fn test_outbound_pump_ends_when_upstream_closes() {
        use tokio_tungstenite::tungstenite::Message as WsMessage;

        let (dispatcher, _state, mut rx) = dispatcher();
        let frames = stream::iter(vec![
            Ok::<_, tokio_tungstenite::tungstenite::Error>(WsMessage::Text("not json".into())),
            Ok(WsMessage::Binary(Bytes::from_static(&[9, 9]))),
            Ok(WsMessage::Close(None)),
        ]);
        let receiver = UpstreamReceiver::from_stream(frames);

        let exit = outbound_pump(receiver, dispatcher).await.unwrap();
        assert_eq!(exit, PumpExit::UpstreamClosed);
        assert!(matches!(rx.try_recv().unwrap(), LocalRoute::Audio(_)));
    }
}
