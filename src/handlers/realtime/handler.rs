//! Relay WebSocket handler
//!
//! Supervises one relay session per local connection: opens the upstream
//! session, runs the inbound and outbound pumps, and tears both sides down
//! when either pump ends.

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::realtime::{OpenAIRealtime, RealtimeError};
use crate::core::turn::{ResponseState, TurnController};
use crate::state::AppState;

use super::relay::{LocalRoute, OutboundDispatcher, inbound_pump, outbound_pump};
use super::session::{PumpExit, RelaySession, SessionState, close_frame_for};

/// Optimized channel buffer size for audio workloads
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long teardown waits for the local close frame to be written
const LOCAL_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket. Binary frames in both
/// directions carry raw PCM16; no JSON is sent to the client.
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Relay WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_realtime_socket(socket, state))
}

/// Run one relay session to completion
async fn handle_realtime_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let mut session = RelaySession::new();
    let session_id = session.id();
    info!(session_id = %session_id, "Relay WebSocket connection established");

    let (sender, receiver) = socket.split();
    let (local_tx, local_rx) = mpsc::channel::<LocalRoute>(CHANNEL_BUFFER_SIZE);
    let sender_task = tokio::spawn(run_local_sender(sender, local_rx, session_id));

    let config = &app_state.config;
    let upstream = match OpenAIRealtime::connect(&config.realtime_config()).await {
        Ok(upstream) => upstream,
        Err(e) => {
            error!(session_id = %session_id, "Upstream session failed to start: {}", e);
            session.transition(SessionState::Closing);
            let (code, reason) = close_frame_for(&Err(e));
            close_local(local_tx, sender_task, code, reason).await;
            session.transition(SessionState::Closed);
            return;
        }
    };

    session.activate(upstream.session_id());
    let (upstream_tx, upstream_rx, upstream_closer) = upstream.into_parts();

    let response_state = Arc::new(ResponseState::new());
    let controller = TurnController::new(
        config.turn,
        config.response_config(),
        response_state.clone(),
        upstream_tx,
    );
    let dispatcher = OutboundDispatcher::new(
        session_id,
        response_state,
        local_tx.clone(),
        app_state.functions.clone(),
    );

    let mut inbound = tokio::spawn(inbound_pump(receiver, controller));
    let mut outbound = tokio::spawn(outbound_pump(upstream_rx, dispatcher));

    let outcome = select! {
        result = &mut inbound => {
            outbound.abort();
            flatten("inbound", result)
        }
        result = &mut outbound => {
            inbound.abort();
            flatten("outbound", result)
        }
    };

    match &outcome {
        Ok(exit) => info!(session_id = %session_id, exit = ?exit, "Relay session ending"),
        Err(e) if e.is_fatal() => error!(session_id = %session_id, "Relay session failed: {}", e),
        Err(e) => info!(session_id = %session_id, "Relay session ending: {}", e),
    }

    session.transition(SessionState::Closing);
    upstream_closer.close().await;

    let (code, reason) = close_frame_for(&outcome);
    close_local(local_tx, sender_task, code, reason).await;
    session.transition(SessionState::Closed);

    info!(session_id = %session_id, "Relay WebSocket connection terminated");
}

/// Fold a pump's join result into the session outcome.
fn flatten(
    pump: &'static str,
    result: Result<Result<PumpExit, RealtimeError>, JoinError>,
) -> Result<PumpExit, RealtimeError> {
    match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            error!(pump, "Relay pump panicked");
            Err(RealtimeError::Internal(format!("{pump} pump panicked")))
        }
        Err(e) => Err(RealtimeError::Internal(format!("{pump} pump failed: {e}"))),
    }
}

/// Queue the close frame and wait, bounded, for the sender task to write it.
async fn close_local(
    local_tx: mpsc::Sender<LocalRoute>,
    mut sender_task: tokio::task::JoinHandle<()>,
    code: u16,
    reason: String,
) {
    if local_tx
        .send(LocalRoute::Close { code, reason })
        .await
        .is_err()
    {
        debug!("Local sender already stopped");
    }
    drop(local_tx);

    if timeout(LOCAL_CLOSE_TIMEOUT, &mut sender_task).await.is_err() {
        warn!("Local sender did not finish in time, aborting");
        sender_task.abort();
    }
}

/// Sender task for outgoing frames
async fn run_local_sender(
    mut sender: SplitSink<WebSocket, Message>,
    mut local_rx: mpsc::Receiver<LocalRoute>,
    session_id: Uuid,
) {
    while let Some(route) = local_rx.recv().await {
        match route {
            LocalRoute::Audio(data) => {
                if let Err(e) = sender.send(Message::Binary(data)).await {
                    warn!(session_id = %session_id, "Failed to send audio to client: {}", e);
                    break;
                }
            }
            LocalRoute::Close { code, reason } => {
                info!(session_id = %session_id, code, reason = %reason, "Closing relay WebSocket connection");
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                    debug!(session_id = %session_id, "Failed to send close frame: {}", e);
                }
                break;
            }
        }
    }
}
