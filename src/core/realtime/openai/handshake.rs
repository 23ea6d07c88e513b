//! Session handshake with the OpenAI Realtime API.
//!
//! 1. Wait for `session.created` (fatal on timeout, error event or close).
//! 2. Send `session.update` with the negotiated session config.
//! 3. Optionally wait for `session.updated`. A timeout only logs a warning;
//!    an error event is still fatal.

use std::fmt::Display;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use super::messages::{ClientEvent, ServerEvent, Session};
use crate::core::realtime::base::{RealtimeConfig, RealtimeError, RealtimeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Created,
    Updated,
}

impl Stage {
    fn event_name(self) -> &'static str {
        match self {
            Stage::Created => "session.created",
            Stage::Updated => "session.updated",
        }
    }
}

/// Run the handshake, returning the upstream session ID.
pub async fn perform<Si, St>(
    sink: &mut Si,
    stream: &mut St,
    config: &RealtimeConfig,
) -> RealtimeResult<String>
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let session = match timeout(
        config.session_created_timeout,
        wait_for(stream, Stage::Created),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(RealtimeError::HandshakeTimeout(format!(
                "session.created not received within {}ms",
                config.session_created_timeout.as_millis()
            )));
        }
    };

    info!(
        session_id = %session.id,
        model = %session.model,
        "Upstream session created"
    );

    let update = ClientEvent::SessionUpdate {
        session: config.session.clone(),
    };
    let json = serde_json::to_string(&update)
        .map_err(|e| RealtimeError::Internal(format!("Failed to serialize session.update: {e}")))?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;

    debug!(session_id = %session.id, "Sent session.update");

    if config.wait_for_session_updated {
        match timeout(
            config.session_updated_timeout,
            wait_for(stream, Stage::Updated),
        )
        .await
        {
            Ok(Ok(updated)) => {
                debug!(
                    session_id = %updated.id,
                    voice = ?updated.voice,
                    "Upstream session updated"
                );
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(
                    session_id = %session.id,
                    "session.updated not received within {}ms, continuing",
                    config.session_updated_timeout.as_millis()
                );
            }
        }
    }

    Ok(session.id)
}

async fn wait_for<St>(stream: &mut St, stage: Stage) -> RealtimeResult<Session>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                Ok(ServerEvent::SessionCreated { session }) if stage == Stage::Created => {
                    return Ok(session);
                }
                Ok(ServerEvent::SessionUpdated { session }) if stage == Stage::Updated => {
                    return Ok(session);
                }
                Ok(ServerEvent::Error { error }) => {
                    return Err(RealtimeError::UpstreamProtocol(format!(
                        "{} while waiting for {}: {}",
                        error.error_type,
                        stage.event_name(),
                        error.message
                    )));
                }
                Ok(other) => {
                    debug!(
                        event_type = other.event_type(),
                        "Ignoring event while waiting for {}",
                        stage.event_name()
                    );
                }
                Err(e) => {
                    warn!("Malformed control event during handshake: {}", e);
                }
            },
            Ok(Message::Close(frame)) => {
                return Err(RealtimeError::UpstreamConnect {
                    status: None,
                    message: format!(
                        "closed by upstream while waiting for {}: {:?}",
                        stage.event_name(),
                        frame
                    ),
                });
            }
            Ok(_) => continue,
            Err(e) => return Err(RealtimeError::WebSocketError(e.to_string())),
        }
    }

    Err(RealtimeError::ConnectionClosed)
}
