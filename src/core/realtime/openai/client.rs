//! OpenAI Realtime API client implementation.
//!
//! One persistent WebSocket per relay session. Writes go through a single
//! writer task fed by an mpsc channel so frames leave in submission order;
//! reads are pulled by whoever owns the [`UpstreamReceiver`].
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events, audio base64-encoded inside them
//! - Headers: `Authorization: Bearer <key>`, `OpenAI-Beta: realtime=v1`
//!
//! # Example
//!
//! ```rust,ignore
//! let mut upstream = OpenAIRealtime::connect(&config).await?;
//! upstream.send_audio(&pcm).await?;
//! while let Some(event) = upstream.receive().await {
//!     // UpstreamEvent::Audio / UpstreamEvent::Control
//! }
//! upstream.close().await;
//! ```

use std::fmt::Display;
use std::time::Duration;

use futures::stream::BoxStream;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{
    self, Message,
    client::IntoClientRequest,
    http::{HeaderName, HeaderValue, header::AUTHORIZATION},
    protocol::{CloseFrame, frame::coding::CloseCode},
};
use tracing::{debug, error, info, warn};
use url::Url;

use super::config::OPENAI_BETA_HEADER;
use super::handshake;
use super::messages::{ClientEvent, ServerEvent};
use crate::core::realtime::base::{RealtimeConfig, RealtimeError, RealtimeResult, UpstreamEvent};

/// Channel capacity for upstream writes.
const WS_CHANNEL_CAPACITY: usize = 256;

/// How long `close` waits for the writer to flush the close frame.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Work items for the writer task.
#[derive(Debug)]
pub enum UpstreamCommand {
    /// Serialize and send a control event
    Event(ClientEvent),
    /// Send a normal close frame and stop
    Close,
}

// =============================================================================
// OpenAI Realtime Client
// =============================================================================

/// Connected upstream session, after a successful handshake.
pub struct OpenAIRealtime {
    session_id: String,
    sender: UpstreamSender,
    receiver: UpstreamReceiver,
    closer: UpstreamCloser,
}

impl OpenAIRealtime {
    /// Open the WebSocket and run the session handshake.
    ///
    /// A rejected upgrade maps to `UpstreamConnect` with the HTTP status; an
    /// upgrade that outlasts `session_created_timeout` maps to
    /// `HandshakeTimeout`.
    pub async fn connect(config: &RealtimeConfig) -> RealtimeResult<Self> {
        let url = build_ws_url(&config.url, &config.model)?;
        let mut request =
            url.as_str()
                .into_client_request()
                .map_err(|e| RealtimeError::UpstreamConnect {
                    status: None,
                    message: e.to_string(),
                })?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|_| {
            RealtimeError::UpstreamConnect {
                status: None,
                message: "API key contains invalid header characters".to_string(),
            }
        })?;
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static(OPENAI_BETA_HEADER),
        );

        debug!(model = %config.model, "Connecting to upstream realtime endpoint");

        // The upgrade shares the session.created deadline; a peer that
        // accepts TCP but never answers must not stall the session.
        let (ws_stream, _response) = match tokio::time::timeout(
            config.session_created_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
        {
            Ok(result) => result.map_err(map_connect_error)?,
            Err(_) => {
                return Err(RealtimeError::HandshakeTimeout(format!(
                    "WebSocket upgrade not completed within {}ms",
                    config.session_created_timeout.as_millis()
                )));
            }
        };

        info!(model = %config.model, "Connected to OpenAI Realtime API");

        Self::establish(ws_stream, config).await
    }

    /// Run the handshake over an already-open transport and start the writer.
    pub async fn establish<S>(ws_stream: S, config: &RealtimeConfig) -> RealtimeResult<Self>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message>
            + Unpin
            + Send
            + 'static,
        <S as Sink<Message>>::Error: Display + Send,
    {
        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let session_id = handshake::perform(&mut ws_sink, &mut ws_stream, config).await?;

        let (tx, rx) = mpsc::channel::<UpstreamCommand>(WS_CHANNEL_CAPACITY);
        let writer = tokio::spawn(run_writer(ws_sink, rx));

        Ok(Self {
            session_id,
            sender: UpstreamSender { tx: tx.clone() },
            receiver: UpstreamReceiver {
                stream: ws_stream.boxed(),
            },
            closer: UpstreamCloser { tx, writer },
        })
    }

    /// Upstream session ID from `session.created`.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append raw PCM16 to the upstream input buffer.
    pub async fn send_audio(&self, data: &[u8]) -> RealtimeResult<()> {
        self.sender.send_audio(data).await
    }

    /// Send a control event.
    pub async fn send_control(&self, event: ClientEvent) -> RealtimeResult<()> {
        self.sender.send_control(event).await
    }

    /// Next audio frame or control event, `None` once upstream closed.
    pub async fn receive(&mut self) -> Option<RealtimeResult<UpstreamEvent>> {
        self.receiver.receive().await
    }

    /// Close the connection with a normal close frame.
    pub async fn close(self) {
        self.closer.close().await;
    }

    /// Split into independently owned halves for the two relay pumps.
    pub fn into_parts(self) -> (UpstreamSender, UpstreamReceiver, UpstreamCloser) {
        (self.sender, self.receiver, self.closer)
    }
}

// =============================================================================
// Split halves
// =============================================================================

/// Cloneable write handle.
#[derive(Clone, Debug)]
pub struct UpstreamSender {
    tx: mpsc::Sender<UpstreamCommand>,
}

impl UpstreamSender {
    /// Build a sender over a bare channel, for driving components without a
    /// live connection.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<UpstreamCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Append raw PCM16 to the upstream input buffer.
    pub async fn send_audio(&self, data: &[u8]) -> RealtimeResult<()> {
        self.send_control(ClientEvent::audio_append(data)).await
    }

    /// Send a control event.
    pub async fn send_control(&self, event: ClientEvent) -> RealtimeResult<()> {
        self.tx
            .send(UpstreamCommand::Event(event))
            .await
            .map_err(|_| RealtimeError::ConnectionClosed)
    }
}

/// Read half. Binary frames become audio, text frames become decoded events.
pub struct UpstreamReceiver {
    stream: BoxStream<'static, Result<Message, tungstenite::Error>>,
}

impl UpstreamReceiver {
    /// Wrap an arbitrary frame stream.
    pub fn from_stream<St>(stream: St) -> Self
    where
        St: Stream<Item = Result<Message, tungstenite::Error>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Next audio frame or control event, `None` once upstream closed.
    ///
    /// An undecodable text frame yields `MalformedControlEvent`, which the
    /// caller may skip; a transport error yields `WebSocketError`.
    pub async fn receive(&mut self) -> Option<RealtimeResult<UpstreamEvent>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(decode_control(&text).map(UpstreamEvent::Control));
                }
                Ok(Message::Binary(data)) => return Some(Ok(UpstreamEvent::Audio(data))),
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "Upstream WebSocket closed by server");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(RealtimeError::WebSocketError(e.to_string()))),
            }
        }
    }
}

/// Owns the writer task; consumed by `close`.
pub struct UpstreamCloser {
    tx: mpsc::Sender<UpstreamCommand>,
    writer: JoinHandle<()>,
}

impl UpstreamCloser {
    /// Queue a close frame and wait, bounded, for the writer to finish.
    pub async fn close(self) {
        let Self { tx, mut writer } = self;
        if tx.send(UpstreamCommand::Close).await.is_err() {
            debug!("Upstream writer already stopped");
        }
        drop(tx);

        match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await {
            Ok(Ok(())) => debug!("Upstream writer finished"),
            Ok(Err(e)) => warn!("Upstream writer task failed: {}", e),
            Err(_) => {
                warn!("Upstream writer did not finish in time, aborting");
                writer.abort();
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Drain commands into the sink until closed or the sink fails.
async fn run_writer<Si>(mut sink: Si, mut rx: mpsc::Receiver<UpstreamCommand>)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    while let Some(command) = rx.recv().await {
        match command {
            UpstreamCommand::Event(event) => {
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Failed to serialize {} event: {}", event.event_type(), e);
                        continue;
                    }
                };

                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    error!("Failed to send upstream message: {}", e);
                    break;
                }
            }
            UpstreamCommand::Close => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "relay session ended".into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    debug!("Failed to send upstream close frame: {}", e);
                }
                break;
            }
        }
    }

    if let Err(e) = sink.close().await {
        debug!("Upstream sink close: {}", e);
    }
    debug!("Upstream writer task ended");
}

/// Decode one text frame into a control event.
pub fn decode_control(text: &str) -> RealtimeResult<ServerEvent> {
    serde_json::from_str::<ServerEvent>(text)
        .map_err(|e| RealtimeError::MalformedControlEvent(e.to_string()))
}

/// Append the model query parameter to the endpoint.
pub fn build_ws_url(base: &str, model: &str) -> RealtimeResult<Url> {
    let mut url = Url::parse(base).map_err(|e| RealtimeError::UpstreamConnect {
        status: None,
        message: format!("invalid upstream URL {base}: {e}"),
    })?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(RealtimeError::UpstreamConnect {
            status: None,
            message: format!("unsupported upstream URL scheme: {}", url.scheme()),
        });
    }

    url.query_pairs_mut().append_pair("model", model);
    Ok(url)
}

fn map_connect_error(err: tungstenite::Error) -> RealtimeError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            RealtimeError::UpstreamConnect {
                status: Some(status.as_u16()),
                message: format!("upgrade rejected with HTTP {status}"),
            }
        }
        other => RealtimeError::UpstreamConnect {
            status: None,
            message: other.to_string(),
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
