//! OpenAI Realtime WebSocket mock
//!
//! Plays the upstream side of the handshake, records every client event it
//! receives, and answers selected events with scripted replies. Tests can
//! also push frames to the relay at any time through [`MockRealtimeServer::inject`].

use super::MockStats;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Canned upstream behavior
#[derive(Clone, Debug, Default)]
pub struct MockScript {
    /// Never send `session.created`
    pub skip_session_created: bool,
    /// Never answer `session.update`
    pub skip_session_updated: bool,
    /// Close the connection right after `session.updated`
    pub close_after_handshake: bool,
    /// Sent after each `input_audio_buffer.commit`
    pub on_commit: Vec<Value>,
    /// Sent after each `response.create`
    pub on_response_create: Vec<Value>,
    /// Sent after each `response.cancel`
    pub on_response_cancel: Vec<Value>,
}

pub struct MockRealtimeServer {
    pub url: String,
    pub stats: Arc<MockStats>,
    received: Arc<Mutex<Vec<Value>>>,
    inject_tx: mpsc::UnboundedSender<Message>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockRealtimeServer {
    /// Bind an ephemeral port and serve connections with `script`
    pub async fn start(script: MockScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let stats = Arc::new(MockStats::default());
        let received = Arc::new(Mutex::new(Vec::new()));
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        let inject_rx = Arc::new(Mutex::new(inject_rx));

        let handle = {
            let stats = stats.clone();
            let received = received.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let script = script.clone();
                    let stats = stats.clone();
                    let received = received.clone();
                    let inject_rx = inject_rx.clone();
                    tokio::spawn(async move {
                        let _ =
                            handle_connection(stream, script, stats, received, inject_rx).await;
                    });
                }
            })
        };

        Self {
            url: format!("ws://{addr}/v1/realtime"),
            stats,
            received,
            inject_tx,
            handle,
        }
    }

    /// Client events received so far, in order
    pub async fn received(&self) -> Vec<Value> {
        self.received.lock().await.clone()
    }

    /// `type` of every received event, in order
    pub async fn received_types(&self) -> Vec<String> {
        self.received()
            .await
            .iter()
            .map(|e| e["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn count(&self, event_type: &str) -> usize {
        self.received_types()
            .await
            .iter()
            .filter(|t| *t == event_type)
            .count()
    }

    /// Wait until at least `n` events of `event_type` arrived
    pub async fn wait_for(&self, event_type: &str, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.count(event_type).await >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Wait until the relay closed its upstream connection
    pub async fn wait_for_close(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.stats.closes() > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Send a JSON event to the relay on the live connection
    pub fn inject(&self, event: Value) {
        let _ = self.inject_tx.send(Message::Text(event.to_string().into()));
    }
}

impl Drop for MockRealtimeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn session_created(id: &str) -> Value {
    json!({
        "type": "session.created",
        "event_id": "evt_created",
        "session": {
            "id": id,
            "object": "realtime.session",
            "model": "gpt-4o-mini-realtime-preview",
            "modalities": ["text", "audio"],
            "voice": "alloy",
            "input_audio_format": "pcm16",
            "output_audio_format": "pcm16"
        }
    })
}

pub fn audio_delta(pcm: &[u8]) -> Value {
    use base64::prelude::*;
    json!({
        "type": "response.audio.delta",
        "response_id": "resp_1",
        "item_id": "item_1",
        "output_index": 0,
        "content_index": 0,
        "delta": BASE64_STANDARD.encode(pcm)
    })
}

pub fn response_created() -> Value {
    json!({"type": "response.created", "response": {"id": "resp_1", "status": "in_progress"}})
}

pub fn response_done() -> Value {
    json!({"type": "response.done", "response": {"id": "resp_1", "status": "completed", "output": []}})
}

pub fn response_cancelled() -> Value {
    json!({"type": "response.cancelled", "response_id": "resp_1"})
}

pub fn commit_empty_error() -> Value {
    json!({
        "type": "error",
        "error": {
            "type": "invalid_request_error",
            "code": "input_audio_buffer_commit_empty",
            "message": "Error committing input audio buffer: buffer too small."
        }
    })
}

async fn handle_connection(
    stream: TcpStream,
    script: MockScript,
    stats: Arc<MockStats>,
    received: Arc<Mutex<Vec<Value>>>,
    inject_rx: Arc<Mutex<mpsc::UnboundedReceiver<Message>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    stats.record_connection();

    if !script.skip_session_created {
        write
            .send(Message::Text(session_created("sess_mock").to_string().into()))
            .await?;
        stats.record_sent();
    }

    let mut inject_rx = inject_rx.lock().await;

    loop {
        tokio::select! {
            msg = read.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) => {
                        stats.record_close();
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => break,
                };

                let event: Value = serde_json::from_str(&text)?;
                stats.record_received();
                let event_type = event["type"].as_str().unwrap_or_default().to_string();
                received.lock().await.push(event);

                let replies: Vec<Value> = match event_type.as_str() {
                    "session.update" if !script.skip_session_updated => {
                        vec![json!({"type": "session.updated", "session": {"id": "sess_mock"}})]
                    }
                    "input_audio_buffer.commit" => script.on_commit.clone(),
                    "response.create" => script.on_response_create.clone(),
                    "response.cancel" => script.on_response_cancel.clone(),
                    _ => Vec::new(),
                };
                for reply in replies {
                    write.send(Message::Text(reply.to_string().into())).await?;
                    stats.record_sent();
                }

                if event_type == "session.update" && script.close_after_handshake {
                    write.send(Message::Close(None)).await?;
                    break;
                }
            }
            Some(msg) = inject_rx.recv() => {
                write.send(msg).await?;
                stats.record_sent();
            }
        }
    }

    Ok(())
}
