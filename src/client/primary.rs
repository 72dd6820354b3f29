//! Primary channel transport (WebSocket).
//!
//! [`PrimaryChannel`] owns one socket task. The task reports what happens
//! on the wire through an event sink and writes whatever the session
//! queues. It knows nothing about authentication or state; the session
//! drives the lifecycle from the events.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::adapters::websocket::{ClientMessage, ServerMessage};

/// What the socket task reports.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryEvent {
    /// The socket is open; nothing has been sent yet.
    Opened,
    Message(ServerMessage),
    /// The socket is gone. Sent at most once and always last.
    Closed { reason: String },
}

/// Handle to a live socket task. Dropping it aborts the task.
#[derive(Debug)]
pub struct PrimaryChannel {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    task: JoinHandle<()>,
}

impl PrimaryChannel {
    /// Connects to `url` in the background and reports through `sink`.
    pub fn open<F>(url: String, sink: F) -> Self
    where
        F: Fn(PrimaryEvent) + Send + Sync + 'static,
    {
        let (outbound, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let reason = run(&url, rx, &sink).await;
            sink(PrimaryEvent::Closed { reason });
        });
        Self { outbound, task }
    }

    /// Queues a frame. Returns false once the socket task has ended.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.outbound.send(message).is_ok()
    }
}

impl Drop for PrimaryChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F>(url: &str, mut outbound: mpsc::UnboundedReceiver<ClientMessage>, sink: &F) -> String
where
    F: Fn(PrimaryEvent),
{
    let socket = match connect_async(url).await {
        Ok((socket, _response)) => socket,
        Err(e) => return format!("connect failed: {}", e),
    };
    sink(PrimaryEvent::Opened);

    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                let Some(message) = queued else {
                    let _ = write.send(Message::Close(None)).await;
                    return "closed by client".to_string();
                };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode primary channel frame");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    return format!("send failed: {}", e);
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => sink(PrimaryEvent::Message(message)),
                    Err(e) => tracing::warn!(error = %e, "Dropping malformed primary channel frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) => format!("closed by server: {}", frame.reason),
                        None => "closed by server".to_string(),
                    };
                }
                // Protocol pings are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => return format!("receive failed: {}", e),
                None => return "connection ended".to_string(),
            },
        }
    }
}
