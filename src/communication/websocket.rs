//! WebSocket subscriber with automatic reconnection.
//!
//! Each connection attempt that ends (refused, closed by the server, or a
//! broken stream) is reported as [`SourceSignal::Disconnected`]; the source then
//! waits out an exponential backoff and dials again. Reconnecting re-subscribes
//! to both event channels because the server pushes them on every socket.

use crate::communication::messages::TelemetryEvent;
use crate::communication::source::{EventSource, SourceSignal};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Backoff between reconnection attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Wait after the first failure (default: 1s)
    pub initial_backoff: Duration,
    /// Upper bound on the wait (default: 30s)
    pub max_backoff: Duration,
    /// Growth factor per consecutive failure (default: 2.0)
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_backoff)
    }
}

pub struct WebSocketSource {
    url: String,
    policy: ReconnectPolicy,
}

impl WebSocketSource {
    pub fn new(url: &str) -> Self {
        Self::with_policy(url, ReconnectPolicy::default())
    }

    pub fn with_policy(url: &str, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.to_string(),
            policy,
        }
    }
}

impl EventSource for WebSocketSource {
    fn start(self, signals: mpsc::Sender<SourceSignal>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = self.policy.initial_backoff;
            loop {
                match connect_async(self.url.as_str()).await {
                    Ok((stream, _)) => {
                        info!("[Subscriber] Connected to {}", self.url);
                        backoff = self.policy.initial_backoff;
                        if signals.send(SourceSignal::Connected).await.is_err() {
                            return;
                        }
                        let Some(reason) = pump_frames(stream, &signals).await else {
                            return;
                        };
                        warn!("[Subscriber] Disconnected from {}: {}", self.url, reason);
                        if signals.send(SourceSignal::Disconnected(reason)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("[Subscriber] Connection to {} failed: {}", self.url, e);
                        if signals
                            .send(SourceSignal::Disconnected(e.to_string()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }

                debug!("[Subscriber] Reconnecting in {:?}", backoff);
                tokio::select! {
                    _ = sleep(backoff) => {}
                    _ = signals.closed() => return,
                }
                backoff = self.policy.next_backoff(backoff);
            }
        })
    }
}

/// Forwards decoded frames until the connection ends (returns the reason) or the
/// subscriber goes away (returns `None`).
async fn pump_frames(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    signals: &mpsc::Sender<SourceSignal>,
) -> Option<String> {
    let (mut write, mut read) = stream.split();
    loop {
        let frame = tokio::select! {
            frame = read.next() => frame,
            _ = signals.closed() => {
                let _ = write.send(Message::Close(None)).await;
                return None;
            }
        };

        let signal = match frame {
            Some(Ok(Message::Text(text))) => match TelemetryEvent::from_json(&text) {
                Ok(event) => SourceSignal::Event(event),
                Err(e) => SourceSignal::Malformed(e.to_string()),
            },
            Some(Ok(Message::Close(frame))) => {
                return Some(
                    frame
                        .map(|f| f.reason.to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "close frame received".to_string()),
                );
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Some(e.to_string()),
            None => return Some("stream ended".to_string()),
        };

        if signals.send(signal).await.is_err() {
            let _ = write.send(Message::Close(None)).await;
            return None;
        }
    }
}
