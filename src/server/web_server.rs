//! # Dashboard relay server
//!
//! Pushes `vehicleUpdate` and `roadConditionUpdate` to every connected
//! WebSocket client and serves the latest snapshot over plain HTTP for the
//! polling dashboard.
//!
//! ## Endpoints
//! - `/ws`: push channel, one JSON event per text frame
//! - `/data`: latest snapshot as JSON
//! - `/health`: liveness and current tick

use crate::communication::hub::{BroadcastHub, HubItem};
use crate::communication::messages::TelemetryEvent;
use crate::config::ServerConfig;
use crate::error::{ConfigError, Result};
use crate::shared_data::TelemetrySnapshot;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{sink::SinkExt, stream::StreamExt, Sink};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared state behind every handler.
pub struct AppState {
    pub hub: BroadcastHub,
    /// Latest snapshot published by the broadcast loop.
    pub snapshots: watch::Receiver<TelemetrySnapshot>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        hub: BroadcastHub,
        snapshots: watch::Receiver<TelemetrySnapshot>,
        config: ServerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            hub,
            snapshots,
            config,
        })
    }

    pub fn latest_snapshot(&self) -> TelemetrySnapshot {
        self.snapshots.borrow().clone()
    }
}

/// Router with CORS restricted to the configured dashboard origin.
pub fn build_router(state: Arc<AppState>) -> Result<Router> {
    let allow_origin = if state.config.allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        let origin = state
            .config
            .allowed_origin
            .parse::<HeaderValue>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "ALLOWED_ORIGIN",
                value: state.config.allowed_origin.clone(),
                reason: e.to_string(),
            })?;
        // a list only echoes matching origins; other origins get no CORS headers
        AllowOrigin::list([origin])
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET]);

    Ok(Router::new()
        .route("/ws", get(ws_handler))
        .route("/data", get(data_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state))
}

/// Serves on an already-bound listener until `shutdown` resolves.
pub async fn start_server<F>(state: Arc<AppState>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state)?;
    let addr = listener.local_addr()?;
    info!("[Server] Listening on {}", addr);
    info!("[Server]   WebSocket: ws://{}/ws", addr);
    info!("[Server]   Data:      http://{}/data", addr);
    info!("[Server]   Health:    http://{}/health", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("[Server] Stopped");
    Ok(())
}

async fn data_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.latest_snapshot())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "tick": state.snapshots.borrow().tick,
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    // subscribe before reading the snapshot so no tick falls between the two
    let rx = state.hub.subscribe();
    info!(
        "[Server] Subscriber connected ({} active)",
        state.hub.subscriber_count()
    );

    // ticks up to this one were already delivered through the snapshot
    let mut delivered_through = None;
    if state.config.snapshot_on_connect {
        let snapshot = state.latest_snapshot();
        for event in TelemetryEvent::from_snapshot(&snapshot) {
            if !send_event(&mut sender, &event).await {
                debug!("[Server] Subscriber left before the initial snapshot");
                return;
            }
        }
        delivered_through = Some(snapshot.tick);
    }

    let mut send_task = tokio::spawn(forward_hub_events(sender, rx, delivered_through));

    // inbound frames carry nothing; read only to notice the close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }
    info!("[Server] Subscriber disconnected");
}

/// Pushes hub items to one socket until the hub closes or the socket fails.
/// Items stamped at or before `delivered_through` are skipped.
async fn forward_hub_events<S>(
    mut sender: S,
    mut rx: broadcast::Receiver<Arc<HubItem>>,
    delivered_through: Option<u64>,
) where
    S: Sink<Message> + Unpin,
{
    loop {
        match rx.recv().await {
            Ok(item) => {
                if delivered_through.is_some_and(|tick| item.tick <= tick) {
                    continue;
                }
                if !send_event(&mut sender, &item.event).await {
                    debug!("[Server] Send failed, subscriber gone");
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("[Server] Slow subscriber skipped {} event(s)", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Returns `false` once the socket can no longer be written.
async fn send_event<S>(sender: &mut S, event: &TelemetryEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("[Server] Could not encode {}: {}", event.name(), e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}
