// main.rs
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use vehicle_dashboard::communication::amqp::AmqpPublisher;
use vehicle_dashboard::communication::hub::BroadcastHub;
use vehicle_dashboard::config::ServerConfig;
use vehicle_dashboard::engine::broadcast_loop::BroadcastLoop;
use vehicle_dashboard::error::Result;
use vehicle_dashboard::server::web_server::{start_server, AppState};
use vehicle_dashboard::simulation_engine::store::TelemetryStore;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("[Server] Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ServerConfig::from_env()?;
    info!(
        "[Server] Starting on port {}, allowed origin {}",
        config.port, config.allowed_origin
    );

    let hub = BroadcastHub::default();
    let mut broadcast = BroadcastLoop::from_config(TelemetryStore::seeded(), &config);
    broadcast.add_publisher(hub.clone());

    if let Some(url) = config.amqp_url.clone() {
        match tokio::task::spawn_blocking(move || AmqpPublisher::connect(&url)).await? {
            Ok(publisher) => broadcast.add_publisher(publisher),
            Err(e) => warn!("[AMQP] Broker unavailable, continuing without it: {}", e),
        }
    }

    let state = AppState::new(hub, broadcast.snapshots(), config.clone());
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(start_server(state, listener, async move {
        let _ = stop_rx.await;
    }));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("[Server] Could not listen for Ctrl+C: {}", e);
        }
        info!("[Server] Shutdown requested");
    };

    let interrupted = tokio::select! {
        _ = broadcast.run_until(shutdown) => true,
        result = &mut server => {
            result??;
            false
        }
    };
    if interrupted {
        let _ = stop_tx.send(());
        server.await??;
    }
    Ok(())
}
