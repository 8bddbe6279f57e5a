// dashboard_subscriber_main.rs
use log::{error, info};
use vehicle_dashboard::communication::websocket::WebSocketSource;
use vehicle_dashboard::config::ClientConfig;
use vehicle_dashboard::monitoring::console::print_view_changes;
use vehicle_dashboard::monitoring::subscriber::subscribe;
use vehicle_dashboard::monitoring::view_state::DashboardView;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("[Subscriber] {}", e);
            std::process::exit(1);
        }
    };

    let url = config.websocket_url();
    info!("[Subscriber] Subscribing to {}", url);
    let view = DashboardView::new();
    let subscription = subscribe("websocket", WebSocketSource::new(&url), view.clone());

    print_view_changes(view, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    subscription.cancel();
}
