// amqp_monitor_main.rs
use log::{error, info};
use vehicle_dashboard::communication::amqp::AmqpSource;
use vehicle_dashboard::config::ClientConfig;
use vehicle_dashboard::monitoring::console::print_view_changes;
use vehicle_dashboard::monitoring::subscriber::subscribe;
use vehicle_dashboard::monitoring::view_state::DashboardView;

#[tokio::main]
async fn main() {
    env_logger::init();

    let amqp_url = match ClientConfig::from_env() {
        Ok(ClientConfig {
            amqp_url: Some(url),
            ..
        }) => url,
        Ok(_) => {
            error!("[AMQP] TELEMETRY_AMQP_URL is not set");
            std::process::exit(1);
        }
        Err(e) => {
            error!("[AMQP] {}", e);
            std::process::exit(1);
        }
    };

    info!("[AMQP] Monitoring telemetry from the broker");
    let view = DashboardView::new();
    let subscription = subscribe("amqp", AmqpSource::new(&amqp_url), view.clone());

    print_view_changes(view, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    subscription.cancel();
}
