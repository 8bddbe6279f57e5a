// dashboard_poller_main.rs
use log::{error, info};
use vehicle_dashboard::config::ClientConfig;
use vehicle_dashboard::monitoring::console::print_view_changes;
use vehicle_dashboard::monitoring::poller::{HttpSnapshotFetcher, Poller};
use vehicle_dashboard::monitoring::view_state::DashboardView;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("[Poller] {}", e);
            std::process::exit(1);
        }
    };

    // a request never outlives its polling period
    let fetcher = match HttpSnapshotFetcher::new(&config.data_url(), config.poll_interval) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("[Poller] Could not build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "[Poller] Polling {} every {} ms",
        config.data_url(),
        config.poll_interval.as_millis()
    );
    let view = DashboardView::new();
    let subscription = Poller::new(fetcher, view.clone(), config.poll_interval).start();

    print_view_changes(view, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    subscription.cancel();
}
