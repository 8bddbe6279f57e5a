// monitoring/console.rs
use crate::monitoring::view_state::{DashboardView, LinkStatus, ViewState};
use crate::shared_data::{BrakeStatus, VehicleRecord};
use std::future::Future;

/// Plain-text rendering of the dashboard: vehicle table, then road alerts.
pub fn render_view(state: &ViewState) -> String {
    let mut out = String::new();
    let link = match state.link {
        LinkStatus::Connecting => "connecting",
        LinkStatus::Live => "live",
        LinkStatus::Stale => "stale (showing last known data)",
    };
    out.push_str(&format!("Link: {}", link));
    if let Some(tick) = state.last_tick {
        out.push_str(&format!(" | tick {}", tick));
    }
    out.push_str(&format!(
        " | {} applied, {} rejected\n",
        state.updates_applied, state.updates_rejected
    ));

    out.push_str("Vehicles:\n");
    if state.vehicles.is_empty() {
        out.push_str("  (none)\n");
    }
    for vehicle in &state.vehicles {
        out.push_str(&format!("  {}\n", vehicle_line(vehicle)));
    }

    out.push_str("Road Conditions:\n");
    let alerts = state.alerts();
    if alerts.is_empty() {
        out.push_str("  (none)\n");
    }
    for alert in alerts {
        out.push_str(&format!(
            "  [{}] {}: {}\n",
            alert.severity, alert.kind, alert.condition
        ));
    }
    out
}

fn vehicle_line(vehicle: &VehicleRecord) -> String {
    let brake = match vehicle.brake_status {
        BrakeStatus::Applied => "Applied",
        BrakeStatus::NotApplied => "Not Applied",
    };
    let mut line = format!(
        "{} | {:>6.2} km/h | {:>5.2} m/s² | {:?} | brake {}",
        vehicle.id, vehicle.speed, vehicle.acceleration, vehicle.state, brake
    );
    if let Some(position) = vehicle.position {
        line.push_str(&format!(
            " | ({:.5}, {:.5})",
            position.latitude(),
            position.longitude()
        ));
    }
    line
}

/// Prints the view every time it changes until `shutdown` resolves.
pub async fn print_view_changes<F>(view: DashboardView, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut rx = view.watch();
    tokio::pin!(shutdown);
    loop {
        println!("{}", render_view(&rx.borrow_and_update()));
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }
}
