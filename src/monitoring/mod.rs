// monitoring/mod.rs
pub mod console;
pub mod poller;
pub mod severity;
pub mod subscriber;
pub mod view_state;

pub use severity::{classify_condition, road_alerts, RoadAlert, Severity};
pub use subscriber::{subscribe, Subscription};
pub use view_state::{DashboardView, LinkStatus, ViewState};
