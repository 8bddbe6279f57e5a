use crate::communication::messages::TelemetryEvent;
use crate::communication::source::SourceSignal;
use crate::monitoring::severity::{road_alerts, RoadAlert};
use crate::shared_data::{current_timestamp, RoadConditionRecord, TelemetrySnapshot, VehicleRecord};
use log::warn;
use serde::Serialize;
use tokio::sync::watch;

/// Freshness of the view as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkStatus {
    /// No update received yet.
    Connecting,
    /// The last signal from the transport was a connect or an update.
    Live,
    /// The transport dropped or a poll failed; data is the last known value.
    Stale,
}

/// Local copy of the relay's state held by a dashboard client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub vehicles: Vec<VehicleRecord>,
    pub road_conditions: Vec<RoadConditionRecord>,
    pub link: LinkStatus,
    /// Tick of the last applied snapshot, when the transport carries one.
    pub last_tick: Option<u64>,
    /// Local receive time (unix seconds) of the last applied update.
    pub last_update: Option<u64>,
    pub updates_applied: u64,
    pub updates_rejected: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            vehicles: Vec::new(),
            road_conditions: Vec::new(),
            link: LinkStatus::Connecting,
            last_tick: None,
            last_update: None,
            updates_applied: 0,
            updates_rejected: 0,
        }
    }
}

impl ViewState {
    /// Replaces the matching collection wholesale. No merge with the previous value.
    pub fn apply_event(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::VehicleUpdate(vehicles) => self.vehicles = vehicles,
            TelemetryEvent::RoadConditionUpdate(conditions) => self.road_conditions = conditions,
        }
        self.mark_applied();
    }

    /// Polling variant: both collections come from one response.
    pub fn apply_snapshot(&mut self, snapshot: TelemetrySnapshot) {
        self.vehicles = snapshot.vehicles;
        self.road_conditions = snapshot.road_conditions;
        self.last_tick = Some(snapshot.tick);
        self.mark_applied();
    }

    /// A transport signal. Disconnects and bad frames leave the data untouched.
    pub fn apply_signal(&mut self, signal: SourceSignal) {
        match signal {
            SourceSignal::Connected => self.link = LinkStatus::Live,
            SourceSignal::Event(event) => self.apply_event(event),
            SourceSignal::Malformed(reason) => {
                warn!("[Subscriber] Skipping malformed update: {}", reason);
                self.updates_rejected += 1;
            }
            SourceSignal::Disconnected(_) => self.mark_stale(),
        }
    }

    pub fn mark_stale(&mut self) {
        self.link = LinkStatus::Stale;
    }

    pub fn alerts(&self) -> Vec<RoadAlert> {
        road_alerts(&self.road_conditions)
    }

    fn mark_applied(&mut self) {
        self.link = LinkStatus::Live;
        self.last_update = Some(current_timestamp());
        self.updates_applied += 1;
    }
}

/// Shared, observable view-state.
///
/// Writers (a subscription or a poller) mutate through [`DashboardView::update`];
/// the presentation side reads a copy or waits for changes on a watch receiver.
#[derive(Debug, Clone)]
pub struct DashboardView {
    tx: watch::Sender<ViewState>,
}

impl DashboardView {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ViewState::default());
        Self { tx }
    }

    pub fn current(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut ViewState),
    {
        self.tx.send_modify(change);
    }
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}
