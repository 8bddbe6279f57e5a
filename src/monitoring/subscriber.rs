use crate::communication::source::{EventSource, SourceSignal};
use crate::monitoring::view_state::DashboardView;
use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SIGNAL_BUFFER: usize = 32;

/// A live binding between a transport and a [`DashboardView`].
///
/// Teardown runs exactly once: either through [`Subscription::cancel`] or when
/// the value is dropped, including during unwinding.
pub struct Subscription {
    name: String,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn from_tasks(name: &str, tasks: Vec<JoinHandle<()>>) -> Self {
        Self {
            name: name.to_string(),
            tasks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `false` once every task behind the subscription has stopped.
    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    pub fn cancel(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("[Subscriber] Subscription '{}' cancelled", self.name);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Opens `source` and applies every signal it produces to `view`.
///
/// Each event replaces its collection in the view; a disconnect freezes the
/// view at its last value and marks it stale until the source reconnects.
pub fn subscribe<S: EventSource>(name: &str, source: S, view: DashboardView) -> Subscription {
    let (tx, mut rx) = mpsc::channel::<SourceSignal>(SIGNAL_BUFFER);
    let source_task = source.start(tx);
    let label = name.to_string();
    let apply_task = tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            debug!("[Subscriber] {} <- {:?}", label, signal_kind(&signal));
            view.update(|state| state.apply_signal(signal));
        }
        debug!("[Subscriber] {} source finished", label);
    });
    Subscription::from_tasks(name, vec![source_task, apply_task])
}

fn signal_kind(signal: &SourceSignal) -> &'static str {
    match signal {
        SourceSignal::Connected => "connected",
        SourceSignal::Event(event) => event.name(),
        SourceSignal::Malformed(_) => "malformed",
        SourceSignal::Disconnected(_) => "disconnected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::hub::{BroadcastHub, EventPublisher, HubSource};
    use crate::communication::messages::TelemetryEvent;
    use crate::monitoring::view_state::LinkStatus;
    use crate::simulation_engine::store::TelemetryStore;

    /// Replays a fixed script of signals, then keeps the channel open until cancelled.
    struct ScriptedSource(Vec<SourceSignal>);

    impl EventSource for ScriptedSource {
        fn start(self, signals: mpsc::Sender<SourceSignal>) -> JoinHandle<()> {
            tokio::spawn(async move {
                for signal in self.0 {
                    if signals.send(signal).await.is_err() {
                        return;
                    }
                }
                signals.closed().await;
            })
        }
    }

    async fn wait_for<F>(view: &DashboardView, ready: F)
    where
        F: Fn(&crate::monitoring::view_state::ViewState) -> bool,
    {
        let mut rx = view.watch();
        while !ready(&rx.borrow_and_update()) {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn events_replace_view_and_disconnect_freezes_it() {
        let snapshot = TelemetryStore::seeded().snapshot(1);
        let view = DashboardView::new();
        let _subscription = subscribe(
            "scripted",
            ScriptedSource(vec![
                SourceSignal::Connected,
                SourceSignal::Event(TelemetryEvent::VehicleUpdate(snapshot.vehicles.clone())),
                SourceSignal::Disconnected("closed".to_string()),
            ]),
            view.clone(),
        );

        wait_for(&view, |state| state.link == LinkStatus::Stale).await;
        let state = view.current();
        assert_eq!(state.vehicles, snapshot.vehicles);
        assert_eq!(state.updates_applied, 1);
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_updating() {
        let mut hub = BroadcastHub::default();
        let view = DashboardView::new();
        let subscription = subscribe("hub", HubSource::new(&hub), view.clone());

        wait_for(&view, |state| state.link == LinkStatus::Live).await;
        let first = TelemetryStore::seeded().snapshot(1);
        hub.publish(1, &TelemetryEvent::VehicleUpdate(first.vehicles.clone()))
            .unwrap();
        wait_for(&view, |state| state.updates_applied == 1).await;

        assert!(subscription.is_active());
        subscription.cancel();
        tokio::task::yield_now().await;

        hub.publish(2, &TelemetryEvent::VehicleUpdate(Vec::new())).unwrap();
        tokio::task::yield_now().await;
        assert_eq!(view.current().vehicles, first.vehicles);
    }

    #[tokio::test]
    async fn dropping_the_subscription_releases_the_source() {
        let hub = BroadcastHub::default();
        let view = DashboardView::new();
        {
            let _subscription = subscribe("hub", HubSource::new(&hub), view.clone());
            wait_for(&view, |state| state.link == LinkStatus::Live).await;
            assert_eq!(hub.subscriber_count(), 1);
        }
        // aborted tasks release their receiver once the runtime polls them
        for _ in 0..10 {
            if hub.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(hub.subscriber_count(), 0);
    }
}
