use crate::communication::messages::TelemetryEvent;
use crate::communication::source::{EventSource, SourceSignal};
use crate::error::Result;
use crate::global_variables::HUB_CAPACITY;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Server-side sink for tick events.
pub trait EventPublisher: Send {
    fn name(&self) -> &str;

    /// Hands the event produced by `tick` to every current subscriber and
    /// returns how many there were.
    fn publish(&mut self, tick: u64, event: &TelemetryEvent) -> Result<usize>;
}

/// An event as carried by the hub, stamped with the tick that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct HubItem {
    pub tick: u64,
    pub event: TelemetryEvent,
}

/// In-process fan-out over a tokio broadcast channel.
///
/// Every WebSocket connection holds one receiver. Dropping a receiver removes
/// that subscriber from the recipient set; nothing is queued for it.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<Arc<HubItem>>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HubItem>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl EventPublisher for BroadcastHub {
    fn name(&self) -> &str {
        "hub"
    }

    fn publish(&mut self, tick: u64, event: &TelemetryEvent) -> Result<usize> {
        let item = HubItem {
            tick,
            event: event.clone(),
        };
        // send only fails when nobody is listening
        Ok(self.tx.send(Arc::new(item)).unwrap_or(0))
    }
}

/// Subscriber side of the hub, for embedding the dashboard in the relay process.
pub struct HubSource {
    receiver: broadcast::Receiver<Arc<HubItem>>,
}

impl HubSource {
    /// Subscribes right away, so events published after this call are delivered.
    pub fn new(hub: &BroadcastHub) -> Self {
        Self {
            receiver: hub.subscribe(),
        }
    }
}

impl EventSource for HubSource {
    fn start(self, signals: mpsc::Sender<SourceSignal>) -> JoinHandle<()> {
        let mut receiver = self.receiver;
        tokio::spawn(async move {
            if signals.send(SourceSignal::Connected).await.is_err() {
                return;
            }
            loop {
                let signal = match receiver.recv().await {
                    Ok(item) => SourceSignal::Event(item.event.clone()),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("[Subscriber] Hub subscriber lagged, {} events skipped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        let _ = signals
                            .send(SourceSignal::Disconnected("hub closed".to_string()))
                            .await;
                        break;
                    }
                };
                if signals.send(signal).await.is_err() {
                    debug!("[Subscriber] Hub source stopped, subscription dropped");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::RoadConditionRecord;

    fn road_event() -> TelemetryEvent {
        TelemetryEvent::RoadConditionUpdate(vec![RoadConditionRecord::new("Surface", "Wet")])
    }

    #[test]
    fn publishing_without_subscribers_reaches_nobody() {
        let mut hub = BroadcastHub::default();
        assert_eq!(hub.publish(1, &road_event()).unwrap(), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let mut hub = BroadcastHub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.publish(1, &road_event()).unwrap(), 2);
        assert_eq!(a.recv().await.unwrap().event, road_event());
        assert_eq!(b.recv().await.unwrap().tick, 1);
    }

    #[tokio::test]
    async fn dropped_subscriber_leaves_the_recipient_set() {
        let mut hub = BroadcastHub::default();
        let a = hub.subscribe();
        let _b = hub.subscribe();
        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.publish(1, &road_event()).unwrap(), 1);
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_replay() {
        let mut hub = BroadcastHub::default();
        let _early = hub.subscribe();
        hub.publish(1, &road_event()).unwrap();
        let mut late = hub.subscribe();
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn hub_source_forwards_connected_then_events() {
        let mut hub = BroadcastHub::default();
        let (tx, mut rx) = mpsc::channel(8);
        let handle = HubSource::new(&hub).start(tx);

        assert_eq!(rx.recv().await, Some(SourceSignal::Connected));
        hub.publish(1, &road_event()).unwrap();
        assert_eq!(rx.recv().await, Some(SourceSignal::Event(road_event())));

        drop(rx);
        hub.publish(1, &road_event()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn hub_source_reports_disconnect_when_hub_goes_away() {
        let hub = BroadcastHub::default();
        let (tx, mut rx) = mpsc::channel(8);
        let handle = HubSource::new(&hub).start(tx);
        drop(hub);

        assert_eq!(rx.recv().await, Some(SourceSignal::Connected));
        assert!(matches!(rx.recv().await, Some(SourceSignal::Disconnected(_))));
        handle.await.unwrap();
    }
}
