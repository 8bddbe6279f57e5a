use crate::error::{DashboardError, Result};
use crate::monitoring::subscriber::Subscription;
use crate::monitoring::view_state::DashboardView;
use crate::shared_data::TelemetrySnapshot;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Where the polling client gets its snapshot from.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> Result<TelemetrySnapshot>;
}

/// `GET /data` against the relay server.
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotFetcher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self) -> Result<TelemetrySnapshot> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(DashboardError::Status(response.status().as_u16()));
        }
        Ok(response.json::<TelemetrySnapshot>().await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    /// The request failed; the view kept its previous data.
    Failed,
}

/// Polling variant of the dashboard client.
pub struct Poller<F: SnapshotFetcher> {
    fetcher: F,
    view: DashboardView,
    period: Duration,
}

impl<F: SnapshotFetcher> Poller<F> {
    pub fn new(fetcher: F, view: DashboardView, period: Duration) -> Self {
        Self {
            fetcher,
            view,
            period,
        }
    }

    /// One request. A failure is logged and marks the view stale; it never propagates.
    pub async fn poll_once(&self) -> PollOutcome {
        match self.fetcher.fetch().await {
            Ok(snapshot) => {
                debug!("[Poller] Applied snapshot for tick {}", snapshot.tick);
                self.view.update(|state| state.apply_snapshot(snapshot));
                PollOutcome::Applied
            }
            Err(e) => {
                warn!("[Poller] Poll failed, keeping last known state: {}", e);
                self.view.update(|state| state.mark_stale());
                PollOutcome::Failed
            }
        }
    }

    /// Polls every period until the returned subscription is cancelled or dropped.
    ///
    /// Requests do not overlap: a slow response delays the next poll instead of
    /// stacking up behind it.
    pub fn start(self) -> Subscription {
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        });
        Subscription::from_tasks("poller", vec![task])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::view_state::LinkStatus;
    use crate::simulation_engine::store::TelemetryStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out scripted responses in order; `None` stands for a network failure.
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Option<TelemetrySnapshot>>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Option<TelemetrySnapshot>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl SnapshotFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<TelemetrySnapshot> {
            let next = self.responses.lock().unwrap().pop_front().flatten();
            next.ok_or_else(|| {
                DashboardError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))
            })
        }
    }

    #[tokio::test]
    async fn failed_poll_keeps_previous_view() {
        let snapshot = TelemetryStore::seeded().snapshot(5);
        let view = DashboardView::new();
        let poller = Poller::new(
            ScriptedFetcher::new(vec![Some(snapshot.clone()), None]),
            view.clone(),
            Duration::from_millis(1000),
        );

        assert_eq!(poller.poll_once().await, PollOutcome::Applied);
        let before = view.current();

        assert_eq!(poller.poll_once().await, PollOutcome::Failed);
        let after = view.current();

        assert_eq!(after.vehicles, before.vehicles);
        assert_eq!(after.road_conditions, before.road_conditions);
        assert_eq!(after.last_tick, Some(5));
        assert_eq!(after.link, LinkStatus::Stale);
    }

    #[tokio::test]
    async fn next_successful_poll_recovers() {
        let store = TelemetryStore::seeded();
        let view = DashboardView::new();
        let poller = Poller::new(
            ScriptedFetcher::new(vec![None, Some(store.snapshot(9))]),
            view.clone(),
            Duration::from_millis(1000),
        );

        poller.poll_once().await;
        assert!(view.current().vehicles.is_empty());
        poller.poll_once().await;
        assert_eq!(view.current().link, LinkStatus::Live);
        assert_eq!(view.current().last_tick, Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn started_poller_polls_on_its_interval() {
        let store = TelemetryStore::seeded();
        let view = DashboardView::new();
        let poller = Poller::new(
            ScriptedFetcher::new(vec![
                Some(store.snapshot(1)),
                Some(store.snapshot(2)),
                Some(store.snapshot(3)),
            ]),
            view.clone(),
            Duration::from_millis(1000),
        );
        let subscription = poller.start();

        // first tick fires immediately, then one per second
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(view.current().last_tick, Some(3));
        assert_eq!(view.current().updates_applied, 3);

        subscription.cancel();
    }

    #[tokio::test]
    async fn http_fetcher_failure_is_an_error_not_a_panic() {
        let fetcher =
            HttpSnapshotFetcher::new("http://127.0.0.1:1/data", Duration::from_millis(500))
                .unwrap();
        assert!(fetcher.fetch().await.is_err());
    }
}
