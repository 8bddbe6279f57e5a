// src/engine/broadcast_loop.rs
use crate::communication::hub::EventPublisher;
use crate::communication::messages::TelemetryEvent;
use crate::config::ServerConfig;
use crate::shared_data::TelemetrySnapshot;
use crate::simulation_engine::simulation::{simulate_step, SimulationBounds};
use crate::simulation_engine::store::TelemetryStore;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::future::Future;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No timer armed.
    Idle,
    /// Timer armed; one tick per interval.
    Running,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Subscribers reached by the vehicle update, summed over publishers.
    pub recipients: usize,
    /// Publishers removed on this tick because publishing to them failed.
    pub dropped_publishers: Vec<String>,
}

/// Timer-driven simulation and fan-out.
///
/// The loop owns the [`TelemetryStore`] outright and is its only writer. Each
/// tick mutates the store, then hands detached copies to the publishers and to
/// the snapshot watch used by `GET /data`. Because a tick runs to completion
/// before the next one starts, no locking is needed.
pub struct BroadcastLoop {
    store: TelemetryStore,
    bounds: SimulationBounds,
    rng: SmallRng,
    interval: Duration,
    publishers: Vec<Box<dyn EventPublisher>>,
    snapshot_tx: watch::Sender<TelemetrySnapshot>,
    state_tx: watch::Sender<LoopState>,
    tick: u64,
}

impl BroadcastLoop {
    pub fn new(store: TelemetryStore, interval: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        let (snapshot_tx, _) = watch::channel(store.snapshot(0));
        let (state_tx, _) = watch::channel(LoopState::Idle);
        Self {
            store,
            bounds: SimulationBounds::new(interval),
            rng,
            interval,
            publishers: Vec::new(),
            snapshot_tx,
            state_tx,
            tick: 0,
        }
    }

    pub fn from_config(store: TelemetryStore, config: &ServerConfig) -> Self {
        Self::new(store, config.broadcast_interval, config.simulation_seed)
    }

    pub fn with_bounds(mut self, bounds: SimulationBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn add_publisher<P: EventPublisher + 'static>(&mut self, publisher: P) {
        info!("[Broadcast] Publishing to '{}'", publisher.name());
        self.publishers.push(Box::new(publisher));
    }

    /// Latest published snapshot; starts at the seed state (tick 0).
    pub fn snapshots(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn state(&self) -> LoopState {
        *self.state_tx.borrow()
    }

    /// Follows `Idle`/`Running` transitions from outside the loop's task.
    pub fn state_changes(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    /// Runs one simulation step and publishes both collections.
    pub fn tick(&mut self) -> TickReport {
        simulate_step(self.store.vehicles_mut(), &self.bounds, &mut self.rng);
        self.tick += 1;

        let snapshot = self.store.snapshot(self.tick);
        let events = TelemetryEvent::from_snapshot(&snapshot);
        self.snapshot_tx.send_replace(snapshot);

        let mut recipients = 0;
        let mut dropped_publishers = Vec::new();
        let mut index = 0;
        while index < self.publishers.len() {
            let publisher = &mut self.publishers[index];
            let mut failed = false;
            for event in &events {
                match publisher.publish(self.tick, event) {
                    Ok(count) => {
                        if matches!(event, TelemetryEvent::VehicleUpdate(_)) {
                            recipients += count;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "[Broadcast] Publisher '{}' failed on {}, dropping it: {}",
                            publisher.name(),
                            event.name(),
                            e
                        );
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                let removed = self.publishers.remove(index);
                dropped_publishers.push(removed.name().to_string());
            } else {
                index += 1;
            }
        }

        debug!(
            "[Broadcast] Tick {} delivered to {} subscriber(s)",
            self.tick, recipients
        );
        TickReport {
            tick: self.tick,
            recipients,
            dropped_publishers,
        }
    }

    /// Ticks every interval until `shutdown` resolves. The first tick fires one
    /// interval after start.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.state_tx.send_replace(LoopState::Running);
        info!(
            "[Broadcast] Running, interval {} ms",
            self.interval.as_millis()
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                _ = &mut shutdown => break,
            }
        }

        self.state_tx.send_replace(LoopState::Idle);
        info!("[Broadcast] Stopped after {} ticks", self.tick);
    }

    /// Ticks for the lifetime of the process.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending::<()>()).await
    }
}
