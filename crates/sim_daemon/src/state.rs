use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use sim_control::{Session, TickScheduler};
use sim_core::{EventEnvelope, MetricsSnapshot};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Bounded so a long-lived daemon does not grow without limit.
pub const MAX_METRICS_HISTORY: usize = 1000;

/// Tick gate backed by a `watch` channel. The tick loop holds the receiver
/// and parks while the gate is closed.
#[derive(Debug)]
pub struct WatchScheduler {
    gate: watch::Sender<bool>,
}

impl WatchScheduler {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (gate, rx) = watch::channel(false);
        (Self { gate }, rx)
    }
}

impl TickScheduler for WatchScheduler {
    fn start(&mut self) {
        self.gate.send_replace(true);
    }

    fn stop(&mut self) {
        self.gate.send_replace(false);
    }

    fn is_running(&self) -> bool {
        *self.gate.borrow()
    }
}

pub struct SimState {
    pub session: Session<ChaCha8Rng, WatchScheduler>,
    pub metrics_history: VecDeque<MetricsSnapshot>,
}

impl SimState {
    pub fn new(session: Session<ChaCha8Rng, WatchScheduler>) -> Self {
        Self {
            session,
            metrics_history: VecDeque::new(),
        }
    }

    pub fn push_metrics(&mut self, snapshot: MetricsSnapshot) {
        if self.metrics_history.len() >= MAX_METRICS_HISTORY {
            self.metrics_history.pop_front();
        }
        self.metrics_history.push_back(snapshot);
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub cycle_interval_ms: u64,
}
