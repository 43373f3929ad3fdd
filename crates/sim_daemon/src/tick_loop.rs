use crate::state::{EventTx, SharedSim};
use sim_core::{Event, EventEnvelope};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Drives the session at a fixed interval while the scheduler gate is open.
///
/// Returns when the gate's sender is dropped, which happens only when the
/// session itself goes away.
pub async fn run_tick_loop(
    sim: SharedSim,
    event_tx: EventTx,
    mut gate: watch::Receiver<bool>,
    cycle_interval: Duration,
) {
    loop {
        if gate.wait_for(|running| *running).await.is_err() {
            break;
        }

        let mut interval = tokio::time::interval(cycle_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // discard the immediate first tick

        loop {
            interval.tick().await;
            let events = {
                let mut guard = sim.lock();
                // The gate may have closed while we slept.
                if !guard.session.is_ticking() {
                    break;
                }
                let events = guard.session.step();
                let snapshot =
                    sim_core::compute_metrics(guard.session.state(), guard.session.content());
                guard.push_metrics(snapshot);
                events
            };
            log_transitions(&events);
            let _ = event_tx.send(events);
        }
    }
}

pub fn log_transitions(events: &[EventEnvelope]) {
    for envelope in events {
        match &envelope.event {
            Event::SimulationStarted => tracing::info!("simulation started"),
            Event::Victory => tracing::info!(cycle = envelope.cycle, "habitat survived"),
            Event::GameOver => tracing::warn!(cycle = envelope.cycle, "habitat lost"),
            Event::ModuleLost { module_id } => {
                tracing::info!(cycle = envelope.cycle, %module_id, "module lost");
            }
            _ => {}
        }
    }
}
