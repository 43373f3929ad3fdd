//! `sim_core` — deterministic habitat survival cycle.
//!
//! No IO, no network. All randomness via the passed-in `RandomSource`.

mod commands;
mod deck;
mod engine;
mod id;
mod incidents;
mod log;
pub mod metrics;
mod missions;
mod profile;
mod registry;
mod resources;
mod snapshot;
mod state;
mod synergy;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use commands::apply_command;
pub use deck::{draw_hazard, hazard_weight, pick_weighted, RandomSource};
pub use engine::{cycle_decay, event_chance, tick};
pub use id::generate_session_id;
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use profile::resolve_planet_profile;
pub use registry::instance_count;
pub use resources::{RESOURCE_MAX, RESOURCE_MIN};
pub use snapshot::{
    snapshot, DestinationView, MissionView, ModuleView, PendingHazardView, RoundedResources,
    Snapshot,
};
pub use state::{new_game_state, SCHEMA_VERSION};
pub use synergy::{derive_state, evaluate_synergies, module_resource_effects};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, cycle: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, cycle, event }
}

#[cfg(test)]
mod tests;
