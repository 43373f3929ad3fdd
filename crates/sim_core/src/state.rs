use std::collections::VecDeque;

use uuid::Uuid;

use crate::profile::resolve_planet_profile;
use crate::synergy::derive_state;
use crate::{Counters, DestinationId, GameContent, GameState, MetaState, Phase};

pub const SCHEMA_VERSION: u32 = 1;

/// Construction-phase state with no destination and the initial resources.
pub fn new_game_state(content: &GameContent, seed: u64, session_id: Uuid) -> GameState {
    GameState {
        meta: MetaState {
            cycle: 0,
            seed,
            session_id,
            schema_version: SCHEMA_VERSION,
            content_version: content.content_version.clone(),
        },
        phase: Phase::Construction,
        victory: false,
        game_over: false,
        destination: None,
        profile: resolve_planet_profile(None, &content.constants),
        resources: content.constants.initial_resources,
        modules: Vec::new(),
        incidents: Vec::new(),
        pending_hazard: None,
        mission: None,
        auto_repair_ticker: 0,
        event_log: VecDeque::with_capacity(content.constants.event_log_capacity),
        derived: derive_state(&[], content),
        counters: Counters::default(),
    }
}

/// Clears the run back to construction at `destination`, keeping session
/// identity and id counters so ids stay unique for the whole session.
/// Mission tallies restart with the run.
pub(crate) fn reset_run(state: &mut GameState, content: &GameContent, destination: Option<DestinationId>) {
    let profile = resolve_planet_profile(
        destination.as_ref().and_then(|id| content.destination(id)),
        &content.constants,
    );
    state.meta.cycle = 0;
    state.phase = Phase::Construction;
    state.victory = false;
    state.game_over = false;
    state.resources = profile.resource_baseline;
    state.profile = profile;
    state.destination = destination;
    state.modules.clear();
    state.incidents.clear();
    state.pending_hazard = None;
    state.mission = None;
    state.auto_repair_ticker = 0;
    state.event_log.clear();
    state.derived = derive_state(&[], content);
    state.counters.missions_completed = 0;
    state.counters.missions_failed = 0;
}

impl GameState {
    /// True once victory or game-over has been reached.
    pub fn is_finished(&self) -> bool {
        self.victory || self.game_over
    }

    /// The scheduler should be ticking exactly when this holds.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Simulation && !self.is_finished()
    }
}
