use crate::deck::{draw_hazard, RandomSource};
use crate::incidents::{apply_hazard, auto_repair, resolve_incidents};
use crate::log::narrate;
use crate::missions::advance_mission;
use crate::synergy::refresh_derived;
use crate::{
    Event, EventEnvelope, GameContent, GameState, HazardId, LogTone, ModuleStatus,
    PendingHazard, Phase, ResourceDelta, ResourceKey, SynergySummary,
};

/// Advance the simulation by one cycle.
///
/// Order of operations:
/// 1. Count down a forewarned hazard, or release it if its lead time is spent.
/// 2. Otherwise roll for a new hazard; with early warning it is forecast
///    instead of applied.
/// 3. Apply the selected hazard (targeting, damage, repair mission).
/// 4. Resolve open incidents: ongoing drains and module losses.
/// 5. Auto-repair maintenance.
/// 6. Re-derive synergies on the post-incident module set.
/// 7. Compute decay.
/// 8. Write `modifiers - decay + impact + drain` in one clamped step, then
///    check for depletion.
/// 9. Advance orbital time and check for victory.
/// 10. Advance the active mission.
///
/// Outside the simulation phase, or once the run is over, this is a no-op.
/// Returns all events produced this cycle.
pub fn tick(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl RandomSource,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    if !state.is_running() {
        return events;
    }

    // Effects that shape this cycle come from the module set as it stood
    // when the cycle began.
    let synergy = state.derived.synergy.clone();
    let lost_before = state
        .modules
        .iter()
        .filter(|module| module.status == ModuleStatus::Lost)
        .count();

    let impact = match select_hazard(state, content, &synergy, rng, &mut events)
        .and_then(|id| content.hazard(&id))
    {
        Some(hazard) => apply_hazard(
            state,
            content,
            hazard,
            synergy.extra_damage,
            rng,
            &mut events,
        ),
        None => ResourceDelta::default(),
    };

    let drain = resolve_incidents(state, content, &mut events);
    auto_repair(state, content, synergy.auto_repair_interval, &mut events);
    refresh_derived(state, content);

    let decay = cycle_decay(state, content, lost_before);
    let total = state
        .derived
        .resource_modifiers
        .minus(&decay)
        .plus(&impact)
        .plus(&drain);
    state.resources.apply_delta(&total);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::ResourcesChanged {
            delta: total,
            resources: state.resources,
        },
    ));
    check_depletion(state, content, &mut events);

    advance_time(state, content, &mut events);
    advance_mission(state, content, &mut events);
    check_depletion(state, content, &mut events);

    events
}

/// Steps 1 and 2: returns the hazard to apply this cycle, if any.
fn select_hazard(
    state: &mut GameState,
    content: &GameContent,
    synergy: &SynergySummary,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) -> Option<HazardId> {
    let mut selected = None;
    let mut forecast: Option<(HazardId, u32, String)> = None;

    match state.pending_hazard.take() {
        Some(mut pending) if pending.lead_time > 0 => {
            pending.lead_time -= 1;
            let label = hazard_label(content, &pending.hazard_id);
            forecast = Some((
                pending.hazard_id.clone(),
                pending.lead_time,
                format!("Upcoming event detected: {label}."),
            ));
            state.pending_hazard = Some(pending);
        }
        Some(pending) => selected = Some(pending.hazard_id),
        None => {}
    }

    if selected.is_none() && rng.next_unit() < event_chance(state, content, synergy) {
        if let Some(hazard) = draw_hazard(content, &state.profile, rng) {
            if synergy.early_warning > 0 && state.pending_hazard.is_none() {
                state.pending_hazard = Some(PendingHazard {
                    hazard_id: hazard.id.clone(),
                    lead_time: synergy.early_warning,
                });
                forecast = Some((
                    hazard.id.clone(),
                    synergy.early_warning,
                    format!(
                        "Forecast: {} in {} cycle(s).",
                        hazard.label, synergy.early_warning
                    ),
                ));
            } else {
                selected = Some(hazard.id.clone());
            }
        }
    }

    if let Some((hazard_id, lead_time, message)) = forecast {
        narrate(state, content, message, LogTone::Info);
        events.push(crate::emit(
            &mut state.counters,
            state.meta.cycle,
            Event::HazardForecast {
                hazard_id,
                lead_time,
            },
        ));
    }
    selected
}

fn hazard_label(content: &GameContent, id: &HazardId) -> String {
    content
        .hazard(id)
        .map_or_else(|| id.0.clone(), |hazard| hazard.label.clone())
}

/// Probability that a hazard is drawn this cycle, clamped to
/// `[0, max_event_chance]`. Every module's risk factor counts, lost ones too.
pub fn event_chance(state: &GameState, content: &GameContent, synergy: &SynergySummary) -> f32 {
    let constants = &content.constants;
    let module_risk: f32 = state
        .modules
        .iter()
        .filter_map(|module| content.module_def(&module.def_id))
        .map(|def| def.risk_factor * constants.module_risk_weight)
        .sum();
    let chance = constants.base_event_chance
        + state.profile.event_chance_modifier
        + synergy.event_risk_modifier
        + module_risk
        + state.profile.incident_risk_modifier;
    chance.clamp(0.0, constants.max_event_chance)
}

/// Per-resource decay for this cycle. `lost_before` counts modules that were
/// already lost when the cycle began.
pub fn cycle_decay(state: &GameState, content: &GameContent, lost_before: usize) -> ResourceDelta {
    let constants = &content.constants;
    let multiplier = state.derived.synergy.decay_multiplier * state.profile.decay_multiplier;
    let penalty = constants.lost_module_decay_penalty * lost_before as f32;
    let mut decay = ResourceDelta::default();
    for key in ResourceKey::ALL {
        let base = constants.base_decay.get(key) + state.profile.decay_offset.get(key);
        decay = decay.plus(&ResourceDelta::single(key, base * multiplier + penalty));
    }
    decay
}

fn advance_time(state: &mut GameState, content: &GameContent, events: &mut Vec<EventEnvelope>) {
    state.meta.cycle += 1;
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::CycleCompleted {
            cycle: state.meta.cycle,
        },
    ));
    if state.is_finished() || state.meta.cycle < content.constants.survival_target_cycles {
        return;
    }
    state.victory = true;
    state.phase = Phase::Victory;
    narrate(
        state,
        content,
        "Equilibrium holds. The habitat has survived.",
        LogTone::Positive,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::Victory,
    ));
}

/// Ends the run the moment any pool is empty. Idempotent, and a run that
/// has already been won stays won.
pub(crate) fn check_depletion(
    state: &mut GameState,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) {
    if state.is_finished() || !state.resources.any_depleted() {
        return;
    }
    state.game_over = true;
    state.phase = Phase::GameOver;
    narrate(
        state,
        content,
        "Critical systems depleted. The habitat can no longer sustain its crew.",
        LogTone::Critical,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::GameOver,
    ));
}
