//! Mission tracker: at most one mission, with a per-goal state machine.
//!
//! Terminal missions stay in `state.mission` until something replaces them.

use crate::deck::{pick_weighted, RandomSource};
use crate::log::narrate;
use crate::{
    Event, EventEnvelope, GameContent, GameState, LogTone, MissionDef, MissionGoal,
    MissionState, MissionStatus, MissionTrigger, ModuleDefId, ModuleInstanceId, ModuleStatus,
    ResourceDelta, ResourceKey,
};

fn assign(
    state: &mut GameState,
    def: &MissionDef,
    target_module: Option<ModuleInstanceId>,
    events: &mut Vec<EventEnvelope>,
) {
    state.mission = Some(MissionState {
        mission_id: def.id.clone(),
        trigger: def.trigger,
        status: MissionStatus::Active,
        progress: 0,
        cycles_remaining: def.time_limit,
        target_module,
    });
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::MissionAssigned {
            mission_id: def.id.clone(),
        },
    ));
}

fn active_mission(state: &GameState) -> Option<&MissionState> {
    state
        .mission
        .as_ref()
        .filter(|mission| mission.status == MissionStatus::Active)
}

fn draw_by_trigger(
    state: &mut GameState,
    content: &GameContent,
    trigger: MissionTrigger,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) {
    let candidates: Vec<&MissionDef> = content
        .missions
        .iter()
        .filter(|mission| mission.trigger == trigger)
        .collect();
    let Some(def) = pick_weighted(&candidates, |m| m.weight.unwrap_or(1.0), rng) else {
        return;
    };
    assign(state, def, None, events);
    narrate(
        state,
        content,
        format!("Mission assigned: {}.", def.label),
        LogTone::Info,
    );
}

/// Offers a construction mission if nothing is active.
pub(crate) fn offer_construction_mission(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) {
    if active_mission(state).is_some() {
        return;
    }
    draw_by_trigger(state, content, MissionTrigger::Construction, rng, events);
}

/// Draws a simulation mission unless one with that trigger is already held.
pub(crate) fn draw_simulation_mission(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) {
    if state
        .mission
        .as_ref()
        .is_some_and(|mission| mission.trigger == MissionTrigger::DuringSimulation)
    {
        return;
    }
    draw_by_trigger(state, content, MissionTrigger::DuringSimulation, rng, events);
}

/// Replaces whatever mission is held with the damage-response mission.
pub(crate) fn schedule_repair_mission(
    state: &mut GameState,
    content: &GameContent,
    module_id: &ModuleInstanceId,
    module_name: &str,
    events: &mut Vec<EventEnvelope>,
) {
    let Some(def) = content.missions.iter().find(|mission| {
        mission.trigger == MissionTrigger::OnDamage && mission.goal == MissionGoal::RepairTarget
    }) else {
        return;
    };
    assign(state, def, Some(module_id.clone()), events);
    narrate(
        state,
        content,
        format!("Priority issued: {}.", def.label),
        LogTone::Warning,
    );
    narrate(
        state,
        content,
        format!("Failure detected in {module_name}."),
        LogTone::Warning,
    );
}

fn reward_of(content: &GameContent, mission: &MissionState) -> (ResourceDelta, String) {
    content.mission(&mission.mission_id).map_or_else(
        || (ResourceDelta::default(), mission.mission_id.0.clone()),
        |def| (def.reward, def.label.clone()),
    )
}

fn complete(state: &mut GameState, content: &GameContent, events: &mut Vec<EventEnvelope>) {
    let Some(mission) = state.mission.as_mut() else {
        return;
    };
    mission.status = MissionStatus::Completed;
    let mission = mission.clone();
    state.counters.missions_completed += 1;
    let (reward, label) = reward_of(content, &mission);
    state.resources.apply_delta(&reward);
    narrate(
        state,
        content,
        format!("Mission completed: {label}."),
        LogTone::Positive,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::MissionCompleted {
            mission_id: mission.mission_id,
        },
    ));
}

fn fail(state: &mut GameState, content: &GameContent, events: &mut Vec<EventEnvelope>) {
    let Some(mission) = state.mission.as_mut() else {
        return;
    };
    mission.status = MissionStatus::Failed;
    let mission = mission.clone();
    state.counters.missions_failed += 1;
    let (_, label) = reward_of(content, &mission);
    state.resources.adjust(
        ResourceKey::Morale,
        -content.constants.mission_failure_morale_penalty,
    );
    narrate(
        state,
        content,
        format!("Mission failed: {label}."),
        LogTone::Critical,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::MissionFailed {
            mission_id: mission.mission_id,
        },
    ));
}

fn goal_of<'a>(content: &'a GameContent, mission: &MissionState) -> Option<&'a MissionGoal> {
    content.mission(&mission.mission_id).map(|def| &def.goal)
}

/// Called after a module is built; completes a matching build mission.
pub(crate) fn on_module_built(
    state: &mut GameState,
    content: &GameContent,
    def_id: &ModuleDefId,
    events: &mut Vec<EventEnvelope>,
) {
    let Some(mission) = active_mission(state) else {
        return;
    };
    if matches!(goal_of(content, mission), Some(MissionGoal::BuildModule { module }) if module == def_id)
    {
        complete(state, content, events);
    }
}

/// Called after a manual repair; completes the repair mission on that module.
pub(crate) fn on_module_repaired(
    state: &mut GameState,
    content: &GameContent,
    module_id: &ModuleInstanceId,
    events: &mut Vec<EventEnvelope>,
) {
    let Some(mission) = active_mission(state) else {
        return;
    };
    if matches!(goal_of(content, mission), Some(MissionGoal::RepairTarget))
        && mission.target_module.as_ref() == Some(module_id)
    {
        complete(state, content, events);
    }
}

enum Step {
    Complete,
    Fail,
    Continue,
}

/// Per-cycle evaluation against the post-cycle module set and resources.
pub(crate) fn advance_mission(
    state: &mut GameState,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) {
    let Some(mission) = active_mission(state) else {
        return;
    };
    let Some(goal) = goal_of(content, mission).cloned() else {
        return;
    };

    let step = match goal {
        MissionGoal::RepairTarget => {
            let target_status = mission.target_module.as_ref().and_then(|target| {
                state
                    .modules
                    .iter()
                    .find(|module| &module.id == target)
                    .map(|module| module.status)
            });
            match (target_status, mission.cycles_remaining) {
                (None | Some(ModuleStatus::Operational), _) => Step::Complete,
                (_, Some(0)) => Step::Fail,
                _ => Step::Continue,
            }
        }
        MissionGoal::SustainResource {
            resource,
            threshold,
            cycles,
        } => {
            let held = state.resources.get(resource) >= threshold;
            let progress = if held { mission.progress + 1 } else { 0 };
            if let Some(mission) = state.mission.as_mut() {
                mission.progress = progress;
            }
            if progress >= cycles {
                Step::Complete
            } else {
                Step::Continue
            }
        }
        MissionGoal::BuildModule { .. } => Step::Continue,
    };

    match step {
        Step::Complete => complete(state, content, events),
        Step::Fail => fail(state, content, events),
        Step::Continue => {
            if matches!(goal, MissionGoal::RepairTarget) {
                if let Some(remaining) = state
                    .mission
                    .as_mut()
                    .and_then(|mission| mission.cycles_remaining.as_mut())
                {
                    *remaining = remaining.saturating_sub(1);
                }
            }
        }
    }
}
