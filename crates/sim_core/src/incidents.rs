//! Damage lifecycle: targeting, escalation, loss, and the manual and
//! automatic interventions that interrupt it.
//!
//! Status moves `operational -> damaged -> lost`; only repair brings a
//! damaged module back. The incident's `cycles_remaining` is the countdown
//! of record and the module's `damage_countdown` mirrors it.

use crate::deck::RandomSource;
use crate::log::narrate;
use crate::missions::{on_module_repaired, schedule_repair_mission};
use crate::synergy::refresh_derived;
use crate::{
    Event, EventEnvelope, GameContent, GameState, HazardDef, Incident, IncidentId, LogTone,
    ModuleDefId, ModuleInstanceId, ModuleStatus, RejectReason, ResourceDelta,
};

pub(crate) fn module_name(content: &GameContent, def_id: &ModuleDefId) -> String {
    content
        .module_def(def_id)
        .map_or_else(|| def_id.0.clone(), |def| def.name.clone())
}

/// First non-lost module (in build order) the hazard prefers, otherwise a
/// uniformly random non-lost module.
pub(crate) fn select_target(
    state: &GameState,
    hazard: &HazardDef,
    rng: &mut impl RandomSource,
) -> Option<usize> {
    let candidates: Vec<usize> = state
        .modules
        .iter()
        .enumerate()
        .filter(|(_, module)| module.status != ModuleStatus::Lost)
        .map(|(index, _)| index)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    candidates
        .iter()
        .copied()
        .find(|&index| hazard.preferred_targets.contains(&state.modules[index].def_id))
        .or_else(|| Some(candidates[rng.pick_index(candidates.len())]))
}

/// Countdown for a fresh incident, never below one cycle.
pub(crate) fn escalation_countdown(
    hazard: &HazardDef,
    content: &GameContent,
    extra_damage: u32,
    severity_modifier: i32,
) -> u32 {
    let base = hazard
        .escalate_after
        .unwrap_or(content.constants.default_escalate_after);
    let raw = i64::from(base) - i64::from(extra_damage) - i64::from(severity_modifier);
    u32::try_from(raw.max(1)).unwrap_or(1)
}

/// Strikes the habitat with `hazard`. Returns the immediate resource impact.
pub(crate) fn apply_hazard(
    state: &mut GameState,
    content: &GameContent,
    hazard: &HazardDef,
    extra_damage: u32,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) -> ResourceDelta {
    let target = select_target(state, hazard, rng);
    let cycle = state.meta.cycle;
    events.push(crate::emit(
        &mut state.counters,
        cycle,
        Event::HazardStruck {
            hazard_id: hazard.id.clone(),
            target: target.map(|index| state.modules[index].id.clone()),
        },
    ));

    let Some(index) = target else {
        narrate(state, content, hazard.message.clone(), LogTone::Warning);
        return hazard.impact;
    };

    let mut countdown = escalation_countdown(
        hazard,
        content,
        extra_damage,
        state.profile.incident_severity_modifier,
    );
    let module_id = state.modules[index].id.clone();
    let def_id = state.modules[index].def_id.clone();

    // A re-strike replaces the open incident but never extends the module's life.
    if let Some(existing) = state
        .incidents
        .iter()
        .position(|incident| incident.module_id == module_id)
    {
        countdown = countdown.min(state.incidents[existing].cycles_remaining);
        state.incidents.remove(existing);
    }

    let module = &mut state.modules[index];
    module.status = ModuleStatus::Damaged;
    module.damage_countdown = Some(countdown);
    module.stabilized_buffer = 0;

    let incident_id = IncidentId(format!("incident_{:04}", state.counters.next_incident_id));
    state.counters.next_incident_id += 1;
    state.incidents.push(Incident {
        id: incident_id,
        hazard_id: hazard.id.clone(),
        module_def_id: def_id.clone(),
        module_id: module_id.clone(),
        cycles_remaining: countdown,
        ongoing_effect: hazard.ongoing_effect,
        stabilized_buffer: 0,
    });
    events.push(crate::emit(
        &mut state.counters,
        cycle,
        Event::ModuleDamaged {
            module_id: module_id.clone(),
            hazard_id: hazard.id.clone(),
            countdown,
        },
    ));

    let name = module_name(content, &def_id);
    schedule_repair_mission(state, content, &module_id, &name, events);
    narrate(state, content, hazard.message.clone(), LogTone::Critical);
    hazard.impact
}

/// Advances every open incident one cycle. Returns the summed ongoing drain.
pub(crate) fn resolve_incidents(
    state: &mut GameState,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) -> ResourceDelta {
    let mut drain = ResourceDelta::default();
    let mut remaining = Vec::with_capacity(state.incidents.len());
    let mut lost = Vec::new();

    for mut incident in std::mem::take(&mut state.incidents) {
        let Some(module) = state
            .modules
            .iter_mut()
            .find(|module| module.id == incident.module_id)
        else {
            continue;
        };
        if module.status == ModuleStatus::Lost {
            continue;
        }

        if let Some(effect) = incident.ongoing_effect {
            drain = drain.plus(&effect.delta());
        }

        let incident_buffer = incident.stabilized_buffer.saturating_sub(1);
        let held = incident_buffer > 0 || module.stabilized_buffer > 0;
        let next = if held {
            incident.cycles_remaining
        } else {
            incident.cycles_remaining.saturating_sub(1)
        };

        if next == 0 {
            module.status = ModuleStatus::Lost;
            module.damage_countdown = None;
            module.stabilized_buffer = 0;
            lost.push((module.id.clone(), module.def_id.clone()));
            continue;
        }

        module.damage_countdown = Some(next);
        module.stabilized_buffer = module.stabilized_buffer.saturating_sub(1);
        incident.cycles_remaining = next;
        incident.stabilized_buffer = incident_buffer;
        remaining.push(incident);
    }
    state.incidents = remaining;

    for (module_id, def_id) in lost {
        narrate(
            state,
            content,
            format!(
                "Module {} has been lost. The void reclaims the slot.",
                module_name(content, &def_id)
            ),
            LogTone::Critical,
        );
        events.push(crate::emit(
            &mut state.counters,
            state.meta.cycle,
            Event::ModuleLost { module_id },
        ));
    }
    drain
}

fn restore(state: &mut GameState, index: usize) -> ModuleInstanceId {
    let module = &mut state.modules[index];
    module.status = ModuleStatus::Operational;
    module.damage_countdown = None;
    module.stabilized_buffer = 0;
    let id = module.id.clone();
    state.incidents.retain(|incident| incident.module_id != id);
    id
}

fn require_damaged(state: &GameState, index: usize) -> Result<(), RejectReason> {
    if state.modules[index].status == ModuleStatus::Damaged {
        Ok(())
    } else {
        Err(RejectReason::NotDamaged)
    }
}

/// Manual repair: pays the repair cost and restores the module.
pub(crate) fn repair(
    state: &mut GameState,
    content: &GameContent,
    index: usize,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    require_damaged(state, index)?;
    let cost = content.constants.repair_cost;
    if !state.resources.can_afford(&cost) {
        return Err(RejectReason::InsufficientResources);
    }
    state.resources.apply_delta(&cost.as_cost());
    let module_id = restore(state, index);
    refresh_derived(state, content);

    let name = module_name(content, &state.modules[index].def_id);
    narrate(
        state,
        content,
        format!("Module {name} manually stabilized."),
        LogTone::Positive,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::ModuleRepaired {
            module_id: module_id.clone(),
            automatic: false,
        },
    ));
    on_module_repaired(state, content, &module_id, events);
    Ok(())
}

/// Pays the redirect cost to hold the module's countdown for a cycle.
pub(crate) fn redirect_power(
    state: &mut GameState,
    content: &GameContent,
    index: usize,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    require_damaged(state, index)?;
    let cost = content.constants.redirect_cost;
    if !state.resources.can_afford(&cost) {
        return Err(RejectReason::InsufficientResources);
    }
    state.resources.apply_delta(&cost.as_cost());

    let module = &mut state.modules[index];
    module.stabilized_buffer += 1;
    let module_id = module.id.clone();
    let def_id = module.def_id.clone();
    for incident in state
        .incidents
        .iter_mut()
        .filter(|incident| incident.module_id == module_id)
    {
        incident.stabilized_buffer += 1;
    }

    narrate(
        state,
        content,
        format!("Power rerouted to module {}.", module_name(content, &def_id)),
        LogTone::Info,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::PowerRedirected { module_id },
    ));
    Ok(())
}

/// Shortens the countdown by one cycle, never below one.
pub(crate) fn ignore_damage(
    state: &mut GameState,
    content: &GameContent,
    index: usize,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    require_damaged(state, index)?;
    let module_id = state.modules[index].id.clone();
    let def_id = state.modules[index].def_id.clone();

    let mut countdown = state.modules[index]
        .damage_countdown
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1);
    for incident in state
        .incidents
        .iter_mut()
        .filter(|incident| incident.module_id == module_id)
    {
        incident.cycles_remaining = incident.cycles_remaining.saturating_sub(1).max(1);
        countdown = incident.cycles_remaining;
    }
    state.modules[index].damage_countdown = Some(countdown);

    narrate(
        state,
        content,
        format!(
            "Ignoring {}'s failure. Risk is increasing.",
            module_name(content, &def_id)
        ),
        LogTone::Critical,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::DamageIgnored {
            module_id,
            countdown,
        },
    ));
    Ok(())
}

/// Ticks the maintenance counter and, once it reaches `interval`, restores
/// the first damaged module for free. The counter resets only on a repair.
pub(crate) fn auto_repair(
    state: &mut GameState,
    content: &GameContent,
    interval: Option<u32>,
    events: &mut Vec<EventEnvelope>,
) {
    state.auto_repair_ticker += 1;
    let Some(interval) = interval else {
        return;
    };
    if state.auto_repair_ticker < interval {
        return;
    }
    let Some(index) = state
        .modules
        .iter()
        .position(|module| module.status == ModuleStatus::Damaged)
    else {
        return;
    };

    let module_id = restore(state, index);
    state.auto_repair_ticker = 0;
    let name = module_name(content, &state.modules[index].def_id);
    narrate(
        state,
        content,
        format!("Maintenance drone stabilizes {name}."),
        LogTone::Positive,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::ModuleRepaired {
            module_id,
            automatic: true,
        },
    ));
}
