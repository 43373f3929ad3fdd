use crate::deck::RandomSource;
use crate::engine::check_depletion;
use crate::incidents::{ignore_damage, redirect_power, repair};
use crate::log::narrate;
use crate::missions::{draw_simulation_mission, offer_construction_mission, on_module_built};
use crate::registry::{add_module, remove_module};
use crate::state::reset_run;
use crate::{
    Command, CommandOutcome, DestinationId, Event, EventEnvelope, GameContent, GameState,
    LogTone, ModuleInstanceId, Phase, RejectReason,
};

fn accepted() -> CommandOutcome {
    CommandOutcome {
        accepted: true,
        created_module: None,
    }
}

fn reject(
    state: &mut GameState,
    content: &GameContent,
    reason: RejectReason,
    message: impl Into<String>,
    events: &mut Vec<EventEnvelope>,
) -> CommandOutcome {
    narrate(state, content, message, LogTone::Warning);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::ActionRejected { reason },
    ));
    CommandOutcome::default()
}

fn module_index(state: &GameState, module_id: &ModuleInstanceId) -> Option<usize> {
    state.modules.iter().position(|module| &module.id == module_id)
}

/// Applies one player action atomically.
///
/// Unknown ids are ignored without a trace. Capacity and precondition
/// violations leave state untouched apart from a warning log entry and an
/// `ActionRejected` event.
pub fn apply_command(
    state: &mut GameState,
    content: &GameContent,
    command: &Command,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) -> CommandOutcome {
    match command {
        Command::SelectDestination { destination_id } => {
            select_destination(state, content, destination_id, rng, events)
        }
        Command::AddModule { module_def_id } => {
            let Some(def) = content.module_def(module_def_id) else {
                return CommandOutcome::default();
            };
            if state.phase != Phase::Construction {
                return reject(
                    state,
                    content,
                    RejectReason::WrongPhase,
                    "The habitat can only be extended during construction.",
                    events,
                );
            }
            match add_module(state, content, def, events) {
                Ok(module_id) => {
                    on_module_built(state, content, &def.id, events);
                    CommandOutcome {
                        accepted: true,
                        created_module: Some(module_id),
                    }
                }
                Err(RejectReason::HabitatFull) => reject(
                    state,
                    content,
                    RejectReason::HabitatFull,
                    "No free habitat slots remain.",
                    events,
                ),
                Err(reason) => reject(
                    state,
                    content,
                    reason,
                    format!("No more {} modules can be installed.", def.name),
                    events,
                ),
            }
        }
        Command::RemoveModule { module_id } => {
            if module_index(state, module_id).is_none() {
                return CommandOutcome::default();
            }
            if state.phase != Phase::Construction {
                return reject(
                    state,
                    content,
                    RejectReason::WrongPhase,
                    "Modules can only be dismantled during construction.",
                    events,
                );
            }
            remove_module(state, content, module_id, events);
            accepted()
        }
        Command::StartSimulation => start_simulation(state, content, rng, events),
        Command::Repair { module_id } => {
            intervene(state, content, module_id, Intervention::Repair, events)
        }
        Command::RedirectPower { module_id } => {
            intervene(state, content, module_id, Intervention::Redirect, events)
        }
        Command::IgnoreDamage { module_id } => {
            intervene(state, content, module_id, Intervention::Ignore, events)
        }
        Command::ResetGame => {
            reset_run(state, content, None);
            events.push(crate::emit(
                &mut state.counters,
                state.meta.cycle,
                Event::DestinationSelected {
                    destination_id: None,
                },
            ));
            accepted()
        }
    }
}

fn select_destination(
    state: &mut GameState,
    content: &GameContent,
    destination_id: &DestinationId,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) -> CommandOutcome {
    let Some(dest) = content.destination(destination_id) else {
        return CommandOutcome::default();
    };
    if !dest.unlocked {
        let message = dest
            .locked_message
            .clone()
            .unwrap_or_else(|| format!("{} is not yet reachable.", dest.name));
        return reject(state, content, RejectReason::DestinationLocked, message, events);
    }

    reset_run(state, content, Some(dest.id.clone()));
    let message = if dest.environment_summary.is_empty() {
        format!("Systems calibrated for {}.", dest.name)
    } else {
        format!(
            "Systems calibrated for {}. {}",
            dest.name, dest.environment_summary
        )
    };
    narrate(state, content, message, LogTone::Info);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::DestinationSelected {
            destination_id: Some(dest.id.clone()),
        },
    ));
    offer_construction_mission(state, content, rng, events);
    accepted()
}

fn start_simulation(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl RandomSource,
    events: &mut Vec<EventEnvelope>,
) -> CommandOutcome {
    if state.phase != Phase::Construction {
        return reject(
            state,
            content,
            RejectReason::WrongPhase,
            "The simulation is already under way.",
            events,
        );
    }
    let required = content.constants.min_modules_to_launch;
    if state.modules.len() < required {
        return reject(
            state,
            content,
            RejectReason::NotEnoughModules,
            format!("At least {required} modules are required to launch."),
            events,
        );
    }

    state.phase = Phase::Simulation;
    state.meta.cycle = 0;
    state.victory = false;
    state.pending_hazard = None;
    state.incidents.clear();
    state.auto_repair_ticker = 0;

    narrate(
        state,
        content,
        "Habitat sealed. Orbital simulation engaged.",
        LogTone::Info,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::SimulationStarted,
    ));
    draw_simulation_mission(state, content, rng, events);
    accepted()
}

#[derive(Clone, Copy)]
enum Intervention {
    Repair,
    Redirect,
    Ignore,
}

fn intervene(
    state: &mut GameState,
    content: &GameContent,
    module_id: &ModuleInstanceId,
    kind: Intervention,
    events: &mut Vec<EventEnvelope>,
) -> CommandOutcome {
    let Some(index) = module_index(state, module_id) else {
        return CommandOutcome::default();
    };
    if state.phase != Phase::Simulation {
        return reject(
            state,
            content,
            RejectReason::WrongPhase,
            "Interventions are only possible while the simulation runs.",
            events,
        );
    }

    let result = match kind {
        Intervention::Repair => repair(state, content, index, events),
        Intervention::Redirect => redirect_power(state, content, index, events),
        Intervention::Ignore => ignore_damage(state, content, index, events),
    };
    match result {
        Ok(()) => {
            check_depletion(state, content, events);
            accepted()
        }
        Err(RejectReason::InsufficientResources) => {
            let message = match kind {
                Intervention::Redirect => "No surplus energy available to redirect.",
                Intervention::Repair | Intervention::Ignore => {
                    "Insufficient resources to repair the module."
                }
            };
            reject(
                state,
                content,
                RejectReason::InsufficientResources,
                message,
                events,
            )
        }
        Err(reason) => reject(state, content, reason, "That module is not damaged.", events),
    }
}
