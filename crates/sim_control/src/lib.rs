mod session;

pub use session::{ManualScheduler, Session, TickScheduler};

use serde::{Deserialize, Serialize};
use sim_core::{
    instance_count, Command, DestinationId, GameContent, GameState, ModuleDefId, ModuleStatus,
    Phase, ResourceDelta, Resources,
};

pub trait CommandSource {
    fn generate_commands(&mut self, state: &GameState, content: &GameContent) -> Vec<Command>;
}

/// What the autopilot builds, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotPlan {
    pub destination: DestinationId,
    /// Build order. Repeated ids request more than one instance.
    pub build: Vec<ModuleDefId>,
    /// Interventions are skipped when they would leave energy or morale below this.
    #[serde(default = "default_reserve")]
    pub reserve: f32,
}

fn default_reserve() -> f32 {
    15.0
}

impl Default for AutopilotPlan {
    fn default() -> Self {
        Self {
            destination: DestinationId::from("dest_leo"),
            build: [
                "module_energy",
                "module_life_support",
                "module_crew_quarters",
                "module_laboratory",
                "module_maintenance",
            ]
            .into_iter()
            .map(ModuleDefId::from)
            .collect(),
            reserve: default_reserve(),
        }
    }
}

/// Plays a session without a human:
/// 1. Select the planned destination (once).
/// 2. Build the plan in order, skipping capped or unknown modules; top up
///    from the catalog if the plan is short of the launch minimum.
/// 3. Launch.
/// 4. Each cycle, repair damaged modules closest to loss first; redirect
///    power when a repair is out of budget and the module is one cycle out.
#[derive(Debug, Default)]
pub struct AutopilotController {
    plan: AutopilotPlan,
    destination_requested: bool,
}

impl AutopilotController {
    pub fn new(plan: AutopilotPlan) -> Self {
        Self {
            plan,
            destination_requested: false,
        }
    }

    pub fn plan(&self) -> &AutopilotPlan {
        &self.plan
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Resources left after paying `cost`, or `None` if that dips under `reserve`.
fn spend(budget: &Resources, cost: &ResourceDelta, reserve: f32) -> Option<Resources> {
    let mut after = *budget;
    after.apply_delta(&cost.as_cost());
    let keeps_reserve = [
        (cost.energy, after.energy),
        (cost.oxygen, after.oxygen),
        (cost.morale, after.morale),
    ]
    .iter()
    .all(|&(paid, left)| paid.abs() < f32::EPSILON || left >= reserve);
    (budget.can_afford(cost) && keeps_reserve).then_some(after)
}

/// Next module to build, or `None` when the habitat is ready to launch.
fn next_build(state: &GameState, content: &GameContent, plan: &AutopilotPlan) -> Option<ModuleDefId> {
    if state.modules.len() >= state.profile.habitat_slots {
        return None;
    }
    let has_room = |def_id: &ModuleDefId| {
        content.module_def(def_id).is_some_and(|def| {
            def.max_instances
                .is_none_or(|cap| instance_count(state, def) < cap)
        })
    };

    for (index, def_id) in plan.build.iter().enumerate() {
        let requested = plan.build[..=index].iter().filter(|id| *id == def_id).count();
        let built = state
            .modules
            .iter()
            .filter(|module| &module.def_id == def_id)
            .count();
        if built < requested && has_room(def_id) {
            return Some(def_id.clone());
        }
    }

    if state.modules.len() < content.constants.min_modules_to_launch {
        return content
            .module_defs
            .iter()
            .map(|def| &def.id)
            .find(|id| has_room(id))
            .cloned();
    }
    None
}

fn construction_commands(
    controller: &mut AutopilotController,
    state: &GameState,
    content: &GameContent,
) -> Vec<Command> {
    if state.destination.is_none() && !controller.destination_requested {
        controller.destination_requested = true;
        return vec![Command::SelectDestination {
            destination_id: controller.plan.destination.clone(),
        }];
    }
    match next_build(state, content, &controller.plan) {
        Some(module_def_id) => vec![Command::AddModule { module_def_id }],
        None => vec![Command::StartSimulation],
    }
}

fn intervention_commands(
    state: &GameState,
    content: &GameContent,
    plan: &AutopilotPlan,
) -> Vec<Command> {
    let mut damaged: Vec<_> = state
        .modules
        .iter()
        .filter(|module| module.status == ModuleStatus::Damaged)
        .collect();
    damaged.sort_by_key(|module| module.damage_countdown.unwrap_or(u32::MAX));

    let constants = &content.constants;
    let mut budget = state.resources;
    let mut commands = Vec::new();
    for module in damaged {
        if let Some(after) = spend(&budget, &constants.repair_cost, plan.reserve) {
            budget = after;
            commands.push(Command::Repair {
                module_id: module.id.clone(),
            });
            continue;
        }
        let about_to_fail = module.damage_countdown == Some(1) && module.stabilized_buffer == 0;
        if about_to_fail {
            if let Some(after) = spend(&budget, &constants.redirect_cost, plan.reserve) {
                budget = after;
                commands.push(Command::RedirectPower {
                    module_id: module.id.clone(),
                });
            }
        }
    }
    commands
}

// ---------------------------------------------------------------------------
// AutopilotController
// ---------------------------------------------------------------------------

impl CommandSource for AutopilotController {
    fn generate_commands(&mut self, state: &GameState, content: &GameContent) -> Vec<Command> {
        match state.phase {
            Phase::Construction => construction_commands(self, state, content),
            Phase::Simulation => intervention_commands(state, content, &self.plan),
            Phase::Victory | Phase::GameOver => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::test_fixtures::{base_content, base_state, ScriptedRandom};
    use sim_core::{HazardId, Incident, IncidentId};
    use std::sync::Arc;

    fn leo_state(content: &GameContent) -> GameState {
        let mut state = base_state(content);
        let mut events = Vec::new();
        sim_core::apply_command(
            &mut state,
            content,
            &Command::SelectDestination {
                destination_id: DestinationId::from("dest_leo"),
            },
            &mut ScriptedRandom::default(),
            &mut events,
        );
        state
    }

    fn add(state: &mut GameState, content: &GameContent, def: &str) {
        let mut events = Vec::new();
        sim_core::apply_command(
            state,
            content,
            &Command::AddModule {
                module_def_id: ModuleDefId::from(def),
            },
            &mut ScriptedRandom::default(),
            &mut events,
        );
    }

    fn damage(state: &mut GameState, index: usize, countdown: u32) {
        let module = &mut state.modules[index];
        module.status = ModuleStatus::Damaged;
        module.damage_countdown = Some(countdown);
        state.incidents.push(Incident {
            id: IncidentId(format!("incident_{index:04}")),
            hazard_id: HazardId::from("hazard_solar_flare"),
            module_def_id: module.def_id.clone(),
            module_id: module.id.clone(),
            cycles_remaining: countdown,
            ongoing_effect: None,
            stabilized_buffer: 0,
        });
    }

    #[test]
    fn test_autopilot_selects_destination_once() {
        let content = base_content();
        let state = base_state(&content);
        let mut autopilot = AutopilotController::default();

        let first = autopilot.generate_commands(&state, &content);
        assert_eq!(
            first,
            vec![Command::SelectDestination {
                destination_id: DestinationId::from("dest_leo")
            }]
        );
        // Destination still unset (e.g. rejected): move on to building.
        let second = autopilot.generate_commands(&state, &content);
        assert!(matches!(second[0], Command::AddModule { .. }));
    }

    #[test]
    fn test_autopilot_builds_plan_in_order() {
        let content = base_content();
        let mut state = leo_state(&content);
        let mut autopilot = AutopilotController::default();
        autopilot.destination_requested = true;

        let mut built = Vec::new();
        for _ in 0..10 {
            let commands = autopilot.generate_commands(&state, &content);
            match &commands[..] {
                [Command::AddModule { module_def_id }] => {
                    built.push(module_def_id.0.clone());
                    add(&mut state, &content, &module_def_id.0);
                }
                [Command::StartSimulation] => break,
                other => panic!("unexpected commands {other:?}"),
            }
        }
        assert_eq!(
            built,
            vec![
                "module_energy",
                "module_life_support",
                "module_crew_quarters",
                "module_laboratory",
                "module_maintenance"
            ]
        );
    }

    #[test]
    fn test_autopilot_skips_capped_modules() {
        let content = base_content();
        let mut state = leo_state(&content);
        let plan = AutopilotPlan {
            build: vec![
                ModuleDefId::from("module_maintenance"),
                ModuleDefId::from("module_maintenance"),
                ModuleDefId::from("module_energy"),
                ModuleDefId::from("module_comms"),
            ],
            ..AutopilotPlan::default()
        };
        let mut autopilot = AutopilotController::new(plan);
        autopilot.destination_requested = true;

        add(&mut state, &content, "module_maintenance");
        let commands = autopilot.generate_commands(&state, &content);
        assert_eq!(
            commands,
            vec![Command::AddModule {
                module_def_id: ModuleDefId::from("module_energy")
            }]
        );
    }

    #[test]
    fn test_autopilot_tops_up_short_plan() {
        let content = base_content();
        let state = leo_state(&content);
        let plan = AutopilotPlan {
            build: vec![],
            ..AutopilotPlan::default()
        };
        let mut autopilot = AutopilotController::new(plan);
        autopilot.destination_requested = true;
        let commands = autopilot.generate_commands(&state, &content);
        assert_eq!(
            commands,
            vec![Command::AddModule {
                module_def_id: ModuleDefId::from("module_energy")
            }]
        );
    }

    #[test]
    fn test_autopilot_repairs_most_urgent_first() {
        let content = base_content();
        let mut state = leo_state(&content);
        for def in ["module_energy", "module_comms", "module_crew_quarters"] {
            add(&mut state, &content, def);
        }
        state.phase = Phase::Simulation;
        damage(&mut state, 0, 3);
        damage(&mut state, 2, 1);

        let commands = AutopilotController::default().generate_commands(&state, &content);
        assert_eq!(
            commands,
            vec![
                Command::Repair {
                    module_id: state.modules[2].id.clone()
                },
                Command::Repair {
                    module_id: state.modules[0].id.clone()
                },
            ]
        );
    }

    #[test]
    fn test_autopilot_redirects_when_repair_breaks_reserve() {
        let content = base_content();
        let mut state = leo_state(&content);
        for def in ["module_energy", "module_comms", "module_crew_quarters"] {
            add(&mut state, &content, def);
        }
        state.phase = Phase::Simulation;
        damage(&mut state, 0, 1);
        damage(&mut state, 1, 2);
        state.resources.energy = 22.0;

        let commands = AutopilotController::default().generate_commands(&state, &content);
        // Repair (10 energy) would leave 12 < 15; redirect (5) leaves 17.
        assert_eq!(
            commands,
            vec![Command::RedirectPower {
                module_id: state.modules[0].id.clone()
            }]
        );
    }

    #[test]
    fn test_autopilot_idle_after_run_ends() {
        let content = base_content();
        let mut state = base_state(&content);
        state.phase = Phase::Victory;
        state.victory = true;
        assert!(AutopilotController::default()
            .generate_commands(&state, &content)
            .is_empty());
    }

    // --- Session ------------------------------------------------------------

    fn manual_session(content: GameContent) -> Session<ChaCha8Rng> {
        let content = Arc::new(content);
        let state = base_state(&content);
        Session::manual(state, content, ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn test_scheduler_follows_simulation_phase() {
        let mut content = base_content();
        content.constants.min_modules_to_launch = 0;
        let mut session = manual_session(content);
        assert!(!session.is_ticking());
        assert!(session.step().is_empty(), "no ticks before launch");

        let (outcome, _) = session.execute(&Command::StartSimulation);
        assert!(outcome.accepted);
        assert!(session.is_ticking());
        assert!(session.scheduler().is_running());

        session.execute(&Command::ResetGame);
        assert!(!session.is_ticking());
        assert_eq!(session.state().phase, Phase::Construction);
    }

    #[test]
    fn test_scheduler_stops_on_game_over() {
        let mut content = base_content();
        content.constants.min_modules_to_launch = 0;
        content.constants.base_decay = ResourceDelta::new(60.0, 0.0, 0.0);
        content.constants.base_event_chance = 0.0;
        let mut session = manual_session(content);
        session.execute(&Command::StartSimulation);

        session.step();
        assert!(session.is_ticking());
        session.step();

        assert!(session.state().game_over);
        assert!(!session.is_ticking());
        assert!(session.step().is_empty());
        assert_eq!(session.snapshot().cycle, 2);
    }

    #[test]
    fn test_scheduler_stops_on_victory() {
        let mut content = base_content();
        content.constants.min_modules_to_launch = 0;
        content.constants.survival_target_cycles = 3;
        content.constants.base_event_chance = 0.0;
        let mut session = manual_session(content);
        session.execute(&Command::StartSimulation);
        while session.is_ticking() {
            session.step();
        }
        assert!(session.state().victory);
        assert_eq!(session.state().meta.cycle, 3);
    }
}
