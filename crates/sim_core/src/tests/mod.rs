use super::*;
use crate::test_fixtures::{base_content, base_state, make_rng, module_instance, ScriptedRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod cycle;

// --- Shared test helpers ------------------------------------------------

fn test_content() -> GameContent {
    base_content()
}

/// Content that allows launching an empty habitat.
fn launch_content() -> GameContent {
    let mut content = base_content();
    content.constants.min_modules_to_launch = 0;
    content
}

fn test_state(content: &GameContent) -> GameState {
    base_state(content)
}

/// Applies a command with a source that never rolls an event.
fn run_command(
    state: &mut GameState,
    content: &GameContent,
    command: Command,
) -> (CommandOutcome, Vec<EventEnvelope>) {
    let mut rng = ScriptedRandom::default();
    let mut events = Vec::new();
    let outcome = apply_command(state, content, &command, &mut rng, &mut events);
    (outcome, events)
}

fn build(state: &mut GameState, content: &GameContent, def_id: &str) -> ModuleInstanceId {
    let (outcome, _) = run_command(
        state,
        content,
        Command::AddModule {
            module_def_id: ModuleDefId::from(def_id),
        },
    );
    outcome
        .created_module
        .unwrap_or_else(|| panic!("{def_id} should be buildable"))
}

/// Selects `dest_leo`, builds `defs` in order and starts the simulation.
fn launched_state(content: &GameContent, defs: &[&str]) -> GameState {
    let mut state = test_state(content);
    run_command(
        &mut state,
        content,
        Command::SelectDestination {
            destination_id: DestinationId::from("dest_leo"),
        },
    );
    for def in defs {
        build(&mut state, content, def);
    }
    let (outcome, _) = run_command(&mut state, content, Command::StartSimulation);
    assert!(outcome.accepted, "simulation should start");
    state
}

/// One cycle with no hazard roll succeeding.
fn quiet_tick(state: &mut GameState, content: &GameContent) -> Vec<EventEnvelope> {
    tick(state, content, &mut ScriptedRandom::default())
}

fn assert_resources(state: &GameState, energy: f32, oxygen: f32, morale: f32) {
    let r = state.resources;
    assert!(
        (r.energy - energy).abs() < 1e-3
            && (r.oxygen - oxygen).abs() < 1e-3
            && (r.morale - morale).abs() < 1e-3,
        "expected {energy}/{oxygen}/{morale}, got {}/{}/{}",
        r.energy,
        r.oxygen,
        r.morale
    );
}
