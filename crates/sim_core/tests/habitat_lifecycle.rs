//! Integration test: choose orbit → build → launch → survive a strike → repair → victory.

use sim_core::test_fixtures::{base_content, base_state, ScriptedRandom};
use sim_core::*;

fn apply(state: &mut GameState, content: &GameContent, command: Command) -> CommandOutcome {
    let mut events = Vec::new();
    apply_command(
        state,
        content,
        &command,
        &mut ScriptedRandom::default(),
        &mut events,
    )
}

#[test]
fn full_habitat_lifecycle() {
    let content = base_content();
    let mut state = base_state(&content);

    assert!(
        apply(
            &mut state,
            &content,
            Command::SelectDestination {
                destination_id: DestinationId::from("dest_leo"),
            }
        )
        .accepted
    );
    for def in [
        "module_energy",
        "module_life_support",
        "module_crew_quarters",
        "module_maintenance",
    ] {
        let outcome = apply(
            &mut state,
            &content,
            Command::AddModule {
                module_def_id: ModuleDefId::from(def),
            },
        );
        assert!(outcome.created_module.is_some(), "{def} should build");
    }
    let labels: Vec<&str> = state
        .derived
        .synergy
        .active
        .iter()
        .map(|s| s.id.0.as_str())
        .collect();
    assert!(labels.contains(&"synergy_support_grid"));
    assert!(labels.contains(&"synergy_circadian"));
    assert!(labels.contains(&"synergy_automated_maintenance"));

    assert!(apply(&mut state, &content, Command::StartSimulation).accepted);

    // Cycle 1: the flare finds the solar array.
    let events = tick(&mut state, &content, &mut ScriptedRandom::new([0.0, 0.0]));
    let damaged = events.iter().find_map(|e| match &e.event {
        Event::ModuleDamaged { module_id, .. } => Some(module_id.clone()),
        _ => None,
    });
    let damaged = damaged.expect("flare should damage a module");
    assert_eq!(damaged, state.modules[0].id);

    let view = snapshot(&state, &content);
    assert_eq!(view.incidents.len(), 1);
    assert_eq!(
        view.mission.as_ref().map(|m| m.mission_id.0.as_str()),
        Some("mission_repair_next_cycle")
    );

    assert!(
        apply(
            &mut state,
            &content,
            Command::Repair {
                module_id: damaged
            }
        )
        .accepted
    );
    assert_eq!(state.modules[0].status, ModuleStatus::Operational);

    let mut rng = ScriptedRandom::default();
    while state.is_running() {
        tick(&mut state, &content, &mut rng);
    }

    assert!(state.victory, "quiet cycles after the repair should reach the target");
    let metrics = compute_metrics(&state, &content);
    assert_eq!(metrics.phase, "victory");
    assert_eq!(metrics.cycle, 12);
    assert_eq!(metrics.modules_lost, 0);
    assert_eq!(metrics.incidents_open, 0);
}
