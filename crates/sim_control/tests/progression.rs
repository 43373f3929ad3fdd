//! Progression regression tests.
//!
//! These tests play whole sessions with the autopilot against the shipped
//! content and verify that every run launches, ends by the survival target,
//! and that the autopilot never issues an intervention the engine refuses.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::{AutopilotController, AutopilotPlan, CommandSource, Session};
use sim_core::{Command, DestinationId, Event, GameContent, Phase};
use std::sync::Arc;

fn production_content() -> Arc<GameContent> {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let content = sim_world::load_content(&format!("{manifest}/../../content"))
        .expect("shipped content should load");
    Arc::new(content)
}

/// Plays one session to the end. Returns the session and every rejected
/// simulation-phase command.
fn play(
    content: &Arc<GameContent>,
    seed: u64,
    plan: AutopilotPlan,
) -> (Session<ChaCha8Rng>, Vec<Command>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let state = sim_world::build_initial_state(content, seed, &mut rng);
    let mut session = Session::manual(state, Arc::clone(content), rng);
    let mut autopilot = AutopilotController::new(plan);
    let mut rejected = Vec::new();

    // Construction: bounded so a bad plan cannot spin forever.
    for _ in 0..32 {
        if session.state().phase != Phase::Construction {
            break;
        }
        for command in autopilot.generate_commands(session.state(), session.content()) {
            session.execute(&command);
        }
    }
    assert_eq!(
        session.state().phase,
        Phase::Simulation,
        "seed {seed}: autopilot should launch"
    );

    while session.is_ticking() {
        session.step();
        for command in autopilot.generate_commands(session.state(), session.content()) {
            let (outcome, events) = session.execute(&command);
            let refused = events
                .iter()
                .any(|e| matches!(e.event, Event::ActionRejected { .. }));
            if !outcome.accepted && refused {
                rejected.push(command);
            }
        }
    }
    (session, rejected)
}

#[test]
fn autopilot_runs_end_by_survival_target() {
    let content = production_content();
    let target = content.constants.survival_target_cycles;
    for seed in 0..40 {
        let (session, _) = play(&content, seed, AutopilotPlan::default());
        let state = session.state();
        assert!(state.is_finished(), "seed {seed}: run should be over");
        assert!(state.meta.cycle <= target, "seed {seed}: ran past target");
        if state.victory {
            assert_eq!(state.meta.cycle, target);
        }
    }
}

#[test]
fn autopilot_interventions_are_never_refused() {
    let content = production_content();
    for seed in 0..40 {
        let (_, rejected) = play(&content, seed, AutopilotPlan::default());
        // A damaged module can be lost or repaired between the autopilot's
        // read and its command only by the autopilot itself, so nothing
        // should ever bounce.
        assert!(rejected.is_empty(), "seed {seed}: refused {rejected:?}");
    }
}

#[test]
fn autopilot_launches_at_every_open_destination() {
    let content = production_content();
    for destination in content.destinations.iter().filter(|d| d.unlocked) {
        let plan = AutopilotPlan {
            destination: destination.id.clone(),
            ..AutopilotPlan::default()
        };
        let (session, _) = play(&content, 11, plan);
        assert_eq!(
            session.state().destination.as_ref(),
            Some(&destination.id),
            "autopilot should settle at {}",
            destination.id
        );
    }
}

#[test]
fn locked_destination_falls_back_to_default_orbit() {
    let content = production_content();
    let plan = AutopilotPlan {
        destination: DestinationId::from("dest_europa"),
        ..AutopilotPlan::default()
    };
    let (session, _) = play(&content, 3, plan);
    // Selection was refused, so the session launched without a destination.
    assert!(session.state().destination.is_none());
    assert!(session.state().is_finished());
}

#[test]
fn same_seed_same_outcome() {
    let content = production_content();
    let (a, _) = play(&content, 17, AutopilotPlan::default());
    let (b, _) = play(&content, 17, AutopilotPlan::default());
    assert_eq!(a.state().meta.cycle, b.state().meta.cycle);
    assert_eq!(a.state().victory, b.state().victory);
    assert_eq!(a.state().resources, b.state().resources);
    assert_eq!(a.state().meta.session_id, b.state().meta.session_id);
}
