use super::*;

/// Simulation-phase state holding `modules` directly, no mission.
fn running_state(content: &GameContent, modules: Vec<ModuleInstance>) -> GameState {
    let mut state = test_state(content);
    state.counters.next_module_instance_id = modules.len() as u64;
    state.modules = modules;
    state.phase = Phase::Simulation;
    state.derived = derive_state(&state.modules, content);
    state
}

#[test]
fn test_tick_outside_simulation_is_noop() {
    let content = test_content();
    let mut state = test_state(&content);
    let events = tick(&mut state, &content, &mut make_rng());
    assert!(events.is_empty());
    assert_eq!(state.meta.cycle, 0);
    assert_resources(&state, 100.0, 100.0, 100.0);
}

#[test]
fn test_cycle_emits_resource_and_cycle_events() {
    let content = test_content();
    let mut state = running_state(&content, vec![]);
    let events = quiet_tick(&mut state, &content);

    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::CycleCompleted { cycle: 1 }
    )));
    let delta = events
        .iter()
        .find_map(|e| match &e.event {
            Event::ResourcesChanged { delta, .. } => Some(*delta),
            _ => None,
        })
        .expect("resources changed event");
    assert_eq!(delta, ResourceDelta::new(-2.0, -3.0, -1.0));
    assert_eq!(events[0].id.0, "evt_000000");
}

#[test]
fn test_destination_scales_and_offsets_decay() {
    let content = launch_content();
    let mut state = test_state(&content);
    run_command(
        &mut state,
        &content,
        Command::SelectDestination {
            destination_id: DestinationId::from("dest_mars"),
        },
    );
    assert_resources(&state, 80.0, 90.0, 100.0);
    run_command(&mut state, &content, Command::StartSimulation);

    quiet_tick(&mut state, &content);

    // (2 + 0) * 1.2, (3 + 1) * 1.2, (1 + 0) * 1.2
    assert_resources(&state, 77.6, 85.2, 98.8);
}

#[test]
fn test_modules_lost_before_cycle_add_decay_penalty() {
    let content = test_content();
    let mut comms = module_instance("module_comms", 0);
    comms.status = ModuleStatus::Lost;
    let mut state = running_state(&content, vec![comms]);

    quiet_tick(&mut state, &content);

    assert_resources(&state, 97.0, 96.0, 98.0);
}

#[test]
fn test_module_lost_during_cycle_is_not_penalised_until_next() {
    let content = test_content();
    let mut energy = module_instance("module_energy", 0);
    energy.status = ModuleStatus::Damaged;
    energy.damage_countdown = Some(1);
    let module_id = energy.id.clone();
    let mut state = running_state(&content, vec![energy]);
    state.incidents.push(Incident {
        id: IncidentId::from("incident_0000"),
        hazard_id: HazardId::from("hazard_solar_flare"),
        module_def_id: ModuleDefId::from("module_energy"),
        module_id,
        cycles_remaining: 1,
        ongoing_effect: Some(OngoingEffectKind::EnergyDrain),
        stabilized_buffer: 0,
    });

    let events = quiet_tick(&mut state, &content);

    assert_eq!(state.modules[0].status, ModuleStatus::Lost);
    assert!(events
        .iter()
        .any(|e| matches!(e.event, Event::ModuleLost { .. })));
    // Lost module contributes nothing; drain -6 still applies this cycle.
    assert_resources(&state, 92.0, 97.0, 99.0);

    quiet_tick(&mut state, &content);
    assert_resources(&state, 89.0, 93.0, 97.0);
}

#[test]
fn test_synergy_modifiers_apply_each_cycle() {
    let content = test_content();
    let mut state = running_state(
        &content,
        vec![
            module_instance("module_energy", 0),
            module_instance("module_life_support", 1),
        ],
    );
    quiet_tick(&mut state, &content);
    // modules: energy +3 -1, oxygen +3; decay scaled by support grid 0.9
    assert_resources(&state, 100.0, 100.0, 99.1);
}

#[test]
fn test_early_warning_forecasts_then_strikes() {
    let content = test_content();
    let mut state = running_state(
        &content,
        vec![
            module_instance("module_laboratory", 0),
            module_instance("module_comms", 1),
        ],
    );
    assert_eq!(state.derived.synergy.early_warning, 1);

    // Cycle 1: roll hits, flare drawn and held back.
    let events = tick(&mut state, &content, &mut ScriptedRandom::new([0.0, 0.0]));
    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::HazardForecast { lead_time: 1, .. }
    )));
    assert!(state.modules.iter().all(|m| m.status == ModuleStatus::Operational));

    // Cycle 2: lead time counts down, nothing strikes.
    let events = quiet_tick(&mut state, &content);
    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::HazardForecast { lead_time: 0, .. }
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e.event, Event::HazardStruck { .. })));
    assert_eq!(state.pending_hazard.as_ref().map(|p| p.lead_time), Some(0));

    // Cycle 3: the held flare lands on a random module (draw 0.0 -> first).
    let events = tick(&mut state, &content, &mut ScriptedRandom::new([0.0]));
    assert!(events
        .iter()
        .any(|e| matches!(e.event, Event::HazardStruck { .. })));
    assert!(state.pending_hazard.is_none());
    assert_eq!(state.modules[0].status, ModuleStatus::Damaged);
}

#[test]
fn test_event_chance_is_clamped() {
    let content = test_content();
    let mut state = running_state(&content, vec![]);
    let synergy = state.derived.synergy.clone();
    assert!((event_chance(&state, &content, &synergy) - 0.25).abs() < 1e-6);

    state.profile.event_chance_modifier = 5.0;
    assert!((event_chance(&state, &content, &synergy) - 0.9).abs() < 1e-6);

    state.profile.event_chance_modifier = -5.0;
    assert!(event_chance(&state, &content, &synergy).abs() < 1e-6);
}

#[test]
fn test_module_risk_raises_event_chance() {
    let content = test_content();
    let state = running_state(
        &content,
        vec![module_instance("module_experimental_reactor", 0)],
    );
    // 0.25 + reactor risk 2 * 0.05 + latent instability 0.15
    let chance = event_chance(&state, &content, &state.derived.synergy);
    assert!((chance - 0.5).abs() < 1e-5, "chance {chance}");
}

#[test]
fn test_auto_repair_runs_inside_cycle() {
    let content = test_content();
    let mut energy = module_instance("module_energy", 1);
    energy.status = ModuleStatus::Damaged;
    energy.damage_countdown = Some(3);
    let module_id = energy.id.clone();
    let mut state = running_state(
        &content,
        vec![module_instance("module_maintenance", 0), energy],
    );
    state.incidents.push(Incident {
        id: IncidentId::from("incident_0000"),
        hazard_id: HazardId::from("hazard_solar_flare"),
        module_def_id: ModuleDefId::from("module_energy"),
        module_id,
        cycles_remaining: 9,
        ongoing_effect: None,
        stabilized_buffer: 0,
    });
    state.auto_repair_ticker = 3;

    let events = quiet_tick(&mut state, &content);

    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::ModuleRepaired {
            automatic: true,
            ..
        }
    )));
    assert_eq!(state.modules[1].status, ModuleStatus::Operational);
    assert!(state.incidents.is_empty());
    assert_eq!(state.auto_repair_ticker, 0);
}
