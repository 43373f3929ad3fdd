//! Shared test fixtures for sim_core and downstream crates.
//!
//! `base_content()` mirrors the shipped catalog closely enough for
//! integration-level tests (eight modules, the full synergy table, three
//! hazards, four missions, three destinations). `ScriptedRandom` replays a
//! fixed sequence of draws so cycle outcomes can be forced.

use std::collections::{HashMap, VecDeque};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::{
    Constants, DestinationDef, DestinationId, GameContent, GameState, HazardDef, HazardId,
    HazardProfileDef, MissionDef, MissionGoal, MissionId, MissionTrigger, ModuleDef, ModuleDefId,
    ModuleInstance, ModuleInstanceId, ModuleStatus, OngoingEffectKind, RandomSource,
    ResourceDelta, ResourceKey, Resources, SynergyEffects, SynergyId, SynergyRuleDef, Tone,
};

fn module(id: &str, name: &str, role: &str, effects: ResourceDelta) -> ModuleDef {
    ModuleDef {
        id: ModuleDefId::from(id),
        name: name.to_string(),
        role: role.to_string(),
        description: String::new(),
        effects,
        max_instances: None,
        risk_factor: 0.0,
    }
}

fn synergy(id: &str, label: &str, modules: &[&str], effects: SynergyEffects, tone: Tone) -> SynergyRuleDef {
    SynergyRuleDef {
        id: SynergyId::from(id),
        label: label.to_string(),
        description: String::new(),
        modules: modules.iter().map(|m| ModuleDefId::from(*m)).collect(),
        effects,
        tone,
    }
}

pub fn test_constants() -> Constants {
    Constants {
        initial_resources: Resources::new(100.0, 100.0, 100.0),
        base_decay: ResourceDelta::new(2.0, 3.0, 1.0),
        base_event_chance: 0.25,
        max_event_chance: 0.9,
        module_risk_weight: 0.05,
        survival_target_cycles: 12,
        lost_module_decay_penalty: 1.0,
        repair_cost: ResourceDelta::new(10.0, 0.0, 2.0),
        redirect_cost: ResourceDelta::new(5.0, 0.0, 5.0),
        mission_failure_morale_penalty: 4.0,
        default_habitat_slots: 10,
        default_escalate_after: 2,
        event_log_capacity: 10,
        min_modules_to_launch: 3,
        cycle_interval_ms: 5000,
    }
}

fn test_modules() -> Vec<ModuleDef> {
    let mut life_support = module(
        "module_life_support",
        "Life Support",
        "Oxygen recycling",
        ResourceDelta::new(-1.0, 3.0, 0.0),
    );
    life_support.max_instances = Some(2);

    let mut laboratory = module(
        "module_laboratory",
        "Laboratory",
        "Research and analysis",
        ResourceDelta::new(-1.0, 0.0, 1.0),
    );
    laboratory.risk_factor = 0.5;

    let mut crew = module(
        "module_crew_quarters",
        "Crew Quarters",
        "Rest and recovery",
        ResourceDelta::new(0.0, 0.0, 2.0),
    );
    crew.max_instances = Some(2);

    let mut maintenance = module(
        "module_maintenance",
        "Maintenance Bay",
        "Drone upkeep",
        ResourceDelta::new(-0.5, 0.0, 0.0),
    );
    maintenance.max_instances = Some(1);

    let mut control = module(
        "module_control_center",
        "Control Center",
        "Habitat coordination",
        ResourceDelta::new(-1.0, 0.0, 0.0),
    );
    control.max_instances = Some(1);

    let mut reactor = module(
        "module_experimental_reactor",
        "Experimental Reactor",
        "High-yield power",
        ResourceDelta::new(6.0, 0.0, 0.0),
    );
    reactor.max_instances = Some(1);
    reactor.risk_factor = 2.0;

    vec![
        module(
            "module_energy",
            "Solar Array",
            "Power generation",
            ResourceDelta::new(3.0, 0.0, 0.0),
        ),
        life_support,
        laboratory,
        crew,
        module(
            "module_comms",
            "Comms Array",
            "Long-range contact",
            ResourceDelta::new(-0.5, 0.0, 1.0),
        ),
        maintenance,
        control,
        reactor,
    ]
}

fn test_hazards() -> Vec<HazardDef> {
    vec![
        HazardDef {
            id: HazardId::from("hazard_solar_flare"),
            label: "Solar flare".to_string(),
            weight: Some(2.0),
            preferred_targets: vec![ModuleDefId::from("module_energy")],
            impact: ResourceDelta::new(-8.0, 0.0, 0.0),
            escalate_after: None,
            ongoing_effect: Some(OngoingEffectKind::EnergyDrain),
            message: "A solar flare overloads the power grid.".to_string(),
        },
        HazardDef {
            id: HazardId::from("hazard_micrometeor"),
            label: "Micrometeor shower".to_string(),
            weight: None,
            preferred_targets: vec![ModuleDefId::from("module_life_support")],
            impact: ResourceDelta::new(0.0, -6.0, 0.0),
            escalate_after: Some(3),
            ongoing_effect: Some(OngoingEffectKind::OxygenDrain),
            message: "Micrometeors puncture the outer hull.".to_string(),
        },
        HazardDef {
            id: HazardId::from("hazard_crew_conflict"),
            label: "Crew conflict".to_string(),
            weight: None,
            preferred_targets: vec![ModuleDefId::from("module_crew_quarters")],
            impact: ResourceDelta::new(0.0, 0.0, -6.0),
            escalate_after: Some(2),
            ongoing_effect: Some(OngoingEffectKind::MoraleDrain),
            message: "Tension boils over in the crew quarters.".to_string(),
        },
    ]
}

fn test_synergies() -> Vec<SynergyRuleDef> {
    vec![
        synergy(
            "synergy_support_grid",
            "Optimized support grid",
            &["module_energy", "module_life_support"],
            SynergyEffects {
                decay_multiplier: Some(0.9),
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_bioengineering",
            "Applied bioengineering",
            &["module_life_support", "module_laboratory"],
            SynergyEffects {
                resource_bonus: ResourceDelta::single(ResourceKey::Oxygen, 3.0),
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_predictive_modeling",
            "Predictive modeling",
            &["module_energy", "module_laboratory"],
            SynergyEffects {
                event_risk_modifier: -0.1,
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_circadian",
            "Restored circadian cycles",
            &["module_crew_quarters", "module_life_support"],
            SynergyEffects {
                resource_bonus: ResourceDelta::single(ResourceKey::Morale, 3.0),
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_proactive_probing",
            "Proactive probing",
            &["module_laboratory", "module_comms"],
            SynergyEffects {
                early_warning: 1,
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_automated_maintenance",
            "Automated maintenance",
            &["module_maintenance"],
            SynergyEffects {
                auto_repair_interval: Some(4),
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_total_coordination",
            "Total coordination",
            &["module_control_center"],
            SynergyEffects {
                synergy_amplifier: 0.1,
                ..SynergyEffects::default()
            },
            Tone::Positive,
        ),
        synergy(
            "synergy_reactor_noise",
            "Reactor noise",
            &["module_energy", "module_crew_quarters"],
            SynergyEffects {
                resource_penalty: ResourceDelta::single(ResourceKey::Morale, 2.0),
                ..SynergyEffects::default()
            },
            Tone::Negative,
        ),
        synergy(
            "synergy_latent_instability",
            "Latent instability",
            &["module_experimental_reactor"],
            SynergyEffects {
                event_risk_modifier: 0.15,
                extra_damage: 1,
                ..SynergyEffects::default()
            },
            Tone::Negative,
        ),
    ]
}

fn test_missions() -> Vec<MissionDef> {
    vec![
        MissionDef {
            id: MissionId::from("mission_repair_next_cycle"),
            label: "Repair a damaged module".to_string(),
            description: String::new(),
            trigger: MissionTrigger::OnDamage,
            time_limit: Some(1),
            reward: ResourceDelta::new(5.0, 0.0, 5.0),
            weight: None,
            goal: MissionGoal::RepairTarget,
        },
        MissionDef {
            id: MissionId::from("mission_oxygen_buffer"),
            label: "Keep oxygen high".to_string(),
            description: String::new(),
            trigger: MissionTrigger::DuringSimulation,
            time_limit: Some(3),
            reward: ResourceDelta::new(0.0, 6.0, 4.0),
            weight: None,
            goal: MissionGoal::SustainResource {
                resource: ResourceKey::Oxygen,
                threshold: 70.0,
                cycles: 3,
            },
        },
        MissionDef {
            id: MissionId::from("mission_deploy_support"),
            label: "Expand life support".to_string(),
            description: String::new(),
            trigger: MissionTrigger::Construction,
            time_limit: None,
            reward: ResourceDelta::new(0.0, 5.0, 0.0),
            weight: None,
            goal: MissionGoal::BuildModule {
                module: ModuleDefId::from("module_life_support"),
            },
        },
        MissionDef {
            id: MissionId::from("mission_stabilize_energy"),
            label: "Stabilize energy".to_string(),
            description: String::new(),
            trigger: MissionTrigger::DuringSimulation,
            time_limit: Some(2),
            reward: ResourceDelta::new(8.0, 0.0, 2.0),
            weight: None,
            goal: MissionGoal::SustainResource {
                resource: ResourceKey::Energy,
                threshold: 60.0,
                cycles: 2,
            },
        },
    ]
}

fn test_destinations() -> Vec<DestinationDef> {
    vec![
        DestinationDef {
            id: DestinationId::from("dest_leo"),
            name: "Low Earth Orbit".to_string(),
            summary: "Stable environment, low radiation risk.".to_string(),
            environment_summary: "Frequent resupply from Earth.".to_string(),
            habitat_slots: None,
            resource_baseline: None,
            hazards: HazardProfileDef::default(),
            unlocked: true,
            locked_message: None,
        },
        DestinationDef {
            id: DestinationId::from("dest_mars"),
            name: "Martian Orbit".to_string(),
            summary: "High exposure, demanding survival.".to_string(),
            environment_summary: "Dust storms strain life support.".to_string(),
            habitat_slots: Some(4),
            // Morale left unset: falls back to the initial value.
            resource_baseline: Some(ResourceDelta::new(80.0, 90.0, 0.0)),
            hazards: HazardProfileDef {
                decay_multiplier: Some(1.2),
                decay_offset: ResourceDelta::new(0.0, 1.0, 0.0),
                event_chance_modifier: 0.1,
                incident_risk_modifier: 0.05,
                incident_severity_modifier: 1,
                event_weight_adjustments: HashMap::from([(
                    HazardId::from("hazard_solar_flare"),
                    1.5,
                )]),
            },
            unlocked: true,
            locked_message: None,
        },
        DestinationDef {
            id: DestinationId::from("dest_europa"),
            name: "Europa Orbit".to_string(),
            summary: "Radiation belts and ice.".to_string(),
            environment_summary: String::new(),
            habitat_slots: Some(3),
            resource_baseline: None,
            hazards: HazardProfileDef::default(),
            unlocked: false,
            locked_message: Some("Radiation shielding still in development.".to_string()),
        },
    ]
}

pub fn base_content() -> GameContent {
    GameContent {
        content_version: "test".to_string(),
        module_defs: test_modules(),
        hazards: test_hazards(),
        synergies: test_synergies(),
        missions: test_missions(),
        destinations: test_destinations(),
        constants: test_constants(),
    }
}

/// Fresh construction-phase state with no destination, seed 42.
pub fn base_state(content: &GameContent) -> GameState {
    crate::new_game_state(content, 42, Uuid::nil())
}

/// Bare instance for synergy and effect tests. Id is `module_inst_{n:04}`.
pub fn module_instance(def_id: &str, n: u64) -> ModuleInstance {
    ModuleInstance {
        id: ModuleInstanceId(format!("module_inst_{n:04}")),
        def_id: ModuleDefId::from(def_id),
        status: ModuleStatus::Operational,
        damage_countdown: None,
        stabilized_buffer: 0,
    }
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Replays a fixed sequence of unit draws. Once exhausted it keeps
/// returning 0.99, which fails every event roll.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    draws: VecDeque<f32>,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f32>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f32 {
        self.draws.pop_front().unwrap_or(0.99)
    }
}
