//! Content loading, session setup and run bookkeeping shared between
//! sim_cli, sim_daemon and sim_bench.

use anyhow::{Context, Result};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sim_core::{
    Constants, DestinationDef, GameContent, GameState, HazardDef, MissionDef, MissionGoal,
    ModuleDef, ModuleDefId, SynergyRuleDef,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct ModulesFile {
    content_version: String,
    modules: Vec<ModuleDef>,
}

#[derive(Deserialize)]
struct HazardsFile {
    hazards: Vec<HazardDef>,
}

#[derive(Deserialize)]
struct SynergiesFile {
    synergies: Vec<SynergyRuleDef>,
}

#[derive(Deserialize)]
struct MissionsFile {
    missions: Vec<MissionDef>,
}

#[derive(Deserialize)]
struct DestinationsFile {
    destinations: Vec<DestinationDef>,
}

fn assert_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) {
    let mut seen = HashSet::new();
    for id in ids {
        assert!(seen.insert(id), "duplicate {kind} id '{id}'");
    }
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a synergy naming a module that doesn't exist, a
/// hazard preferring an unknown target, two entries sharing an id, or an
/// instance cap of zero.
pub fn validate_content(content: &GameContent) {
    assert_unique("module", content.module_defs.iter().map(|m| m.id.0.as_str()));
    assert_unique("hazard", content.hazards.iter().map(|h| h.id.0.as_str()));
    assert_unique("synergy", content.synergies.iter().map(|s| s.id.0.as_str()));
    assert_unique("mission", content.missions.iter().map(|m| m.id.0.as_str()));
    assert_unique(
        "destination",
        content.destinations.iter().map(|d| d.id.0.as_str()),
    );

    let module_ids: HashSet<&ModuleDefId> = content.module_defs.iter().map(|m| &m.id).collect();

    for module_def in &content.module_defs {
        if let Some(cap) = module_def.max_instances {
            assert!(
                cap > 0,
                "module '{}' max_instances must be positive",
                module_def.id
            );
        }
    }

    for synergy in &content.synergies {
        assert!(
            !synergy.modules.is_empty(),
            "synergy '{}' requires no modules",
            synergy.id
        );
        for module in &synergy.modules {
            assert!(
                module_ids.contains(module),
                "synergy '{}' module '{}' is not a known module id",
                synergy.id,
                module,
            );
        }
        if let Some(interval) = synergy.effects.auto_repair_interval {
            assert!(
                interval > 0,
                "synergy '{}' auto_repair_interval must be positive",
                synergy.id
            );
        }
    }

    for hazard in &content.hazards {
        for target in &hazard.preferred_targets {
            assert!(
                module_ids.contains(target),
                "hazard '{}' target '{}' is not a known module id",
                hazard.id,
                target,
            );
        }
    }

    for mission in &content.missions {
        if let MissionGoal::BuildModule { module } = &mission.goal {
            assert!(
                module_ids.contains(module),
                "mission '{}' build goal '{}' is not a known module id",
                mission.id,
                module,
            );
        }
    }

    let hazard_ids: HashSet<_> = content.hazards.iter().map(|h| &h.id).collect();
    for destination in &content.destinations {
        if let Some(slots) = destination.habitat_slots {
            assert!(
                slots > 0,
                "destination '{}' habitat_slots must be positive",
                destination.id
            );
        }
        for hazard in destination.hazards.event_weight_adjustments.keys() {
            assert!(
                hazard_ids.contains(hazard),
                "destination '{}' weight adjustment '{}' is not a known hazard id",
                destination.id,
                hazard,
            );
        }
    }

    let constants = &content.constants;
    assert!(
        constants.survival_target_cycles > 0,
        "survival_target_cycles must be positive"
    );
    assert!(
        constants.default_habitat_slots > 0,
        "default_habitat_slots must be positive"
    );
    assert!(
        (0.0..=1.0).contains(&constants.max_event_chance),
        "max_event_chance must lie in [0, 1]"
    );
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let text =
        std::fs::read_to_string(dir.join(file)).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {file}"))
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let modules_file: ModulesFile = read_json(dir, "modules.json")?;
    let hazards_file: HazardsFile = read_json(dir, "hazards.json")?;
    let synergies_file: SynergiesFile = read_json(dir, "synergies.json")?;
    let missions_file: MissionsFile = read_json(dir, "missions.json")?;
    let destinations_file: DestinationsFile = read_json(dir, "destinations.json")?;
    let content = GameContent {
        content_version: modules_file.content_version,
        module_defs: modules_file.modules,
        hazards: hazards_file.hazards,
        synergies: synergies_file.synergies,
        missions: missions_file.missions,
        destinations: destinations_file.destinations,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// Fresh construction-phase session. The session id is drawn from `rng` so
/// a seeded run is reproducible end to end.
pub fn build_initial_state(content: &GameContent, seed: u64, rng: &mut impl Rng) -> GameState {
    let session_id = sim_core::generate_session_id(rng);
    sim_core::new_game_state(content, seed, session_id)
}

// ---------------------------------------------------------------------------
// Run directories
// ---------------------------------------------------------------------------

/// Metadata written next to a run's metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub seed: u64,
    pub start_time: String,
    pub content_version: String,
    pub destination: Option<String>,
    pub runner: String,
    pub metrics_every: u64,
}

/// `YYYYMMDD_HHMMSS_seed<N>` in UTC.
pub fn generate_run_id(seed: u64) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{timestamp}_seed{seed}")
}

pub fn create_run_dir(root: &Path, run_id: &str) -> Result<PathBuf> {
    let dir = root.join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn write_run_info(dir: &Path, info: &RunInfo) -> Result<()> {
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
