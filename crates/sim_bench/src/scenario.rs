use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sim_control::AutopilotPlan;
use sim_core::{DestinationId, ModuleDefId};
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seeds: SeedSpec,
    #[serde(default = "default_destination")]
    pub destination: DestinationId,
    /// Autopilot build order. Empty means the autopilot's default order.
    #[serde(default)]
    pub build: Vec<ModuleDefId>,
    #[serde(default)]
    pub reserve: Option<f32>,
    /// Stop a run early after this many cycles.
    #[serde(default)]
    pub max_cycles: Option<u64>,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
}

fn default_destination() -> DestinationId {
    AutopilotPlan::default().destination
}

fn default_content_dir() -> String {
    "./content".to_string()
}

impl Scenario {
    pub fn plan(&self) -> AutopilotPlan {
        let defaults = AutopilotPlan::default();
        AutopilotPlan {
            destination: self.destination.clone(),
            build: if self.build.is_empty() {
                defaults.build
            } else {
                self.build.clone()
            },
            reserve: self.reserve.unwrap_or(defaults.reserve),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    pub fn expand(&self) -> Vec<u64> {
        match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range } => (range[0]..=range[1]).collect(),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if scenario.max_cycles == Some(0) {
        bail!("scenario 'max_cycles' must be > 0 when set");
    }
    if scenario.seeds.expand().is_empty() {
        bail!("scenario 'seeds' must produce at least one seed");
    }
    Ok(scenario)
}
