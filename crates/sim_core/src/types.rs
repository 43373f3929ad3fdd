//! Type definitions for `sim_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(ModuleDefId);
string_id!(ModuleInstanceId);
string_id!(HazardId);
string_id!(SynergyId);
string_id!(MissionId);
string_id!(DestinationId);
string_id!(IncidentId);
string_id!(EventId);
string_id!(LogEntryId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKey {
    Energy,
    Oxygen,
    Morale,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 3] = [ResourceKey::Energy, ResourceKey::Oxygen, ResourceKey::Morale];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Operational,
    Damaged,
    /// Terminal. A lost module never changes status again.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Construction,
    Simulation,
    Victory,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTone {
    Neutral,
    Info,
    Positive,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionTrigger {
    Construction,
    OnDamage,
    DuringSimulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Active,
    Completed,
    Failed,
}

/// Per-cycle drain applied while an incident stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OngoingEffectKind {
    OxygenDrain,
    MoraleDrain,
    EnergyDrain,
}

impl OngoingEffectKind {
    pub fn delta(self) -> ResourceDelta {
        match self {
            OngoingEffectKind::OxygenDrain => ResourceDelta::single(ResourceKey::Oxygen, -5.0),
            OngoingEffectKind::MoraleDrain => ResourceDelta::single(ResourceKey::Morale, -2.0),
            OngoingEffectKind::EnergyDrain => ResourceDelta::single(ResourceKey::Energy, -6.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Resource values
// ---------------------------------------------------------------------------

/// The three bounded pools. Every field stays within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub energy: f32,
    pub oxygen: f32,
    pub morale: f32,
}

/// Signed per-resource amounts. Absent keys in content default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceDelta {
    pub energy: f32,
    pub oxygen: f32,
    pub morale: f32,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: MetaState,
    pub phase: Phase,
    pub victory: bool,
    pub game_over: bool,
    pub destination: Option<DestinationId>,
    /// Recomputed whenever `destination` changes; never edited in place.
    pub profile: PlanetProfile,
    pub resources: Resources,
    /// Build order is preserved; targeting and auto-repair depend on it.
    pub modules: Vec<ModuleInstance>,
    pub incidents: Vec<Incident>,
    pub pending_hazard: Option<PendingHazard>,
    pub mission: Option<MissionState>,
    pub auto_repair_ticker: u32,
    /// Newest first, capped at `Constants::event_log_capacity`.
    pub event_log: VecDeque<LogEntry>,
    pub derived: DerivedState,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    /// Orbital time: completed simulation cycles.
    pub cycle: u64,
    pub seed: u64,
    pub session_id: Uuid,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_module_instance_id: u64,
    pub next_incident_id: u64,
    pub next_log_entry_id: u64,
    /// Missions resolved this run. Cleared by a reset, unlike the id counters.
    #[serde(default)]
    pub missions_completed: u32,
    #[serde(default)]
    pub missions_failed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInstance {
    pub id: ModuleInstanceId,
    pub def_id: ModuleDefId,
    pub status: ModuleStatus,
    /// Mirror of the open incident's `cycles_remaining`; the incident is authoritative.
    pub damage_countdown: Option<u32>,
    pub stabilized_buffer: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub hazard_id: HazardId,
    pub module_def_id: ModuleDefId,
    pub module_id: ModuleInstanceId,
    pub cycles_remaining: u32,
    pub ongoing_effect: Option<OngoingEffectKind>,
    pub stabilized_buffer: u32,
}

/// A hazard already drawn but held back by an early-warning lead time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingHazard {
    pub hazard_id: HazardId,
    pub lead_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionState {
    pub mission_id: MissionId,
    pub trigger: MissionTrigger,
    pub status: MissionStatus,
    pub progress: u32,
    pub cycles_remaining: Option<u32>,
    pub target_module: Option<ModuleInstanceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub cycle: u64,
    pub message: String,
    pub tone: LogTone,
}

/// Aggregates re-derived from the module set after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedState {
    pub resource_modifiers: ResourceDelta,
    pub synergy: SynergySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergySummary {
    pub active: SmallVec<[ActiveSynergy; 4]>,
    pub decay_multiplier: f32,
    pub event_risk_modifier: f32,
    pub resource_bonus: ResourceDelta,
    pub resource_penalty: ResourceDelta,
    pub early_warning: u32,
    pub auto_repair_interval: Option<u32>,
    pub extra_damage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSynergy {
    pub id: SynergyId,
    pub label: String,
    pub description: String,
    pub tone: Tone,
}

/// Read-only projection of the chosen destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetProfile {
    pub habitat_slots: usize,
    pub resource_baseline: Resources,
    pub decay_multiplier: f32,
    pub decay_offset: ResourceDelta,
    pub event_chance_modifier: f32,
    pub incident_risk_modifier: f32,
    pub incident_severity_modifier: i32,
    pub event_weight_adjustments: HashMap<HazardId, f32>,
    pub environment_summary: String,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

/// Player actions. Each executes atomically between cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SelectDestination { destination_id: DestinationId },
    AddModule { module_def_id: ModuleDefId },
    RemoveModule { module_id: ModuleInstanceId },
    StartSimulation,
    Repair { module_id: ModuleInstanceId },
    RedirectPower { module_id: ModuleInstanceId },
    IgnoreDamage { module_id: ModuleInstanceId },
    ResetGame,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub accepted: bool,
    /// Set when `AddModule` created an instance.
    pub created_module: Option<ModuleInstanceId>,
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub cycle: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    HabitatFull,
    InstanceCapReached,
    WrongPhase,
    NotDamaged,
    InsufficientResources,
    DestinationLocked,
    NotEnoughModules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DestinationSelected {
        destination_id: Option<DestinationId>,
    },
    ModuleBuilt {
        module_id: ModuleInstanceId,
        def_id: ModuleDefId,
    },
    ModuleRemoved {
        module_id: ModuleInstanceId,
    },
    SimulationStarted,
    ActionRejected {
        reason: RejectReason,
    },
    HazardForecast {
        hazard_id: HazardId,
        lead_time: u32,
    },
    HazardStruck {
        hazard_id: HazardId,
        target: Option<ModuleInstanceId>,
    },
    ModuleDamaged {
        module_id: ModuleInstanceId,
        hazard_id: HazardId,
        countdown: u32,
    },
    ModuleLost {
        module_id: ModuleInstanceId,
    },
    ModuleRepaired {
        module_id: ModuleInstanceId,
        automatic: bool,
    },
    PowerRedirected {
        module_id: ModuleInstanceId,
    },
    DamageIgnored {
        module_id: ModuleInstanceId,
        countdown: u32,
    },
    MissionAssigned {
        mission_id: MissionId,
    },
    MissionCompleted {
        mission_id: MissionId,
    },
    MissionFailed {
        mission_id: MissionId,
    },
    ResourcesChanged {
        delta: ResourceDelta,
        resources: Resources,
    },
    CycleCompleted {
        cycle: u64,
    },
    Victory,
    GameOver,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub module_defs: Vec<ModuleDef>,
    pub hazards: Vec<HazardDef>,
    pub synergies: Vec<SynergyRuleDef>,
    pub missions: Vec<MissionDef>,
    pub destinations: Vec<DestinationDef>,
    pub constants: Constants,
}

impl GameContent {
    pub fn module_def(&self, id: &ModuleDefId) -> Option<&ModuleDef> {
        self.module_defs.iter().find(|def| &def.id == id)
    }

    pub fn hazard(&self, id: &HazardId) -> Option<&HazardDef> {
        self.hazards.iter().find(|hazard| &hazard.id == id)
    }

    pub fn mission(&self, id: &MissionId) -> Option<&MissionDef> {
        self.missions.iter().find(|mission| &mission.id == id)
    }

    pub fn destination(&self, id: &DestinationId) -> Option<&DestinationDef> {
        self.destinations.iter().find(|dest| &dest.id == id)
    }

    /// First unlocked destination in catalog order, else the first listed.
    pub fn default_destination(&self) -> Option<&DestinationDef> {
        self.destinations
            .iter()
            .find(|dest| dest.unlocked)
            .or_else(|| self.destinations.first())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub id: ModuleDefId,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: ResourceDelta,
    #[serde(default)]
    pub max_instances: Option<usize>,
    #[serde(default)]
    pub risk_factor: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardDef {
    pub id: HazardId,
    pub label: String,
    #[serde(default)]
    pub weight: Option<f32>,
    #[serde(default)]
    pub preferred_targets: Vec<ModuleDefId>,
    #[serde(default)]
    pub impact: ResourceDelta,
    #[serde(default)]
    pub escalate_after: Option<u32>,
    #[serde(default)]
    pub ongoing_effect: Option<OngoingEffectKind>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyRuleDef {
    pub id: SynergyId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub modules: Vec<ModuleDefId>,
    #[serde(default)]
    pub effects: SynergyEffects,
    pub tone: Tone,
}

/// Every recognized synergy effect. Absent fields are neutral.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyEffects {
    pub decay_multiplier: Option<f32>,
    pub resource_bonus: ResourceDelta,
    pub resource_penalty: ResourceDelta,
    pub event_risk_modifier: f32,
    pub early_warning: u32,
    pub auto_repair_interval: Option<u32>,
    pub extra_damage: u32,
    pub synergy_amplifier: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionDef {
    pub id: MissionId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub trigger: MissionTrigger,
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub reward: ResourceDelta,
    #[serde(default)]
    pub weight: Option<f32>,
    pub goal: MissionGoal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionGoal {
    /// Bring the damaged module named in the mission metadata back online.
    RepairTarget,
    /// Hold `resource >= threshold` for `cycles` consecutive cycles.
    SustainResource {
        resource: ResourceKey,
        threshold: f32,
        cycles: u32,
    },
    BuildModule { module: ModuleDefId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationDef {
    pub id: DestinationId,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub environment_summary: String,
    #[serde(default)]
    pub habitat_slots: Option<usize>,
    #[serde(default)]
    pub resource_baseline: Option<ResourceDelta>,
    #[serde(default)]
    pub hazards: HazardProfileDef,
    #[serde(default = "default_unlocked")]
    pub unlocked: bool,
    #[serde(default)]
    pub locked_message: Option<String>,
}

fn default_unlocked() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardProfileDef {
    pub decay_multiplier: Option<f32>,
    pub decay_offset: ResourceDelta,
    pub event_chance_modifier: f32,
    pub incident_risk_modifier: f32,
    pub incident_severity_modifier: i32,
    pub event_weight_adjustments: HashMap<HazardId, f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub initial_resources: Resources,
    /// Per-cycle decay before destination and synergy adjustments.
    pub base_decay: ResourceDelta,
    pub base_event_chance: f32,
    pub max_event_chance: f32,
    /// Event chance added per point of module `risk_factor`.
    pub module_risk_weight: f32,
    pub survival_target_cycles: u64,
    /// Flat decay added to every resource for each module lost before the cycle.
    pub lost_module_decay_penalty: f32,
    pub repair_cost: ResourceDelta,
    pub redirect_cost: ResourceDelta,
    pub mission_failure_morale_penalty: f32,
    pub default_habitat_slots: usize,
    pub default_escalate_after: u32,
    pub event_log_capacity: usize,
    pub min_modules_to_launch: usize,
    pub cycle_interval_ms: u64,
}
