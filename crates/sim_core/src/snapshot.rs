//! Read-only projection of a session for presentation layers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::event_chance;
use crate::incidents::module_name;
use crate::{
    DestinationId, GameContent, GameState, HazardId, Incident, LogEntry, MissionId,
    MissionStatus, ModuleDefId, ModuleInstanceId, ModuleStatus, Phase, ResourceDelta,
    SynergySummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedResources {
    pub energy: u32,
    pub oxygen: u32,
    pub morale: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationView {
    pub id: DestinationId,
    pub name: String,
    pub environment_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleView {
    pub id: ModuleInstanceId,
    pub def_id: ModuleDefId,
    pub name: String,
    pub role: String,
    pub status: ModuleStatus,
    pub damage_countdown: Option<u32>,
    pub stabilized_buffer: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingHazardView {
    pub hazard_id: HazardId,
    pub label: String,
    pub lead_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionView {
    pub mission_id: MissionId,
    pub label: String,
    pub description: String,
    pub status: MissionStatus,
    pub progress: u32,
    pub cycles_remaining: Option<u32>,
    pub target_module: Option<ModuleInstanceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub session_id: Uuid,
    pub cycle: u64,
    pub phase: Phase,
    pub victory: bool,
    pub game_over: bool,
    pub survival_target: u64,
    pub habitat_slots: usize,
    pub destination: Option<DestinationView>,
    pub resources: RoundedResources,
    pub resource_modifiers: ResourceDelta,
    pub modules: Vec<ModuleView>,
    pub incidents: Vec<Incident>,
    pub pending_hazard: Option<PendingHazardView>,
    pub mission: Option<MissionView>,
    pub synergy: SynergySummary,
    pub event_chance: f32,
    /// Newest first.
    pub event_log: Vec<LogEntry>,
}

pub fn snapshot(state: &GameState, content: &GameContent) -> Snapshot {
    let [energy, oxygen, morale] = state.resources.rounded();

    let destination = state
        .destination
        .as_ref()
        .and_then(|id| content.destination(id))
        .map(|dest| DestinationView {
            id: dest.id.clone(),
            name: dest.name.clone(),
            environment_summary: dest.environment_summary.clone(),
        });

    let modules = state
        .modules
        .iter()
        .map(|module| ModuleView {
            id: module.id.clone(),
            def_id: module.def_id.clone(),
            name: module_name(content, &module.def_id),
            role: content
                .module_def(&module.def_id)
                .map(|def| def.role.clone())
                .unwrap_or_default(),
            status: module.status,
            damage_countdown: module.damage_countdown,
            stabilized_buffer: module.stabilized_buffer,
        })
        .collect();

    let pending_hazard = state.pending_hazard.as_ref().map(|pending| PendingHazardView {
        hazard_id: pending.hazard_id.clone(),
        label: content
            .hazard(&pending.hazard_id)
            .map_or_else(|| pending.hazard_id.0.clone(), |h| h.label.clone()),
        lead_time: pending.lead_time,
    });

    let mission = state.mission.as_ref().map(|mission| {
        let def = content.mission(&mission.mission_id);
        MissionView {
            mission_id: mission.mission_id.clone(),
            label: def.map_or_else(|| mission.mission_id.0.clone(), |d| d.label.clone()),
            description: def.map(|d| d.description.clone()).unwrap_or_default(),
            status: mission.status,
            progress: mission.progress,
            cycles_remaining: mission.cycles_remaining,
            target_module: mission.target_module.clone(),
        }
    });

    Snapshot {
        session_id: state.meta.session_id,
        cycle: state.meta.cycle,
        phase: state.phase,
        victory: state.victory,
        game_over: state.game_over,
        survival_target: content.constants.survival_target_cycles,
        habitat_slots: state.profile.habitat_slots,
        destination,
        resources: RoundedResources {
            energy,
            oxygen,
            morale,
        },
        resource_modifiers: state.derived.resource_modifiers,
        modules,
        incidents: state.incidents.clone(),
        pending_hazard,
        mission,
        synergy: state.derived.synergy.clone(),
        event_chance: event_chance(state, content, &state.derived.synergy),
        event_log: state.event_log.iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, module_instance};
    use crate::Resources;

    #[test]
    fn resources_are_rounded() {
        let content = base_content();
        let mut state = base_state(&content);
        state.resources = Resources::new(97.6, 12.4, 50.5);
        let snap = snapshot(&state, &content);
        assert_eq!(
            snap.resources,
            RoundedResources {
                energy: 98,
                oxygen: 12,
                morale: 51
            }
        );
        assert_eq!(snap.survival_target, 12);
        assert_eq!(snap.habitat_slots, 10);
        assert!(snap.destination.is_none());
    }

    #[test]
    fn modules_carry_catalog_names() {
        let content = base_content();
        let mut state = base_state(&content);
        state.modules.push(module_instance("module_energy", 0));
        let snap = snapshot(&state, &content);
        assert_eq!(snap.modules[0].name, "Solar Array");
        assert_eq!(snap.modules[0].role, "Power generation");
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let content = base_content();
        let state = base_state(&content);
        let json = serde_json::to_value(snapshot(&state, &content)).unwrap();
        assert_eq!(json["phase"], "construction");
        assert_eq!(json["resources"]["energy"], 100);
    }
}
