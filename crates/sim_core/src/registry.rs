use crate::log::narrate;
use crate::synergy::refresh_derived;
use crate::{
    Event, EventEnvelope, GameContent, GameState, LogTone, ModuleDef, ModuleInstance,
    ModuleInstanceId, ModuleStatus, RejectReason,
};

/// Instances of `def` currently in the habitat, lost ones included.
pub fn instance_count(state: &GameState, def: &ModuleDef) -> usize {
    state
        .modules
        .iter()
        .filter(|module| module.def_id == def.id)
        .count()
}

/// Builds one operational instance of `def`. Lost modules still occupy
/// their slot until removed.
pub(crate) fn add_module(
    state: &mut GameState,
    content: &GameContent,
    def: &ModuleDef,
    events: &mut Vec<EventEnvelope>,
) -> Result<ModuleInstanceId, RejectReason> {
    if state.modules.len() >= state.profile.habitat_slots {
        return Err(RejectReason::HabitatFull);
    }
    if def
        .max_instances
        .is_some_and(|cap| instance_count(state, def) >= cap)
    {
        return Err(RejectReason::InstanceCapReached);
    }

    let id = crate::id::next_module_instance_id(&mut state.counters);
    state.modules.push(ModuleInstance {
        id: id.clone(),
        def_id: def.id.clone(),
        status: ModuleStatus::Operational,
        damage_countdown: None,
        stabilized_buffer: 0,
    });
    refresh_derived(state, content);

    narrate(
        state,
        content,
        format!("{} deployed. {}.", def.name, def.role),
        LogTone::Info,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::ModuleBuilt {
            module_id: id.clone(),
            def_id: def.id.clone(),
        },
    ));
    Ok(id)
}

/// Removes the instance if present. Its incidents go with it.
pub(crate) fn remove_module(
    state: &mut GameState,
    content: &GameContent,
    module_id: &ModuleInstanceId,
    events: &mut Vec<EventEnvelope>,
) -> Option<ModuleInstance> {
    let index = state.modules.iter().position(|module| &module.id == module_id)?;
    let removed = state.modules.remove(index);
    state
        .incidents
        .retain(|incident| &incident.module_id != module_id);
    refresh_derived(state, content);

    let name = content
        .module_def(&removed.def_id)
        .map_or_else(|| removed.def_id.0.clone(), |def| def.name.clone());
    narrate(
        state,
        content,
        format!("{name} dismantled."),
        LogTone::Neutral,
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.cycle,
        Event::ModuleRemoved {
            module_id: removed.id.clone(),
        },
    ));
    Some(removed)
}
