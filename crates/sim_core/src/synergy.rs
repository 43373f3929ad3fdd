//! Synergy evaluation and module-driven resource modifiers.
//!
//! Both are pure functions of the module set. Callers re-derive after every
//! mutation via [`refresh_derived`]; nothing here is cached between calls.

use ahash::AHashSet;
use smallvec::SmallVec;

use crate::{
    ActiveSynergy, DerivedState, GameContent, GameState, ModuleDefId, ModuleInstance,
    ModuleStatus, ResourceDelta, SynergySummary, Tone,
};

/// Weight of a module's effect table for its current status.
pub fn status_weight(status: ModuleStatus) -> f32 {
    match status {
        ModuleStatus::Operational => 1.0,
        ModuleStatus::Damaged => 0.5,
        ModuleStatus::Lost => 0.0,
    }
}

pub fn module_resource_effects(modules: &[ModuleInstance], content: &GameContent) -> ResourceDelta {
    let mut total = ResourceDelta::default();
    for module in modules {
        let Some(def) = content.module_def(&module.def_id) else {
            continue;
        };
        total.add_scaled(&def.effects, status_weight(module.status));
    }
    total
}

/// Aggregates every rule whose required module ids are all present among
/// non-lost modules. Independent of module order.
pub fn evaluate_synergies(modules: &[ModuleInstance], content: &GameContent) -> SynergySummary {
    let available: AHashSet<&ModuleDefId> = modules
        .iter()
        .filter(|module| module.status != ModuleStatus::Lost)
        .map(|module| &module.def_id)
        .collect();

    let active_rules: Vec<_> = content
        .synergies
        .iter()
        .filter(|rule| rule.modules.iter().all(|id| available.contains(id)))
        .collect();

    let amplifier_factor = 1.0
        + active_rules
            .iter()
            .map(|rule| rule.effects.synergy_amplifier)
            .sum::<f32>();

    let mut summary = SynergySummary {
        active: SmallVec::new(),
        decay_multiplier: 1.0,
        event_risk_modifier: 0.0,
        resource_bonus: ResourceDelta::default(),
        resource_penalty: ResourceDelta::default(),
        early_warning: 0,
        auto_repair_interval: None,
        extra_damage: 0,
    };

    for rule in active_rules {
        let effects = &rule.effects;
        let tone_factor = match rule.tone {
            Tone::Positive => amplifier_factor,
            Tone::Negative => 1.0,
        };

        if let Some(multiplier) = effects.decay_multiplier {
            let reduction = 1.0 - multiplier;
            summary.decay_multiplier *= 1.0 - reduction * tone_factor;
        }
        summary
            .resource_bonus
            .add_scaled(&effects.resource_bonus, tone_factor);
        summary
            .resource_penalty
            .add_scaled(&effects.resource_penalty, 1.0);
        summary.event_risk_modifier += effects.event_risk_modifier * tone_factor;
        summary.early_warning = summary.early_warning.max(effects.early_warning);
        if let Some(interval) = effects.auto_repair_interval.filter(|i| *i > 0) {
            summary.auto_repair_interval = Some(
                summary
                    .auto_repair_interval
                    .map_or(interval, |current| current.min(interval)),
            );
        }
        summary.extra_damage += effects.extra_damage;

        summary.active.push(ActiveSynergy {
            id: rule.id.clone(),
            label: rule.label.clone(),
            description: rule.description.clone(),
            tone: rule.tone,
        });
    }

    summary
}

pub fn derive_state(modules: &[ModuleInstance], content: &GameContent) -> DerivedState {
    let synergy = evaluate_synergies(modules, content);
    let resource_modifiers = module_resource_effects(modules, content)
        .plus(&synergy.resource_bonus)
        .minus(&synergy.resource_penalty);
    DerivedState {
        resource_modifiers,
        synergy,
    }
}

pub fn refresh_derived(state: &mut GameState, content: &GameContent) {
    state.derived = derive_state(&state.modules, content);
}
