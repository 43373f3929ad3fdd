use crate::{Constants, DestinationDef, PlanetProfile, Resources};

/// Projects a destination into the modifiers the engine reads each cycle.
/// `None` yields the neutral default profile.
pub fn resolve_planet_profile(
    destination: Option<&DestinationDef>,
    constants: &Constants,
) -> PlanetProfile {
    let Some(dest) = destination else {
        return PlanetProfile {
            habitat_slots: constants.default_habitat_slots,
            resource_baseline: constants.initial_resources,
            decay_multiplier: 1.0,
            decay_offset: crate::ResourceDelta::default(),
            event_chance_modifier: 0.0,
            incident_risk_modifier: 0.0,
            incident_severity_modifier: 0,
            event_weight_adjustments: std::collections::HashMap::new(),
            environment_summary: String::new(),
        };
    };

    // Baseline keys the destination leaves out keep the initial values.
    let resource_baseline = dest.resource_baseline.map_or(constants.initial_resources, |b| {
        let init = constants.initial_resources;
        Resources::new(
            if b.energy > 0.0 { b.energy } else { init.energy },
            if b.oxygen > 0.0 { b.oxygen } else { init.oxygen },
            if b.morale > 0.0 { b.morale } else { init.morale },
        )
    });

    let hazards = &dest.hazards;
    PlanetProfile {
        habitat_slots: dest.habitat_slots.unwrap_or(constants.default_habitat_slots),
        resource_baseline,
        decay_multiplier: hazards.decay_multiplier.unwrap_or(1.0),
        decay_offset: hazards.decay_offset,
        event_chance_modifier: hazards.event_chance_modifier,
        incident_risk_modifier: hazards.incident_risk_modifier,
        incident_severity_modifier: hazards.incident_severity_modifier,
        event_weight_adjustments: hazards.event_weight_adjustments.clone(),
        environment_summary: dest.environment_summary.clone(),
    }
}
