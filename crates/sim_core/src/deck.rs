//! Weighted random selection and the injectable random source.

use rand::Rng;

use crate::{GameContent, HazardDef, PlanetProfile};

/// Uniform draws in `[0, 1)`. Every `rand::Rng` is a source; tests script one.
pub trait RandomSource {
    fn next_unit(&mut self) -> f32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn pick_index(&mut self, len: usize) -> usize {
        let index = (self.next_unit() * len as f32) as usize;
        index.min(len - 1)
    }
}

impl<R: Rng> RandomSource for R {
    fn next_unit(&mut self) -> f32 {
        self.gen::<f32>()
    }
}

/// Walks `items` subtracting each weight from a uniform draw over the total.
///
/// Negative weights count as zero. Falls back to a uniform pick when the total
/// weight is not positive, and to the last item if rounding runs off the end.
pub fn pick_weighted<'a, T>(
    items: &'a [T],
    weight_of: impl Fn(&T) -> f32,
    rng: &mut impl RandomSource,
) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let total: f32 = items.iter().map(|item| weight_of(item).max(0.0)).sum();
    if total <= 0.0 {
        return Some(&items[rng.pick_index(items.len())]);
    }
    let mut roll = rng.next_unit() * total;
    for item in items {
        let weight = weight_of(item).max(0.0);
        if roll < weight {
            return Some(item);
        }
        roll -= weight;
    }
    items.last()
}

/// Selection weight of a hazard at the active destination.
///
/// Base weight defaults to 1; the destination multiplier defaults to 1 and a
/// multiplier of 0 takes the hazard out of rotation without removing it.
pub fn hazard_weight(hazard: &HazardDef, profile: &PlanetProfile) -> f32 {
    let base = hazard.weight.unwrap_or(1.0);
    let multiplier = profile
        .event_weight_adjustments
        .get(&hazard.id)
        .copied()
        .unwrap_or(1.0);
    (base * multiplier).max(0.0)
}

pub fn draw_hazard<'a>(
    content: &'a GameContent,
    profile: &PlanetProfile,
    rng: &mut impl RandomSource,
) -> Option<&'a HazardDef> {
    pick_weighted(&content.hazards, |hazard| hazard_weight(hazard, profile), rng)
}
