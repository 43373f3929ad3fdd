//! Resource ledger: three bounded pools mutated only through signed deltas.

use crate::{ResourceDelta, ResourceKey, Resources};

pub const RESOURCE_MIN: f32 = 0.0;
pub const RESOURCE_MAX: f32 = 100.0;

fn clamp_pool(value: f32) -> f32 {
    value.clamp(RESOURCE_MIN, RESOURCE_MAX)
}

impl Resources {
    pub fn new(energy: f32, oxygen: f32, morale: f32) -> Self {
        Self {
            energy: clamp_pool(energy),
            oxygen: clamp_pool(oxygen),
            morale: clamp_pool(morale),
        }
    }

    pub fn get(&self, key: ResourceKey) -> f32 {
        match key {
            ResourceKey::Energy => self.energy,
            ResourceKey::Oxygen => self.oxygen,
            ResourceKey::Morale => self.morale,
        }
    }

    fn slot(&mut self, key: ResourceKey) -> &mut f32 {
        match key {
            ResourceKey::Energy => &mut self.energy,
            ResourceKey::Oxygen => &mut self.oxygen,
            ResourceKey::Morale => &mut self.morale,
        }
    }

    /// Adds `delta` to every pool, clamping each to `[0, 100]`.
    /// Out-of-range results are clamped, never rejected.
    pub fn apply_delta(&mut self, delta: &ResourceDelta) {
        for key in ResourceKey::ALL {
            let slot = self.slot(key);
            *slot = clamp_pool(*slot + delta.get(key));
        }
    }

    pub fn adjust(&mut self, key: ResourceKey, amount: f32) {
        let slot = self.slot(key);
        *slot = clamp_pool(*slot + amount);
    }

    /// True when every pool holds at least the matching (positive) cost.
    pub fn can_afford(&self, cost: &ResourceDelta) -> bool {
        ResourceKey::ALL
            .iter()
            .all(|&key| self.get(key) >= cost.get(key).abs())
    }

    pub fn any_depleted(&self) -> bool {
        ResourceKey::ALL.iter().any(|&key| self.get(key) <= RESOURCE_MIN)
    }

    /// Presentation values, rounded to whole units.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded(&self) -> [u32; 3] {
        [
            self.energy.round() as u32,
            self.oxygen.round() as u32,
            self.morale.round() as u32,
        ]
    }
}

impl ResourceDelta {
    pub fn new(energy: f32, oxygen: f32, morale: f32) -> Self {
        Self {
            energy,
            oxygen,
            morale,
        }
    }

    pub fn single(key: ResourceKey, amount: f32) -> Self {
        let mut delta = Self::default();
        *delta.slot(key) = amount;
        delta
    }

    pub fn get(&self, key: ResourceKey) -> f32 {
        match key {
            ResourceKey::Energy => self.energy,
            ResourceKey::Oxygen => self.oxygen,
            ResourceKey::Morale => self.morale,
        }
    }

    fn slot(&mut self, key: ResourceKey) -> &mut f32 {
        match key {
            ResourceKey::Energy => &mut self.energy,
            ResourceKey::Oxygen => &mut self.oxygen,
            ResourceKey::Morale => &mut self.morale,
        }
    }

    pub fn add_scaled(&mut self, other: &ResourceDelta, factor: f32) {
        for key in ResourceKey::ALL {
            *self.slot(key) += other.get(key) * factor;
        }
    }

    pub fn plus(mut self, other: &ResourceDelta) -> Self {
        self.add_scaled(other, 1.0);
        self
    }

    pub fn minus(mut self, other: &ResourceDelta) -> Self {
        self.add_scaled(other, -1.0);
        self
    }

    /// The delta that pays `self` as a cost: every component made non-positive.
    pub fn as_cost(&self) -> Self {
        Self::new(-self.energy.abs(), -self.oxygen.abs(), -self.morale.abs())
    }

    pub fn is_zero(&self) -> bool {
        ResourceKey::ALL
            .iter()
            .all(|&key| self.get(key).abs() < f32::EPSILON)
    }
}

impl From<ResourceDelta> for Resources {
    fn from(delta: ResourceDelta) -> Self {
        Resources::new(delta.energy, delta.oxygen, delta.morale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_clamps_at_both_bounds() {
        let mut resources = Resources::new(95.0, 3.0, 50.0);
        resources.apply_delta(&ResourceDelta::new(20.0, -10.0, 0.5));
        assert!((resources.energy - 100.0).abs() < 1e-5);
        assert!(resources.oxygen.abs() < 1e-5);
        assert!((resources.morale - 50.5).abs() < 1e-5);
    }

    #[test]
    fn extreme_deltas_stay_in_range() {
        let mut resources = Resources::new(50.0, 50.0, 50.0);
        for amount in [-1e6_f32, 1e6, -250.0, 250.0, -0.001, 0.001] {
            resources.apply_delta(&ResourceDelta::new(amount, -amount, amount * 0.5));
            for key in ResourceKey::ALL {
                let value = resources.get(key);
                assert!((RESOURCE_MIN..=RESOURCE_MAX).contains(&value), "{key:?}={value}");
            }
        }
    }

    #[test]
    fn adjust_touches_one_pool() {
        let mut resources = Resources::new(40.0, 40.0, 40.0);
        resources.adjust(ResourceKey::Morale, -45.0);
        assert!(resources.morale.abs() < 1e-5);
        assert!((resources.energy - 40.0).abs() < 1e-5);
        assert!(resources.any_depleted());
    }

    #[test]
    fn can_afford_compares_against_cost_magnitude() {
        let resources = Resources::new(10.0, 0.0, 2.0);
        assert!(resources.can_afford(&ResourceDelta::new(10.0, 0.0, 2.0)));
        assert!(!resources.can_afford(&ResourceDelta::new(10.5, 0.0, 2.0)));
        assert!(!resources.can_afford(&ResourceDelta::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn rounded_for_presentation() {
        let resources = Resources::new(97.6, 0.4, 50.5);
        assert_eq!(resources.rounded(), [98, 0, 51]);
    }
}
