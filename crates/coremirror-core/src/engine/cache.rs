use super::adapter::Stress;
use nalgebra::Vector3;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Energy,
    Forces,
    Stress,
    Electronegativities,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [
        Quantity::Energy,
        Quantity::Forces,
        Quantity::Stress,
        Quantity::Electronegativities,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuantityValue {
    Energy(f64),
    Forces(Vec<Vector3<f64>>),
    Stress(Stress),
    Electronegativities(Vec<f64>),
}

impl QuantityValue {
    pub fn quantity(&self) -> Quantity {
        match self {
            QuantityValue::Energy(_) => Quantity::Energy,
            QuantityValue::Forces(_) => Quantity::Forces,
            QuantityValue::Stress(_) => Quantity::Stress,
            QuantityValue::Electronegativities(_) => Quantity::Electronegativities,
        }
    }
}

/// Last pulled value of each derived quantity.
///
/// A populated slot is only trustworthy while the engine still holds the state
/// it was computed from; the controller checks that before serving a hit.
#[derive(Debug, Default, Clone)]
pub struct QuantityCache {
    slots: HashMap<Quantity, QuantityValue>,
}

impl QuantityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: QuantityValue) {
        self.slots.insert(value.quantity(), value);
    }

    pub fn get(&self, quantity: Quantity) -> Option<&QuantityValue> {
        self.slots.get(&quantity)
    }

    pub fn is_populated(&self, quantity: Quantity) -> bool {
        self.slots.contains_key(&quantity)
    }

    pub fn invalidate_all(&mut self) {
        self.slots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_stored_under_their_own_quantity() {
        let mut cache = QuantityCache::new();
        cache.insert(QuantityValue::Energy(-1.5));
        cache.insert(QuantityValue::Electronegativities(vec![0.1, -0.1]));

        assert_eq!(cache.get(Quantity::Energy), Some(&QuantityValue::Energy(-1.5)));
        assert!(cache.is_populated(Quantity::Electronegativities));
        assert!(!cache.is_populated(Quantity::Forces));
    }

    #[test]
    fn newer_values_replace_older_ones() {
        let mut cache = QuantityCache::new();
        cache.insert(QuantityValue::Energy(1.0));
        cache.insert(QuantityValue::Energy(2.0));
        assert_eq!(cache.get(Quantity::Energy), Some(&QuantityValue::Energy(2.0)));
    }

    #[test]
    fn invalidate_all_empties_every_slot() {
        let mut cache = QuantityCache::new();
        cache.insert(QuantityValue::Energy(1.0));
        cache.insert(QuantityValue::Stress([0.0; 6]));
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(Quantity::ALL.iter().all(|&q| !cache.is_populated(q)));
    }
}
