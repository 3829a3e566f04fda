//! Weighted outcome tables

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{TumbleError, TumbleResult};

/// A single weighted outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: u32,
}

/// Ordered table of weighted outcomes
///
/// Order is preserved so that a given seed always maps to the same outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable<T> {
    entries: Vec<Weighted<T>>,
}

impl<T> Default for WeightTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> WeightTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(value, weight)` pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (T, u32)>) -> Self {
        let mut table = Self::new();
        for (value, weight) in pairs {
            table.insert(value, weight);
        }
        table
    }

    /// Insert or replace the weight of a value
    pub fn insert(&mut self, value: T, weight: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.value == value) {
            entry.weight = weight;
        } else {
            self.entries.push(Weighted { value, weight });
        }
    }

    /// Builder: add an entry
    pub fn with_entry(mut self, value: T, weight: u32) -> Self {
        self.insert(value, weight);
        self
    }

    /// Keep only entries matching the predicate
    pub fn filtered(&self, keep: impl Fn(&T) -> bool) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| keep(&e.value))
                .cloned()
                .collect(),
        }
    }

    /// Iterate over values
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.value)
    }

    /// Iterate over entries
    pub fn entries(&self) -> &[Weighted<T>] {
        &self.entries
    }

    /// Weight of a value (0 if absent)
    pub fn weight_of(&self, value: &T) -> u32 {
        self.entries
            .iter()
            .find(|e| &e.value == value)
            .map(|e| e.weight)
            .unwrap_or(0)
    }

    /// Sum of all weights
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| e.weight as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one value proportionally to its weight
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TumbleResult<T> {
        let total = self.total_weight();
        if total == 0 {
            return Err(TumbleError::EmptyWeightTable(format!(
                "{} entries, zero total weight",
                self.entries.len()
            )));
        }

        let mut roll = rng.random_range(0..total);
        for entry in &self.entries {
            let weight = entry.weight as u64;
            if roll < weight {
                return Ok(entry.value.clone());
            }
            roll -= weight;
        }

        // Unreachable while total > 0
        Err(TumbleError::EmptyWeightTable("roll exceeded total weight".into()))
    }
}

impl WeightTable<u32> {
    /// Drop values below `floor`; the unfiltered table is kept if nothing survives
    pub fn filter_min(&self, floor: u32) -> Self {
        let filtered = self.filtered(|v| *v >= floor);
        if filtered.total_weight() == 0 {
            self.clone()
        } else {
            filtered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sample_respects_zero_weights() {
        let table = WeightTable::from_pairs([(2u32, 0), (5, 10), (10, 0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(table.sample(&mut rng).unwrap(), 5);
        }
    }

    #[test]
    fn test_empty_table_errors() {
        let table: WeightTable<u32> = WeightTable::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            table.sample(&mut rng),
            Err(TumbleError::EmptyWeightTable(_))
        ));
    }

    #[test]
    fn test_insert_replaces_weight() {
        let table = WeightTable::from_pairs([(2u32, 5)]).with_entry(2, 9);
        assert_eq!(table.len(), 1);
        assert_eq!(table.weight_of(&2), 9);
    }

    #[test]
    fn test_filter_min_falls_back_when_empty() {
        let table = WeightTable::from_pairs([(2u32, 5), (5, 3), (20, 1)]);
        assert_eq!(table.filter_min(10).values().copied().collect::<Vec<_>>(), [20]);
        assert_eq!(table.filter_min(100), table);
    }

    #[test]
    fn test_sample_covers_all_entries() {
        let table = WeightTable::from_pairs([(1u32, 1), (2, 1), (3, 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut seen = [false; 3];
        for _ in 0..300 {
            let v = table.sample(&mut rng).unwrap();
            seen[(v - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
