//! Symbol definitions, weighted reel strips and the symbol registry

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{TumbleError, TumbleResult};
use crate::weights::WeightTable;

/// A symbol instance on the board
///
/// Every board cell owns its own instance, so an attribute assigned to one
/// cell never leaks into another cell carrying the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol name (e.g., "H1", "L3", "S", "M")
    pub name: String,
    /// Multiplier attribute, if one was assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
}

impl Symbol {
    /// Create a bare symbol
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiplier: None,
        }
    }

    /// Create a symbol carrying a multiplier
    pub fn with_multiplier(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            multiplier: Some(value),
        }
    }

    /// Attach (or overwrite) the multiplier attribute
    pub fn assign_multiplier(&mut self, value: u32) {
        self.multiplier = Some(value);
    }

    pub fn has_multiplier(&self) -> bool {
        self.multiplier.is_some()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Pays by count anywhere on the board
    Paying,
    /// Triggers free spins, never pays
    Scatter,
    /// Carries a multiplier attribute
    Multiplier,
    /// Occupies a cell, never pays and never receives injections
    Blocker,
}

/// A weighted reel strip
///
/// Each row of a reel is an independent draw from the strip's weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelStrip {
    /// Reel index
    pub reel_index: usize,
    /// Symbol weights for this reel
    pub weights: WeightTable<String>,
}

impl ReelStrip {
    /// Create a strip from symbol weights
    pub fn new(reel_index: usize, weights: WeightTable<String>) -> Self {
        Self {
            reel_index,
            weights,
        }
    }

    /// Build from a physical strip: every stop weighs 1
    pub fn from_sequence<S: AsRef<str>>(reel_index: usize, stops: &[S]) -> Self {
        let mut weights = WeightTable::new();
        for stop in stops {
            let name = stop.as_ref().to_string();
            let current = weights.weight_of(&name);
            weights.insert(name, current + 1);
        }
        Self::new(reel_index, weights)
    }

    /// Draw one fresh symbol
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> TumbleResult<Symbol> {
        self.weights
            .sample(rng)
            .map(Symbol::new)
            .map_err(|_| {
                TumbleError::EmptyWeightTable(format!("reel strip {}", self.reel_index))
            })
    }

    /// Probability of drawing a symbol on this reel
    pub fn probability_of(&self, name: &str) -> f64 {
        let total = self.weights.total_weight();
        if total == 0 {
            return 0.0;
        }
        self.weights.weight_of(&name.to_string()) as f64 / total as f64
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.total_weight() == 0
    }
}

/// A pay tier: `pay` applies from `min_count` symbols upward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayTier {
    pub min_count: u32,
    pub pay: f64,
}

/// Symbol registry and scatter-pay paytable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRegistry {
    /// Pay tiers per paying symbol, ascending by `min_count`
    pub paytable: BTreeMap<String, Vec<PayTier>>,
    /// Scatter symbol names
    pub scatters: Vec<String>,
    /// Blocking symbol names
    #[serde(default)]
    pub blockers: Vec<String>,
    /// Name of the multiplier-carrying symbol
    pub multiplier_symbol: String,
}

impl SymbolRegistry {
    /// Classify a symbol name
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        if self.scatters.iter().any(|s| s == name) {
            Some(SymbolKind::Scatter)
        } else if self.multiplier_symbol == name {
            Some(SymbolKind::Multiplier)
        } else if self.blockers.iter().any(|s| s == name) {
            Some(SymbolKind::Blocker)
        } else if self.paytable.contains_key(name) {
            Some(SymbolKind::Paying)
        } else {
            None
        }
    }

    /// Cells holding these symbols never receive an injected symbol
    pub fn is_protected(&self, name: &str) -> bool {
        matches!(
            self.kind_of(name),
            Some(SymbolKind::Scatter) | Some(SymbolKind::Blocker)
        )
    }

    /// Primary scatter name
    pub fn scatter(&self) -> Option<&str> {
        self.scatters.first().map(String::as_str)
    }

    /// Pay for `count` symbols of `name`: highest tier whose threshold is met
    pub fn pay_for(&self, name: &str, count: u32) -> Option<f64> {
        self.paytable.get(name).and_then(|tiers| {
            tiers
                .iter()
                .filter(|t| t.min_count <= count)
                .max_by_key(|t| t.min_count)
                .map(|t| t.pay)
        })
    }

    /// Paying symbol names
    pub fn paying_symbols(&self) -> impl Iterator<Item = &str> {
        self.paytable.keys().map(String::as_str)
    }

    /// Standard scatter-pay registry: 4 high, 5 low, scatter `S`, multiplier `M`
    pub fn standard() -> Self {
        let tiers = |pays: [f64; 3]| {
            vec![
                PayTier { min_count: 8, pay: pays[0] },
                PayTier { min_count: 10, pay: pays[1] },
                PayTier { min_count: 12, pay: pays[2] },
            ]
        };

        let mut paytable = BTreeMap::new();
        paytable.insert("H1".to_string(), tiers([10.0, 25.0, 50.0]));
        paytable.insert("H2".to_string(), tiers([2.5, 10.0, 25.0]));
        paytable.insert("H3".to_string(), tiers([2.0, 5.0, 15.0]));
        paytable.insert("H4".to_string(), tiers([1.5, 2.0, 12.0]));
        paytable.insert("L1".to_string(), tiers([1.0, 1.5, 10.0]));
        paytable.insert("L2".to_string(), tiers([0.8, 1.2, 8.0]));
        paytable.insert("L3".to_string(), tiers([0.5, 1.0, 5.0]));
        paytable.insert("L4".to_string(), tiers([0.4, 0.9, 4.0]));
        paytable.insert("L5".to_string(), tiers([0.25, 0.75, 2.0]));

        Self {
            paytable,
            scatters: vec!["S".to_string()],
            blockers: vec!["BLOCK".to_string()],
            multiplier_symbol: "M".to_string(),
        }
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_pay_for_tiers() {
        let registry = SymbolRegistry::standard();
        assert_eq!(registry.pay_for("H1", 7), None);
        assert_eq!(registry.pay_for("H1", 8), Some(10.0));
        assert_eq!(registry.pay_for("H1", 11), Some(25.0));
        assert_eq!(registry.pay_for("H1", 30), Some(50.0));
        assert_eq!(registry.pay_for("S", 10), None);
    }

    #[test]
    fn test_kind_of() {
        let registry = SymbolRegistry::standard();
        assert_eq!(registry.kind_of("S"), Some(SymbolKind::Scatter));
        assert_eq!(registry.kind_of("M"), Some(SymbolKind::Multiplier));
        assert_eq!(registry.kind_of("L2"), Some(SymbolKind::Paying));
        assert!(registry.is_protected("BLOCK"));
        assert!(!registry.is_protected("M"));
    }

    #[test]
    fn test_strip_from_sequence_counts_stops() {
        let strip = ReelStrip::from_sequence(0, &["H1", "L1", "L1", "S"]);
        assert_eq!(strip.weights.weight_of(&"L1".to_string()), 2);
        assert!((strip.probability_of("L1") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_strip_draw_returns_fresh_symbol() {
        let strip = ReelStrip::from_sequence(0, &["M"]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut a = strip.draw(&mut rng).unwrap();
        let b = strip.draw(&mut rng).unwrap();
        a.assign_multiplier(50);
        assert_eq!(b.multiplier, None);
    }
}
