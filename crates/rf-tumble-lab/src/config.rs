//! Game configuration: reel sets, bet modes and distributions
//!
//! Everything here is read-only once a [`crate::TumbleEngine`] has been built
//! and is shared by reference between simulation workers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{TumbleError, TumbleResult};
use crate::symbols::{ReelStrip, SymbolRegistry};
use crate::weights::WeightTable;

/// Which part of a round is being played
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Paid spin
    #[default]
    BaseGame,
    /// Free spins awarded by scatters
    FreeGame,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseGame => "basegame",
            Self::FreeGame => "freegame",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-distribution simulation conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionConditions {
    /// Reel set weights per gametype (falls back to the config default)
    #[serde(default)]
    pub reel_weights: HashMap<GameType, WeightTable<String>>,
    /// Multiplier value weights per gametype
    #[serde(default)]
    pub mult_values: HashMap<GameType, WeightTable<u32>>,
    /// Scatter counts to force when `force_freegame` is set
    #[serde(default)]
    pub scatter_triggers: Option<WeightTable<u32>>,
    /// Base spin must enter the free game
    #[serde(default)]
    pub force_freegame: bool,
    /// Outcome is expected to hit the win cap
    #[serde(default)]
    pub force_wincap: bool,
    /// Multipliers apply on the single base spin (bonus-buy style)
    #[serde(default)]
    pub single_spin_feature: bool,
    /// At least one multiplier of this value must be seen
    #[serde(default)]
    pub guaranteed_min_bomb: Option<u32>,
    /// Multiplier values below this floor are never drawn
    #[serde(default)]
    pub min_bomb_mult: Option<u32>,
}

/// A named acceptance bucket within a bet mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    /// Criteria name ("basegame", "freegame", "0", "wincap", ...)
    pub criteria: String,
    /// Share of simulations assigned to this bucket
    pub quota: f64,
    /// Exact final win required for acceptance
    #[serde(default)]
    pub win_criteria: Option<f64>,
    #[serde(default)]
    pub conditions: DistributionConditions,
}

impl Distribution {
    pub fn new(criteria: impl Into<String>, quota: f64) -> Self {
        Self {
            criteria: criteria.into(),
            quota,
            win_criteria: None,
            conditions: DistributionConditions::default(),
        }
    }

    /// Builder: exact win criteria
    pub fn with_win_criteria(mut self, win: f64) -> Self {
        self.win_criteria = Some(win);
        self
    }

    /// Builder: conditions
    pub fn with_conditions(mut self, conditions: DistributionConditions) -> Self {
        self.conditions = conditions;
        self
    }
}

/// A purchasable spin variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetMode {
    pub name: String,
    /// Cost in base bets
    pub cost: f64,
    /// Target return to player
    pub rtp: f64,
    /// Maximum win in base bets
    pub max_win: f64,
    #[serde(default)]
    pub is_feature: bool,
    #[serde(default)]
    pub is_buybonus: bool,
    pub distributions: Vec<Distribution>,
}

impl BetMode {
    /// Look up a distribution by criteria name
    pub fn distribution(&self, criteria: &str) -> TumbleResult<&Distribution> {
        self.distributions
            .iter()
            .find(|d| d.criteria == criteria)
            .ok_or_else(|| TumbleError::UnknownDistribution {
                mode: self.name.clone(),
                criteria: criteria.to_string(),
            })
    }

    /// Pick a distribution proportionally to its quota
    pub fn pick_distribution<R: Rng + ?Sized>(&self, rng: &mut R) -> TumbleResult<&Distribution> {
        let total: f64 = self.distributions.iter().map(|d| d.quota.max(0.0)).sum();
        if total <= 0.0 {
            return Err(TumbleError::InvalidConfig(format!(
                "bet mode '{}' has no positive distribution quota",
                self.name
            )));
        }

        let mut roll = rng.random::<f64>() * total;
        for dist in &self.distributions {
            let quota = dist.quota.max(0.0);
            if roll < quota {
                return Ok(dist);
            }
            roll -= quota;
        }

        // Float rounding can leave roll at the very top of the range
        self.distributions
            .iter()
            .rev()
            .find(|d| d.quota > 0.0)
            .ok_or_else(|| TumbleError::InvalidConfig(format!("bet mode '{}'", self.name)))
    }

    pub fn criteria_names(&self) -> Vec<&str> {
        self.distributions.iter().map(|d| d.criteria.as_str()).collect()
    }
}

/// Reject-loop limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerLimits {
    /// Attempt ceiling per spin (`None` = retry forever)
    pub max_attempts: Option<u32>,
}

impl Default for SamplerLimits {
    fn default() -> Self {
        Self {
            max_attempts: Some(100_000),
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_id: String,
    pub num_reels: usize,
    /// Rows per reel (reels may differ)
    pub num_rows: Vec<usize>,
    /// Named reel sets, one strip per reel
    pub reel_sets: HashMap<String, Vec<ReelStrip>>,
    /// Reel set used when a distribution does not choose one
    pub default_reel_set: HashMap<GameType, String>,
    pub symbols: SymbolRegistry,
    /// Mode name → required minimum multiplier
    #[serde(default)]
    pub mode_minimum_multiplier: HashMap<String, u32>,
    /// Gametype → scatter count → awarded spins
    pub freespin_triggers: HashMap<GameType, BTreeMap<u32, u32>>,
    /// Maximum payout per round, in base bets
    pub wincap: f64,
    pub bet_modes: Vec<BetMode>,
    #[serde(default)]
    pub sampler: SamplerLimits,
}

impl GameConfig {
    // ═══════════════════════════════════════════════════════════════════════════
    // LOADING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> TumbleResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TumbleError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> TumbleResult<Self> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| TumbleError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> TumbleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> TumbleResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TumbleError::ConfigParse(e.to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUPS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn bet_mode(&self, name: &str) -> TumbleResult<&BetMode> {
        self.bet_modes
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| TumbleError::UnknownBetMode(name.to_string()))
    }

    pub fn reel_set(&self, name: &str) -> TumbleResult<&[ReelStrip]> {
        self.reel_sets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TumbleError::UnknownReelSet(name.to_string()))
    }

    pub fn trigger_table(&self, gametype: GameType) -> TumbleResult<&BTreeMap<u32, u32>> {
        self.freespin_triggers
            .get(&gametype)
            .filter(|t| !t.is_empty())
            .ok_or(TumbleError::MissingTriggerTable(gametype))
    }

    /// Smallest scatter count that triggers free spins
    pub fn min_trigger_count(&self, gametype: GameType) -> TumbleResult<u32> {
        self.trigger_table(gametype)?
            .keys()
            .next()
            .copied()
            .ok_or(TumbleError::MissingTriggerTable(gametype))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fail fast on configuration that would otherwise surface mid-simulation
    pub fn validate(&self) -> TumbleResult<()> {
        if self.num_reels == 0 || self.num_rows.len() != self.num_reels {
            return Err(TumbleError::InvalidConfig(format!(
                "{} reels but {} row counts",
                self.num_reels,
                self.num_rows.len()
            )));
        }
        if self.num_rows.iter().any(|&r| r == 0) {
            return Err(TumbleError::InvalidConfig("reel with zero rows".into()));
        }

        for (name, strips) in &self.reel_sets {
            if strips.len() != self.num_reels {
                return Err(TumbleError::InvalidConfig(format!(
                    "reel set '{}' has {} strips, expected {}",
                    name,
                    strips.len(),
                    self.num_reels
                )));
            }
            if let Some(strip) = strips.iter().find(|s| s.is_empty()) {
                return Err(TumbleError::EmptyWeightTable(format!(
                    "reel set '{}' strip {}",
                    name, strip.reel_index
                )));
            }
        }

        for gametype in [GameType::BaseGame, GameType::FreeGame] {
            let name = self.default_reel_set.get(&gametype).ok_or_else(|| {
                TumbleError::InvalidConfig(format!("no default reel set for {}", gametype))
            })?;
            self.reel_set(name)?;
            self.trigger_table(gametype)?;
        }

        if self.wincap <= 0.0 {
            return Err(TumbleError::InvalidConfig("wincap must be positive".into()));
        }
        if self.symbols.paytable.is_empty() {
            return Err(TumbleError::InvalidConfig("empty paytable".into()));
        }
        if self
            .symbols
            .paytable
            .values()
            .flatten()
            .any(|tier| tier.pay <= 0.0)
        {
            // Tumble chains rely on every win moving the round toward the cap
            return Err(TumbleError::InvalidConfig("paytable pays must be positive".into()));
        }
        if self.symbols.scatter().is_none() {
            return Err(TumbleError::InvalidConfig("no scatter symbol".into()));
        }
        if self.symbols.multiplier_symbol.is_empty()
            || self.symbols.paytable.contains_key(&self.symbols.multiplier_symbol)
        {
            return Err(TumbleError::InvalidConfig(format!(
                "multiplier symbol '{}' must be named and must not pay",
                self.symbols.multiplier_symbol
            )));
        }

        if self.bet_modes.is_empty() {
            return Err(TumbleError::InvalidConfig("no bet modes".into()));
        }
        let mut seen = HashSet::new();
        for mode in &self.bet_modes {
            if !seen.insert(mode.name.as_str()) {
                return Err(TumbleError::InvalidConfig(format!(
                    "duplicate bet mode '{}'",
                    mode.name
                )));
            }
            if mode.distributions.is_empty() {
                return Err(TumbleError::InvalidConfig(format!(
                    "bet mode '{}' has no distributions",
                    mode.name
                )));
            }
            for dist in &mode.distributions {
                for table in dist.conditions.reel_weights.values() {
                    for reel_set in table.values() {
                        self.reel_set(reel_set)?;
                    }
                }
                for (gametype, table) in &dist.conditions.mult_values {
                    if table.total_weight() == 0 {
                        return Err(TumbleError::EmptyWeightTable(format!(
                            "{}/{} multiplier table for {}",
                            mode.name, dist.criteria, gametype
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRESETS
    // ═══════════════════════════════════════════════════════════════════════════

    /// 6×5 scatter-pay tumble game with multiplier bombs and seven bet modes
    pub fn multiplier_demo() -> Self {
        let num_reels = 6;
        let num_rows = vec![5; num_reels];

        let base_weights = |with_mult: u32, scatter: u32| {
            let mut table = WeightTable::from_pairs([
                ("H1".to_string(), 3),
                ("H2".to_string(), 4),
                ("H3".to_string(), 5),
                ("H4".to_string(), 6),
                ("L1".to_string(), 8),
                ("L2".to_string(), 9),
                ("L3".to_string(), 10),
                ("L4".to_string(), 11),
                ("L5".to_string(), 12),
                ("S".to_string(), scatter),
            ]);
            if with_mult > 0 {
                table.insert("M".to_string(), with_mult);
            }
            table
        };
        let reel_set = |with_mult: u32, scatter: u32| -> Vec<ReelStrip> {
            (0..num_reels)
                .map(|reel| ReelStrip::new(reel, base_weights(with_mult, scatter)))
                .collect()
        };

        let mut reel_sets = HashMap::new();
        reel_sets.insert("BR0".to_string(), reel_set(0, 2));
        reel_sets.insert("BRS".to_string(), reel_set(0, 3));
        reel_sets.insert("BRM".to_string(), reel_set(3, 2));
        reel_sets.insert("FR0".to_string(), reel_set(4, 2));
        reel_sets.insert(
            "WCAP".to_string(),
            (0..num_reels)
                .map(|reel| {
                    ReelStrip::new(
                        reel,
                        WeightTable::from_pairs([
                            ("H1".to_string(), 20),
                            ("H2".to_string(), 4),
                            ("L5".to_string(), 4),
                            ("M".to_string(), 6),
                            ("S".to_string(), 1),
                        ]),
                    )
                })
                .collect(),
        );

        let mut default_reel_set = HashMap::new();
        default_reel_set.insert(GameType::BaseGame, "BR0".to_string());
        default_reel_set.insert(GameType::FreeGame, "FR0".to_string());

        let mut freespin_triggers = HashMap::new();
        freespin_triggers.insert(GameType::BaseGame, BTreeMap::from([(4, 10), (5, 12), (6, 15)]));
        freespin_triggers.insert(GameType::FreeGame, BTreeMap::from([(3, 5), (4, 8), (5, 10)]));

        let mode_minimum_multiplier = HashMap::from([
            ("min_one_x10".to_string(), 10),
            ("min_one_x100".to_string(), 100),
            ("min_one_x1000".to_string(), 1000),
        ]);

        let wincap = 25_000.0;

        Self {
            game_id: "multiplier_demo".into(),
            num_reels,
            num_rows,
            reel_sets,
            default_reel_set,
            symbols: SymbolRegistry::standard(),
            mode_minimum_multiplier,
            freespin_triggers,
            wincap,
            bet_modes: presets::bet_modes(wincap),
            sampler: SamplerLimits::default(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::multiplier_demo()
    }
}

mod presets {
    use super::*;

    fn freegame_mults() -> WeightTable<u32> {
        WeightTable::from_pairs([
            (2, 100),
            (3, 80),
            (4, 60),
            (5, 50),
            (6, 40),
            (8, 30),
            (10, 25),
            (12, 15),
            (15, 10),
            (20, 8),
            (25, 5),
            (50, 3),
            (100, 1),
        ])
    }

    fn single_spin_mults() -> WeightTable<u32> {
        WeightTable::from_pairs([
            (2, 60),
            (5, 40),
            (10, 30),
            (25, 15),
            (50, 8),
            (100, 4),
            (250, 2),
            (500, 1),
        ])
    }

    fn reels(gametype: GameType, name: &str) -> HashMap<GameType, WeightTable<String>> {
        HashMap::from([(gametype, WeightTable::from_pairs([(name.to_string(), 1)]))])
    }

    fn scatter_triggers() -> WeightTable<u32> {
        WeightTable::from_pairs([(4, 20), (5, 5), (6, 1)])
    }

    fn freegame(quota: f64, base_reels: &str) -> Distribution {
        let mut reel_weights = reels(GameType::BaseGame, base_reels);
        reel_weights.extend(reels(GameType::FreeGame, "FR0"));
        Distribution::new("freegame", quota).with_conditions(DistributionConditions {
            reel_weights,
            mult_values: HashMap::from([(GameType::FreeGame, freegame_mults())]),
            scatter_triggers: Some(scatter_triggers()),
            force_freegame: true,
            ..Default::default()
        })
    }

    fn wincap(quota: f64, wincap: f64) -> Distribution {
        let mut reel_weights = reels(GameType::BaseGame, "BR0");
        reel_weights.extend(reels(GameType::FreeGame, "WCAP"));
        Distribution::new("wincap", quota)
            .with_win_criteria(wincap)
            .with_conditions(DistributionConditions {
                reel_weights,
                mult_values: HashMap::from([(
                    GameType::FreeGame,
                    WeightTable::from_pairs([(50, 5), (100, 10), (500, 5), (1000, 2)]),
                )]),
                scatter_triggers: Some(WeightTable::from_pairs([(5, 1), (6, 2)])),
                force_freegame: true,
                force_wincap: true,
                ..Default::default()
            })
    }

    fn zero_win(quota: f64, base_reels: &str) -> Distribution {
        Distribution::new("0", quota)
            .with_win_criteria(0.0)
            .with_conditions(DistributionConditions {
                reel_weights: reels(GameType::BaseGame, base_reels),
                ..Default::default()
            })
    }

    fn basegame(quota: f64, base_reels: &str) -> Distribution {
        Distribution::new("basegame", quota).with_conditions(DistributionConditions {
            reel_weights: reels(GameType::BaseGame, base_reels),
            ..Default::default()
        })
    }

    fn single_spin(name: &str, cost: f64, need: u32, max_win: f64) -> BetMode {
        let conditions = |criteria_reels: &str| DistributionConditions {
            reel_weights: reels(GameType::BaseGame, criteria_reels),
            mult_values: HashMap::from([(GameType::BaseGame, single_spin_mults())]),
            single_spin_feature: true,
            guaranteed_min_bomb: Some(need),
            ..Default::default()
        };
        BetMode {
            name: name.into(),
            cost,
            rtp: 0.965,
            max_win,
            is_feature: false,
            is_buybonus: true,
            distributions: vec![
                Distribution::new("0", 0.3)
                    .with_win_criteria(0.0)
                    .with_conditions(conditions("BRM")),
                Distribution::new("basegame", 0.7).with_conditions(conditions("BRM")),
            ],
        }
    }

    pub(super) fn bet_modes(max_win: f64) -> Vec<BetMode> {
        let mut no_small_bomb = freegame(1.0, "BR0");
        no_small_bomb.conditions.min_bomb_mult = Some(10);

        vec![
            BetMode {
                name: "base".into(),
                cost: 1.0,
                rtp: 0.965,
                max_win,
                is_feature: true,
                is_buybonus: false,
                distributions: vec![
                    wincap(0.001, max_win),
                    zero_win(0.4, "BR0"),
                    freegame(0.1, "BR0"),
                    basegame(0.5, "BR0"),
                ],
            },
            BetMode {
                name: "bonus".into(),
                cost: 100.0,
                rtp: 0.965,
                max_win,
                is_feature: false,
                is_buybonus: true,
                distributions: vec![wincap(0.001, max_win), freegame(0.999, "BR0")],
            },
            BetMode {
                name: "doubleboost".into(),
                cost: 1.3,
                rtp: 0.965,
                max_win,
                is_feature: true,
                is_buybonus: false,
                distributions: vec![
                    wincap(0.001, max_win),
                    zero_win(0.4, "BR0"),
                    freegame(0.2, "BRS"),
                    basegame(0.4, "BR0"),
                ],
            },
            BetMode {
                name: "no_small_bomb".into(),
                cost: 500.0,
                rtp: 0.965,
                max_win,
                is_feature: false,
                is_buybonus: true,
                distributions: vec![no_small_bomb],
            },
            single_spin("min_one_x10", 5.0, 10, max_win),
            single_spin("min_one_x100", 250.0, 100, max_win),
            single_spin("min_one_x1000", 1000.0, 1000, max_win),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_demo_config_is_valid() {
        let config = GameConfig::multiplier_demo();
        config.validate().unwrap();

        let names: Vec<_> = config.bet_modes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "base",
                "bonus",
                "doubleboost",
                "no_small_bomb",
                "min_one_x10",
                "min_one_x100",
                "min_one_x1000"
            ]
        );
        assert!(config.bet_modes.iter().all(|m| (m.rtp - 0.965).abs() < 1e-9));
    }

    #[test]
    fn test_demo_costs() {
        let config = GameConfig::multiplier_demo();
        let cost = |name: &str| config.bet_mode(name).unwrap().cost;
        assert_eq!(cost("base"), 1.0);
        assert_eq!(cost("bonus"), 100.0);
        assert_eq!(cost("doubleboost"), 1.3);
        assert_eq!(cost("no_small_bomb"), 500.0);
        assert_eq!(cost("min_one_x10"), 5.0);
        assert_eq!(cost("min_one_x100"), 250.0);
        assert_eq!(cost("min_one_x1000"), 1000.0);
    }

    #[test]
    fn test_missing_trigger_table_fails_fast() {
        let mut config = GameConfig::multiplier_demo();
        config.freespin_triggers.remove(&GameType::FreeGame);
        assert!(matches!(
            config.validate(),
            Err(TumbleError::MissingTriggerTable(GameType::FreeGame))
        ));
    }

    #[test]
    fn test_empty_multiplier_table_fails_fast() {
        let mut config = GameConfig::multiplier_demo();
        config.bet_modes[1].distributions[1]
            .conditions
            .mult_values
            .insert(GameType::FreeGame, WeightTable::new());
        assert!(matches!(
            config.validate(),
            Err(TumbleError::EmptyWeightTable(_))
        ));
    }

    #[test]
    fn test_row_count_mismatch() {
        let mut config = GameConfig::multiplier_demo();
        config.num_rows.pop();
        assert!(matches!(config.validate(), Err(TumbleError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_lookups() {
        let config = GameConfig::multiplier_demo();
        assert!(matches!(
            config.bet_mode("nope"),
            Err(TumbleError::UnknownBetMode(_))
        ));
        assert!(matches!(
            config.bet_mode("base").unwrap().distribution("nope"),
            Err(TumbleError::UnknownDistribution { .. })
        ));
    }

    #[test]
    fn test_json_round_trip_preserves_modes() {
        let config = GameConfig::multiplier_demo();
        let json = config.to_json().unwrap();
        let parsed = GameConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.bet_modes.len(), config.bet_modes.len());
        assert_eq!(parsed.freespin_triggers, config.freespin_triggers);
        assert_eq!(parsed.mode_minimum_multiplier, config.mode_minimum_multiplier);
    }

    #[test]
    fn test_pick_distribution_follows_quota() {
        let config = GameConfig::multiplier_demo();
        let mode = config.bet_mode("bonus").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let freegame = (0..1000)
            .filter(|_| mode.pick_distribution(&mut rng).unwrap().criteria == "freegame")
            .count();
        assert!(freegame > 980);
    }
}
