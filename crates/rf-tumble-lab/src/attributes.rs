//! Special-symbol rules
//!
//! A rule runs on every freshly revealed cell whose symbol it is registered
//! for: once on the initial board and again on each tumble refill. Rules are
//! looked up by symbol name through [`SpecialSymbolRules`].

use std::collections::HashMap;

use rand::RngCore;

use crate::board::{Board, Position};
use crate::config::{DistributionConditions, GameType};
use crate::error::{TumbleError, TumbleResult};
use crate::symbols::Symbol;

/// Everything a rule may read, plus the flags it may set
pub struct RuleContext<'a> {
    pub gametype: GameType,
    pub mode: &'a str,
    pub criteria: &'a str,
    pub conditions: &'a DistributionConditions,
    /// Multiplier that must appear at least once, if any
    pub required_minimum: Option<u32>,
    /// Set once a multiplier equal to the required minimum is assigned
    pub min_mult_seen: &'a mut bool,
    pub rng: &'a mut dyn RngCore,
}

/// A policy that attaches attributes to a freshly revealed symbol
pub trait SymbolRule: Send + Sync {
    /// Rule name, for logging
    fn name(&self) -> &str;

    /// Mutate `symbol` in place
    fn apply(&self, symbol: &mut Symbol, ctx: &mut RuleContext<'_>) -> TumbleResult<()>;
}

/// Multiplier attribute assignment
///
/// Active only in the free game or in single-spin feature modes; elsewhere
/// the symbol stays bare. Values come from the distribution's per-gametype
/// table, falling back to the free-game table.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplierRule;

impl MultiplierRule {
    fn is_active(ctx: &RuleContext<'_>) -> bool {
        ctx.gametype == GameType::FreeGame || ctx.conditions.single_spin_feature
    }
}

impl SymbolRule for MultiplierRule {
    fn name(&self) -> &str {
        "multiplier"
    }

    fn apply(&self, symbol: &mut Symbol, ctx: &mut RuleContext<'_>) -> TumbleResult<()> {
        if !Self::is_active(ctx) {
            return Ok(());
        }

        let mult_values = &ctx.conditions.mult_values;
        let base_table = mult_values
            .get(&ctx.gametype)
            .or_else(|| mult_values.get(&GameType::FreeGame))
            .ok_or_else(|| TumbleError::MissingMultiplierTable {
                gametype: ctx.gametype,
                mode: ctx.mode.to_string(),
                criteria: ctx.criteria.to_string(),
            })?;

        let mut table = base_table.clone();
        if let Some(need) = ctx.required_minimum {
            if !table.values().any(|v| *v >= need) {
                table.insert(need, 1);
            }
        }
        if let Some(floor) = ctx.conditions.min_bomb_mult {
            table = table.filter_min(floor);
        }

        let value = table.sample(&mut *ctx.rng)?;
        symbol.assign_multiplier(value);

        if ctx.required_minimum == Some(value) {
            *ctx.min_mult_seen = true;
        }

        Ok(())
    }
}

/// Symbol name → rules run on each new instance of that symbol
#[derive(Default)]
pub struct SpecialSymbolRules {
    rules: HashMap<String, Vec<Box<dyn SymbolRule>>>,
}

impl SpecialSymbolRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default rules: multiplier assignment on `multiplier_symbol`
    pub fn standard(multiplier_symbol: &str) -> Self {
        Self::new().with_rule(multiplier_symbol, MultiplierRule)
    }

    pub fn register(&mut self, symbol: impl Into<String>, rule: impl SymbolRule + 'static) {
        self.rules
            .entry(symbol.into())
            .or_default()
            .push(Box::new(rule));
    }

    /// Builder: register a rule
    pub fn with_rule(mut self, symbol: impl Into<String>, rule: impl SymbolRule + 'static) -> Self {
        self.register(symbol, rule);
        self
    }

    pub fn is_special(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Apply all matching rules to one symbol
    pub fn apply(&self, symbol: &mut Symbol, ctx: &mut RuleContext<'_>) -> TumbleResult<()> {
        if let Some(rules) = self.rules.get(&symbol.name) {
            for rule in rules {
                rule.apply(symbol, ctx)?;
            }
        }
        Ok(())
    }

    /// Apply rules to the given cells of a board
    pub fn apply_to_cells(
        &self,
        board: &mut Board,
        cells: &[Position],
        ctx: &mut RuleContext<'_>,
    ) -> TumbleResult<()> {
        for &pos in cells {
            if let Some(symbol) = board.get_mut(pos) {
                self.apply(symbol, ctx)?;
            }
        }
        Ok(())
    }

    /// Apply rules to every special cell on the board
    pub fn apply_to_board(&self, board: &mut Board, ctx: &mut RuleContext<'_>) -> TumbleResult<()> {
        let cells: Vec<Position> = board
            .cells()
            .filter(|(_, s)| self.is_special(&s.name))
            .map(|(pos, _)| pos)
            .collect();
        self.apply_to_cells(board, &cells, ctx)
    }
}

impl std::fmt::Debug for SpecialSymbolRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (symbol, rules) in &self.rules {
            let names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
            map.entry(symbol, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightTable;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn conditions(gametype: GameType, table: WeightTable<u32>) -> DistributionConditions {
        DistributionConditions {
            mult_values: HashMap::from([(gametype, table)]),
            ..Default::default()
        }
    }

    fn run(
        gametype: GameType,
        conditions: &DistributionConditions,
        required_minimum: Option<u32>,
        seed: u64,
    ) -> TumbleResult<(Symbol, bool)> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut seen = false;
        let mut symbol = Symbol::new("M");
        let mut ctx = RuleContext {
            gametype,
            mode: "test",
            criteria: "freegame",
            conditions,
            required_minimum,
            min_mult_seen: &mut seen,
            rng: &mut rng,
        };
        MultiplierRule.apply(&mut symbol, &mut ctx)?;
        Ok((symbol, seen))
    }

    #[test]
    fn test_base_game_leaves_symbol_bare() {
        let cond = conditions(GameType::FreeGame, WeightTable::from_pairs([(2, 1)]));
        let (symbol, _) = run(GameType::BaseGame, &cond, None, 1).unwrap();
        assert_eq!(symbol.multiplier, None);
    }

    #[test]
    fn test_single_spin_assigns_in_base_game() {
        let mut cond = conditions(GameType::BaseGame, WeightTable::from_pairs([(5, 1)]));
        cond.single_spin_feature = true;
        let (symbol, _) = run(GameType::BaseGame, &cond, None, 1).unwrap();
        assert_eq!(symbol.multiplier, Some(5));
    }

    #[test]
    fn test_falls_back_to_freegame_table() {
        let mut cond = conditions(GameType::FreeGame, WeightTable::from_pairs([(3, 1)]));
        cond.single_spin_feature = true;
        let (symbol, _) = run(GameType::BaseGame, &cond, None, 1).unwrap();
        assert_eq!(symbol.multiplier, Some(3));
    }

    #[test]
    fn test_missing_table_fails() {
        let cond = DistributionConditions::default();
        assert!(matches!(
            run(GameType::FreeGame, &cond, None, 1),
            Err(TumbleError::MissingMultiplierTable { .. })
        ));
    }

    #[test]
    fn test_unreachable_need_is_added() {
        let cond = conditions(GameType::FreeGame, WeightTable::from_pairs([(2, 0), (5, 0)]));
        let (symbol, seen) = run(GameType::FreeGame, &cond, Some(1000), 9).unwrap();
        assert_eq!(symbol.multiplier, Some(1000));
        assert!(seen);
    }

    #[test]
    fn test_min_bomb_floor() {
        let mut cond = conditions(
            GameType::FreeGame,
            WeightTable::from_pairs([(2, 100), (5, 100), (10, 1), (25, 1)]),
        );
        cond.min_bomb_mult = Some(10);
        for seed in 0..50 {
            let (symbol, _) = run(GameType::FreeGame, &cond, None, seed).unwrap();
            assert!(symbol.multiplier.unwrap() >= 10);
        }
    }

    #[test]
    fn test_min_bomb_floor_reverts_when_nothing_survives() {
        let mut cond = conditions(GameType::FreeGame, WeightTable::from_pairs([(2, 1)]));
        cond.min_bomb_mult = Some(10);
        let (symbol, _) = run(GameType::FreeGame, &cond, None, 3).unwrap();
        assert_eq!(symbol.multiplier, Some(2));
    }

    #[test]
    fn test_registry_applies_only_to_registered_symbols() {
        let rules = SpecialSymbolRules::standard("M");
        let mut cond = conditions(GameType::FreeGame, WeightTable::from_pairs([(4, 1)]));
        cond.single_spin_feature = false;
        let mut board = Board::from_names(&[vec!["M", "H1"], vec!["S", "M"]]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut seen = false;
        let mut ctx = RuleContext {
            gametype: GameType::FreeGame,
            mode: "bonus",
            criteria: "freegame",
            conditions: &cond,
            required_minimum: None,
            min_mult_seen: &mut seen,
            rng: &mut rng,
        };
        rules.apply_to_board(&mut board, &mut ctx).unwrap();

        assert_eq!(board.reels[0][0].multiplier, Some(4));
        assert_eq!(board.reels[1][1].multiplier, Some(4));
        assert_eq!(board.reels[0][1].multiplier, None);
        assert!(!rules.is_special("S"));
    }
}
