//! Minimum-multiplier guarantee
//!
//! Some modes promise that at least one multiplier of a given value shows up.
//! Natural draws usually satisfy it; when they don't, the board is corrected
//! by upgrading one existing multiplier symbol or injecting a new one.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Position};
use crate::config::{Distribution, GameConfig};
use crate::error::{TumbleError, TumbleResult};
use crate::evaluate::get_highest_multiplier;
use crate::symbols::{Symbol, SymbolRegistry};

/// What the enforcer did to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuaranteeOutcome {
    /// No minimum configured
    NotRequired,
    /// Board already carried a large enough multiplier
    AlreadyMet,
    /// Existing multiplier symbol raised to the minimum
    Upgraded(Position),
    /// Fresh multiplier symbol placed on the board
    Injected(Position),
}

impl GuaranteeOutcome {
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Upgraded(_) | Self::Injected(_))
    }
}

/// Minimum multiplier for a distribution: its own, else the mode's
pub fn required_minimum(config: &GameConfig, mode: &str, distribution: &Distribution) -> Option<u32> {
    distribution
        .conditions
        .guaranteed_min_bomb
        .or_else(|| config.mode_minimum_multiplier.get(mode).copied())
}

/// Make `get_highest_multiplier(board) >= required` hold
pub fn enforce_multiplier_guarantee<R: Rng + ?Sized>(
    board: &mut Board,
    registry: &SymbolRegistry,
    required: Option<u32>,
    min_mult_seen: &mut bool,
    rng: &mut R,
) -> TumbleResult<GuaranteeOutcome> {
    let Some(required) = required else {
        return Ok(GuaranteeOutcome::NotRequired);
    };

    if get_highest_multiplier(board) >= required {
        *min_mult_seen = true;
        return Ok(GuaranteeOutcome::AlreadyMet);
    }

    let multiplier_symbol = registry.multiplier_symbol.as_str();

    // Prefer raising an existing attribute over adding a new one
    let carriers = board.positions_of(multiplier_symbol);
    let upgrade = carriers
        .iter()
        .copied()
        .find(|&pos| board.get(pos).is_some_and(Symbol::has_multiplier))
        .or_else(|| carriers.first().copied());

    if let Some(pos) = upgrade {
        if let Some(symbol) = board.get_mut(pos) {
            symbol.assign_multiplier(required);
        }
        *min_mult_seen = true;
        return Ok(GuaranteeOutcome::Upgraded(pos));
    }

    let candidates: Vec<Position> = board
        .cells()
        .filter(|(_, s)| !registry.is_protected(&s.name))
        .map(|(pos, _)| pos)
        .collect();

    let pos = candidates
        .choose(rng)
        .copied()
        .ok_or_else(|| TumbleError::NoInjectableCell {
            symbol: multiplier_symbol.to_string(),
            required,
        })?;

    board.set(pos, Symbol::with_multiplier(multiplier_symbol, required));
    *min_mult_seen = true;
    Ok(GuaranteeOutcome::Injected(pos))
}
