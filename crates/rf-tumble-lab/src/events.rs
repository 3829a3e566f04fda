//! Spin events and the per-simulation book
//!
//! A book collects every event of one accepted round, in emission order.
//! Events of rejected attempts never reach it.

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::config::GameType;
use crate::evaluate::{MultiplierInfo, SymbolWin};
use crate::symbols::Symbol;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════════════════════════════════
    // BOARD
    // ═══════════════════════════════════════════════════════════════════════
    /// Initial board of a spin
    Reveal {
        board: Vec<Vec<Symbol>>,
        gametype: GameType,
    },

    /// Winning cells exploded and fresh symbols fell in
    TumbleBoard {
        exploding: Vec<Position>,
        new_symbols: Vec<Vec<Symbol>>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // WINS
    // ═══════════════════════════════════════════════════════════════════════
    /// Result of one evaluation pass
    WinInfo { total_win: f64, wins: Vec<SymbolWin> },

    /// Running tumble total for the spin
    UpdateTumbleWin { amount: f64 },

    /// Board multiplier applied to the spin win
    BoardMultiplierInfo {
        multiplier: u32,
        positions: Vec<MultiplierInfo>,
        base_win: f64,
        updated_win: f64,
    },

    /// Settled spin win
    SetWin { amount: f64 },

    /// Round total so far
    SetTotalWin { amount: f64 },

    /// Round total reached the win cap
    WinCap { amount: f64 },

    /// Round finished
    FinalWin { amount: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // FREE SPINS
    // ═══════════════════════════════════════════════════════════════════════
    FreeSpinTrigger { total_fs: u32, positions: Vec<Position> },

    FreeSpinRetrigger { total_fs: u32 },

    /// Free spin `amount` of `total` is starting
    UpdateFreeSpin { amount: u32, total: u32 },

    FreeSpinEnd { amount: f64 },
}

impl EventKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Reveal { .. } => "reveal",
            Self::TumbleBoard { .. } => "tumble_board",
            Self::WinInfo { .. } => "win_info",
            Self::UpdateTumbleWin { .. } => "update_tumble_win",
            Self::BoardMultiplierInfo { .. } => "board_multiplier_info",
            Self::SetWin { .. } => "set_win",
            Self::SetTotalWin { .. } => "set_total_win",
            Self::WinCap { .. } => "win_cap",
            Self::FinalWin { .. } => "final_win",
            Self::FreeSpinTrigger { .. } => "free_spin_trigger",
            Self::FreeSpinRetrigger { .. } => "free_spin_retrigger",
            Self::UpdateFreeSpin { .. } => "update_free_spin",
            Self::FreeSpinEnd { .. } => "free_spin_end",
        }
    }
}

/// An event with its position in the book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinEvent {
    pub index: usize,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// One accepted round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Simulation index
    pub id: u64,
    pub criteria: String,
    pub bet_mode: String,
    /// Final round win in base bets
    pub payout_multiplier: f64,
    pub basegame_wins: f64,
    pub freegame_wins: f64,
    /// Largest multiplier seen on any settled board of the round
    pub highest_multiplier: u32,
    pub wincap_triggered: bool,
    pub events: Vec<SpinEvent>,
}

impl Book {
    pub fn new(id: u64, bet_mode: impl Into<String>, criteria: impl Into<String>) -> Self {
        Self {
            id,
            criteria: criteria.into(),
            bet_mode: bet_mode.into(),
            ..Default::default()
        }
    }

    pub fn add_event(&mut self, kind: EventKind) {
        let index = self.events.len();
        self.events.push(SpinEvent { index, kind });
    }

    /// Type names in emission order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.kind.type_name()).collect()
    }

    pub fn events_of(&self, type_name: &str) -> impl Iterator<Item = &EventKind> {
        self.events
            .iter()
            .map(|e| &e.kind)
            .filter(move |k| k.type_name() == type_name)
    }

    /// Number of free spins actually played
    pub fn free_spins_played(&self) -> usize {
        self.events_of("update_free_spin").count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_emission_order() {
        let mut book = Book::new(3, "base", "0");
        book.add_event(EventKind::SetWin { amount: 0.0 });
        book.add_event(EventKind::FinalWin { amount: 0.0 });
        assert_eq!(book.events[1].index, 1);
        assert_eq!(book.event_types(), ["set_win", "final_win"]);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SpinEvent {
            index: 0,
            kind: EventKind::UpdateFreeSpin { amount: 1, total: 10 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "update_free_spin");
        assert_eq!(json["index"], 0);
        assert_eq!(json["total"], 10);
    }
}
