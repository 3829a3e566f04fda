//! Scatter-pay evaluation and board multiplier reads

use serde::{Deserialize, Serialize};

use crate::board::{Board, Position};
use crate::symbols::SymbolRegistry;

/// Extra detail attached to a symbol win
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinMeta {
    /// Pay before the global multiplier
    pub base_win: f64,
    pub global_mult: u32,
}

/// One paying symbol on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolWin {
    pub symbol: String,
    pub count: u32,
    pub win: f64,
    pub positions: Vec<Position>,
    pub meta: WinMeta,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinData {
    pub total_win: f64,
    pub wins: Vec<SymbolWin>,
}

impl WinData {
    pub fn has_win(&self) -> bool {
        self.total_win > 0.0
    }

    /// Every cell that took part in a win
    pub fn winning_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .wins
            .iter()
            .flat_map(|w| w.positions.iter().copied())
            .collect();
        positions.sort();
        positions.dedup();
        positions
    }
}

/// A multiplier-carrying cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierInfo {
    pub reel: usize,
    pub row: usize,
    pub value: u32,
}

/// Pay each paying symbol by its count anywhere on the board
pub fn get_scatterpays(board: &Board, registry: &SymbolRegistry, global_mult: u32) -> WinData {
    let mut data = WinData::default();

    for symbol in registry.paying_symbols() {
        let positions = board.positions_of(symbol);
        let count = positions.len() as u32;
        let Some(base_win) = registry.pay_for(symbol, count) else {
            continue;
        };

        let win = base_win * global_mult as f64;
        data.total_win += win;
        data.wins.push(SymbolWin {
            symbol: symbol.to_string(),
            count,
            win,
            positions,
            meta: WinMeta {
                base_win,
                global_mult,
            },
        });
    }

    data
}

/// Sum of every multiplier attribute on the board, never below 1
pub fn get_board_multipliers(board: &Board) -> (u32, Vec<MultiplierInfo>) {
    let info: Vec<MultiplierInfo> = board
        .cells()
        .filter_map(|(pos, symbol)| {
            symbol.multiplier.map(|value| MultiplierInfo {
                reel: pos.reel,
                row: pos.row,
                value,
            })
        })
        .collect();

    let sum: u32 = info.iter().map(|m| m.value).sum();
    (sum.max(1), info)
}

/// Largest multiplier attribute on the board (0 when there is none)
pub fn get_highest_multiplier(board: &Board) -> u32 {
    board
        .cells()
        .filter_map(|(_, s)| s.multiplier)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn board_with(symbol: &str, count: usize) -> Board {
        // 6x5 board of filler with `count` copies of `symbol`
        let mut names = vec![vec!["X"; 5]; 6];
        for i in 0..count {
            names[i % 6][i / 6] = symbol;
        }
        Board::from_names(&names)
    }

    #[test]
    fn test_below_threshold_pays_nothing() {
        let registry = SymbolRegistry::standard();
        let data = get_scatterpays(&board_with("H1", 7), &registry, 1);
        assert!(!data.has_win());
        assert!(data.wins.is_empty());
    }

    #[test]
    fn test_scatter_pay_with_global_multiplier() {
        let registry = SymbolRegistry::standard();
        let data = get_scatterpays(&board_with("H2", 10), &registry, 3);
        assert_eq!(data.wins.len(), 1);
        assert_eq!(data.wins[0].count, 10);
        assert_relative_eq!(data.total_win, 30.0);
        assert_eq!(data.winning_positions().len(), 10);
    }

    #[test]
    fn test_board_multiplier_floor() {
        let board = board_with("H1", 3);
        assert_eq!(get_board_multipliers(&board), (1, vec![]));
        assert_eq!(get_highest_multiplier(&board), 0);
    }

    #[test]
    fn test_board_multiplier_sums_attributes() {
        let mut board = board_with("M", 3);
        board.reels[0][0].assign_multiplier(5);
        board.reels[1][0].assign_multiplier(20);
        // Third M stays bare (base game)
        let (total, info) = get_board_multipliers(&board);
        assert_eq!(total, 25);
        assert_eq!(info.len(), 2);
        assert_eq!(get_highest_multiplier(&board), 20);
    }
}
