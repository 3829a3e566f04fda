//! Running win totals for one simulated round

use serde::{Deserialize, Serialize};

use crate::config::GameType;

/// Win accumulators
///
/// `tumble_win` is the latest evaluation pass, `spin_win` the current spin
/// (all tumbles), `running_bet_win` the whole round across base and free game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinManager {
    pub spin_win: f64,
    pub tumble_win: f64,
    pub basegame_wins: f64,
    pub freegame_wins: f64,
    pub running_bet_win: f64,
}

impl WinManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an evaluation pass
    pub fn update_spinwin(&mut self, amount: f64) {
        self.tumble_win = amount;
        self.spin_win += amount;
    }

    pub fn set_spin_win(&mut self, amount: f64) {
        self.spin_win = amount;
    }

    /// Bank the settled spin into the round totals for `gametype`
    pub fn update_gametype_wins(&mut self, gametype: GameType) {
        match gametype {
            GameType::BaseGame => self.basegame_wins += self.spin_win,
            GameType::FreeGame => self.freegame_wins += self.spin_win,
        }
        self.running_bet_win += self.spin_win;
    }

    /// Round total including the spin still in progress
    pub fn pending_total(&self) -> f64 {
        self.running_bet_win + self.spin_win
    }

    pub fn reset_spin(&mut self) {
        self.spin_win = 0.0;
        self.tumble_win = 0.0;
    }

    pub fn reset_book(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gametype_banking() {
        let mut wins = WinManager::new();
        wins.update_spinwin(2.0);
        wins.update_spinwin(3.0);
        assert_relative_eq!(wins.tumble_win, 3.0);
        assert_relative_eq!(wins.spin_win, 5.0);

        wins.update_gametype_wins(GameType::BaseGame);
        wins.reset_spin();
        wins.update_spinwin(10.0);
        wins.update_gametype_wins(GameType::FreeGame);

        assert_relative_eq!(wins.basegame_wins, 5.0);
        assert_relative_eq!(wins.freegame_wins, 10.0);
        assert_relative_eq!(wins.running_bet_win, 15.0);

        wins.reset_book();
        assert_eq!(wins, WinManager::default());
    }
}
