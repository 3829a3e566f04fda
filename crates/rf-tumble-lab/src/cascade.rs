//! Cascade controller
//!
//! ```text
//! Evaluating ──(win, no cap)──> Tumbling ──> Evaluating
//!     │
//!     └──(no win or capped)──> Settling ──> Done
//! ```
//!
//! The board multiplier is applied once, in `Settling`. The win cap is
//! checked after every evaluation and again after settling; once it
//! triggers no further tumble happens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{SpinContext, TumbleEngine};
use crate::error::TumbleResult;
use crate::evaluate::{get_board_multipliers, get_highest_multiplier, get_scatterpays};
use crate::events::EventKind;
use crate::symbols::Symbol;

/// Cascade state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadePhase {
    Evaluating,
    Tumbling,
    Settling,
    Done,
}

impl TumbleEngine {
    /// Evaluate and tumble until no win remains or the cap triggers, then settle
    pub fn run_cascade(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        self.state.wins.reset_spin();
        self.state.tumble_count = 0;

        let mut phase = CascadePhase::Evaluating;
        while phase != CascadePhase::Done {
            phase = self.step_cascade(phase, spin)?;
        }
        Ok(())
    }

    /// Advance the cascade by one phase
    pub fn step_cascade(
        &mut self,
        phase: CascadePhase,
        spin: &SpinContext<'_>,
    ) -> TumbleResult<CascadePhase> {
        let next = match phase {
            CascadePhase::Evaluating => {
                self.get_scatterpays_update_wins();
                self.evaluate_wincap();
                if self.state.wins.tumble_win > 0.0 && !self.state.wincap_triggered {
                    CascadePhase::Tumbling
                } else {
                    CascadePhase::Settling
                }
            }
            CascadePhase::Tumbling => {
                self.tumble_board(spin)?;
                CascadePhase::Evaluating
            }
            CascadePhase::Settling => {
                self.settle_spin();
                CascadePhase::Done
            }
            CascadePhase::Done => CascadePhase::Done,
        };
        Ok(next)
    }

    /// Evaluate scatter pays and fold them into the spin win
    pub fn get_scatterpays_update_wins(&mut self) {
        let data = get_scatterpays(
            &self.state.board,
            &self.config.symbols,
            self.state.global_multiplier,
        );
        self.state.wins.update_spinwin(data.total_win);

        if data.has_win() {
            self.book.add_event(EventKind::WinInfo {
                total_win: data.total_win,
                wins: data.wins.clone(),
            });
            self.book.add_event(EventKind::UpdateTumbleWin {
                amount: self.state.wins.spin_win,
            });
        }
        self.state.last_win = data;
    }

    /// Explode the last winning cells and refill the board
    pub fn tumble_board(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        let config = Arc::clone(&self.config);
        let exploding = self.state.last_win.winning_positions();
        let strips = config.reel_set(&self.state.reel_set)?;

        let new_cells = self.state.board.refill(&exploding, strips, &mut self.rng)?;
        self.apply_special_rules(spin, Some(new_cells.as_slice()))?;
        self.observe_guarantee(spin);
        self.state.tumble_count += 1;

        let mut new_symbols: Vec<Vec<Symbol>> = vec![Vec::new(); self.state.board.num_reels()];
        for pos in &new_cells {
            if let Some(symbol) = self.state.board.get(*pos) {
                new_symbols[pos.reel].push(symbol.clone());
            }
        }

        self.book.add_event(EventKind::TumbleBoard {
            exploding,
            new_symbols,
        });
        Ok(())
    }

    /// Clamp the spin win so the round total never passes the cap
    ///
    /// Returns whether the cap has triggered.
    pub fn evaluate_wincap(&mut self) -> bool {
        let wincap = self.config.wincap;
        let wins = &mut self.state.wins;

        if wins.pending_total() >= wincap {
            wins.set_spin_win((wincap - wins.running_bet_win).max(0.0));
            if !self.state.wincap_triggered {
                self.state.wincap_triggered = true;
                self.book.add_event(EventKind::WinCap { amount: wincap });
            }
        }
        self.state.wincap_triggered
    }

    /// Apply the board multiplier once and bank the spin
    pub fn settle_spin(&mut self) {
        let (multiplier, positions) = get_board_multipliers(&self.state.board);
        let base_win = self.state.wins.spin_win;

        if base_win > 0.0 && multiplier > 1 {
            let updated_win = base_win * multiplier as f64;
            self.state.wins.set_spin_win(updated_win);
            self.book.add_event(EventKind::BoardMultiplierInfo {
                multiplier,
                positions,
                base_win,
                updated_win,
            });
            self.book.add_event(EventKind::UpdateTumbleWin {
                amount: updated_win,
            });
        }

        self.evaluate_wincap();
        self.state.highest_multiplier = self
            .state
            .highest_multiplier
            .max(get_highest_multiplier(&self.state.board));

        self.book.add_event(EventKind::SetWin {
            amount: self.state.wins.spin_win,
        });
        self.state.wins.update_gametype_wins(self.state.gametype);
        self.book.add_event(EventKind::SetTotalWin {
            amount: self.state.wins.running_bet_win,
        });
    }
}
