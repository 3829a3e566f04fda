//! Acceptance check for the repeat-until-criteria loop

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GameType;
use crate::engine::{GameState, SpinContext};

/// Final wins are cent-rounded, so anything closer than this is a match
const WIN_EPSILON: f64 = 1e-6;

/// Why an attempt was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Attempt flagged during simulation (e.g. unforced free-game entry)
    FlaggedRepeat,
    /// Final win differs from the distribution's exact target
    WinCriteriaMismatch,
    /// Win-cap distribution finished below the cap
    WincapMissed,
    /// Required multiplier never observed in its window
    GuaranteeMissed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FlaggedRepeat => "flagged for repeat",
            Self::WinCriteriaMismatch => "win criteria mismatch",
            Self::WincapMissed => "win cap not reached",
            Self::GuaranteeMissed => "minimum multiplier not seen",
        };
        f.write_str(text)
    }
}

pub fn win_matches(final_win: f64, target: f64) -> bool {
    (final_win - target).abs() < WIN_EPSILON
}

/// `None` accepts the attempt
pub fn check_game_repeat(state: &GameState, spin: &SpinContext<'_>) -> Option<RejectReason> {
    if state.repeat {
        return Some(RejectReason::FlaggedRepeat);
    }

    let distribution = spin.distribution;
    if let Some(target) = distribution.win_criteria {
        if !win_matches(state.final_win, target) {
            return Some(RejectReason::WinCriteriaMismatch);
        }
    }
    if distribution.conditions.force_wincap && !state.wincap_triggered {
        return Some(RejectReason::WincapMissed);
    }

    if spin.required_minimum.is_none() {
        return None;
    }

    if spin.is_single_spin() && !state.min_mult_seen {
        return Some(RejectReason::GuaranteeMissed);
    }

    // The free-game window closes at exhaustion, or early when the cap ends the round
    let freegame_round =
        state.gametype == GameType::FreeGame || distribution.conditions.force_freegame;
    let window_closed = state.wincap_triggered || state.free_spins.is_end_of_freegame();
    if freegame_round && window_closed && !state.min_mult_seen {
        return Some(RejectReason::GuaranteeMissed);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::engine::TumbleEngine;

    #[test]
    fn test_repeat_flag_wins_over_everything() {
        let config = GameConfig::multiplier_demo();
        let spin = TumbleEngine::spin_context(&config, "base", "basegame").unwrap();
        let state = GameState {
            repeat: true,
            ..GameState::new()
        };
        assert_eq!(check_game_repeat(&state, &spin), Some(RejectReason::FlaggedRepeat));
    }

    #[test]
    fn test_exact_win_criteria() {
        let config = GameConfig::multiplier_demo();
        let spin = TumbleEngine::spin_context(&config, "base", "0").unwrap();
        let mut state = GameState::new();
        assert_eq!(check_game_repeat(&state, &spin), None);

        state.final_win = 0.25;
        assert_eq!(
            check_game_repeat(&state, &spin),
            Some(RejectReason::WinCriteriaMismatch)
        );
    }

    #[test]
    fn test_wincap_distribution_needs_cap() {
        let config = GameConfig::multiplier_demo();
        let spin = TumbleEngine::spin_context(&config, "bonus", "wincap").unwrap();
        let mut state = GameState::new();
        state.final_win = config.wincap;
        assert_eq!(check_game_repeat(&state, &spin), Some(RejectReason::WincapMissed));

        state.wincap_triggered = true;
        assert_eq!(check_game_repeat(&state, &spin), None);
    }

    #[test]
    fn test_single_spin_guarantee_window() {
        let config = GameConfig::multiplier_demo();
        let spin = TumbleEngine::spin_context(&config, "min_one_x100", "basegame").unwrap();
        let mut state = GameState::new();
        assert_eq!(
            check_game_repeat(&state, &spin),
            Some(RejectReason::GuaranteeMissed)
        );
        state.min_mult_seen = true;
        assert_eq!(check_game_repeat(&state, &spin), None);
    }

    #[test]
    fn test_free_game_guarantee_checked_at_exhaustion() {
        let mut config = GameConfig::multiplier_demo();
        config.mode_minimum_multiplier.insert("bonus".into(), 50);
        let spin = TumbleEngine::spin_context(&config, "bonus", "freegame").unwrap();

        let mut state = GameState::new();
        state.gametype = GameType::FreeGame;
        state.free_spins.start(2);
        state.free_spins.begin_spin();
        // Still spins left: window not closed
        assert_eq!(check_game_repeat(&state, &spin), None);

        state.free_spins.begin_spin();
        assert_eq!(
            check_game_repeat(&state, &spin),
            Some(RejectReason::GuaranteeMissed)
        );

        state.min_mult_seen = true;
        assert_eq!(check_game_repeat(&state, &spin), None);
    }

    #[test]
    fn test_capped_free_game_closes_guarantee_window() {
        let mut config = GameConfig::multiplier_demo();
        config.mode_minimum_multiplier.insert("bonus".into(), 50);
        let spin = TumbleEngine::spin_context(&config, "bonus", "freegame").unwrap();

        let mut state = GameState::new();
        state.gametype = GameType::FreeGame;
        state.free_spins.start(10);
        state.free_spins.begin_spin();
        state.wincap_triggered = true;
        state.final_win = config.wincap;
        assert_eq!(
            check_game_repeat(&state, &spin),
            Some(RejectReason::GuaranteeMissed)
        );

        state.min_mult_seen = true;
        assert_eq!(check_game_repeat(&state, &spin), None);
    }

    #[test]
    fn test_base_cap_skipping_forced_free_game_misses_guarantee() {
        let mut config = GameConfig::multiplier_demo();
        config.mode_minimum_multiplier.insert("bonus".into(), 50);
        let spin = TumbleEngine::spin_context(&config, "bonus", "freegame").unwrap();

        let mut state = GameState::new();
        state.wincap_triggered = true;
        state.final_win = config.wincap;
        assert_eq!(
            check_game_repeat(&state, &spin),
            Some(RejectReason::GuaranteeMissed)
        );
    }
}
