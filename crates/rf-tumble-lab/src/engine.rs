//! Tumble engine: board draws, free game and the accept/reject loop

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::attributes::{RuleContext, SpecialSymbolRules};
use crate::board::{Board, Position};
use crate::config::{BetMode, Distribution, GameConfig, GameType};
use crate::error::{TumbleError, TumbleResult};
use crate::evaluate::{WinData, get_highest_multiplier};
use crate::events::{Book, EventKind};
use crate::free_spins::{FreeSpinCounters, fs_award_from_scatter};
use crate::guarantee::{GuaranteeOutcome, enforce_multiplier_guarantee, required_minimum};
use crate::sampler::check_game_repeat;
use crate::wins::WinManager;

/// Golden-ratio stride between per-simulation seed streams
const SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seed for simulation `sim` under master seed `master`
pub fn derive_seed(master: u64, sim: u64) -> u64 {
    master ^ sim.wrapping_mul(SEED_STRIDE)
}

/// Round a win to cents
pub fn round_win(win: f64) -> f64 {
    (win * 100.0).round() / 100.0
}

/// The bet mode and distribution an attempt is simulated under
#[derive(Debug, Clone, Copy)]
pub struct SpinContext<'a> {
    pub mode: &'a BetMode,
    pub distribution: &'a Distribution,
    /// Minimum multiplier that must be seen, if any
    pub required_minimum: Option<u32>,
}

impl SpinContext<'_> {
    pub fn is_single_spin(&self) -> bool {
        self.distribution.conditions.single_spin_feature
    }
}

/// Mutable state of one attempt
///
/// Reset wholesale at the start of every attempt, so nothing leaks from a
/// rejected attempt into the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub gametype: GameType,
    /// Reel set the current board was drawn from (refills use it too)
    pub reel_set: String,
    pub wins: WinManager,
    pub free_spins: FreeSpinCounters,
    /// Latest evaluation pass
    pub last_win: WinData,
    /// Scales scatter pays during evaluation
    pub global_multiplier: u32,
    pub tumble_count: u32,
    pub wincap_triggered: bool,
    /// Attempt must be redrawn regardless of its outcome
    pub repeat: bool,
    /// Required minimum multiplier has been observed
    pub min_mult_seen: bool,
    /// Largest multiplier on any settled board
    pub highest_multiplier: u32,
    pub final_win: f64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::default(),
            gametype: GameType::BaseGame,
            reel_set: String::new(),
            wins: WinManager::new(),
            free_spins: FreeSpinCounters::default(),
            last_win: WinData::default(),
            global_multiplier: 1,
            tumble_count: 0,
            wincap_triggered: false,
            repeat: false,
            min_mult_seen: false,
            highest_multiplier: 0,
            final_win: 0.0,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Tumble engine
///
/// Owns one random stream and one attempt state. Configuration is shared,
/// so a batch runs one engine per worker over the same `Arc<GameConfig>`.
pub struct TumbleEngine {
    pub(crate) config: Arc<GameConfig>,
    pub(crate) rules: SpecialSymbolRules,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) seed: u64,
    pub(crate) state: GameState,
    pub(crate) book: Book,
}

impl TumbleEngine {
    /// Create an engine over a validated config
    pub fn new(config: Arc<GameConfig>) -> TumbleResult<Self> {
        config.validate()?;
        Ok(Self::prevalidated(config))
    }

    /// Create an engine over a config the caller has already validated
    pub(crate) fn prevalidated(config: Arc<GameConfig>) -> Self {
        let rules = SpecialSymbolRules::standard(&config.symbols.multiplier_symbol);
        Self {
            config,
            rules,
            rng: ChaCha8Rng::seed_from_u64(0),
            seed: 0,
            state: GameState::new(),
            book: Book::default(),
        }
    }

    /// Replace the special-symbol rules
    pub fn with_rules(mut self, rules: SpecialSymbolRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set the master seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn rules(&self) -> &SpecialSymbolRules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    pub fn set_board(&mut self, board: Board) {
        self.state.board = board;
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Resolve mode and criteria into a spin context
    pub fn spin_context<'a>(
        config: &'a GameConfig,
        mode: &str,
        criteria: &str,
    ) -> TumbleResult<SpinContext<'a>> {
        let bet_mode = config.bet_mode(mode)?;
        let distribution = bet_mode.distribution(criteria)?;
        Ok(SpinContext {
            mode: bet_mode,
            distribution,
            required_minimum: required_minimum(config, mode, distribution),
        })
    }

    /// Clear all attempt state and start an empty book
    pub fn reset_book(&mut self, sim: u64, mode: &str, criteria: &str) {
        self.state = GameState::new();
        self.book = Book::new(sim, mode, criteria);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SAMPLER LOOP
    // ═══════════════════════════════════════════════════════════════════════════

    /// Simulate `sim` until an attempt satisfies `criteria` of `mode`
    ///
    /// The random stream is reseeded from `(seed, sim)`, so the same inputs
    /// always produce the same book. Rejected attempts leave no trace.
    pub fn run_spin(&mut self, sim: u64, mode: &str, criteria: &str) -> TumbleResult<Book> {
        let config = Arc::clone(&self.config);
        let spin = Self::spin_context(&config, mode, criteria)?;
        self.rng = ChaCha8Rng::seed_from_u64(derive_seed(self.seed, sim));

        let max_attempts = config.sampler.max_attempts;
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            self.reset_book(sim, mode, criteria);
            self.run_attempt(&spin)?;

            let Some(reason) = check_game_repeat(&self.state, &spin) else {
                log::debug!(
                    "sim {} [{}/{}] accepted after {} attempt(s), win {}",
                    sim,
                    mode,
                    criteria,
                    attempts,
                    self.state.final_win
                );
                return Ok(self.book.clone());
            };

            log::debug!("sim {} attempt {} rejected: {}", sim, attempts, reason);
            if max_attempts.is_some_and(|max| attempts >= max) {
                return Err(TumbleError::DistributionUnreachable {
                    mode: mode.to_string(),
                    criteria: criteria.to_string(),
                    attempts,
                });
            }
        }
    }

    /// Pick a criteria for `sim` by distribution quota
    ///
    /// Uses its own stream so the pick never shifts the spin's draws.
    pub fn pick_criteria(&self, sim: u64, mode: &str) -> TumbleResult<String> {
        let mut picker = ChaCha8Rng::seed_from_u64(derive_seed(self.seed, sim).rotate_left(32));
        let bet_mode = self.config.bet_mode(mode)?;
        Ok(bet_mode.pick_distribution(&mut picker)?.criteria.clone())
    }

    /// Simulate `sim` under a quota-picked criteria
    pub fn run_spin_by_quota(&mut self, sim: u64, mode: &str) -> TumbleResult<Book> {
        let criteria = self.pick_criteria(sim, mode)?;
        self.run_spin(sim, mode, &criteria)
    }

    /// One full round: base spin, optional free game, final win
    fn run_attempt(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        self.state.gametype = GameType::BaseGame;
        self.draw_board(spin)?;
        self.run_cascade(spin)?;

        if self.state.wincap_triggered {
            // Round is over
        } else if self.check_fs_condition()? {
            if self.check_freespin_entry(spin) {
                self.run_freespin_from_base(spin)?;
            }
        } else if spin.distribution.conditions.force_freegame {
            self.state.repeat = true;
        }

        self.finalize_book();
        Ok(())
    }

    fn finalize_book(&mut self) {
        let final_win = round_win(self.state.wins.running_bet_win);
        self.state.final_win = final_win;

        self.book.payout_multiplier = final_win;
        self.book.basegame_wins = round_win(self.state.wins.basegame_wins);
        self.book.freegame_wins = round_win(self.state.wins.freegame_wins);
        self.book.highest_multiplier = self.state.highest_multiplier;
        self.book.wincap_triggered = self.state.wincap_triggered;
        self.book.add_event(EventKind::FinalWin { amount: final_win });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BOARD
    // ═══════════════════════════════════════════════════════════════════════════

    /// Reel set for the current gametype: distribution weights, else the default
    fn select_reel_set(&mut self, spin: &SpinContext<'_>) -> TumbleResult<String> {
        let gametype = self.state.gametype;
        if let Some(table) = spin.distribution.conditions.reel_weights.get(&gametype) {
            return table.sample(&mut self.rng);
        }
        self.config
            .default_reel_set
            .get(&gametype)
            .cloned()
            .ok_or_else(|| {
                TumbleError::InvalidConfig(format!("no default reel set for {}", gametype))
            })
    }

    /// Draw a fresh board for the current gametype
    ///
    /// Forces scatters on forced free-game base draws, runs the special-symbol
    /// rules on every special cell, applies the guarantee window and emits
    /// the reveal.
    pub fn draw_board(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        let config = Arc::clone(&self.config);
        let gametype = self.state.gametype;

        let reel_set = self.select_reel_set(spin)?;
        let strips = config.reel_set(&reel_set)?;
        self.state.board = Board::draw(strips, &config.num_rows, &mut self.rng)?;
        self.state.reel_set = reel_set;

        let conditions = &spin.distribution.conditions;
        if gametype == GameType::BaseGame && conditions.force_freegame {
            let target = match &conditions.scatter_triggers {
                Some(triggers) => triggers.sample(&mut self.rng)?,
                None => config.min_trigger_count(GameType::BaseGame)?,
            };
            let scatter = config
                .symbols
                .scatter()
                .ok_or_else(|| TumbleError::InvalidConfig("no scatter symbol".into()))?;
            self.state
                .board
                .force_symbol_count(scatter, target as usize, &mut self.rng)?;
        }

        self.apply_special_rules(spin, None)?;
        self.apply_guarantee_window(spin)?;

        self.book.add_event(EventKind::Reveal {
            board: self.state.board.reels.clone(),
            gametype,
        });
        Ok(())
    }

    /// Run special-symbol rules on `cells`, or on every special cell
    pub(crate) fn apply_special_rules(
        &mut self,
        spin: &SpinContext<'_>,
        cells: Option<&[Position]>,
    ) -> TumbleResult<()> {
        let Self {
            rules, rng, state, ..
        } = self;

        let mut ctx = RuleContext {
            gametype: state.gametype,
            mode: &spin.mode.name,
            criteria: &spin.distribution.criteria,
            conditions: &spin.distribution.conditions,
            required_minimum: spin.required_minimum,
            min_mult_seen: &mut state.min_mult_seen,
            rng,
        };

        match cells {
            Some(cells) => rules.apply_to_cells(&mut state.board, cells, &mut ctx),
            None => rules.apply_to_board(&mut state.board, &mut ctx),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GUARANTEE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Correct the current board so it meets the required minimum
    pub fn enforce_guarantee(&mut self, spin: &SpinContext<'_>) -> TumbleResult<GuaranteeOutcome> {
        let outcome = enforce_multiplier_guarantee(
            &mut self.state.board,
            &self.config.symbols,
            spin.required_minimum,
            &mut self.state.min_mult_seen,
            &mut self.rng,
        )?;

        if outcome.mutated() {
            log::debug!(
                "[{}/{}] guarantee x{:?} forced: {:?}",
                spin.mode.name,
                spin.distribution.criteria,
                spin.required_minimum,
                outcome
            );
        }
        Ok(outcome)
    }

    /// Mark the minimum as seen once the board shows it; returns the seen flag
    pub(crate) fn observe_guarantee(&mut self, spin: &SpinContext<'_>) -> bool {
        if let Some(required) = spin.required_minimum {
            if get_highest_multiplier(&self.state.board) >= required {
                self.state.min_mult_seen = true;
            }
        }
        self.state.min_mult_seen
    }

    /// Single-spin modes enforce on the base board. Free-game modes observe
    /// each free spin and enforce on the last scheduled one if still unmet.
    fn apply_guarantee_window(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        if spin.required_minimum.is_none() {
            return Ok(());
        }

        match self.state.gametype {
            GameType::BaseGame if spin.is_single_spin() => {
                self.enforce_guarantee(spin)?;
            }
            GameType::FreeGame => {
                if !self.observe_guarantee(spin)
                    && self.state.free_spins.is_end_of_freegame()
                {
                    self.enforce_guarantee(spin)?;
                }
            }
            GameType::BaseGame => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FREE SPINS
    // ═══════════════════════════════════════════════════════════════════════════

    fn scatter_positions(&self) -> Vec<Position> {
        self.config
            .symbols
            .scatter()
            .map(|s| self.state.board.positions_of(s))
            .unwrap_or_default()
    }

    /// Board holds enough scatters to (re)trigger for the current gametype
    pub fn check_fs_condition(&self) -> TumbleResult<bool> {
        let min = self.config.min_trigger_count(self.state.gametype)?;
        Ok(self.scatter_positions().len() as u32 >= min)
    }

    /// Only forced free-game distributions may enter the free game;
    /// anything else flags the attempt for a redraw
    pub fn check_freespin_entry(&mut self, spin: &SpinContext<'_>) -> bool {
        if spin.distribution.conditions.force_freegame {
            return true;
        }
        log::debug!(
            "[{}/{}] unforced free game entry, redrawing",
            spin.mode.name,
            spin.distribution.criteria
        );
        self.state.repeat = true;
        false
    }

    /// Set the free-spin total from the scatters on the board
    pub fn update_freespin_amount(&mut self) -> TumbleResult<u32> {
        let positions = self.scatter_positions();
        let gametype = self.state.gametype;
        let award = fs_award_from_scatter(
            self.config.trigger_table(gametype)?,
            positions.len() as u32,
            gametype,
        )?;

        self.state.free_spins.start(award);
        self.book.add_event(EventKind::FreeSpinTrigger {
            total_fs: self.state.free_spins.tot_fs,
            positions,
        });
        Ok(award)
    }

    /// Add a retrigger award to the free-spin total
    pub fn update_fs_retrigger_amt(&mut self) -> TumbleResult<u32> {
        let count = self.scatter_positions().len() as u32;
        let gametype = self.state.gametype;
        let award = fs_award_from_scatter(self.config.trigger_table(gametype)?, count, gametype)?;

        self.state.free_spins.retrigger(award);
        self.book.add_event(EventKind::FreeSpinRetrigger {
            total_fs: self.state.free_spins.tot_fs,
        });
        Ok(award)
    }

    /// Award spins from the base board, then play them
    pub fn run_freespin_from_base(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        let award = self.update_freespin_amount()?;
        log::debug!("[{}] free game triggered: {} spins", spin.mode.name, award);
        self.run_freespin(spin)
    }

    /// Play free spins until none are left or the cap is hit
    pub fn run_freespin(&mut self, spin: &SpinContext<'_>) -> TumbleResult<()> {
        self.state.gametype = GameType::FreeGame;

        while self.state.free_spins.has_spins_left() && !self.state.wincap_triggered {
            self.state.free_spins.begin_spin();
            self.book.add_event(EventKind::UpdateFreeSpin {
                amount: self.state.free_spins.fs,
                total: self.state.free_spins.tot_fs,
            });

            self.draw_board(spin)?;
            self.run_cascade(spin)?;

            if !self.state.wincap_triggered && self.check_fs_condition()? {
                self.update_fs_retrigger_amt()?;
            }
        }

        self.state.free_spins.finish();
        self.book.add_event(EventKind::FreeSpinEnd {
            amount: round_win(self.state.wins.freegame_wins),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TumbleEngine {
        TumbleEngine::new(Arc::new(GameConfig::multiplier_demo()))
            .unwrap()
            .with_seed(42)
    }

    #[test]
    fn test_derive_seed_separates_streams() {
        assert_eq!(derive_seed(7, 0), 7);
        assert_ne!(derive_seed(7, 1), derive_seed(7, 2));
    }

    #[test]
    fn test_round_win() {
        assert_eq!(round_win(1.234_9), 1.23);
        assert_eq!(round_win(0.0), 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GameConfig::multiplier_demo();
        config.wincap = 0.0;
        assert!(TumbleEngine::new(Arc::new(config)).is_err());
    }

    #[test]
    fn test_zero_criteria_yields_zero_win() {
        let mut engine = engine();
        for sim in 0..5 {
            let book = engine.run_spin(sim, "base", "0").unwrap();
            assert_eq!(book.payout_multiplier, 0.0);
            assert_eq!(book.criteria, "0");
            assert_eq!(book.event_types().last(), Some(&"final_win"));
        }
    }

    #[test]
    fn test_unforced_distribution_never_enters_free_game() {
        let mut engine = engine();
        for sim in 0..20 {
            let book = engine.run_spin(sim, "base", "basegame").unwrap();
            assert_eq!(book.free_spins_played(), 0);
            assert_eq!(book.freegame_wins, 0.0);
        }
    }

    #[test]
    fn test_forced_free_game_plays_awarded_spins() {
        let mut engine = engine();
        let book = engine.run_spin(3, "bonus", "freegame").unwrap();

        let awarded: u32 = book
            .events_of("free_spin_trigger")
            .chain(book.events_of("free_spin_retrigger"))
            .map(|e| match e {
                EventKind::FreeSpinTrigger { total_fs, .. }
                | EventKind::FreeSpinRetrigger { total_fs } => *total_fs,
                _ => 0,
            })
            .max()
            .unwrap();
        assert!(awarded >= 10);
        if !book.wincap_triggered {
            assert_eq!(book.free_spins_played() as u32, awarded);
        }
    }

    #[test]
    fn test_freespin_amount_and_retrigger_double() {
        let mut engine = engine();
        engine.state_mut().gametype = GameType::FreeGame;
        engine.set_board(Board::from_names(&[
            vec!["S", "S", "S", "S", "H1"],
            vec!["L1"; 5],
            vec!["L2"; 5],
            vec!["L3"; 5],
            vec!["L4"; 5],
            vec!["L5"; 5],
        ]));

        let award = engine.update_freespin_amount().unwrap();
        assert_eq!(award, 8);
        engine.update_fs_retrigger_amt().unwrap();
        assert_eq!(engine.state().free_spins.tot_fs, 2 * award);
    }

    #[test]
    fn test_check_fs_condition() {
        let mut engine = engine();
        engine.set_board(Board::from_names(&[
            vec!["S", "S", "S", "H1", "H1"],
            vec!["L1"; 5],
            vec!["L2"; 5],
            vec!["L3"; 5],
            vec!["L4"; 5],
            vec!["L5"; 5],
        ]));
        assert!(!engine.check_fs_condition().unwrap());
        engine.state_mut().gametype = GameType::FreeGame;
        assert!(engine.check_fs_condition().unwrap());
    }
}
