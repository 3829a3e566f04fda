//! Free-spin awards and counters

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GameType;
use crate::error::{TumbleError, TumbleResult};

/// Spins awarded for `count` scatters
///
/// Counts outside the table are clamped to its nearest end, so an oversized
/// retrigger never fails. A count inside the key range that is not itself a
/// key gets the largest award.
pub fn fs_award_from_scatter(
    table: &BTreeMap<u32, u32>,
    count: u32,
    gametype: GameType,
) -> TumbleResult<u32> {
    let (Some((&min_key, &min_award)), Some((_, &max_award))) =
        (table.first_key_value(), table.last_key_value())
    else {
        return Err(TumbleError::MissingTriggerTable(gametype));
    };

    if let Some(&award) = table.get(&count) {
        return Ok(award);
    }
    if count < min_key {
        return Ok(min_award);
    }
    Ok(max_award)
}

/// Free-game progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpinCounters {
    /// Spins started so far
    pub fs: u32,
    /// Spins awarded in total (including retriggers)
    pub tot_fs: u32,
    /// Explicit remaining count, when tracked
    pub fs_remaining: Option<u32>,
    pub freegame_finished: bool,
}

impl FreeSpinCounters {
    /// Enter the free game with `award` spins
    pub fn start(&mut self, award: u32) {
        *self = Self {
            fs: 0,
            tot_fs: award,
            fs_remaining: Some(award),
            freegame_finished: false,
        };
    }

    /// Advance to the next spin
    pub fn begin_spin(&mut self) {
        self.fs += 1;
        self.fs_remaining = Some(self.tot_fs.saturating_sub(self.fs));
    }

    /// Add a retrigger award
    pub fn retrigger(&mut self, award: u32) {
        self.tot_fs += award;
        self.fs_remaining = Some(self.tot_fs.saturating_sub(self.fs));
    }

    pub fn has_spins_left(&self) -> bool {
        self.fs < self.tot_fs
    }

    pub fn finish(&mut self) {
        self.freegame_finished = true;
    }

    /// Whether the spin just played is the last one
    ///
    /// The explicit remaining count wins, then played-versus-total, then the
    /// finished flag.
    pub fn is_end_of_freegame(&self) -> bool {
        if let Some(remaining) = self.fs_remaining {
            return remaining == 0;
        }
        if self.tot_fs > 0 {
            return self.fs >= self.tot_fs;
        }
        self.freegame_finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BTreeMap<u32, u32> {
        BTreeMap::from([(3, 8), (4, 10), (5, 12)])
    }

    #[test]
    fn test_exact_and_clamped_awards() {
        let t = table();
        assert_eq!(fs_award_from_scatter(&t, 3, GameType::FreeGame).unwrap(), 8);
        assert_eq!(fs_award_from_scatter(&t, 4, GameType::FreeGame).unwrap(), 10);
        assert_eq!(fs_award_from_scatter(&t, 7, GameType::FreeGame).unwrap(), 12);
        assert_eq!(fs_award_from_scatter(&t, 2, GameType::FreeGame).unwrap(), 8);
    }

    #[test]
    fn test_gap_inside_range_gets_largest_award() {
        let t = BTreeMap::from([(3, 5), (6, 20)]);
        assert_eq!(fs_award_from_scatter(&t, 4, GameType::BaseGame).unwrap(), 20);
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            fs_award_from_scatter(&BTreeMap::new(), 4, GameType::BaseGame),
            Err(TumbleError::MissingTriggerTable(GameType::BaseGame))
        ));
    }

    #[test]
    fn test_counters_with_retrigger() {
        let mut c = FreeSpinCounters::default();
        c.start(2);
        c.begin_spin();
        assert!(!c.is_end_of_freegame());
        c.begin_spin();
        assert!(c.is_end_of_freegame());

        c.retrigger(3);
        assert!(!c.is_end_of_freegame());
        assert!(c.has_spins_left());
        assert_eq!(c.fs_remaining, Some(3));
    }

    #[test]
    fn test_end_priority_without_remaining() {
        let mut c = FreeSpinCounters {
            fs: 4,
            tot_fs: 4,
            fs_remaining: None,
            freegame_finished: false,
        };
        assert!(c.is_end_of_freegame());

        c.tot_fs = 0;
        c.fs = 0;
        assert!(!c.is_end_of_freegame());
        c.finish();
        assert!(c.is_end_of_freegame());
    }
}
