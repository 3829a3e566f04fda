//! Board: reels of symbol cells, weighted draws and tumbling refills
//!
//! Row 0 is the top of a reel. Tumbling removes cells, lets the survivors fall
//! toward the bottom row and fills the vacated top cells with fresh draws.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{TumbleError, TumbleResult};
use crate::symbols::{ReelStrip, Symbol};

/// Cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub reel: usize,
    pub row: usize,
}

impl Position {
    pub fn new(reel: usize, row: usize) -> Self {
        Self { reel, row }
    }
}

/// A board of `reels[reel][row]` cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub reels: Vec<Vec<Symbol>>,
}

impl Board {
    /// Build a board from symbol names (reel-major)
    pub fn from_names<S: AsRef<str>>(reels: &[Vec<S>]) -> Self {
        Self {
            reels: reels
                .iter()
                .map(|reel| reel.iter().map(|s| Symbol::new(s.as_ref())).collect())
                .collect(),
        }
    }

    /// Draw every cell independently from its reel's strip
    pub fn draw<R: Rng + ?Sized>(
        strips: &[ReelStrip],
        num_rows: &[usize],
        rng: &mut R,
    ) -> TumbleResult<Self> {
        if strips.len() != num_rows.len() {
            return Err(TumbleError::InvalidConfig(format!(
                "{} strips for {} reels",
                strips.len(),
                num_rows.len()
            )));
        }

        let reels = strips
            .iter()
            .zip(num_rows)
            .map(|(strip, &rows)| (0..rows).map(|_| strip.draw(rng)).collect())
            .collect::<TumbleResult<Vec<Vec<Symbol>>>>()?;

        Ok(Self { reels })
    }

    pub fn num_reels(&self) -> usize {
        self.reels.len()
    }

    pub fn num_rows(&self, reel: usize) -> usize {
        self.reels.get(reel).map_or(0, Vec::len)
    }

    pub fn get(&self, pos: Position) -> Option<&Symbol> {
        self.reels.get(pos.reel).and_then(|r| r.get(pos.row))
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Symbol> {
        self.reels.get_mut(pos.reel).and_then(|r| r.get_mut(pos.row))
    }

    /// Replace the symbol at `pos`; out-of-range positions are ignored
    pub fn set(&mut self, pos: Position, symbol: Symbol) {
        if let Some(cell) = self.get_mut(pos) {
            *cell = symbol;
        }
    }

    /// All cells in reel-major order
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Symbol)> {
        self.reels.iter().enumerate().flat_map(|(reel, symbols)| {
            symbols
                .iter()
                .enumerate()
                .map(move |(row, symbol)| (Position::new(reel, row), symbol))
        })
    }

    pub fn positions_of(&self, name: &str) -> Vec<Position> {
        self.cells()
            .filter(|(_, s)| s.is(name))
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.cells().filter(|(_, s)| s.is(name)).count()
    }

    /// Tumble: remove `removed`, drop survivors, draw fresh symbols on top
    ///
    /// Returns the positions of the freshly drawn cells.
    pub fn refill<R: Rng + ?Sized>(
        &mut self,
        removed: &[Position],
        strips: &[ReelStrip],
        rng: &mut R,
    ) -> TumbleResult<Vec<Position>> {
        let mut new_cells = Vec::new();

        for (reel, column) in self.reels.iter_mut().enumerate() {
            let rows = column.len();
            let mut survivors: Vec<Symbol> = Vec::with_capacity(rows);
            for (row, symbol) in column.drain(..).enumerate() {
                if !removed.contains(&Position::new(reel, row)) {
                    survivors.push(symbol);
                }
            }

            let vacated = rows - survivors.len();
            if vacated == 0 {
                *column = survivors;
                continue;
            }

            let strip = strips.get(reel).ok_or_else(|| {
                TumbleError::InvalidConfig(format!("no reel strip for reel {}", reel))
            })?;

            let mut refilled = Vec::with_capacity(rows);
            for row in 0..vacated {
                refilled.push(strip.draw(rng)?);
                new_cells.push(Position::new(reel, row));
            }
            refilled.extend(survivors);
            *column = refilled;
        }

        Ok(new_cells)
    }

    /// Place `name` on random distinct cells until the board holds at least `target`
    ///
    /// Returns the positions that were overwritten.
    pub fn force_symbol_count<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        target: usize,
        rng: &mut R,
    ) -> TumbleResult<Vec<Position>> {
        let present = self.count(name);
        if present >= target {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Position> = self
            .cells()
            .filter(|(_, s)| !s.is(name))
            .map(|(pos, _)| pos)
            .collect();

        let missing = target - present;
        if candidates.len() < missing {
            return Err(TumbleError::InvalidConfig(format!(
                "board cannot hold {} '{}' symbols",
                target, name
            )));
        }

        let mut placed = Vec::with_capacity(missing);
        for _ in 0..missing {
            let pos = match candidates.choose(rng) {
                Some(&pos) => pos,
                None => break,
            };
            candidates.retain(|p| *p != pos);
            self.set(pos, Symbol::new(name));
            placed.push(pos);
        }

        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightTable;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn strips(names: &[&str], reels: usize) -> Vec<ReelStrip> {
        (0..reels)
            .map(|reel| {
                ReelStrip::new(
                    reel,
                    WeightTable::from_pairs(names.iter().map(|n| (n.to_string(), 1))),
                )
            })
            .collect()
    }

    #[test]
    fn test_draw_shape_matches_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let board = Board::draw(&strips(&["A", "B"], 3), &[3, 4, 5], &mut rng).unwrap();
        assert_eq!(board.num_reels(), 3);
        assert_eq!(board.num_rows(0), 3);
        assert_eq!(board.num_rows(2), 5);
    }

    #[test]
    fn test_refill_drops_survivors_and_fills_top() {
        let mut board = Board::from_names(&[vec!["A", "B", "C", "D"]]);
        board.reels[0][0].assign_multiplier(7);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let new_cells = board
            .refill(
                &[Position::new(0, 1), Position::new(0, 3)],
                &strips(&["X"], 1),
                &mut rng,
            )
            .unwrap();

        assert_eq!(new_cells, vec![Position::new(0, 0), Position::new(0, 1)]);
        let names: Vec<_> = board.reels[0].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["X", "X", "A", "C"]);
        // Attribute travels with the falling cell
        assert_eq!(board.reels[0][2].multiplier, Some(7));
        assert_eq!(board.reels[0][0].multiplier, None);
    }

    #[test]
    fn test_refill_without_removals_is_noop() {
        let mut board = Board::from_names(&[vec!["A", "B"], vec!["C", "D"]]);
        let before = board.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let new_cells = board.refill(&[], &strips(&["X"], 2), &mut rng).unwrap();
        assert!(new_cells.is_empty());
        assert_eq!(board, before);
    }

    #[test]
    fn test_force_symbol_count() {
        let mut board = Board::from_names(&[vec!["A", "S", "B"], vec!["C", "D", "E"]]);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let placed = board.force_symbol_count("S", 4, &mut rng).unwrap();
        assert_eq!(placed.len(), 3);
        assert_eq!(board.count("S"), 4);

        assert!(board.force_symbol_count("S", 2, &mut rng).unwrap().is_empty());
        assert!(board.force_symbol_count("S", 7, &mut rng).is_err());
    }

    #[test]
    fn test_positions_of() {
        let board = Board::from_names(&[vec!["M", "A"], vec!["A", "M"]]);
        assert_eq!(
            board.positions_of("M"),
            vec![Position::new(0, 0), Position::new(1, 1)]
        );
        assert_eq!(board.count("A"), 2);
    }
}
