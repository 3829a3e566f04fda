//! Batch simulation across a rayon pool
//!
//! Every simulation index draws from its own seeded stream, so results do not
//! depend on thread count or scheduling.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::engine::TumbleEngine;
use crate::error::{TumbleError, TumbleResult};
use crate::events::Book;

/// What to simulate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub mode: String,
    pub num_sims: u64,
    pub seed: u64,
    /// Worker threads (`None` = rayon default)
    #[serde(default)]
    pub threads: Option<usize>,
    /// Pin every sim to one criteria instead of picking by quota
    #[serde(default)]
    pub criteria: Option<String>,
}

impl SimulationRun {
    pub fn new(mode: impl Into<String>, num_sims: u64) -> Self {
        Self {
            mode: mode.into(),
            num_sims,
            seed: 0,
            threads: None,
            criteria: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }
}

/// Per-criteria tallies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaStats {
    pub count: u64,
    pub total_win: f64,
}

/// Aggregated batch result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub mode: String,
    /// Mode cost in base bets
    pub cost: f64,
    /// Sims that produced an accepted book
    pub num_sims: u64,
    pub total_win: f64,
    pub hits: u64,
    pub max_win: f64,
    pub wincaps: u64,
    /// Sims whose distribution could not be reached
    pub unreachable: u64,
    pub per_criteria: BTreeMap<String, CriteriaStats>,
}

impl SimulationSummary {
    /// Return to player as a fraction of the amount wagered
    pub fn rtp(&self) -> f64 {
        let wagered = self.num_sims as f64 * self.cost;
        if wagered > 0.0 {
            self.total_win / wagered
        } else {
            0.0
        }
    }

    /// Share of sims with a non-zero win
    pub fn hit_rate(&self) -> f64 {
        if self.num_sims > 0 {
            self.hits as f64 / self.num_sims as f64
        } else {
            0.0
        }
    }

    pub fn average_win(&self) -> f64 {
        if self.num_sims > 0 {
            self.total_win / self.num_sims as f64
        } else {
            0.0
        }
    }

    fn record(&mut self, book: &Book) {
        let win = book.payout_multiplier;
        self.num_sims += 1;
        self.total_win += win;
        if win > 0.0 {
            self.hits += 1;
        }
        if book.wincap_triggered {
            self.wincaps += 1;
        }
        self.max_win = self.max_win.max(win);

        let stats = self.per_criteria.entry(book.criteria.clone()).or_default();
        stats.count += 1;
        stats.total_win += win;
    }
}

/// Run every sim of `run` and return the per-sim results in sim order
pub fn simulate_books(
    config: Arc<GameConfig>,
    run: &SimulationRun,
) -> TumbleResult<Vec<TumbleResult<Book>>> {
    config.validate()?;
    config.bet_mode(&run.mode)?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = run.threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder
        .build()
        .map_err(|e| TumbleError::InvalidConfig(format!("thread pool: {}", e)))?;

    let results = pool.install(|| {
        (0..run.num_sims)
            .into_par_iter()
            .map_init(
                || TumbleEngine::prevalidated(Arc::clone(&config)).with_seed(run.seed),
                |engine, sim| match &run.criteria {
                    Some(criteria) => engine.run_spin(sim, &run.mode, criteria),
                    None => engine.run_spin_by_quota(sim, &run.mode),
                },
            )
            .collect()
    });

    Ok(results)
}

/// Run a batch and aggregate it
///
/// Unreachable distributions are counted and logged; any other error aborts
/// the batch.
pub fn run_simulations(config: Arc<GameConfig>, run: &SimulationRun) -> TumbleResult<SimulationSummary> {
    let cost = config.bet_mode(&run.mode)?.cost;
    log::info!(
        "Simulating {} x '{}' (seed {}, threads {:?})",
        run.num_sims,
        run.mode,
        run.seed,
        run.threads
    );

    let mut summary = SimulationSummary {
        mode: run.mode.clone(),
        cost,
        ..Default::default()
    };

    for (sim, result) in simulate_books(config, run)?.into_iter().enumerate() {
        match result {
            Ok(book) => summary.record(&book),
            Err(TumbleError::DistributionUnreachable {
                mode,
                criteria,
                attempts,
            }) => {
                log::warn!(
                    "sim {}: '{}/{}' unreachable after {} attempts",
                    sim,
                    mode,
                    criteria,
                    attempts
                );
                summary.unreachable += 1;
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "'{}': rtp {:.4}, hit rate {:.4}, max win {:.2}",
        summary.mode,
        summary.rtp(),
        summary.hit_rate(),
        summary.max_win
    );
    Ok(summary)
}
