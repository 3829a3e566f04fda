//! # rf-tumble-lab — Tumble Slot Spin Simulator
//!
//! Simulates single rounds of cascading scatter-pay slot games and forces each
//! accepted round to satisfy the acceptance criteria of its bet-mode
//! distribution.
//!
//! ## Features
//!
//! - **Tumble Loop**: Evaluate, explode winning cells, refill, repeat
//! - **Multiplier Symbols**: Per-cell multiplier attributes summed onto the spin win
//! - **Guarantees**: Minimum-multiplier enforcement for feature-buy modes
//! - **Free Spins**: Clamped trigger and retrigger awards
//! - **Sampler**: Repeat-until-criteria with a bounded attempt count
//! - **Batch Runs**: Deterministic per-sim seeding across a rayon pool
//!
//! ## Architecture
//!
//! ```text
//! TumbleEngine::run_spin(sim, mode, criteria)
//!     │
//!     ├── draw_board ── SpecialSymbolRules ── guarantee window
//!     ├── run_cascade (Evaluating → Tumbling → Settling)
//!     ├── run_freespin (trigger, retrigger, guarantee window)
//!     └── check_game_repeat ── accept → Book / reject → redraw
//! ```

pub mod attributes;
pub mod board;
pub mod cascade;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod events;
pub mod free_spins;
pub mod guarantee;
pub mod sampler;
pub mod simulation;
pub mod symbols;
pub mod weights;
pub mod wins;

pub use attributes::*;
pub use board::*;
pub use cascade::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use evaluate::*;
pub use events::*;
pub use free_spins::*;
pub use guarantee::*;
pub use sampler::*;
pub use simulation::*;
pub use symbols::*;
pub use weights::*;
pub use wins::*;
