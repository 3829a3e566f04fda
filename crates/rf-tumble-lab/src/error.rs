//! Error types for the tumble simulator

use thiserror::Error;

use crate::config::GameType;

/// Simulation error type
#[derive(Error, Debug)]
pub enum TumbleError {
    #[error("No multiplier table for {gametype} (mode '{mode}', criteria '{criteria}')")]
    MissingMultiplierTable {
        gametype: GameType,
        mode: String,
        criteria: String,
    },

    #[error("Weight table has no positive weights: {0}")]
    EmptyWeightTable(String),

    #[error("No free spin trigger table for {0}")]
    MissingTriggerTable(GameType),

    #[error("Unknown bet mode: {0}")]
    UnknownBetMode(String),

    #[error("Unknown distribution '{criteria}' in bet mode '{mode}'")]
    UnknownDistribution { mode: String, criteria: String },

    #[error("Unknown reel set: {0}")]
    UnknownReelSet(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("No cell can take a '{symbol}' symbol (required multiplier {required})")]
    NoInjectableCell { symbol: String, required: u32 },

    #[error("Distribution '{criteria}' of mode '{mode}' not reached after {attempts} attempts")]
    DistributionUnreachable {
        mode: String,
        criteria: String,
        attempts: u32,
    },

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type TumbleResult<T> = Result<T, TumbleError>;
