//! Tumble simulator CLI
//!
//! Usage:
//!   tumble-sim run                       - Simulate every bet mode
//!   tumble-sim run --mode bonus -n 5000  - Simulate one mode
//!   tumble-sim validate                  - Check a config
//!   tumble-sim export --yaml             - Print the config

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use rf_tumble_lab::{GameConfig, SimulationRun, SimulationSummary, run_simulations};

#[derive(Parser)]
#[command(name = "tumble-sim", about = "Tumble slot spin simulator")]
struct Cli {
    /// Game config (.json/.yaml); the built-in demo game when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate bet modes and report RTP
    Run {
        /// Bet mode (repeatable; all modes when omitted)
        #[arg(short, long)]
        mode: Vec<String>,
        /// Simulations per mode
        #[arg(short = 'n', long, default_value_t = 1000)]
        sims: u64,
        /// Master seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        /// Worker threads
        #[arg(short, long)]
        threads: Option<usize>,
        /// Pin every sim to one criteria
        #[arg(long)]
        criteria: Option<String>,
        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the config and list its bet modes
    Validate,
    /// Print the config
    Export {
        /// YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run {
            mode,
            sims,
            seed,
            threads,
            criteria,
            json,
        } => run(Arc::new(config), mode, sims, seed, threads, criteria, json),
        Commands::Validate => validate(&config),
        Commands::Export { yaml } => export(&config, yaml),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    match path {
        Some(path) => GameConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(GameConfig::multiplier_demo()),
    }
}

fn run(
    config: Arc<GameConfig>,
    modes: Vec<String>,
    sims: u64,
    seed: u64,
    threads: Option<usize>,
    criteria: Option<String>,
    json: bool,
) -> Result<()> {
    let modes = if modes.is_empty() {
        config.bet_modes.iter().map(|m| m.name.clone()).collect()
    } else {
        modes
    };

    let mut summaries = Vec::with_capacity(modes.len());
    for mode in modes {
        let mut run = SimulationRun::new(&mode, sims).with_seed(seed);
        if let Some(threads) = threads {
            run = run.with_threads(threads);
        }
        if let Some(criteria) = &criteria {
            run = run.with_criteria(criteria);
        }

        let summary = run_simulations(Arc::clone(&config), &run)
            .with_context(|| format!("simulating '{}'", mode))?;
        summaries.push(summary);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_table(&summaries);
    }
    Ok(())
}

fn print_table(summaries: &[SimulationSummary]) {
    println!(
        "{:<16} {:>8} {:>8} {:>10} {:>10} {:>12} {:>6}",
        "mode", "sims", "rtp", "hit rate", "avg win", "max win", "unrch"
    );
    for s in summaries {
        println!(
            "{:<16} {:>8} {:>8.4} {:>10.4} {:>10.2} {:>12.2} {:>6}",
            s.mode,
            s.num_sims,
            s.rtp(),
            s.hit_rate(),
            s.average_win(),
            s.max_win,
            s.unreachable
        );
    }
}

fn validate(config: &GameConfig) -> Result<()> {
    config.validate()?;
    if config.bet_modes.is_empty() {
        bail!("no bet modes");
    }

    println!("{}: {} reels, wincap {}", config.game_id, config.num_reels, config.wincap);
    for mode in &config.bet_modes {
        println!(
            "  {:<16} cost {:>8.2}  rtp {:.3}  criteria [{}]",
            mode.name,
            mode.cost,
            mode.rtp,
            mode.criteria_names().join(", ")
        );
    }
    Ok(())
}

fn export(config: &GameConfig, yaml: bool) -> Result<()> {
    let text = if yaml {
        serde_yml::to_string(config)?
    } else {
        config.to_json()?
    };
    println!("{}", text);
    Ok(())
}
