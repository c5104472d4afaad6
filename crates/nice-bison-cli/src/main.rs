//! Command-line runner for the bison cooperation model.
//!
//! ```bash
//! # one seeded run, metrics every tick, JSON summary on stdout
//! nice-bison run --steps 500
//!
//! # eight replicates derived from one base seed, run in parallel
//! nice-bison sweep --replicates 8 --steps 1000 --sample-every 10 --out sweep.json
//! ```
//!
//! Logs go to stderr; stdout is reserved for JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nice_bison_core::config::{GrassDistribution, SimConfig};
use nice_bison_core::model::{run_replicates, Model};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nice-bison")]
#[command(about = "Evolution of cooperation among grazing bison on a torus")]
#[command(version)]
struct Cli {
    /// Debug logging plus per-entity trace events
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one model and print its summary
    Run {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run independent replicates in parallel
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Number of replicate worlds
        #[arg(short, long, default_value = "8")]
        replicates: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON config; missing fields take defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "200")]
    steps: usize,

    #[arg(long, default_value = "1")]
    sample_every: usize,

    /// Seed override (the base seed for sweeps)
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    #[arg(long)]
    initial_bison: Option<usize>,

    #[arg(long)]
    battle_cost: Option<f64>,

    #[arg(long)]
    fight_weight: Option<f64>,

    #[arg(long)]
    mutation_std: Option<f64>,

    /// Spawn grass uniformly instead of clustered around the centre
    #[arg(long)]
    uniform_grass: bool,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl RunArgs {
    fn load_config(&self, verbose: bool) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                SimConfig::from_json(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SimConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(n) = self.initial_bison {
            config.initial_bison = n;
        }
        if let Some(k) = self.battle_cost {
            config.battle_cost = k;
        }
        if let Some(w) = self.fight_weight {
            config.movement_fight_weight = w;
        }
        if let Some(std) = self.mutation_std {
            config.mutation_std = std;
        }
        if self.uniform_grass {
            config.grass_distribution = GrassDistribution::Uniform;
        }
        config.verbose |= verbose;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    match out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_run(args: &RunArgs, verbose: bool) -> Result<()> {
    let config = args.load_config(verbose)?;
    tracing::info!(seed = config.seed, steps = args.steps, "starting run");
    let mut model = Model::try_new(config)?;
    let summary = model.try_run_experiment(args.steps, args.sample_every)?;
    tracing::info!(
        final_bison = summary.final_bison_count,
        battles = summary.total_battles,
        cooperation = ?summary.run_cooperation_mean,
        "run finished"
    );
    write_json(&summary, args.out.as_deref())
}

fn cmd_sweep(args: &RunArgs, replicates: usize, verbose: bool) -> Result<()> {
    let config = args.load_config(verbose)?;
    let mut seed_rng = ChaCha12Rng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..replicates).map(|_| seed_rng.random::<u64>()).collect();
    tracing::info!(base_seed = config.seed, replicates, steps = args.steps, "starting sweep");
    let summaries = run_replicates(&config, &seeds, args.steps, args.sample_every)?;
    let extinct = summaries
        .iter()
        .filter(|s| s.extinction_step.is_some())
        .count();
    tracing::info!(replicates, extinct, "sweep finished");
    write_json(&summaries, args.out.as_deref())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match &cli.command {
        Commands::Run { run } => cmd_run(run, cli.verbose),
        Commands::Sweep { run, replicates } => cmd_sweep(run, *replicates, cli.verbose),
    }
}
