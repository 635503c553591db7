//! Command-line interface for the traitors simulator.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Condition, ConfigError, GameConfig};
use crate::session::BackendKind;

/// Traitors - seeded social-deduction simulator
#[derive(Parser, Debug)]
#[command(name = "traitors")]
#[command(about = "Seeded Traitors simulator with swappable decision backends", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single session
    RunOne {
        /// Session seed
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Simulation options
        #[command(flatten)]
        sim: SimArgs,
    },

    /// Run one session per seed and write a summary table
    RunBatch {
        /// Seed list: one integer or an inclusive range like 1..100
        #[arg(long, default_value = "1..5")]
        seeds: String,

        /// Simulation options
        #[command(flatten)]
        sim: SimArgs,
    },
}

/// Simulation options shared by both run commands. Unset flags fall back to
/// the configuration file when one is given, then to the stock defaults.
#[derive(Args, Debug, Clone)]
pub struct SimArgs {
    /// TOML configuration file; explicit flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Experiment condition
    #[arg(long, value_enum)]
    pub condition: Option<Condition>,

    /// Decision backend driving the players
    #[arg(long, value_enum, default_value_t = BackendKind::Llm)]
    pub backend: BackendKind,

    /// Model requested from the LLM backend
    #[arg(long)]
    pub model_name: Option<String>,

    /// Sampling temperature for the LLM backend
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Number of players
    #[arg(long)]
    pub n_players: Option<u32>,

    /// Number of traitors
    #[arg(long)]
    pub n_traitors: Option<u32>,

    /// Public messages per player per discussion phase
    #[arg(long)]
    pub discussion_turns: Option<u32>,

    /// Round cap before a forced draw
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Output directory for logs and summaries
    #[arg(long, default_value = "results")]
    pub outdir: PathBuf,
}

impl SimArgs {
    /// Resolves the effective configuration for `seed`.
    pub fn build_config(&self, seed: u64) -> Result<GameConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => GameConfig::from_file(path)?,
            None => GameConfig::new(seed),
        };
        config.seed = seed;
        if let Some(condition) = self.condition {
            config.condition = condition;
        }
        if let Some(model_name) = &self.model_name {
            config.model_name = model_name.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(n_players) = self.n_players {
            config.n_players = n_players;
        }
        if let Some(n_traitors) = self.n_traitors {
            config.n_traitors = n_traitors;
        }
        if let Some(discussion_turns) = self.discussion_turns {
            config.discussion_turns = discussion_turns;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        config.validate()?;
        Ok(config)
    }
}
