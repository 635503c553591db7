//! Traitors simulator - command-line entry point.

#![warn(missing_docs)]

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use traitors::{parse_seeds, run_batch, run_one, Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::RunOne { seed, sim } => {
            let config = sim.build_config(seed)?;
            let row = run_one(config, sim.backend, &sim.outdir).await?;
            println!(
                "{}",
                json!({
                    "game_id": row.game_id,
                    "winner": row.winner,
                    "rounds": row.rounds,
                })
            );
        }
        Command::RunBatch { seeds, sim } => {
            let seeds = parse_seeds(&seeds)?;
            let config = sim.build_config(seeds.first().copied().unwrap_or(1))?;
            run_batch(config, &seeds, sim.backend, &sim.outdir).await?;
            println!("Wrote {}", sim.outdir.join("summary.csv").display());
        }
    }
    Ok(())
}
