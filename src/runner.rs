//! Batch orchestration: runs sessions over seed lists and writes the
//! flat-file result tables.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

use crate::analysis::summarize;
use crate::config::{Condition, GameConfig};
use crate::event_log::JsonlLogger;
use crate::game::Winner;
use crate::session::{generate_game_id, run_session, BackendKind};

/// One finished session, flattened for the batch summary table.
#[derive(Debug, Clone, Serialize)]
pub struct RunRow {
    /// Session identifier.
    pub game_id: String,
    /// Seed the session ran under.
    pub seed: u64,
    /// Experiment condition.
    pub condition: Condition,
    /// Outcome of the session.
    pub winner: Winner,
    /// Round the session ended in.
    pub rounds: u32,
    /// Whether the traitors won.
    pub traitor_win: bool,
    /// Whether the faithful won.
    pub faithful_win: bool,
}

/// Parses a seeds argument: one integer, or an inclusive `start..end` range.
pub fn parse_seeds(raw: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = raw.split_once("..") {
        let start: u64 = start
            .trim()
            .parse()
            .with_context(|| format!("invalid seed range start in {raw:?}"))?;
        let end: u64 = end
            .trim()
            .parse()
            .with_context(|| format!("invalid seed range end in {raw:?}"))?;
        if end < start {
            bail!("seed range end {end} is below start {start}");
        }
        return Ok((start..=end).collect());
    }
    let single: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid seeds argument {raw:?}"))?;
    Ok(vec![single])
}

/// Runs one session with a JSONL logger under `{outdir}/logs` and returns
/// its summary row.
#[instrument(skip(config), fields(seed = config.seed, condition = %config.condition))]
pub async fn run_one(config: GameConfig, backend: BackendKind, outdir: &Path) -> Result<RunRow> {
    let log_dir = outdir.join("logs");
    let game_id = generate_game_id(config.seed, config.condition);
    let logger = JsonlLogger::new(&log_dir, &game_id)?;
    let (state, _logger) = run_session(config, backend, logger).await?;
    let winner = state
        .winner
        .ok_or_else(|| anyhow!("session {} ended without a winner", state.game_id))?;
    info!(game_id = %state.game_id, winner = %winner, rounds = state.round_idx, "Session finished");
    Ok(RunRow {
        game_id: state.game_id,
        seed: state.config.seed,
        condition: state.config.condition,
        winner,
        rounds: state.round_idx,
        traitor_win: winner == Winner::Traitors,
        faithful_win: winner == Winner::Faithful,
    })
}

/// Runs one session per seed, all under the same base configuration, and
/// writes `summary.csv` under `outdir`.
#[instrument(skip(base), fields(sessions = seeds.len(), backend = %backend))]
pub async fn run_batch(
    base: GameConfig,
    seeds: &[u64],
    backend: BackendKind,
    outdir: &Path,
) -> Result<Vec<RunRow>> {
    let mut rows = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        let mut config = base.clone();
        config.seed = seed;
        rows.push(run_one(config, backend, outdir).await?);
    }
    write_summary_csv(&rows, &outdir.join("summary.csv"))?;
    let batch = summarize(&rows);
    info!(
        total = batch.total,
        traitor_win_rate = batch.traitor_win_rate,
        faithful_win_rate = batch.faithful_win_rate,
        "Batch complete"
    );
    Ok(rows)
}

fn write_summary_csv(rows: &[RunRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let mut out = String::from("game_id,seed,condition,winner,rounds,traitor_win,faithful_win\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            row.game_id,
            row.seed,
            row.condition,
            row.winner,
            row.rounds,
            row.traitor_win,
            row.faithful_win
        ));
    }
    fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "Wrote batch summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_range_is_inclusive() {
        assert_eq!(parse_seeds("1..5").unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_seeds("3..3").unwrap(), vec![3]);
    }

    #[test]
    fn single_seed_parses() {
        assert_eq!(parse_seeds("7").unwrap(), vec![7]);
        assert_eq!(parse_seeds(" 12 ").unwrap(), vec![12]);
    }

    #[test]
    fn bad_seed_arguments_are_rejected() {
        assert!(parse_seeds("five").is_err());
        assert!(parse_seeds("9..2").is_err());
        assert!(parse_seeds("1..x").is_err());
    }

    #[test]
    fn summary_csv_has_header_and_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let rows = vec![RunRow {
            game_id: "baseline_memory-1-abcd1234".to_string(),
            seed: 1,
            condition: Condition::BaselineMemory,
            winner: Winner::Faithful,
            rounds: 4,
            traitor_win: false,
            faithful_win: true,
        }];
        write_summary_csv(&rows, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "game_id,seed,condition,winner,rounds,traitor_win,faithful_win"
        );
        assert_eq!(
            lines[1],
            "baseline_memory-1-abcd1234,1,baseline_memory,faithful,4,false,true"
        );
    }

    #[test]
    fn empty_batch_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_summary_csv(&[], &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_end(),
            "game_id,seed,condition,winner,rounds,traitor_win,faithful_win"
        );
    }
}
