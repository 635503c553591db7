//! The append-only session record: one JSON row per engine or player action,
//! plus an end-of-run summary.

use chrono::Utc;
use derive_more::{Display, Error};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

use crate::config::Condition;
use crate::game::GameState;

/// One row in a session's event log.
///
/// Engine-originated rows (tally results, the terminal verdict) carry an
/// `actor_id` of `-1`.
#[derive(Debug, Clone, Serialize)]
pub struct EventLogRow {
    /// Session identifier the row belongs to.
    pub game_id: String,
    /// Seed of the session, repeated on every row for flat-file analysis.
    pub seed: u64,
    /// Experiment condition of the session.
    pub condition: Condition,
    /// Round the action happened in.
    pub round: u32,
    /// Phase vocabulary string, e.g. `"voting"` or `"revote"`.
    pub phase: String,
    /// Acting player, or `-1` for the engine.
    pub actor_id: i64,
    /// What kind of action the payload describes.
    pub action_type: String,
    /// Action-specific payload.
    pub payload: serde_json::Value,
    /// Wall-clock time the row was written. Not part of the deterministic
    /// record.
    pub timestamp_utc: String,
}

impl EventLogRow {
    /// Current UTC time in RFC 3339 form, for the `timestamp_utc` field.
    pub fn timestamp() -> String {
        Utc::now().to_rfc3339()
    }
}

/// Where rows and the end-of-run summary go.
pub trait EventSink: Send {
    /// Appends one row to the record.
    fn log(&mut self, row: EventLogRow) -> Result<(), LogError>;

    /// Writes the summary for a finished session.
    fn write_summary(&mut self, state: &GameState) -> Result<(), LogError>;
}

fn summary_value(state: &GameState) -> Result<serde_json::Value, LogError> {
    let config = serde_json::to_value(&state.config)
        .map_err(|e| LogError::new(format!("serialize config: {e}")))?;
    Ok(json!({
        "game_id": state.game_id,
        "seed": state.config.seed,
        "condition": state.config.condition,
        "winner": state.winner,
        "rounds": state.round_idx,
        "eliminated_order": state.eliminated_order,
        "config": config,
    }))
}

/// Writes rows as JSON Lines to `{log_dir}/{game_id}.jsonl` and the summary
/// to `{log_dir}/{game_id}_summary.json`.
#[derive(Debug)]
pub struct JsonlLogger {
    log_dir: PathBuf,
    game_id: String,
    file: File,
}

impl JsonlLogger {
    /// Opens the row stream in append mode, creating `log_dir` as needed.
    #[instrument]
    pub fn new(log_dir: &Path, game_id: &str) -> Result<Self, LogError> {
        fs::create_dir_all(log_dir)
            .map_err(|e| LogError::new(format!("create {}: {e}", log_dir.display())))?;
        let path = log_dir.join(format!("{game_id}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LogError::new(format!("open {}: {e}", path.display())))?;
        info!(path = %path.display(), "Opened event log");
        Ok(Self {
            log_dir: log_dir.to_path_buf(),
            game_id: game_id.to_string(),
            file,
        })
    }
}

impl EventSink for JsonlLogger {
    fn log(&mut self, row: EventLogRow) -> Result<(), LogError> {
        let line = serde_json::to_string(&row)
            .map_err(|e| LogError::new(format!("serialize row: {e}")))?;
        writeln!(self.file, "{line}")
            .map_err(|e| LogError::new(format!("append row: {e}")))?;
        self.file
            .flush()
            .map_err(|e| LogError::new(format!("flush row: {e}")))
    }

    fn write_summary(&mut self, state: &GameState) -> Result<(), LogError> {
        let path = self.log_dir.join(format!("{}_summary.json", self.game_id));
        let summary = summary_value(state)?;
        let pretty = serde_json::to_string_pretty(&summary)
            .map_err(|e| LogError::new(format!("serialize summary: {e}")))?;
        fs::write(&path, pretty)
            .map_err(|e| LogError::new(format!("write {}: {e}", path.display())))?;
        info!(path = %path.display(), "Wrote session summary");
        Ok(())
    }
}

/// Collects rows in memory instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Every row logged, in arrival order.
    pub rows: Vec<EventLogRow>,
    /// The summary, once written.
    pub summary: Option<serde_json::Value>,
}

impl EventSink for MemorySink {
    fn log(&mut self, row: EventLogRow) -> Result<(), LogError> {
        self.rows.push(row);
        Ok(())
    }

    fn write_summary(&mut self, state: &GameState) -> Result<(), LogError> {
        self.summary = Some(summary_value(state)?);
        Ok(())
    }
}

/// An error while writing the session record.
#[derive(Debug, Display, Error, Clone)]
#[display("Log error: {message}, line: {line}, file: {file}")]
pub struct LogError {
    /// The error message.
    pub message: String,
    /// The line number where the error occurred.
    pub line: u32,
    /// The file where the error occurred.
    pub file: &'static str,
}

impl LogError {
    /// Creates a new error from a message, logging it at creation.
    #[track_caller]
    pub fn new(message: String) -> Self {
        error!("{message}");
        let caller = std::panic::Location::caller();
        Self {
            message,
            line: caller.line(),
            file: caller.file(),
        }
    }
}
