//! Win-rate aggregation over finished batches.

use serde::Serialize;

use crate::runner::RunRow;

/// Aggregate outcome counts over one batch of sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Number of sessions in the batch.
    pub total: usize,
    /// Fraction of sessions the traitors won.
    pub traitor_win_rate: f64,
    /// Fraction of sessions the faithful won.
    pub faithful_win_rate: f64,
}

/// Crunches win rates over `rows`. Draws count toward neither side, so the
/// two rates need not sum to one. An empty batch reads all zeros.
pub fn summarize(rows: &[RunRow]) -> BatchSummary {
    let total = rows.len();
    if total == 0 {
        return BatchSummary {
            total: 0,
            traitor_win_rate: 0.0,
            faithful_win_rate: 0.0,
        };
    }
    let traitor_wins = rows.iter().filter(|row| row.traitor_win).count();
    let faithful_wins = rows.iter().filter(|row| row.faithful_win).count();
    BatchSummary {
        total,
        traitor_win_rate: traitor_wins as f64 / total as f64,
        faithful_win_rate: faithful_wins as f64 / total as f64,
    }
}
