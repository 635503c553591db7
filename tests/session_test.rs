//! Integration tests for the batch runner's file outputs.

use std::fs;

use traitors::{parse_seeds, run_batch, run_one, BackendKind, GameConfig, Winner};

fn small_config(seed: u64) -> GameConfig {
    let mut config = GameConfig::new(seed);
    config.n_players = 5;
    config.n_traitors = 1;
    config
}

#[tokio::test]
async fn run_one_writes_jsonl_log_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let row = run_one(small_config(11), BackendKind::Scripted, dir.path())
        .await
        .unwrap();

    assert_eq!(row.traitor_win, row.winner == Winner::Traitors);
    assert_eq!(row.faithful_win, row.winner == Winner::Faithful);

    let log_path = dir
        .path()
        .join("logs")
        .join(format!("{}.jsonl", row.game_id));
    let raw = fs::read_to_string(&log_path).unwrap();
    assert!(!raw.is_empty());
    let mut last_round = 0;
    for line in raw.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["game_id"], row.game_id.as_str());
        assert_eq!(value["seed"], 11);
        last_round = last_round.max(value["round"].as_u64().unwrap());
    }
    assert!(last_round >= 1);

    let summary_path = dir
        .path()
        .join("logs")
        .join(format!("{}_summary.json", row.game_id));
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["game_id"], row.game_id.as_str());
    assert_eq!(summary["winner"], serde_json::to_value(row.winner).unwrap());
    assert_eq!(summary["rounds"], row.rounds);
    assert_eq!(summary["config"]["n_players"], 5);
}

#[tokio::test]
async fn run_batch_writes_one_csv_row_per_seed() {
    let dir = tempfile::tempdir().unwrap();
    let seeds = parse_seeds("1..3").unwrap();
    let rows = run_batch(small_config(0), &seeds, BackendKind::Scripted, dir.path())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter().map(|row| row.seed).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let text = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "game_id,seed,condition,winner,rounds,traitor_win,faithful_win"
    );
    for (line, row) in lines[1..].iter().zip(&rows) {
        assert!(line.starts_with(&row.game_id));
        assert!(line.contains(&format!(",{},", row.seed)));
    }

    for row in &rows {
        let log = dir
            .path()
            .join("logs")
            .join(format!("{}.jsonl", row.game_id));
        assert!(log.exists(), "missing log for {}", row.game_id);
    }
}

#[tokio::test]
async fn batches_replay_identically() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let seeds = [2, 4];
    let rows_a = run_batch(small_config(0), &seeds, BackendKind::Random, dir_a.path())
        .await
        .unwrap();
    let rows_b = run_batch(small_config(0), &seeds, BackendKind::Random, dir_b.path())
        .await
        .unwrap();

    assert_eq!(rows_a.len(), rows_b.len());
    for (a, b) in rows_a.iter().zip(&rows_b) {
        assert_eq!(a.game_id, b.game_id);
        assert_eq!(a.winner, b.winner);
        assert_eq!(a.rounds, b.rounds);
    }
}
