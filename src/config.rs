//! Immutable session configuration.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, instrument};

/// Named experimental variant. Decides which optional steps of a round run.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Condition {
    /// Full loop: belief updates run and private memory persists.
    #[default]
    BaselineMemory,
    /// Ablation: belief updates are skipped and memory is cleared each round.
    NoMemory,
}

impl Condition {
    /// True when the condition runs without belief updates or memory.
    pub fn suppresses_memory(self) -> bool {
        matches!(self, Condition::NoMemory)
    }
}

/// Configuration for one game session. Created once at bootstrap and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of players, ids `1..=n_players`.
    #[serde(default = "default_n_players")]
    pub n_players: u32,
    /// Number of traitors dealt at bootstrap.
    #[serde(default = "default_n_traitors")]
    pub n_traitors: u32,
    /// Round cap; reaching it forces a draw.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Public messages each alive player speaks per discussion phase.
    #[serde(default = "default_discussion_turns")]
    pub discussion_turns: u32,
    /// Character cap applied to every spoken message.
    #[serde(default = "default_message_char_limit")]
    pub message_char_limit: usize,
    /// Seed for the session's random source. Fully determines the run.
    pub seed: u64,
    /// Model requested from the LLM backend.
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Sampling temperature for the LLM backend.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Experimental condition.
    #[serde(default)]
    pub condition: Condition,
    /// Name of the banish tie-break protocol in effect.
    #[serde(default = "default_tie_break_rule")]
    pub tie_break_rule: String,
}

fn default_n_players() -> u32 {
    9
}

fn default_n_traitors() -> u32 {
    2
}

fn default_max_rounds() -> u32 {
    30
}

fn default_discussion_turns() -> u32 {
    1
}

fn default_message_char_limit() -> usize {
    400
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_tie_break_rule() -> String {
    "revote_once_then_random".to_string()
}

impl GameConfig {
    /// A configuration with the stock parameters and the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            n_players: default_n_players(),
            n_traitors: default_n_traitors(),
            max_rounds: default_max_rounds(),
            discussion_turns: default_discussion_turns(),
            message_char_limit: default_message_char_limit(),
            seed,
            model_name: default_model_name(),
            temperature: default_temperature(),
            condition: Condition::default(),
            tie_break_rule: default_tie_break_rule(),
        }
    }

    /// Loads a configuration from a TOML file and validates it.
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading game config");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ConfigError::new(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the bounds no session can be built without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_traitors == 0 || self.n_traitors >= self.n_players {
            return Err(ConfigError::new(format!(
                "n_traitors must be in (0, n_players); got {} of {}",
                self.n_traitors, self.n_players
            )));
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::new("max_rounds must be at least 1".to_string()));
        }
        if self.message_char_limit == 0 {
            return Err(ConfigError::new(
                "message_char_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Human-readable description.
    pub message: String,
    /// Line the error was raised from.
    pub line: u32,
    /// File the error was raised from.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "Config error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn stock_parameters() {
        let config = GameConfig::new(3);
        assert_eq!(config.n_players, 9);
        assert_eq!(config.n_traitors, 2);
        assert_eq!(config.max_rounds, 30);
        assert_eq!(config.discussion_turns, 1);
        assert_eq!(config.message_char_limit, 400);
        assert_eq!(config.seed, 3);
        assert_eq!(config.model_name, "gpt-4o-mini");
        assert_eq!(config.condition, Condition::BaselineMemory);
        assert_eq!(config.tie_break_rule, "revote_once_then_random");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn traitor_bounds_are_enforced() {
        let mut config = GameConfig::new(1);
        config.n_traitors = 0;
        assert!(config.validate().is_err());

        config.n_traitors = 9;
        assert!(config.validate().is_err());

        config.n_traitors = 10;
        assert!(config.validate().is_err());

        config.n_traitors = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn condition_parses_from_snake_case() {
        assert_eq!(
            Condition::from_str("baseline_memory").ok(),
            Some(Condition::BaselineMemory)
        );
        assert_eq!(Condition::from_str("no_memory").ok(), Some(Condition::NoMemory));
        assert!(Condition::from_str("bogus").is_err());
        assert_eq!(Condition::NoMemory.to_string(), "no_memory");
    }

    #[test]
    fn suppression_follows_condition() {
        assert!(!Condition::BaselineMemory.suppresses_memory());
        assert!(Condition::NoMemory.suppresses_memory());
    }

    #[test]
    fn toml_round_trip_with_defaults() {
        let raw = "seed = 17\nn_players = 6\nn_traitors = 1\ncondition = \"no_memory\"\n";
        let config: GameConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.seed, 17);
        assert_eq!(config.n_players, 6);
        assert_eq!(config.n_traitors, 1);
        assert_eq!(config.condition, Condition::NoMemory);
        // Everything unspecified falls back to the stock value.
        assert_eq!(config.max_rounds, 30);
        assert_eq!(config.model_name, "gpt-4o-mini");

        let encoded = toml::to_string(&config).unwrap();
        let decoded: GameConfig = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn from_file_rejects_missing_path() {
        let result = GameConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(result.is_err());
    }
}
