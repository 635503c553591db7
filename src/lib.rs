//! Seeded simulator for the Traitors hidden-role game.
//!
//! Nine players, two of them secret traitors, discuss, vote and murder
//! across rounds until one side wins. Runs are reproducible: the outcome is
//! a pure function of the seed, the configuration and the decision backend
//! driving the players.
//!
//! # Architecture
//!
//! - **Game**: phase machine, vote resolution and termination rules
//! - **Providers**: swappable decision backends (LLM, seeded random, scripted)
//! - **Session**: deterministic bootstrap and the single-run entry point
//! - **Runner**: seed batches, JSONL event logs and summary tables
//!
//! # Example
//!
//! ```no_run
//! use traitors::{run_session, BackendKind, GameConfig, MemorySink};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GameConfig::new(42);
//! let (state, sink) = run_session(config, BackendKind::Scripted, MemorySink::default()).await?;
//! println!("{:?} after {} rounds ({} events)", state.winner, state.round_idx, sink.rows.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod analysis;
mod cli;
mod config;
mod event_log;
mod game;
mod llm_client;
mod personas;
mod prompts;
mod providers;
mod runner;
mod session;

// Crate-level exports - Configuration
pub use config::{Condition, ConfigError, GameConfig};

// Crate-level exports - Game engine
pub use game::{
    assign_roles, clip_chars, evaluate_winner, resolve_banish, resolve_murder, tail_chars, tally,
    validate_ballot, AgentPrivateState, BallotError, GameState, Phase, PlayerId, PublicMessage,
    Role, RoundMachine, TieInfo, VoteRecord, Winner,
};

// Crate-level exports - Event logging
pub use event_log::{EventLogRow, EventSink, JsonlLogger, LogError, MemorySink};

// Crate-level exports - Decision providers
pub use providers::{
    BeliefUpdate, DecisionProvider, ModelProvider, PlayerView, ProviderError, RATIONALE_MAX_CHARS,
    RandomProvider, ScriptedProvider, VoteChoice,
};

// Crate-level exports - Personas
pub use personas::{assign_personas, builtin_personas, Persona, StrategyTendencies};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};

// Crate-level exports - Session bootstrap
pub use session::{build_providers, generate_game_id, init_game_state, run_session, BackendKind};

// Crate-level exports - Batch runner and analysis
pub use analysis::{summarize, BatchSummary};
pub use runner::{parse_seeds, run_batch, run_one, RunRow};

// Crate-level exports - CLI
pub use cli::{Cli, Command, SimArgs};
