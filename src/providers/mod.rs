//! Decision providers: the boundary through which every player acts.
//!
//! The round machine hands a provider a read-only [`PlayerView`] and receives
//! a decision back. Providers never touch game state or the session's random
//! source, so swapping one backend for another cannot move the engine's
//! reproducible draw sequence.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

use crate::game::PlayerId;

mod llm;
mod random;
mod scripted;

pub use llm::ModelProvider;
pub use random::RandomProvider;
pub use scripted::ScriptedProvider;

/// Character cap on a ballot rationale.
pub const RATIONALE_MAX_CHARS: usize = 200;

/// Read-only snapshot handed to a provider for one decision.
///
/// Traitor-only fields are populated only when the viewer is a traitor;
/// everyone else sees them empty.
#[derive(Debug, Clone, Default)]
pub struct PlayerView {
    /// Current round, starting at 1.
    pub round_idx: u32,
    /// Alive ids in ascending order, the viewer included.
    pub alive_ids: Vec<PlayerId>,
    /// Rolling summary of the public channel.
    pub public_summary: String,
    /// The viewer's compacted private memory.
    pub memory_summary: String,
    /// The viewer's strongest suspicions, preformatted.
    pub top_suspicions: String,
    /// Alive traitor ids. Empty for faithful viewers.
    pub traitor_ids: Vec<PlayerId>,
    /// Rolling summary of the traitor channel. Empty for faithful viewers.
    pub traitor_summary: String,
    /// When non-empty, ballots must target one of these ids (revote).
    pub allowed_targets: Vec<PlayerId>,
}

/// Replacement suspicion scores plus a private note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefUpdate {
    /// Suspicion score per player id.
    pub scores: BTreeMap<PlayerId, f64>,
    /// Short private note kept as the player's last rationale.
    #[serde(default)]
    pub notes: String,
}

/// A banish or murder ballot: one target and a short rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteChoice {
    /// Id of the player this ballot targets.
    pub target_id: PlayerId,
    /// Free-text justification, at most [`RATIONALE_MAX_CHARS`] characters.
    #[serde(default)]
    pub rationale: String,
}

impl VoteChoice {
    /// Rejects rationales past the character cap.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let len = self.rationale.chars().count();
        if len > RATIONALE_MAX_CHARS {
            return Err(ProviderError::new(format!(
                "Rationale too long: {} chars (limit {})",
                len, RATIONALE_MAX_CHARS
            )));
        }
        Ok(())
    }
}

/// One player's decision backend for a session.
///
/// Every method receives the caller's current [`PlayerView`]. Errors are
/// recoverable: the machine answers them with its fallback policy instead of
/// aborting the session.
#[async_trait::async_trait]
pub trait DecisionProvider: Send {
    /// Revised suspicion scores over the other alive players.
    async fn update_beliefs(&mut self, view: &PlayerView) -> Result<BeliefUpdate, ProviderError>;

    /// One public discussion message.
    async fn speak(&mut self, view: &PlayerView) -> Result<String, ProviderError>;

    /// One banish ballot. During a revote `view.allowed_targets` is
    /// non-empty and binding.
    async fn vote(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError>;

    /// One private message on the traitor channel.
    async fn traitor_chat(&mut self, view: &PlayerView) -> Result<String, ProviderError>;

    /// One murder ballot against an alive non-traitor.
    async fn choose_murder(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError>;

    /// Display name used in logs.
    fn name(&self) -> &str;
}

/// Decision provider error.
#[derive(Debug, Clone, Display, Error)]
#[display("Provider error: {} at {}:{}", message, file, line)]
pub struct ProviderError {
    /// Human-readable description.
    pub message: String,
    /// Line the error was raised from.
    pub line: u32,
    /// File the error was raised from.
    pub file: &'static str,
}

impl ProviderError {
    /// Creates a new provider error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "Provider error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
