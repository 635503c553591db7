//! Scripted provider for tests and dry runs (no randomness, no network).

use std::collections::BTreeMap;
use tracing::debug;

use crate::game::PlayerId;

use super::{BeliefUpdate, DecisionProvider, PlayerView, ProviderError, VoteChoice};

/// Deterministic provider that always targets the lowest-id legal candidate.
///
/// It makes no random draws of its own, so a session running on scripted
/// providers exercises exactly the engine's draw sequence and nothing else.
pub struct ScriptedProvider {
    id: PlayerId,
    name: String,
}

impl ScriptedProvider {
    /// Creates a scripted provider for player `id`.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: format!("scripted-P{id}"),
        }
    }

    fn lowest_other(&self, candidates: &[PlayerId]) -> Result<PlayerId, ProviderError> {
        candidates
            .iter()
            .copied()
            .find(|&pid| pid != self.id)
            .ok_or_else(|| ProviderError::new(format!("No legal target for P{}", self.id)))
    }
}

#[async_trait::async_trait]
impl DecisionProvider for ScriptedProvider {
    async fn update_beliefs(&mut self, view: &PlayerView) -> Result<BeliefUpdate, ProviderError> {
        let scores: BTreeMap<PlayerId, f64> = view
            .alive_ids
            .iter()
            .copied()
            .filter(|&pid| pid != self.id)
            .map(|pid| (pid, 0.5))
            .collect();
        Ok(BeliefUpdate {
            scores,
            notes: "holding steady".to_string(),
        })
    }

    async fn speak(&mut self, view: &PlayerView) -> Result<String, ProviderError> {
        Ok(format!(
            "P{} is watching round {} quietly.",
            self.id, view.round_idx
        ))
    }

    async fn vote(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError> {
        let candidates = if view.allowed_targets.is_empty() {
            &view.alive_ids
        } else {
            &view.allowed_targets
        };
        let target_id = self.lowest_other(candidates)?;
        debug!(player = %self.name, target = target_id, "scripted ballot");
        Ok(VoteChoice {
            target_id,
            rationale: "lowest id first".to_string(),
        })
    }

    async fn traitor_chat(&mut self, view: &PlayerView) -> Result<String, ProviderError> {
        Ok(format!(
            "P{} suggests we stay the course in round {}.",
            self.id, view.round_idx
        ))
    }

    async fn choose_murder(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError> {
        let candidates: Vec<PlayerId> = view
            .alive_ids
            .iter()
            .copied()
            .filter(|pid| !view.traitor_ids.contains(pid))
            .collect();
        let target_id = self.lowest_other(&candidates)?;
        debug!(player = %self.name, target = target_id, "scripted murder ballot");
        Ok(VoteChoice {
            target_id,
            rationale: "lowest id first".to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
