//! Random provider: uniform legal decisions from a private seeded source.

use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

use crate::game::PlayerId;

use super::{BeliefUpdate, DecisionProvider, PlayerView, ProviderError, VoteChoice};

const CANNED_LINES: [&str; 5] = [
    "Something feels off this round.",
    "I'm keeping my head down for now.",
    "Somebody here is not who they say they are.",
    "Let's look at who voted for whom.",
    "I have a hunch but I'll sit on it.",
];

/// Provider that draws every decision uniformly from its own seeded source.
///
/// The source is private to the provider, so its draws never interleave with
/// the session source and cannot disturb the engine's reproducibility.
pub struct RandomProvider {
    id: PlayerId,
    name: String,
    rng: ChaCha8Rng,
}

impl RandomProvider {
    /// Creates a random provider for player `id` with its own stream seed.
    pub fn new(id: PlayerId, stream_seed: u64) -> Self {
        Self {
            id,
            name: format!("random-P{id}"),
            rng: ChaCha8Rng::seed_from_u64(stream_seed),
        }
    }

    fn pick(&mut self, candidates: &[PlayerId]) -> Result<PlayerId, ProviderError> {
        let legal: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|&pid| pid != self.id)
            .collect();
        legal
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| ProviderError::new(format!("No legal target for P{}", self.id)))
    }
}

#[async_trait::async_trait]
impl DecisionProvider for RandomProvider {
    async fn update_beliefs(&mut self, view: &PlayerView) -> Result<BeliefUpdate, ProviderError> {
        let scores: BTreeMap<PlayerId, f64> = view
            .alive_ids
            .iter()
            .copied()
            .filter(|&pid| pid != self.id)
            .map(|pid| (pid, self.rng.random_range(0.0..=1.0)))
            .collect();
        Ok(BeliefUpdate {
            scores,
            notes: "gut read".to_string(),
        })
    }

    async fn speak(&mut self, _view: &PlayerView) -> Result<String, ProviderError> {
        let line = CANNED_LINES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(CANNED_LINES[0]);
        Ok(line.to_string())
    }

    async fn vote(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError> {
        let candidates = if view.allowed_targets.is_empty() {
            &view.alive_ids
        } else {
            &view.allowed_targets
        };
        let target_id = self.pick(candidates)?;
        debug!(player = %self.name, target = target_id, "random ballot");
        Ok(VoteChoice {
            target_id,
            rationale: "coin flip".to_string(),
        })
    }

    async fn traitor_chat(&mut self, _view: &PlayerView) -> Result<String, ProviderError> {
        let line = CANNED_LINES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(CANNED_LINES[0]);
        Ok(line.to_string())
    }

    async fn choose_murder(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError> {
        let candidates: Vec<PlayerId> = view
            .alive_ids
            .iter()
            .copied()
            .filter(|pid| !view.traitor_ids.contains(pid))
            .collect();
        let target_id = self.pick(&candidates)?;
        debug!(player = %self.name, target = target_id, "random murder ballot");
        Ok(VoteChoice {
            target_id,
            rationale: "coin flip".to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(alive: &[PlayerId]) -> PlayerView {
        PlayerView {
            round_idx: 1,
            alive_ids: alive.to_vec(),
            ..PlayerView::default()
        }
    }

    #[tokio::test]
    async fn never_votes_for_self() {
        let mut provider = RandomProvider::new(2, 9);
        for _ in 0..32 {
            let choice = provider.vote(&view(&[1, 2, 3, 4])).await.unwrap();
            assert_ne!(choice.target_id, 2);
        }
    }

    #[tokio::test]
    async fn identical_stream_seeds_replay() {
        let mut a = RandomProvider::new(3, 41);
        let mut b = RandomProvider::new(3, 41);
        for _ in 0..8 {
            let left = a.vote(&view(&[1, 2, 3, 4, 5])).await.unwrap();
            let right = b.vote(&view(&[1, 2, 3, 4, 5])).await.unwrap();
            assert_eq!(left, right);
        }
    }

    #[tokio::test]
    async fn murder_targets_stay_faithful() {
        let mut provider = RandomProvider::new(1, 5);
        let mut v = view(&[1, 2, 3, 4, 5]);
        v.traitor_ids = vec![1, 2];
        for _ in 0..16 {
            let choice = provider.choose_murder(&v).await.unwrap();
            assert!(matches!(choice.target_id, 3 | 4 | 5));
        }
    }

    #[tokio::test]
    async fn belief_scores_stay_in_range() {
        let mut provider = RandomProvider::new(4, 77);
        let update = provider.update_beliefs(&view(&[1, 2, 3, 4])).await.unwrap();
        assert_eq!(update.scores.len(), 3);
        for score in update.scores.values() {
            assert!((0.0..=1.0).contains(score));
        }
    }
}
