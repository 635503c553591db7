//! Session bootstrap: deterministic state creation, provider wiring and the
//! single-run entry point.

use anyhow::Result;
use clap::ValueEnum;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

use crate::config::{Condition, ConfigError, GameConfig};
use crate::event_log::EventSink;
use crate::game::{
    assign_roles, AgentPrivateState, GameState, Phase, PlayerId, Role, RoundMachine,
};
use crate::llm_client::{LlmClient, LlmConfig};
use crate::personas::assign_personas;
use crate::providers::{DecisionProvider, ModelProvider, RandomProvider, ScriptedProvider};

/// Salt for deriving per-player provider streams off the session seed.
const STREAM_SALT: u64 = 0x517c_c1b7_2722_0a95;

/// Which decision provider family drives the players.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum BackendKind {
    /// Prompted language-model agents.
    #[default]
    Llm,
    /// Seeded uniform choices, no model calls.
    Random,
    /// Fixed lowest-id choices, no randomness at all.
    Scripted,
}

/// Builds the reproducible session identifier
/// `{condition}-{seed}-{hash8}`, where `hash8` is the first eight hex digits
/// of `sha256("{seed}-{condition}")`.
pub fn generate_game_id(seed: u64, condition: Condition) -> String {
    let digest = Sha256::digest(format!("{seed}-{condition}").as_bytes());
    let hex = format!("{digest:x}");
    format!("{condition}-{seed}-{}", &hex[..8])
}

/// Creates the deterministic starting state for `config`: validates it,
/// seeds the session source, deals roles and gives every player a neutral
/// suspicion table over the others.
#[instrument(skip(config), fields(seed = config.seed, condition = %config.condition))]
pub fn init_game_state(config: GameConfig) -> Result<GameState, ConfigError> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (roles, traitors) = assign_roles(config.n_players, config.n_traitors, &mut rng);
    let alive: BTreeSet<PlayerId> = (1..=config.n_players).collect();
    let agent_states: BTreeMap<PlayerId, AgentPrivateState> = alive
        .iter()
        .map(|&pid| {
            let suspicion_scores = alive
                .iter()
                .copied()
                .filter(|&other| other != pid)
                .map(|other| (other, 0.5))
                .collect();
            (
                pid,
                AgentPrivateState {
                    suspicion_scores,
                    ..AgentPrivateState::default()
                },
            )
        })
        .collect();
    let game_id = generate_game_id(config.seed, config.condition);
    info!(game_id = %game_id, players = config.n_players, "Bootstrapped session");
    debug!(?traitors, "Roles dealt");
    Ok(GameState {
        config,
        game_id,
        round_idx: 1,
        phase: Phase::Discussion,
        alive,
        roles,
        traitors,
        public_transcript: Vec::new(),
        traitor_private_transcript: Vec::new(),
        vote_history: Vec::new(),
        agent_states,
        eliminated_order: Vec::new(),
        winner: None,
        rng,
    })
}

fn agent_stream_seed(seed: u64, pid: PlayerId) -> u64 {
    seed.wrapping_mul(STREAM_SALT).wrapping_add(pid as u64)
}

/// Builds one decision provider per player id.
///
/// Personas are dealt from an isolated source seeded with the session seed,
/// so provider construction never advances the session's own stream.
#[instrument(skip(config, roles), fields(backend = %backend))]
pub fn build_providers(
    config: &GameConfig,
    roles: &BTreeMap<PlayerId, Role>,
    backend: BackendKind,
) -> Result<BTreeMap<PlayerId, Box<dyn DecisionProvider>>> {
    let mut providers: BTreeMap<PlayerId, Box<dyn DecisionProvider>> = BTreeMap::new();
    match backend {
        BackendKind::Llm => {
            let mut persona_rng = ChaCha8Rng::seed_from_u64(config.seed);
            let personas = assign_personas(config.n_players, &mut persona_rng)?;
            let llm_config = LlmConfig::from_env(config.model_name.clone(), config.temperature)?;
            let client = LlmClient::new(llm_config);
            for (pid, persona) in (1..=config.n_players).zip(personas) {
                let role = roles.get(&pid).copied().unwrap_or(Role::Faithful);
                providers.insert(
                    pid,
                    Box::new(ModelProvider::new(
                        pid,
                        role,
                        persona,
                        client.clone(),
                        config.message_char_limit,
                    )),
                );
            }
        }
        BackendKind::Random => {
            for pid in 1..=config.n_players {
                providers.insert(
                    pid,
                    Box::new(RandomProvider::new(pid, agent_stream_seed(config.seed, pid))),
                );
            }
        }
        BackendKind::Scripted => {
            for pid in 1..=config.n_players {
                providers.insert(pid, Box::new(ScriptedProvider::new(pid)));
            }
        }
    }
    Ok(providers)
}

/// Runs one complete session and returns its final state along with the
/// sink, summary already written.
pub async fn run_session<S: EventSink>(
    config: GameConfig,
    backend: BackendKind,
    sink: S,
) -> Result<(GameState, S)> {
    let state = init_game_state(config)?;
    let providers = build_providers(&state.config, &state.roles, backend)?;
    let mut machine = RoundMachine::new(state, providers, sink);
    machine.run().await?;
    let (state, mut sink) = machine.into_parts();
    sink.write_summary(&state)?;
    Ok((state, sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_embeds_condition_and_seed() {
        let id = generate_game_id(42, Condition::BaselineMemory);
        assert!(id.starts_with("baseline_memory-42-"));
        assert_eq!(id.len(), "baseline_memory-42-".len() + 8);
    }

    #[test]
    fn game_id_is_stable_and_input_sensitive() {
        let a = generate_game_id(7, Condition::NoMemory);
        let b = generate_game_id(7, Condition::NoMemory);
        assert_eq!(a, b);
        assert_ne!(a, generate_game_id(8, Condition::NoMemory));
        assert_ne!(a, generate_game_id(7, Condition::BaselineMemory));
    }

    #[test]
    fn init_is_deterministic_per_seed() {
        let a = init_game_state(GameConfig::new(13)).unwrap();
        let b = init_game_state(GameConfig::new(13)).unwrap();
        assert_eq!(a.traitors, b.traitors);
        assert_eq!(a.roles, b.roles);
        assert_eq!(a.game_id, b.game_id);
        assert_eq!(a.round_idx, 1);
        assert_eq!(a.phase, Phase::Discussion);
    }

    #[test]
    fn init_rejects_invalid_config() {
        let mut config = GameConfig::new(1);
        config.n_traitors = 0;
        assert!(init_game_state(config).is_err());
    }

    #[test]
    fn init_gives_neutral_suspicions_over_others() {
        let state = init_game_state(GameConfig::new(5)).unwrap();
        let n = state.config.n_players;
        for (&pid, ps) in &state.agent_states {
            assert_eq!(ps.suspicion_scores.len(), (n - 1) as usize);
            assert!(!ps.suspicion_scores.contains_key(&pid));
            assert!(ps.suspicion_scores.values().all(|&s| s == 0.5));
            assert!(ps.memory_summary.is_empty());
        }
    }

    #[test]
    fn stream_seeds_differ_per_player() {
        let seeds: BTreeSet<u64> = (1..=9).map(|pid| agent_stream_seed(99, pid)).collect();
        assert_eq!(seeds.len(), 9);
    }

    #[test]
    fn scripted_and_random_backends_cover_every_player() {
        let config = GameConfig::new(3);
        let state = init_game_state(config).unwrap();
        for backend in [BackendKind::Scripted, BackendKind::Random] {
            let providers = build_providers(&state.config, &state.roles, backend).unwrap();
            let ids: Vec<PlayerId> = providers.keys().copied().collect();
            let expected: Vec<PlayerId> = (1..=state.config.n_players).collect();
            assert_eq!(ids, expected);
        }
    }
}
