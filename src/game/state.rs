//! Mutable session state and its transcript records.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::GameConfig;

use super::phase::Phase;
use super::role::{PlayerId, Role};
use super::terminal::Winner;

/// Messages folded into a rolling summary, counted from the tail.
const SUMMARY_TAIL_MESSAGES: usize = 6;
/// Character cap on the public summary handed to players.
const PUBLIC_SUMMARY_CHARS: usize = 600;
/// Character cap on the traitor-channel summary.
const TRAITOR_SUMMARY_CHARS: usize = 400;
/// Character cap on a player's compacted private memory.
const MEMORY_CHARS: usize = 600;

/// One message on the public or traitor channel, immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicMessage {
    /// Round the message was spoken in.
    pub round: u32,
    /// Phase the message was spoken in.
    pub phase: Phase,
    /// Id of the speaker.
    pub speaker_id: PlayerId,
    /// Message text, already clipped to the configured limit.
    pub content: String,
}

/// Ballots collected in one banish pass, first vote or revote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Round the ballots belong to.
    pub round: u32,
    /// Voter id to target id.
    pub votes: BTreeMap<PlayerId, PlayerId>,
}

/// Private, per-player working state. Only the owning player's decisions and
/// the round-end compaction step touch it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPrivateState {
    /// Rolling compacted memory of past rounds.
    pub memory_summary: String,
    /// Suspicion score per other alive player, each in `[0, 1]`.
    pub suspicion_scores: BTreeMap<PlayerId, f64>,
    /// Rationale attached to the player's most recent decision.
    pub last_rationale: Option<String>,
}

impl AgentPrivateState {
    /// Replaces the suspicion table, clamping every score into `[0, 1]`.
    pub fn record_suspicions(&mut self, scores: BTreeMap<PlayerId, f64>) {
        self.suspicion_scores = scores
            .into_iter()
            .map(|(pid, score)| (pid, score.clamp(0.0, 1.0)))
            .collect();
    }

    /// The player's three strongest suspicions as `P<id>:<score>` pairs,
    /// strongest first. Equal scores keep ascending id order. Returns
    /// `"none"` when no scores are held.
    pub fn top_suspicions(&self) -> String {
        if self.suspicion_scores.is_empty() {
            return "none".to_string();
        }
        let mut ranked: Vec<(PlayerId, f64)> = self
            .suspicion_scores
            .iter()
            .map(|(&pid, &score)| (pid, score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
            .iter()
            .take(3)
            .map(|(pid, score)| format!("P{pid}:{score:.2}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Folds the round's public summary into the rolling memory, keeping the
    /// most recent [`MEMORY_CHARS`] characters. `suppress` clears the memory
    /// instead, for conditions that run without one.
    pub fn compact_memory(&mut self, public_summary: &str, suppress: bool) {
        if suppress {
            self.memory_summary.clear();
            return;
        }
        let combined = format!("{} {}", self.memory_summary, public_summary);
        self.memory_summary = tail_chars(combined.trim(), MEMORY_CHARS).to_string();
    }
}

/// Complete mutable state of one session, exclusively owned by the round
/// machine for the session's lifetime.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Immutable configuration the session was created with.
    pub config: GameConfig,
    /// Reproducible session identifier.
    pub game_id: String,
    /// Current round, starting at 1.
    pub round_idx: u32,
    /// Current phase tag.
    pub phase: Phase,
    /// Ids still in the game, ascending.
    pub alive: BTreeSet<PlayerId>,
    /// Role per player, fixed at bootstrap.
    pub roles: BTreeMap<PlayerId, Role>,
    /// Traitor ids, fixed at bootstrap. Never shrinks on elimination.
    pub traitors: BTreeSet<PlayerId>,
    /// Every public message in order of appearance.
    pub public_transcript: Vec<PublicMessage>,
    /// Every traitor-channel message in order of appearance.
    pub traitor_private_transcript: Vec<PublicMessage>,
    /// Banish ballots per pass, revotes included.
    pub vote_history: Vec<VoteRecord>,
    /// Private working state per player.
    pub agent_states: BTreeMap<PlayerId, AgentPrivateState>,
    /// Ids in elimination order, banishes and murders interleaved.
    pub eliminated_order: Vec<PlayerId>,
    /// Recorded outcome. Written once, never overwritten.
    pub winner: Option<Winner>,
    /// The session's single seeded random source.
    pub rng: ChaCha8Rng,
}

impl GameState {
    /// Traitors still alive, ascending.
    pub fn alive_traitors(&self) -> BTreeSet<PlayerId> {
        self.traitors.intersection(&self.alive).copied().collect()
    }

    /// Role of `pid`. Unknown ids read as faithful.
    pub fn role_of(&self, pid: PlayerId) -> Role {
        self.roles.get(&pid).copied().unwrap_or(Role::Faithful)
    }

    /// Removes `pid` from the alive set and appends it to the elimination
    /// order.
    pub fn eliminate(&mut self, pid: PlayerId) {
        if self.alive.remove(&pid) {
            self.eliminated_order.push(pid);
        }
    }

    /// Rolling summary of the public channel: the last few messages joined
    /// as `P<id>: <content>`, capped at [`PUBLIC_SUMMARY_CHARS`] characters
    /// from the tail.
    pub fn public_summary(&self) -> String {
        summarize(
            &self.public_transcript,
            PUBLIC_SUMMARY_CHARS,
            "No public messages yet.",
        )
    }

    /// Rolling summary of the traitor channel, capped at
    /// [`TRAITOR_SUMMARY_CHARS`] characters.
    pub fn traitor_summary(&self) -> String {
        summarize(
            &self.traitor_private_transcript,
            TRAITOR_SUMMARY_CHARS,
            "No private traitor messages yet.",
        )
    }
}

fn summarize(transcript: &[PublicMessage], max_chars: usize, empty: &str) -> String {
    if transcript.is_empty() {
        return empty.to_string();
    }
    let start = transcript.len().saturating_sub(SUMMARY_TAIL_MESSAGES);
    let joined = transcript[start..]
        .iter()
        .map(|message| format!("P{}: {}", message.speaker_id, message.content))
        .collect::<Vec<_>>()
        .join(" ");
    tail_chars(&joined, max_chars).to_string()
}

/// The last `max_chars` characters of `text`, whole string when shorter.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let cut = text
        .char_indices()
        .nth(total - max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &text[cut..]
}

/// The first `max_chars` characters of `text` with trailing whitespace
/// removed.
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end(),
        None => text.trim_end(),
    }
}
