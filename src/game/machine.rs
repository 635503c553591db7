//! The round state machine: drives one session from the opening discussion
//! to the terminal phase.
//!
//! The machine owns the session's [`GameState`] and one decision provider per
//! player. Providers only ever see read-only views; every mutation and every
//! draw from the session source happens here, in a fixed order, which is what
//! makes a run a pure function of its seed and the providers' replies.

use anyhow::{anyhow, Context, Result};
use derive_more::Display;
use rand::seq::IndexedRandom;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::event_log::{EventLogRow, EventSink};
use crate::providers::{BeliefUpdate, DecisionProvider, PlayerView, ProviderError, VoteChoice};

use super::phase::Phase;
use super::resolution::{resolve_banish, resolve_murder, tally};
use super::role::PlayerId;
use super::state::{clip_chars, GameState, PublicMessage, VoteRecord};
use super::terminal::evaluate_winner;

/// Why a submitted ballot was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BallotError {
    /// The ballot targets its own voter.
    #[display("self-vote is not allowed")]
    SelfTarget,
    /// The ballot targets an id outside the eligible candidate set.
    #[display("target is not an eligible candidate")]
    IneligibleTarget,
}

/// Checks one ballot against the not-self and eligibility rules.
///
/// The self rule is checked first and holds regardless of what the candidate
/// set contains.
pub fn validate_ballot(
    voter: PlayerId,
    target: PlayerId,
    eligible: &[PlayerId],
) -> Result<(), BallotError> {
    if target == voter {
        return Err(BallotError::SelfTarget);
    }
    if !eligible.contains(&target) {
        return Err(BallotError::IneligibleTarget);
    }
    Ok(())
}

/// Drives one session to completion.
pub struct RoundMachine<S> {
    state: GameState,
    providers: BTreeMap<PlayerId, Box<dyn DecisionProvider>>,
    sink: S,
}

impl<S: EventSink> RoundMachine<S> {
    /// Creates a machine over a bootstrapped state, one provider per player
    /// and an event sink.
    pub fn new(
        state: GameState,
        providers: BTreeMap<PlayerId, Box<dyn DecisionProvider>>,
        sink: S,
    ) -> Self {
        Self {
            state,
            providers,
            sink,
        }
    }

    /// The session state as it stands.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Tears the machine down into its final state and the sink.
    pub fn into_parts(self) -> (GameState, S) {
        (self.state, self.sink)
    }

    /// Runs phases until the machine reaches its terminal state.
    #[instrument(skip(self), fields(game_id = %self.state.game_id))]
    pub async fn run(&mut self) -> Result<()> {
        info!(
            players = self.state.config.n_players,
            traitors = self.state.config.n_traitors,
            seed = self.state.config.seed,
            condition = %self.state.config.condition,
            "Running session"
        );
        while !self.state.phase.is_end() {
            self.step().await?;
        }
        Ok(())
    }

    /// Handles the current phase, then advances along the transition
    /// function.
    async fn step(&mut self) -> Result<()> {
        match self.state.phase {
            Phase::Discussion => self.discussion().await?,
            Phase::Voting => self.voting().await?,
            Phase::Banish => self.banish().await?,
            Phase::BanishCheck | Phase::MurderCheck => self.terminal_check()?,
            Phase::TraitorChat => self.traitor_chat().await?,
            Phase::Murder => self.murder().await?,
            Phase::PostMurderUpdate => self.post_murder_update(),
            Phase::End => {}
        }
        self.state.phase = self.state.phase.next(self.state.winner);
        Ok(())
    }

    fn provider_mut(&mut self, pid: PlayerId) -> Result<&mut Box<dyn DecisionProvider>> {
        self.providers
            .get_mut(&pid)
            .ok_or_else(|| anyhow!("no provider registered for P{pid}"))
    }

    /// Appends one row to the event sink with the session's identity fields
    /// filled in.
    fn emit(
        &mut self,
        phase: &str,
        actor_id: i64,
        action_type: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let row = EventLogRow {
            game_id: self.state.game_id.clone(),
            seed: self.state.config.seed,
            condition: self.state.config.condition,
            round: self.state.round_idx,
            phase: phase.to_string(),
            actor_id,
            action_type: action_type.to_string(),
            payload,
            timestamp_utc: EventLogRow::timestamp(),
        };
        self.sink.log(row).context("failed to append event row")?;
        Ok(())
    }

    /// Builds the read-only view `pid` decides from.
    ///
    /// Summaries are passed in rather than recomputed so every player in a
    /// phase sees the channel as it stood at phase entry. Traitor fields stay
    /// empty for faithful viewers.
    fn build_view(
        &self,
        pid: PlayerId,
        public_summary: &str,
        traitor_summary: &str,
        allowed_targets: &[PlayerId],
    ) -> PlayerView {
        let private = self.state.agent_states.get(&pid);
        let (traitor_ids, traitor_summary) = if self.state.role_of(pid).is_traitor() {
            (
                self.state.alive_traitors().into_iter().collect(),
                traitor_summary.to_string(),
            )
        } else {
            (Vec::new(), String::new())
        };
        PlayerView {
            round_idx: self.state.round_idx,
            alive_ids: self.state.alive.iter().copied().collect(),
            public_summary: public_summary.to_string(),
            memory_summary: private
                .map(|ps| ps.memory_summary.clone())
                .unwrap_or_default(),
            top_suspicions: private
                .map(|ps| ps.top_suspicions())
                .unwrap_or_else(|| "none".to_string()),
            traitor_ids,
            traitor_summary,
            allowed_targets: allowed_targets.to_vec(),
        }
    }

    /// Settles one submitted ballot through the fallback policy.
    ///
    /// A provider failure or an invalid target is replaced by one uniform
    /// draw from the session source over `eligible` minus the voter. Returns
    /// the final target, the rationale to log and an error annotation when a
    /// fallback fired.
    fn settle_ballot(
        &mut self,
        voter: PlayerId,
        submitted: Result<VoteChoice, ProviderError>,
        eligible: &[PlayerId],
    ) -> Result<(PlayerId, String, Option<String>)> {
        let pool: Vec<PlayerId> = eligible
            .iter()
            .copied()
            .filter(|&pid| pid != voter)
            .collect();
        match submitted {
            Ok(choice) => match validate_ballot(voter, choice.target_id, eligible) {
                Ok(()) => Ok((choice.target_id, choice.rationale, None)),
                Err(reason) => {
                    let target = self.draw_fallback(voter, &pool)?;
                    debug!(
                        voter,
                        submitted = choice.target_id,
                        target,
                        %reason,
                        "Ballot rejected; drew fallback target"
                    );
                    Ok((
                        target,
                        choice.rationale,
                        Some(format!("invalid target P{}: {reason}", choice.target_id)),
                    ))
                }
            },
            Err(err) => {
                let target = self.draw_fallback(voter, &pool)?;
                warn!(voter, error = %err, "Provider failed; drew fallback target");
                Ok((target, "fallback".to_string(), Some(err.to_string())))
            }
        }
    }

    fn draw_fallback(&mut self, voter: PlayerId, pool: &[PlayerId]) -> Result<PlayerId> {
        pool.choose(&mut self.state.rng)
            .copied()
            .ok_or_else(|| anyhow!("no fallback candidates for P{voter}"))
    }

    /// Belief updates (unless the condition suppresses them) and one or more
    /// public messages from every alive player, in ascending id order.
    #[instrument(skip(self), fields(round = self.state.round_idx))]
    async fn discussion(&mut self) -> Result<()> {
        info!(alive = self.state.alive.len(), "Discussion phase");
        let alive_ids: Vec<PlayerId> = self.state.alive.iter().copied().collect();
        let public_summary = self.state.public_summary();
        let suppress = self.state.config.condition.suppresses_memory();
        for pid in alive_ids.clone() {
            let view = self.build_view(pid, &public_summary, "", &[]);
            if !suppress {
                let update = self.provider_mut(pid)?.update_beliefs(&view).await;
                self.apply_belief_update(pid, &alive_ids, update)?;
            }
            for _ in 0..self.state.config.discussion_turns {
                let spoken = self.provider_mut(pid)?.speak(&view).await;
                match spoken {
                    Ok(text) => {
                        let content =
                            clip_chars(text.trim(), self.state.config.message_char_limit)
                                .to_string();
                        let message = PublicMessage {
                            round: self.state.round_idx,
                            phase: Phase::Discussion,
                            speaker_id: pid,
                            content,
                        };
                        self.state.public_transcript.push(message.clone());
                        self.emit(
                            "discussion",
                            pid as i64,
                            "public_message",
                            serde_json::to_value(&message)?,
                        )?;
                    }
                    Err(err) => {
                        warn!(player = pid, error = %err, "Speak failed; player stays silent");
                        self.emit(
                            "discussion",
                            pid as i64,
                            "public_message",
                            json!({ "error": err.to_string() }),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalizes a belief reply over the other alive players and records it.
    /// A failed reply becomes a neutral table, annotated in the log.
    fn apply_belief_update(
        &mut self,
        pid: PlayerId,
        alive_ids: &[PlayerId],
        update: Result<BeliefUpdate, ProviderError>,
    ) -> Result<()> {
        let (raw_scores, notes, error) = match update {
            Ok(update) => (update.scores, update.notes, None),
            Err(err) => {
                let neutral: BTreeMap<PlayerId, f64> = alive_ids
                    .iter()
                    .copied()
                    .filter(|&other| other != pid)
                    .map(|other| (other, 0.5))
                    .collect();
                (neutral, "fallback neutral".to_string(), Some(err.to_string()))
            }
        };
        let normalized: BTreeMap<PlayerId, f64> = alive_ids
            .iter()
            .copied()
            .filter(|&other| other != pid)
            .map(|other| (other, raw_scores.get(&other).copied().unwrap_or(0.5)))
            .collect();
        if let Some(ps) = self.state.agent_states.get_mut(&pid) {
            ps.record_suspicions(normalized);
            ps.last_rationale = Some(notes.clone());
        }
        self.emit(
            "belief_update",
            pid as i64,
            "belief_update",
            json!({ "scores": raw_scores, "notes": notes, "error": error }),
        )
    }

    /// One banish ballot per alive player, ascending. Ballots land in the
    /// vote history for the banish phase to tally.
    #[instrument(skip(self), fields(round = self.state.round_idx))]
    async fn voting(&mut self) -> Result<()> {
        let alive_ids: Vec<PlayerId> = self.state.alive.iter().copied().collect();
        let public_summary = self.state.public_summary();
        let mut votes: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();
        for pid in alive_ids.clone() {
            let view = self.build_view(pid, &public_summary, "", &[]);
            let submitted = self.provider_mut(pid)?.vote(&view).await;
            let (target, rationale, error) = self.settle_ballot(pid, submitted, &alive_ids)?;
            votes.insert(pid, target);
            self.emit(
                "voting",
                pid as i64,
                "vote",
                json!({ "target_id": target, "rationale": rationale, "error": error }),
            )?;
        }
        self.state.vote_history.push(VoteRecord {
            round: self.state.round_idx,
            votes,
        });
        Ok(())
    }

    /// Tallies the banish ballots. A tie triggers one revote restricted to
    /// the tied set; if that fails too, one uniform draw over the tied set
    /// settles it.
    #[instrument(skip(self), fields(round = self.state.round_idx))]
    async fn banish(&mut self) -> Result<()> {
        let votes = self
            .state
            .vote_history
            .last()
            .map(|record| record.votes.clone())
            .unwrap_or_default();
        let (mut eliminated, mut tie_info) =
            resolve_banish(&self.state.alive, &votes, &mut self.state.rng);
        if eliminated.is_none() && !tie_info.tied.is_empty() {
            let tied = tie_info.tied.clone();
            info!(tied = ?tied, "Banish vote tied; collecting revote");
            let alive_ids: Vec<PlayerId> = self.state.alive.iter().copied().collect();
            let public_summary = self.state.public_summary();
            let mut revote: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();
            for pid in alive_ids {
                let view = self.build_view(pid, &public_summary, "", &tied);
                let submitted = self.provider_mut(pid)?.vote(&view).await;
                let (target, rationale, error) = self.settle_ballot(pid, submitted, &tied)?;
                revote.insert(pid, target);
                self.emit(
                    "revote",
                    pid as i64,
                    "vote",
                    json!({ "target_id": target, "rationale": rationale, "error": error }),
                )?;
            }
            self.state.vote_history.push(VoteRecord {
                round: self.state.round_idx,
                votes: revote.clone(),
            });
            let (re_eliminated, re_info) = tally(&tied, &revote, &mut self.state.rng);
            eliminated = re_eliminated;
            tie_info = re_info;
            if eliminated.is_none() {
                // Draw over whatever set is still tied after the revote, so
                // the logged tied set always contains the pick.
                let pool = if tie_info.tied.is_empty() {
                    &tied
                } else {
                    &tie_info.tied
                };
                let pick = pool
                    .choose(&mut self.state.rng)
                    .copied()
                    .ok_or_else(|| anyhow!("tied set emptied during revote"))?;
                eliminated = Some(pick);
                tie_info.random = true;
            }
        }
        if let Some(pid) = eliminated {
            self.state.eliminate(pid);
            info!(player = pid, role = %self.state.role_of(pid), "Banished");
        }
        self.emit(
            "banish",
            eliminated.map(|pid| pid as i64).unwrap_or(-1),
            "banish_result",
            json!({ "eliminated": eliminated, "tie_info": tie_info }),
        )?;
        Ok(())
    }

    /// Evaluates the termination rules and records the winner when one
    /// exists.
    fn terminal_check(&mut self) -> Result<()> {
        let alive_traitors = self.state.alive_traitors();
        let winner = evaluate_winner(
            &self.state.alive,
            &alive_traitors,
            self.state.round_idx,
            self.state.config.max_rounds,
        );
        if let Some(winner) = winner {
            self.state.winner = Some(winner);
            info!(winner = %winner, round = self.state.round_idx, "Game over");
            self.emit("terminal", -1, "game_end", json!({ "winner": winner }))?;
        }
        Ok(())
    }

    /// One private message from every alive traitor. A no-op when none
    /// remain.
    #[instrument(skip(self), fields(round = self.state.round_idx))]
    async fn traitor_chat(&mut self) -> Result<()> {
        let alive_traitors: Vec<PlayerId> = self.state.alive_traitors().into_iter().collect();
        if alive_traitors.is_empty() {
            return Ok(());
        }
        let public_summary = self.state.public_summary();
        let traitor_summary = self.state.traitor_summary();
        for pid in alive_traitors {
            let view = self.build_view(pid, &public_summary, &traitor_summary, &[]);
            match self.provider_mut(pid)?.traitor_chat(&view).await {
                Ok(text) => {
                    let content = clip_chars(text.trim(), self.state.config.message_char_limit)
                        .to_string();
                    let message = PublicMessage {
                        round: self.state.round_idx,
                        phase: Phase::TraitorChat,
                        speaker_id: pid,
                        content,
                    };
                    self.state.traitor_private_transcript.push(message.clone());
                    self.emit(
                        "traitor_chat",
                        pid as i64,
                        "traitor_chat",
                        serde_json::to_value(&message)?,
                    )?;
                }
                Err(err) => {
                    warn!(player = pid, error = %err, "Traitor chat failed; player stays silent");
                    self.emit(
                        "traitor_chat",
                        pid as i64,
                        "traitor_chat",
                        json!({ "error": err.to_string() }),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// One murder ballot per alive traitor, then the tally. A no-op when no
    /// traitor remains alive.
    #[instrument(skip(self), fields(round = self.state.round_idx))]
    async fn murder(&mut self) -> Result<()> {
        let alive_traitors: Vec<PlayerId> = self.state.alive_traitors().into_iter().collect();
        if alive_traitors.is_empty() {
            return Ok(());
        }
        let eligible: Vec<PlayerId> = self
            .state
            .alive
            .difference(&self.state.traitors)
            .copied()
            .collect();
        let public_summary = self.state.public_summary();
        let traitor_summary = self.state.traitor_summary();
        let mut murder_votes: BTreeMap<PlayerId, PlayerId> = BTreeMap::new();
        for pid in alive_traitors {
            let view = self.build_view(pid, &public_summary, &traitor_summary, &[]);
            let submitted = self.provider_mut(pid)?.choose_murder(&view).await;
            let (target, rationale, error) = self.settle_ballot(pid, submitted, &eligible)?;
            murder_votes.insert(pid, target);
            self.emit(
                "murder",
                pid as i64,
                "murder",
                json!({ "target_id": target, "rationale": rationale, "error": error }),
            )?;
        }
        let (eliminated, tie_info) = resolve_murder(
            &self.state.alive,
            &self.state.traitors,
            &murder_votes,
            &mut self.state.rng,
        );
        if let Some(pid) = eliminated {
            self.state.eliminate(pid);
            info!(player = pid, "Murdered");
        }
        self.emit(
            "murder",
            eliminated.map(|pid| pid as i64).unwrap_or(-1),
            "murder_result",
            json!({ "eliminated": eliminated, "tie_info": tie_info }),
        )?;
        Ok(())
    }

    /// Folds the round's public summary into every alive player's memory and
    /// advances the round index.
    fn post_murder_update(&mut self) {
        let public_summary = self.state.public_summary();
        let suppress = self.state.config.condition.suppresses_memory();
        let alive_ids: Vec<PlayerId> = self.state.alive.iter().copied().collect();
        for pid in alive_ids {
            if let Some(ps) = self.state.agent_states.get_mut(&pid) {
                ps.compact_memory(&public_summary, suppress);
            }
        }
        self.state.round_idx += 1;
        debug!(round = self.state.round_idx, "Round advanced");
    }
}
