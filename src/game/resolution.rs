//! Vote tallying and the deterministic elimination rules.
//!
//! Banish and murder share one tally pass over an eligible candidate set.
//! Candidates are always walked in ascending id order, so any random draw in
//! here is a pure function of the session source's state.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::role::PlayerId;

/// How a tally pass settled. Carried into the event log so analysis can tell
/// a genuine majority from a randomized resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TieInfo {
    /// Ids that shared the top count, empty when a single leader emerged.
    pub tied: Vec<PlayerId>,
    /// Ballot counts per eligible candidate, zeros included.
    pub counts: BTreeMap<PlayerId, u32>,
    /// True when the outcome came from a uniform random draw.
    pub random: bool,
}

/// Counts ballots over `eligible` and settles the pass.
///
/// Ballots for targets outside `eligible` are dropped. A unique positive
/// maximum eliminates its holder. A shared maximum reports the tied set and
/// eliminates nobody. No positive count at all falls back to one uniform
/// draw over `eligible`, flagged as random. An empty `eligible` set resolves
/// to nobody without touching `rng`.
pub fn tally(
    eligible: &[PlayerId],
    votes: &BTreeMap<PlayerId, PlayerId>,
    rng: &mut impl Rng,
) -> (Option<PlayerId>, TieInfo) {
    let mut counts: BTreeMap<PlayerId, u32> = eligible.iter().map(|&pid| (pid, 0)).collect();
    for target in votes.values() {
        if let Some(count) = counts.get_mut(target) {
            *count += 1;
        }
    }
    let top_count = counts.values().copied().max().unwrap_or(0);
    if top_count == 0 {
        if eligible.is_empty() {
            return (None, TieInfo::default());
        }
        let pick = *eligible
            .choose(rng)
            .unwrap_or(&eligible[0]);
        let info = TieInfo {
            tied: eligible.to_vec(),
            counts,
            random: true,
        };
        return (Some(pick), info);
    }
    let leaders: Vec<PlayerId> = counts
        .iter()
        .filter(|&(_, &count)| count == top_count)
        .map(|(&pid, _)| pid)
        .collect();
    if leaders.len() == 1 {
        let info = TieInfo {
            tied: Vec::new(),
            counts,
            random: false,
        };
        (Some(leaders[0]), info)
    } else {
        let info = TieInfo {
            tied: leaders,
            counts,
            random: false,
        };
        (None, info)
    }
}

/// Tallies a banish pass over the full alive roster.
///
/// A tie is reported, not resolved. The round machine owns the revote
/// protocol and the final draw over the tied set.
pub fn resolve_banish(
    alive: &BTreeSet<PlayerId>,
    votes: &BTreeMap<PlayerId, PlayerId>,
    rng: &mut impl Rng,
) -> (Option<PlayerId>, TieInfo) {
    let eligible: Vec<PlayerId> = alive.iter().copied().collect();
    tally(&eligible, votes, rng)
}

/// Tallies a murder pass over the alive non-traitors.
///
/// Unlike banish there is no revote: a tie is settled right here by one
/// uniform draw over the tied set, flagged as random.
pub fn resolve_murder(
    alive: &BTreeSet<PlayerId>,
    traitors: &BTreeSet<PlayerId>,
    votes: &BTreeMap<PlayerId, PlayerId>,
    rng: &mut impl Rng,
) -> (Option<PlayerId>, TieInfo) {
    let eligible: Vec<PlayerId> = alive.difference(traitors).copied().collect();
    let (eliminated, mut info) = tally(&eligible, votes, rng);
    if eliminated.is_none() && !info.tied.is_empty() {
        let pick = *info.tied.choose(rng).unwrap_or(&info.tied[0]);
        info.random = true;
        return (Some(pick), info);
    }
    (eliminated, info)
}
