//! Player identity and seeded role assignment.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifier for a player within one session, always in `1..=n_players`.
pub type PlayerId = u32;

/// Hidden role held by a player for the whole session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Ordinary player, eliminated only by banish vote or murder.
    Faithful,
    /// Member of the hidden faction with the private channel and the murder ballot.
    Traitor,
}

impl Role {
    /// True for the traitor faction.
    pub fn is_traitor(self) -> bool {
        matches!(self, Role::Traitor)
    }
}

/// Assigns roles to players `1..=n_players`, drawing exactly `n_traitors`
/// distinct ids uniformly without replacement from `rng`.
///
/// The outcome depends only on the draw sequence of `rng`, so two identically
/// seeded sources produce identical assignments. Callers must have validated
/// `0 < n_traitors < n_players` beforehand.
pub fn assign_roles(
    n_players: u32,
    n_traitors: u32,
    rng: &mut impl Rng,
) -> (BTreeMap<PlayerId, Role>, BTreeSet<PlayerId>) {
    let traitors: BTreeSet<PlayerId> = index::sample(rng, n_players as usize, n_traitors as usize)
        .into_iter()
        .map(|i| i as PlayerId + 1)
        .collect();
    let roles = (1..=n_players)
        .map(|pid| {
            let role = if traitors.contains(&pid) {
                Role::Traitor
            } else {
                Role::Faithful
            };
            (pid, role)
        })
        .collect();
    (roles, traitors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn assigns_exact_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (roles, traitors) = assign_roles(9, 2, &mut rng);
        assert_eq!(roles.len(), 9);
        assert_eq!(traitors.len(), 2);
        let n_traitors = roles.values().filter(|r| r.is_traitor()).count();
        assert_eq!(n_traitors, 2);
        assert!(traitors.iter().all(|pid| (1..=9).contains(pid)));
    }

    #[test]
    fn identical_seeds_agree() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(assign_roles(9, 2, &mut a), assign_roles(9, 2, &mut b));
    }

    #[test]
    fn different_seeds_eventually_differ() {
        let picks: BTreeSet<BTreeSet<PlayerId>> = (0u64..16)
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                assign_roles(9, 2, &mut rng).1
            })
            .collect();
        assert!(picks.len() > 1);
    }

    #[test]
    fn roles_match_traitor_set() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (roles, traitors) = assign_roles(6, 1, &mut rng);
        for (pid, role) in &roles {
            assert_eq!(role.is_traitor(), traitors.contains(pid));
        }
    }
}
