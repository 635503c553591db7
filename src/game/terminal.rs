//! Termination rules and the session outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::role::PlayerId;

/// Final outcome of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Winner {
    /// Every traitor has been eliminated.
    Faithful,
    /// Alive traitors reached parity with the alive faithful.
    Traitors,
    /// The round cap ran out before either side won.
    Draw,
}

/// Evaluates the termination rules in their fixed order:
/// no alive traitors means the faithful win; alive traitors at parity with
/// or outnumbering the alive faithful means the traitors win; a round index
/// at or past the cap means a draw; otherwise the game continues.
///
/// `alive_traitors` must be a subset of `alive`.
pub fn evaluate_winner(
    alive: &BTreeSet<PlayerId>,
    alive_traitors: &BTreeSet<PlayerId>,
    round_idx: u32,
    max_rounds: u32,
) -> Option<Winner> {
    if alive_traitors.is_empty() {
        return Some(Winner::Faithful);
    }
    let alive_faithful = alive.len() - alive_traitors.len();
    if alive_traitors.len() >= alive_faithful {
        return Some(Winner::Traitors);
    }
    if round_idx >= max_rounds {
        return Some(Winner::Draw);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[PlayerId]) -> BTreeSet<PlayerId> {
        list.iter().copied().collect()
    }

    #[test]
    fn faithful_win_when_no_traitor_alive() {
        let alive = ids(&[1, 2, 3]);
        let traitors = ids(&[]);
        assert_eq!(
            evaluate_winner(&alive, &traitors, 1, 30),
            Some(Winner::Faithful)
        );
    }

    #[test]
    fn traitors_win_at_parity() {
        let alive = ids(&[1, 2, 3, 4]);
        let traitors = ids(&[1, 2]);
        assert_eq!(
            evaluate_winner(&alive, &traitors, 1, 30),
            Some(Winner::Traitors)
        );
    }

    #[test]
    fn traitors_win_when_outnumbering() {
        let alive = ids(&[1, 2, 3]);
        let traitors = ids(&[1, 2]);
        assert_eq!(
            evaluate_winner(&alive, &traitors, 1, 30),
            Some(Winner::Traitors)
        );
    }

    #[test]
    fn game_continues_below_parity() {
        let alive = ids(&[1, 2, 3, 4, 5]);
        let traitors = ids(&[1]);
        assert_eq!(evaluate_winner(&alive, &traitors, 1, 30), None);
    }

    #[test]
    fn round_cap_forces_draw() {
        let alive = ids(&[1, 2, 3, 4, 5]);
        let traitors = ids(&[1]);
        assert_eq!(evaluate_winner(&alive, &traitors, 30, 30), Some(Winner::Draw));
        assert_eq!(evaluate_winner(&alive, &traitors, 31, 30), Some(Winner::Draw));
    }

    #[test]
    fn faithful_rule_outranks_round_cap() {
        let alive = ids(&[1, 2]);
        let traitors = ids(&[]);
        assert_eq!(
            evaluate_winner(&alive, &traitors, 99, 30),
            Some(Winner::Faithful)
        );
    }

    #[test]
    fn parity_rule_outranks_round_cap() {
        let alive = ids(&[1, 2]);
        let traitors = ids(&[1]);
        assert_eq!(
            evaluate_winner(&alive, &traitors, 99, 30),
            Some(Winner::Traitors)
        );
    }
}
