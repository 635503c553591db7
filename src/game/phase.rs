//! Round phases and the pure transition function.

use serde::{Deserialize, Serialize};

use super::terminal::Winner;

/// Phase tag for the round state machine.
///
/// The two terminal checks carry their own tags so that [`Phase::next`] stays
/// a pure function of the tag and the recorded winner, with no memory of how
/// the machine arrived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Belief updates and public messages from every alive player.
    Discussion,
    /// One banish ballot from every alive player.
    Voting,
    /// Banish tally, revote protocol on a tie, elimination.
    Banish,
    /// Terminal check after the banish result.
    BanishCheck,
    /// One private message from every alive traitor.
    TraitorChat,
    /// Murder ballots from the alive traitors, tally, elimination.
    Murder,
    /// Terminal check after the murder result.
    MurderCheck,
    /// Memory compaction for alive players; the round index advances.
    PostMurderUpdate,
    /// Terminal state. The machine never leaves it.
    End,
}

impl Phase {
    /// The single transition function of the machine.
    ///
    /// Only the two check phases may route to [`Phase::End`], and only when a
    /// winner has been recorded. Every other phase has exactly one successor.
    pub fn next(self, winner: Option<Winner>) -> Phase {
        match self {
            Phase::Discussion => Phase::Voting,
            Phase::Voting => Phase::Banish,
            Phase::Banish => Phase::BanishCheck,
            Phase::BanishCheck if winner.is_some() => Phase::End,
            Phase::BanishCheck => Phase::TraitorChat,
            Phase::TraitorChat => Phase::Murder,
            Phase::Murder => Phase::MurderCheck,
            Phase::MurderCheck if winner.is_some() => Phase::End,
            Phase::MurderCheck => Phase::PostMurderUpdate,
            Phase::PostMurderUpdate => Phase::Discussion,
            Phase::End => Phase::End,
        }
    }

    /// True once the machine has reached its terminal state.
    pub fn is_end(self) -> bool {
        matches!(self, Phase::End)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_cycle_without_winner() {
        let order = [
            Phase::Discussion,
            Phase::Voting,
            Phase::Banish,
            Phase::BanishCheck,
            Phase::TraitorChat,
            Phase::Murder,
            Phase::MurderCheck,
            Phase::PostMurderUpdate,
            Phase::Discussion,
        ];
        for pair in order.windows(2) {
            assert_eq!(pair[0].next(None), pair[1]);
        }
    }

    #[test]
    fn checks_route_to_end_once_winner_is_set() {
        assert_eq!(Phase::BanishCheck.next(Some(Winner::Faithful)), Phase::End);
        assert_eq!(Phase::MurderCheck.next(Some(Winner::Traitors)), Phase::End);
        assert_eq!(Phase::MurderCheck.next(Some(Winner::Draw)), Phase::End);
    }

    #[test]
    fn winner_does_not_short_circuit_other_phases() {
        assert_eq!(Phase::Voting.next(Some(Winner::Draw)), Phase::Banish);
        assert_eq!(Phase::Discussion.next(Some(Winner::Draw)), Phase::Voting);
    }

    #[test]
    fn end_is_absorbing() {
        assert_eq!(Phase::End.next(None), Phase::End);
        assert_eq!(Phase::End.next(Some(Winner::Faithful)), Phase::End);
    }

    #[test]
    fn log_names_are_snake_case() {
        assert_eq!(Phase::TraitorChat.to_string(), "traitor_chat");
        assert_eq!(Phase::PostMurderUpdate.to_string(), "post_murder_update");
    }
}
