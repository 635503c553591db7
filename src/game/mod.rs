//! Deterministic game core: roles, state, phases, tallies, termination and
//! the round machine that drives them.

mod machine;
mod phase;
mod resolution;
mod role;
mod state;
mod terminal;

pub use machine::{validate_ballot, BallotError, RoundMachine};
pub use phase::Phase;
pub use resolution::{resolve_banish, resolve_murder, tally, TieInfo};
pub use role::{assign_roles, PlayerId, Role};
pub use state::{
    clip_chars, tail_chars, AgentPrivateState, GameState, PublicMessage, VoteRecord,
};
pub use terminal::{evaluate_winner, Winner};
