//! Database repositories.

pub mod battle;
pub mod battle_vote;

pub use battle::{BattleQuery, BattleRepository};
pub use battle_vote::BattleVoteRepository;
