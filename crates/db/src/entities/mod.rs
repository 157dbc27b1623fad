//! Database entities.

#![allow(missing_docs)]

pub mod battle;
pub mod battle_vote;

pub use battle::{BattleType, Entity as Battle};
pub use battle_vote::{Choice, Entity as BattleVote};
