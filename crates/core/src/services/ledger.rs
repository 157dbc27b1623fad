//! Vote ledger.

use rtr_common::{AppError, AppResult, IdGenerator, SharedClock};
use rtr_db::{
    entities::{Choice, battle_vote},
    repositories::BattleVoteRepository,
};
use std::collections::HashMap;
use tracing::{debug, info};

use super::identity::{ACCOUNT_PREFIX, MAX_VOTER_ID_LEN};

/// Append-only record of votes, at most one per voter per battle.
#[derive(Clone)]
pub struct VoteLedger {
    vote_repo: BattleVoteRepository,
    clock: SharedClock,
    id_gen: IdGenerator,
}

fn check_voter_id(voter_id: &str) -> AppResult<&str> {
    let voter_id = voter_id.trim();
    if voter_id.is_empty() {
        return Err(AppError::Validation("Voter id must not be empty".to_string()));
    }
    if voter_id.chars().count() > ACCOUNT_PREFIX.len() + MAX_VOTER_ID_LEN {
        return Err(AppError::Validation("Voter id is too long".to_string()));
    }
    Ok(voter_id)
}

impl VoteLedger {
    /// Create a new vote ledger.
    #[must_use]
    pub const fn new(vote_repo: BattleVoteRepository, clock: SharedClock) -> Self {
        Self {
            vote_repo,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record a vote.
    ///
    /// Fails with `BattleNotFound`, `BattleClosed` or `DuplicateVote`. A
    /// second vote from the same voter is rejected, never overwritten.
    pub async fn cast_vote(
        &self,
        battle_id: &str,
        voter_id: &str,
        choice: Choice,
    ) -> AppResult<battle_vote::Model> {
        let voter_id = check_voter_id(voter_id)?;
        let now = self.clock.now();

        let vote = battle_vote::Model {
            id: self.id_gen.generate(),
            battle_id: battle_id.to_string(),
            voter_id: voter_id.to_string(),
            choice,
            cast_at: now.into(),
        };

        match self.vote_repo.insert_for_open_battle(vote, now).await {
            Ok(vote) => {
                info!(
                    battle_id = %battle_id,
                    vote_id = %vote.id,
                    choice = %choice,
                    "Vote recorded"
                );
                Ok(vote)
            }
            Err(err @ AppError::DuplicateVote { .. }) => {
                debug!(battle_id = %battle_id, voter_id = %voter_id, "Duplicate vote rejected");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// All votes cast on a battle, oldest first.
    pub async fn votes_for_battle(&self, battle_id: &str) -> AppResult<Vec<battle_vote::Model>> {
        self.vote_repo.find_by_battle(battle_id).await
    }

    /// The vote `voter_id` cast on a battle, if any.
    pub async fn find_vote(
        &self,
        battle_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<battle_vote::Model>> {
        self.vote_repo
            .find_by_battle_and_voter(battle_id, voter_id.trim())
            .await
    }

    /// Vote totals for several battles at once.
    pub async fn vote_counts(&self, battle_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        self.vote_repo.count_by_battles(battle_ids).await
    }
}
