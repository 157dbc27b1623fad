//! Battle vote repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Battle, BattleVote, battle, battle_vote};
use chrono::{DateTime, Utc};
use rtr_common::{AppError, AppResult};
use sea_orm::{
    ActiveEnum, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Query},
};

/// Battle vote repository for database operations.
#[derive(Clone)]
pub struct BattleVoteRepository {
    db: Arc<DatabaseConnection>,
}

/// Map an insert failure, treating a uniqueness violation as a duplicate vote.
fn insert_error(err: &DbErr, battle_id: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateVote {
            battle_id: battle_id.to_string(),
        },
        _ => AppError::StoreUnavailable(err.to_string()),
    }
}

impl BattleVoteRepository {
    /// Create a new battle vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote if its battle exists and is open at `now`.
    ///
    /// The open check is part of the insert itself (`INSERT .. SELECT .. FROM
    /// battle WHERE open`), so it runs as one atomic statement and SQLite takes
    /// its write lock before reading the battle. Uniqueness of
    /// `(battle_id, voter_id)` is left to the database index: concurrent
    /// submissions from one voter store exactly one row and the rest fail with
    /// [`AppError::DuplicateVote`].
    pub async fn insert_for_open_battle(
        &self,
        vote: battle_vote::Model,
        now: DateTime<Utc>,
    ) -> AppResult<battle_vote::Model> {
        let now: DateTimeWithTimeZone = now.into();

        let mut open_battle = Query::select();
        open_battle
            .exprs([
                Expr::val(vote.id.clone()),
                Expr::val(vote.battle_id.clone()),
                Expr::val(vote.voter_id.clone()),
                Expr::val(vote.choice.to_value()),
                Expr::val(vote.cast_at),
            ])
            .from(Battle)
            .cond_where(
                Condition::all()
                    .add(battle::Column::Id.eq(vote.battle_id.as_str()))
                    .add(battle::Column::IsActive.eq(true))
                    .add(
                        Condition::any()
                            .add(battle::Column::EndsAt.is_null())
                            .add(battle::Column::EndsAt.gt(now)),
                    ),
            );

        let mut insert = Query::insert();
        insert
            .into_table(BattleVote)
            .columns([
                battle_vote::Column::Id,
                battle_vote::Column::BattleId,
                battle_vote::Column::VoterId,
                battle_vote::Column::Choice,
                battle_vote::Column::CastAt,
            ])
            .select_from(open_battle)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let backend = self.db.get_database_backend();
        let result = self
            .db
            .execute(backend.build(&insert))
            .await
            .map_err(|e| insert_error(&e, &vote.battle_id))?;

        if result.rows_affected() == 1 {
            return Ok(vote);
        }

        // Nothing inserted: the battle is either missing or closed.
        let exists = Battle::find_by_id(vote.battle_id.as_str())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?
            .is_some();

        if exists {
            Err(AppError::BattleClosed(vote.battle_id))
        } else {
            Err(AppError::BattleNotFound(vote.battle_id))
        }
    }

    /// Get all votes for a battle, oldest first.
    pub async fn find_by_battle(&self, battle_id: &str) -> AppResult<Vec<battle_vote::Model>> {
        BattleVote::find()
            .filter(battle_vote::Column::BattleId.eq(battle_id))
            .order_by_asc(battle_vote::Column::CastAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Find the vote a voter cast on a battle, if any.
    pub async fn find_by_battle_and_voter(
        &self,
        battle_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<battle_vote::Model>> {
        BattleVote::find()
            .filter(battle_vote::Column::BattleId.eq(battle_id))
            .filter(battle_vote::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Count votes per battle for the given battle ids.
    ///
    /// Battles without votes are absent from the map.
    pub async fn count_by_battles(&self, battle_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if battle_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = BattleVote::find()
            .select_only()
            .column(battle_vote::Column::BattleId)
            .column_as(Expr::col(battle_vote::Column::Id).count(), "vote_count")
            .filter(battle_vote::Column::BattleId.is_in(battle_ids.iter().cloned()))
            .group_by(battle_vote::Column::BattleId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(battle_id, count)| (battle_id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}
