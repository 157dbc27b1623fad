//! Battle repository.

use std::sync::Arc;

use crate::entities::{Battle, BattleType, battle};
use chrono::{DateTime, FixedOffset, Utc};
use rtr_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Listing criteria for battles.
#[derive(Debug, Clone, Default)]
pub struct BattleQuery {
    /// Restrict to one content category.
    pub battle_type: Option<BattleType>,
    /// Only battles that accept votes right now.
    pub active_only: bool,
    /// Maximum number of rows.
    pub limit: Option<u64>,
}

/// Battle repository for database operations.
#[derive(Clone)]
pub struct BattleRepository {
    db: Arc<DatabaseConnection>,
}

impl BattleRepository {
    /// Create a new battle repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a battle by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<battle::Model>> {
        Battle::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Get a battle by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<battle::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::BattleNotFound(id.to_string()))
    }

    /// Create a new battle.
    pub async fn create(&self, model: battle::ActiveModel) -> AppResult<battle::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Mark a battle inactive. Calling it on an inactive battle changes nothing.
    pub async fn deactivate(&self, id: &str) -> AppResult<battle::Model> {
        Battle::update_many()
            .col_expr(battle::Column::IsActive, Expr::value(false))
            .filter(battle::Column::Id.eq(id))
            .filter(battle::Column::IsActive.eq(true))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        self.get_by_id(id).await
    }

    /// List battles newest first.
    ///
    /// With `active_only`, a battle qualifies when it is flagged active and
    /// its window is unbounded or ends after `now`.
    pub async fn list(
        &self,
        query: &BattleQuery,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<battle::Model>> {
        let mut select = Battle::find();

        if let Some(battle_type) = query.battle_type {
            select = select.filter(battle::Column::BattleType.eq(battle_type));
        }

        if query.active_only {
            let now: DateTime<FixedOffset> = now.into();
            select = select.filter(battle::Column::IsActive.eq(true)).filter(
                Condition::any()
                    .add(battle::Column::EndsAt.is_null())
                    .add(battle::Column::EndsAt.gt(now)),
            );
        }

        select = select
            .order_by_desc(battle::Column::CreatedAt)
            .order_by_desc(battle::Column::Id);

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        select
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }
}
