//! Battle store.

use chrono::Duration;
use rtr_common::{AppError, AppResult, IdGenerator, SharedClock};
use rtr_db::{
    entities::{BattleType, battle},
    repositories::{BattleQuery, BattleRepository},
};
use sea_orm::Set;
use serde_json::Value as JsonValue;
use tracing::info;

use super::option::ContentOption;

/// Longest battle title.
pub const MAX_TITLE_LEN: usize = 200;
/// Longest battle description.
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Upper bound on listing and trending page sizes.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Input for creating a battle.
#[derive(Debug, Clone)]
pub struct CreateBattleInput {
    pub title: String,
    pub description: Option<String>,
    pub battle_type: BattleType,
    pub option_a: JsonValue,
    pub option_b: JsonValue,
    /// Length of the voting window; `None` keeps the battle open until deactivated.
    pub duration_hours: Option<i64>,
}

/// Which battles to list.
#[derive(Debug, Clone)]
pub struct BattleFilter {
    pub battle_type: Option<BattleType>,
    /// When false, closed and deactivated battles are listed too.
    pub active_only: bool,
    pub limit: Option<u64>,
}

impl Default for BattleFilter {
    fn default() -> Self {
        Self {
            battle_type: None,
            active_only: true,
            limit: None,
        }
    }
}

impl BattleFilter {
    fn to_query(&self) -> BattleQuery {
        BattleQuery {
            battle_type: self.battle_type,
            active_only: self.active_only,
            limit: self.limit.map(|l| l.clamp(1, MAX_PAGE_SIZE)),
        }
    }
}

/// Durable battles: creation with validation, lookup, listing, deactivation.
#[derive(Clone)]
pub struct BattleStore {
    battle_repo: BattleRepository,
    clock: SharedClock,
    id_gen: IdGenerator,
    max_duration_hours: i64,
}

impl BattleStore {
    /// Create a new battle store.
    #[must_use]
    pub const fn new(
        battle_repo: BattleRepository,
        clock: SharedClock,
        max_duration_hours: i64,
    ) -> Self {
        Self {
            battle_repo,
            clock,
            id_gen: IdGenerator::new(),
            max_duration_hours,
        }
    }

    /// Validate and persist a new battle.
    ///
    /// Nothing is written when validation fails.
    pub async fn create_battle(&self, input: CreateBattleInput) -> AppResult<battle::Model> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "Title is too long (max {MAX_TITLE_LEN} chars)"
            )));
        }

        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(AppError::Validation(format!(
                "Description is too long (max {MAX_DESCRIPTION_LEN} chars)"
            )));
        }

        let option_a = ContentOption::parse(input.battle_type, 'A', &input.option_a)?;
        let option_b = ContentOption::parse(input.battle_type, 'B', &input.option_b)?;
        if option_a.identifier() == option_b.identifier() {
            return Err(AppError::Validation(
                "A battle needs two different options".to_string(),
            ));
        }

        if input
            .duration_hours
            .is_some_and(|hours| !(1..=self.max_duration_hours).contains(&hours))
        {
            return Err(AppError::Validation(format!(
                "Duration must be between 1 and {} hours",
                self.max_duration_hours
            )));
        }

        let now = self.clock.now();
        let ends_at = input.duration_hours.map(|h| (now + Duration::hours(h)).into());

        let model = battle::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title.to_string()),
            description: Set(description),
            battle_type: Set(input.battle_type),
            option_a: Set(input.option_a),
            option_b: Set(input.option_b),
            option_a_identifier: Set(option_a.identifier().to_string()),
            option_b_identifier: Set(option_b.identifier().to_string()),
            created_at: Set(now.into()),
            ends_at: Set(ends_at),
            is_active: Set(true),
        };

        let battle = self.battle_repo.create(model).await?;
        info!(battle_id = %battle.id, battle_type = %battle.battle_type, "Battle created");
        Ok(battle)
    }

    /// Get a battle by id.
    pub async fn get_battle(&self, id: &str) -> AppResult<battle::Model> {
        self.battle_repo.get_by_id(id).await
    }

    /// List battles newest first.
    pub async fn list_battles(&self, filter: &BattleFilter) -> AppResult<Vec<battle::Model>> {
        self.battle_repo
            .list(&filter.to_query(), self.clock.now())
            .await
    }

    /// Stop a battle from accepting votes. Deactivating twice is harmless.
    pub async fn deactivate(&self, id: &str) -> AppResult<battle::Model> {
        let battle = self.battle_repo.deactivate(id).await?;
        info!(battle_id = %battle.id, "Battle deactivated");
        Ok(battle)
    }

    /// Current time according to the store's clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
