//! Battle service.
//!
//! Orchestrates the store, the ledger and the tally engine, and reports
//! activity to the analytics sink.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rtr_common::{AppError, AppResult, SharedClock, config::BattleConfig};
use rtr_db::{
    entities::{Choice, battle, battle_vote},
    repositories::{BattleRepository, BattleVoteRepository},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use super::analytics::{self, AnalyticsEvent, AnalyticsSinkService};
use super::identity::VoterIdentity;
use super::ledger::VoteLedger;
use super::store::{BattleFilter, BattleStore, CreateBattleInput, MAX_PAGE_SIZE};
use super::tally::{Tally, TallyMode, compute_tally};

/// Argument threads are not tracked, so they add nothing to the activity score.
const ARGUMENT_COUNT: u64 = 0;

/// Whether a battle accepts votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BattleStatus {
    Open,
    Closed,
}

/// A battle together with its live results.
#[derive(Debug, Clone)]
pub struct BattleView {
    pub battle: battle::Model,
    pub tally: Tally,
    pub status: BattleStatus,
    /// Seconds left to vote; `None` for battles without a deadline.
    pub remaining_seconds: Option<i64>,
    /// The viewer's own vote, when the viewer identified itself and has voted.
    pub my_vote: Option<battle_vote::Model>,
}

/// One entry of the trending ranking.
#[derive(Debug, Clone)]
pub struct TrendingBattle {
    pub battle: battle::Model,
    pub total_votes: u64,
    pub activity_score: u64,
}

/// How far back a battle counts as recent for trending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingWindow {
    /// Battles created within this many hours.
    Hours(i64),
    /// Every battle counts as recent.
    All,
}

impl TrendingWindow {
    /// Whether a battle created at `created_at` falls inside the window.
    #[must_use]
    pub fn contains(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Hours(hours) => Duration::try_hours(hours)
                .and_then(|window| now.checked_sub_signed(window))
                .is_none_or(|start| created_at >= start),
        }
    }
}

impl Default for TrendingWindow {
    fn default() -> Self {
        Self::Hours(24)
    }
}

impl FromStr for TrendingWindow {
    type Err = AppError;

    /// Accepts `all`, `<n>h` and `<n>d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "all" {
            return Ok(Self::All);
        }

        let invalid = || {
            AppError::Validation(format!(
                "Invalid trending window '{s}', expected all, <n>h or <n>d"
            ))
        };
        let (amount, per_unit) = if let Some(n) = s.strip_suffix('h') {
            (n, 1)
        } else if let Some(n) = s.strip_suffix('d') {
            (n, 24)
        } else {
            return Err(invalid());
        };

        let amount: i64 = amount.parse().map_err(|_| invalid())?;
        if amount < 1 {
            return Err(invalid());
        }
        amount
            .checked_mul(per_unit)
            .filter(|hours| Duration::try_hours(*hours).is_some())
            .map(Self::Hours)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for TrendingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Hours(h) if h % 24 == 0 => write!(f, "{}d", h / 24),
            Self::Hours(h) => write!(f, "{h}h"),
        }
    }
}

/// Trending defaults taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrendingSettings {
    pub recency_bonus: u64,
    pub default_window: TrendingWindow,
    pub default_limit: u64,
}

impl Default for TrendingSettings {
    fn default() -> Self {
        Self {
            recency_bonus: 10,
            default_window: TrendingWindow::default(),
            default_limit: 12,
        }
    }
}

impl TryFrom<&BattleConfig> for TrendingSettings {
    type Error = AppError;

    fn try_from(config: &BattleConfig) -> Result<Self, Self::Error> {
        let default_window = config
            .default_trending_window
            .parse()
            .map_err(|e: AppError| AppError::Config(e.to_string()))?;

        Ok(Self {
            recency_bonus: u64::try_from(config.trending_recency_bonus).map_err(|_| {
                AppError::Config("battles.trending_recency_bonus must not be negative".to_string())
            })?,
            default_window,
            default_limit: config.default_trending_limit.clamp(1, MAX_PAGE_SIZE),
        })
    }
}

/// Battle service for business logic.
#[derive(Clone)]
pub struct BattleService {
    store: BattleStore,
    ledger: VoteLedger,
    analytics: AnalyticsSinkService,
    trending: TrendingSettings,
}

impl BattleService {
    /// Create a new battle service.
    #[must_use]
    pub const fn new(
        store: BattleStore,
        ledger: VoteLedger,
        analytics: AnalyticsSinkService,
        trending: TrendingSettings,
    ) -> Self {
        Self {
            store,
            ledger,
            analytics,
            trending,
        }
    }

    /// Wire the service over a database connection.
    pub fn from_config(
        db: Arc<DatabaseConnection>,
        clock: SharedClock,
        config: &BattleConfig,
        analytics: AnalyticsSinkService,
    ) -> AppResult<Self> {
        let store = BattleStore::new(
            BattleRepository::new(Arc::clone(&db)),
            Arc::clone(&clock),
            config.max_duration_hours,
        );
        let ledger = VoteLedger::new(BattleVoteRepository::new(db), clock);
        Ok(Self::new(
            store,
            ledger,
            analytics,
            TrendingSettings::try_from(config)?,
        ))
    }

    /// Create a battle.
    pub async fn create(&self, input: CreateBattleInput) -> AppResult<battle::Model> {
        let battle = self.store.create_battle(input).await?;

        analytics::emit(
            &self.analytics,
            AnalyticsEvent::BattleCreated {
                battle_id: battle.id.clone(),
                battle_type: battle.battle_type,
                has_deadline: battle.ends_at.is_some(),
            },
        );

        Ok(battle)
    }

    /// Cast `voter`'s vote on a battle.
    pub async fn vote(
        &self,
        battle_id: &str,
        voter: &VoterIdentity,
        choice: Choice,
    ) -> AppResult<battle_vote::Model> {
        let vote = self
            .ledger
            .cast_vote(battle_id, &voter.voter_id(), choice)
            .await?;

        analytics::emit(
            &self.analytics,
            AnalyticsEvent::VoteCast {
                battle_id: vote.battle_id.clone(),
                choice: vote.choice,
                authenticated: voter.is_authenticated(),
            },
        );

        Ok(vote)
    }

    /// A battle with its live tally and, for an identified viewer, their vote.
    pub async fn view(
        &self,
        battle_id: &str,
        viewer: Option<&VoterIdentity>,
    ) -> AppResult<BattleView> {
        let battle = self.store.get_battle(battle_id).await?;
        let votes = self.ledger.votes_for_battle(battle_id).await?;
        let now = self.store.now();

        let my_vote = match viewer {
            Some(viewer) => self.ledger.find_vote(battle_id, &viewer.voter_id()).await?,
            None => None,
        };

        let tally = compute_tally(&battle, &votes, now, TallyMode::Live);
        let status = if battle.is_open_at(now) {
            BattleStatus::Open
        } else {
            BattleStatus::Closed
        };
        let remaining_seconds = remaining_seconds(&battle, now);

        Ok(BattleView {
            battle,
            tally,
            status,
            remaining_seconds,
            my_vote,
        })
    }

    /// List battles newest first.
    pub async fn list(&self, filter: &BattleFilter) -> AppResult<Vec<battle::Model>> {
        self.store.list_battles(filter).await
    }

    /// Rank active battles by recent activity.
    pub async fn trending(
        &self,
        limit: Option<u64>,
        window: Option<TrendingWindow>,
    ) -> AppResult<Vec<TrendingBattle>> {
        let limit = limit
            .unwrap_or(self.trending.default_limit)
            .clamp(1, MAX_PAGE_SIZE);
        let window = window.unwrap_or(self.trending.default_window);
        let now = self.store.now();

        let battles = self.store.list_battles(&BattleFilter::default()).await?;
        let ids: Vec<String> = battles.iter().map(|b| b.id.clone()).collect();
        let counts = self.ledger.vote_counts(&ids).await?;

        let mut ranked: Vec<TrendingBattle> = battles
            .into_iter()
            .map(|battle| {
                let total_votes = counts.get(&battle.id).copied().unwrap_or(0);
                let bonus = if window.contains(battle.created_at.to_utc(), now) {
                    self.trending.recency_bonus
                } else {
                    0
                };
                TrendingBattle {
                    activity_score: total_votes + ARGUMENT_COUNT + bonus,
                    total_votes,
                    battle,
                }
            })
            .collect();

        ranked.sort_by_key(|t| (Reverse(t.activity_score), Reverse(t.battle.created_at)));
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(ranked)
    }

    /// Stop a battle from accepting votes.
    pub async fn deactivate(&self, battle_id: &str) -> AppResult<battle::Model> {
        self.store.deactivate(battle_id).await
    }
}

/// Seconds until the deadline, zero once closed, `None` without a deadline.
fn remaining_seconds(battle: &battle::Model, now: DateTime<Utc>) -> Option<i64> {
    let ends_at = battle.ends_at?;
    if !battle.is_open_at(now) {
        return Some(0);
    }
    Some((ends_at.to_utc() - now).num_seconds().max(0))
}
