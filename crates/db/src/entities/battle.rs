//! Battle entity: a two-option voting contest.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Content category a battle compares.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum BattleType {
    #[sea_orm(string_value = "movie")]
    Movie,
    #[sea_orm(string_value = "book")]
    Book,
    #[sea_orm(string_value = "game")]
    Game,
    #[sea_orm(string_value = "music")]
    Music,
    #[sea_orm(string_value = "food")]
    Food,
    #[default]
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl BattleType {
    /// Lowercase name used in URLs and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Book => "book",
            Self::Game => "game",
            Self::Music => "music",
            Self::Food => "food",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for BattleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BattleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "book" => Ok(Self::Book),
            "game" => Ok(Self::Game),
            "music" => Ok(Self::Music),
            "food" => Ok(Self::Food),
            "custom" => Ok(Self::Custom),
            other => Err(format!("Unknown battle type: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "battle")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    #[sea_orm(indexed)]
    pub battle_type: BattleType,

    /// Raw payload for option A, stored verbatim
    #[sea_orm(column_type = "Json")]
    pub option_a: JsonValue,

    /// Raw payload for option B, stored verbatim
    #[sea_orm(column_type = "Json")]
    pub option_b: JsonValue,

    /// Normalized vote target of option A
    pub option_a_identifier: String,

    /// Normalized vote target of option B
    pub option_b_identifier: String,

    pub created_at: DateTimeWithTimeZone,

    /// End of the voting window (null for unbounded battles)
    #[sea_orm(nullable)]
    pub ends_at: Option<DateTimeWithTimeZone>,

    pub is_active: bool,
}

impl Model {
    /// Whether votes are accepted at `now`.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at.is_none_or(|ends_at| ends_at > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::battle_vote::Entity")]
    BattleVote,
}

impl Related<super::battle_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BattleVote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
