//! Battle endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use rtr_common::{AppError, AppResult};
use rtr_core::{
    BattleFilter, BattleStatus, BattleView, ContentOption, CreateBattleInput, NormalizedOption,
    Tally, TrendingBattle, TrendingWindow, VoterIdentity,
};
use rtr_db::entities::{BattleType, Choice, battle, battle_vote};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::{
    extractors::{ApiQuery, MaybeVoter, ValidatedJson},
    middleware::AppState,
    response::ApiResponse,
};

/// Normalized view of both options.
#[derive(Debug, Serialize)]
pub struct BattleOptionsResponse {
    pub a: NormalizedOption,
    pub b: NormalizedOption,
}

/// Battle response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub battle_type: BattleType,
    pub option_a: JsonValue,
    pub option_b: JsonValue,
    pub options: BattleOptionsResponse,
    pub created_at: String,
    pub ends_at: Option<String>,
    pub is_active: bool,
}

/// Project a stored payload, falling back to its identifier if it no longer parses.
fn normalize(
    battle_type: BattleType,
    slot: char,
    payload: &JsonValue,
    identifier: &str,
) -> NormalizedOption {
    ContentOption::parse(battle_type, slot, payload).map_or_else(
        |_| NormalizedOption {
            identifier: identifier.to_string(),
            display_name: identifier.to_string(),
            image_url: None,
        },
        |option| option.normalized().clone(),
    )
}

impl From<battle::Model> for BattleResponse {
    fn from(b: battle::Model) -> Self {
        let options = BattleOptionsResponse {
            a: normalize(b.battle_type, 'A', &b.option_a, &b.option_a_identifier),
            b: normalize(b.battle_type, 'B', &b.option_b, &b.option_b_identifier),
        };

        Self {
            id: b.id,
            title: b.title,
            description: b.description,
            battle_type: b.battle_type,
            option_a: b.option_a,
            option_b: b.option_b,
            options,
            created_at: b.created_at.to_rfc3339(),
            ends_at: b.ends_at.map(|e| e.to_rfc3339()),
            is_active: b.is_active,
        }
    }
}

/// Vote response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub battle_id: String,
    pub voter_id: String,
    pub choice: Choice,
    pub cast_at: String,
}

impl From<battle_vote::Model> for VoteResponse {
    fn from(v: battle_vote::Model) -> Self {
        Self {
            id: v.id,
            battle_id: v.battle_id,
            voter_id: v.voter_id,
            choice: v.choice,
            cast_at: v.cast_at.to_rfc3339(),
        }
    }
}

/// Battle with live results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleViewResponse {
    pub battle: BattleResponse,
    pub tally: Tally,
    pub status: BattleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<VoteResponse>,
}

impl From<BattleView> for BattleViewResponse {
    fn from(view: BattleView) -> Self {
        Self {
            battle: view.battle.into(),
            tally: view.tally,
            status: view.status,
            remaining_seconds: view.remaining_seconds,
            my_vote: view.my_vote.map(Into::into),
        }
    }
}

/// Trending entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingBattleResponse {
    pub battle: BattleResponse,
    pub total_votes: u64,
    pub activity_score: u64,
}

impl From<TrendingBattle> for TrendingBattleResponse {
    fn from(t: TrendingBattle) -> Self {
        Self {
            battle: t.battle.into(),
            total_votes: t.total_votes,
            activity_score: t.activity_score,
        }
    }
}

/// Create battle request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBattleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub battle_type: Option<String>,
    pub option_a: JsonValue,
    pub option_b: JsonValue,
    pub duration_hours: Option<i64>,
}

fn parse_battle_type(raw: Option<&str>) -> AppResult<Option<BattleType>> {
    raw.filter(|t| !t.trim().is_empty())
        .map(|t| t.parse::<BattleType>().map_err(AppError::Validation))
        .transpose()
}

/// Create a battle.
async fn create_battle(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateBattleRequest>,
) -> AppResult<ApiResponse<BattleResponse>> {
    let battle_type = parse_battle_type(req.battle_type.as_deref())?.unwrap_or_default();

    let battle = state
        .battle_service
        .create(CreateBattleInput {
            title: req.title,
            description: req.description,
            battle_type,
            option_a: req.option_a,
            option_b: req.option_b,
            duration_hours: req.duration_hours,
        })
        .await?;

    Ok(ApiResponse::created(battle.into()))
}

/// Vote request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[validate(length(min = 1, max = 128))]
    pub voter_id: Option<String>,
    pub choice: String,
}

/// Pick the voter: a verified account, else the body token, else the session header.
fn select_voter(
    state: &AppState,
    from_headers: Option<VoterIdentity>,
    token: Option<&str>,
) -> AppResult<Option<VoterIdentity>> {
    match (from_headers, token) {
        (Some(account @ VoterIdentity::Account(_)), _) => Ok(Some(account)),
        (_, Some(token)) => state.resolver.anonymous(token).map(Some),
        (from_headers, None) => Ok(from_headers),
    }
}

/// Cast a vote.
async fn cast_vote(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    MaybeVoter(from_headers): MaybeVoter,
    ValidatedJson(req): ValidatedJson<VoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let choice: Choice = req.choice.parse().map_err(AppError::Validation)?;
    let voter = select_voter(&state, from_headers, req.voter_id.as_deref())?.ok_or_else(|| {
        AppError::Validation("A voter id or signed-in account is required".to_string())
    })?;

    let vote = state
        .battle_service
        .vote(&battle_id, &voter, choice)
        .await?;

    Ok(ApiResponse::created(vote.into()))
}

/// Show battle query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowBattleQuery {
    pub voter_id: Option<String>,
}

/// Get a battle with its tally.
async fn show_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    MaybeVoter(from_headers): MaybeVoter,
    ApiQuery(query): ApiQuery<ShowBattleQuery>,
) -> AppResult<ApiResponse<BattleViewResponse>> {
    let viewer = select_voter(&state, from_headers, query.voter_id.as_deref())?;
    let view = state
        .battle_service
        .view(&battle_id, viewer.as_ref())
        .await?;

    Ok(ApiResponse::ok(view.into()))
}

/// List battles query.
#[derive(Debug, Default, Deserialize)]
pub struct ListBattlesQuery {
    #[serde(rename = "type")]
    pub battle_type: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<u64>,
}

/// List battles, newest first.
async fn list_battles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListBattlesQuery>,
) -> AppResult<ApiResponse<Vec<BattleResponse>>> {
    let filter = BattleFilter {
        battle_type: parse_battle_type(query.battle_type.as_deref())?,
        active_only: query.active.unwrap_or(true),
        limit: query.limit,
    };

    let battles = state.battle_service.list(&filter).await?;
    Ok(ApiResponse::ok(battles.into_iter().map(Into::into).collect()))
}

/// Trending query.
#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    pub window: Option<String>,
    pub limit: Option<u64>,
}

/// Rank active battles by activity.
async fn trending(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TrendingQuery>,
) -> AppResult<ApiResponse<Vec<TrendingBattleResponse>>> {
    let window = query
        .window
        .as_deref()
        .map(str::parse::<TrendingWindow>)
        .transpose()?;

    let ranked = state.battle_service.trending(query.limit, window).await?;
    Ok(ApiResponse::ok(ranked.into_iter().map(Into::into).collect()))
}

/// Stop a battle from accepting votes.
async fn deactivate_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
) -> AppResult<ApiResponse<BattleResponse>> {
    let battle = state.battle_service.deactivate(&battle_id).await?;
    Ok(ApiResponse::ok(battle.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_battles).post(create_battle))
        .route("/trending", get(trending))
        .route("/{id}", get(show_battle))
        .route("/{id}/votes", post(cast_vote))
        .route("/{id}/deactivate", post(deactivate_battle))
}
