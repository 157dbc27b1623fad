//! API endpoints.

mod battles;
mod health;

use axum::{Router, http::Uri};
use rtr_common::AppError;

use crate::middleware::AppState;

pub use battles::{
    BattleResponse, BattleViewResponse, CreateBattleRequest, TrendingBattleResponse, VoteRequest,
    VoteResponse,
};

async fn unknown_endpoint(uri: Uri) -> AppError {
    AppError::NotFound(format!("No endpoint at {}", uri.path()))
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/battles", battles::router())
        .merge(health::router())
        .fallback(unknown_endpoint)
}
