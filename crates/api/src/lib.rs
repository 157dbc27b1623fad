//! HTTP API layer for the battle ledger.
//!
//! - **Endpoints**: battle creation, voting, results, listing and trending
//! - **Extractors**: voter identity, JSON bodies and query strings with
//!   errors rendered in the common error format
//! - **Middleware**: shared state and identity resolution from trusted headers
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, identity_middleware};
