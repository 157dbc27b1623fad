//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request},
    middleware::Next,
    response::Response,
};
use rtr_common::{AppError, AppResult, config::IdentityConfig};
use rtr_core::{BattleService, IdentityResolver, VoterIdentity};
use tracing::debug;

/// Header names voter identities are read from.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    /// Verified account id set by the upstream auth gateway.
    pub account: HeaderName,
    /// Anonymous session token set by the client.
    pub session: HeaderName,
}

impl IdentityHeaders {
    /// Build from configuration, rejecting invalid header names.
    pub fn from_config(config: &IdentityConfig) -> AppResult<Self> {
        let parse = |name: &str| {
            HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
                .map_err(|e| AppError::Config(format!("Invalid identity header '{name}': {e}")))
        };

        Ok(Self {
            account: parse(&config.account_header)?,
            session: parse(&config.session_header)?,
        })
    }
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            account: HeaderName::from_static("x-authenticated-user"),
            session: HeaderName::from_static("x-session-id"),
        }
    }
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub battle_service: BattleService,
    pub identity_headers: IdentityHeaders,
    pub resolver: IdentityResolver,
}

impl AppState {
    /// Create the state shared by all handlers.
    #[must_use]
    pub const fn new(battle_service: BattleService, identity_headers: IdentityHeaders) -> Self {
        Self {
            battle_service,
            identity_headers,
            resolver: IdentityResolver::new(),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> AppResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::BadRequest(format!("Header {name} is not valid text")))
        })
        .transpose()
}

/// Caller identity taken from the identity headers.
///
/// Stored in the request extensions by [`identity_middleware`]. A malformed
/// identity is kept as the error it produced, so only handlers that ask for
/// the voter reject the request.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity(pub Result<VoterIdentity, AppError>);

/// Identity middleware.
///
/// Resolves the caller from the identity headers. Requests without identity
/// headers pass through untouched.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let resolved = header_str(req.headers(), &state.identity_headers.account).and_then(|account| {
        let session = header_str(req.headers(), &state.identity_headers.session)?;
        state.resolver.resolve(account, session)
    });

    match resolved {
        Ok(Some(identity)) => {
            debug!(authenticated = identity.is_authenticated(), "Resolved voter identity");
            req.extensions_mut().insert(ResolvedIdentity(Ok(identity)));
        }
        Ok(None) => {}
        Err(err) => {
            debug!(error = %err, "Ignoring malformed identity headers until a handler needs them");
            req.extensions_mut().insert(ResolvedIdentity(Err(err)));
        }
    }

    next.run(req).await
}
