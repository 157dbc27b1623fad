//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use rtr_common::AppError;
use rtr_core::VoterIdentity;

use crate::middleware::ResolvedIdentity;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Optional voter extractor.
///
/// Reads the identity placed in the request extensions by
/// [`crate::middleware::identity_middleware`] and rejects the request if the
/// identity headers were malformed. Handlers that need an identity combine it
/// with the `voterId` from the body or query.
#[derive(Debug, Clone)]
pub struct MaybeVoter(pub Option<VoterIdentity>);

impl<S> FromRequestParts<S> for MaybeVoter
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<ResolvedIdentity>() {
            None => Ok(Self(None)),
            Some(ResolvedIdentity(resolved)) => {
                resolved.clone().map(|identity| Self(Some(identity)))
            }
        }
    }
}

/// JSON body that is validated before reaching the handler.
///
/// Malformed bodies become `BAD_REQUEST` and failed validation becomes
/// `VALIDATION_ERROR`, both in the common error format.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string extractor with errors in the common error format.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }
}
