//! Request extractors.
//!
//! Each one rejects with an [`ApiError`] so malformed requests get the same
//! JSON error body as every other failure, and none of them lets an
//! out-of-range value through to the contact store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::entity::User;
use crate::error::{ApiError, AuthError};
use crate::schema::{validate_contact_id, Pagination, Violation};
use crate::server::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let user = state.authenticator.authenticate(&token).await?;

        let current = Self(user);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// The authenticated caller, admitted only if it holds an elevated role.
#[derive(Debug, Clone)]
pub struct Elevated(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Elevated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        state.list_all_access.check(&user)?;
        Ok(Self(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// JSON body whose parse failures surface as validation errors.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::validation(vec![Violation::new("body", rejection.body_text())])
}

/// Validated `limit`/`offset` query.
#[derive(Debug, Clone, Copy)]
pub struct Page(pub Pagination);

#[async_trait]
impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pagination) = Query::<Pagination>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![Violation::new("query", rejection.body_text())])
            })?;
        pagination.validate().map(Self).map_err(ApiError::validation)
    }
}

/// Validated `{contact_id}` path segment.
#[derive(Debug, Clone, Copy)]
pub struct ContactId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ContactId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![Violation::new("contact_id", rejection.body_text())])
            })?;
        validate_contact_id(id).map(Self).map_err(ApiError::validation)
    }
}
