//! services/api/src/web/middleware.rs
//!
//! Authentication middleware, the extractors handlers use to read its result,
//! and request extractors whose rejections render as the JSON envelope.

use axum::{
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use notice_board_core::domain::User;
use notice_board_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;

/// The user behind the request, if a credential was supplied.
#[derive(Clone, Debug)]
pub struct Viewer(pub Option<User>);

/// A request that must carry a valid credential.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// `axum::Json` whose rejection is a 400 envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Path` whose rejection is a 400 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// `axum::extract::Query` whose rejection is a 400 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Middleware that resolves the bearer token (or `session` cookie) to a user.
///
/// Requests without a credential continue anonymously; a credential that does
/// not resolve to an active user is rejected with 401.
pub async fn resolve_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let viewer = match extract_token(req.headers()) {
        Some(token) => Some(authenticate(&state, &token).await?),
        None => None,
    };
    req.extensions_mut().insert(Viewer(viewer));
    Ok(next.run(req).await)
}

/// Resolves a session token to an active user.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, ApiError> {
    let user_id = state.db.validate_auth_session(token).await.map_err(|e| {
        warn!("Failed to validate auth session: {:?}", e);
        ApiError::Port(PortError::Unauthorized)
    })?;
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| {
        warn!("Session {} points at a missing user: {:?}", user_id, e);
        ApiError::Port(PortError::Unauthorized)
    })?;
    if !user.is_active {
        return Err(ApiError::Port(PortError::Unauthorized));
    }
    Ok(user)
}

/// Reads `Authorization: Bearer <token>`, falling back to a `session=` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .unwrap_or(Viewer(None)))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer(Some(user))) => Ok(CurrentUser(user.clone())),
            _ => Err(ApiError::Port(PortError::Unauthorized)),
        }
    }
}
