//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use notice_board_core::domain::{NewUser, Role, User};
use notice_board_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::UserDto;
use crate::web::middleware::{extract_token, CurrentUser, JsonBody};
use crate::web::rest::ApiResponse;
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `student` or `faculty`. Admin accounts cannot self-register.
    #[serde(default)]
    pub role: Option<String>,
    pub department: String,
    #[serde(default)]
    pub year: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    /// Send as `Authorization: Bearer <token>`.
    pub token: String,
    pub user: UserDto,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account and sign it in
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = validate_registration(&req)?;
    let password_hash = hash_password(&req.password)?;

    let user = state.db.create_user(&new_user, &password_hash).await?;
    info!(user_id = %user.id, role = %user.role, "User registered");

    let (token, cookie) = issue_session(&state, user.id).await?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok_with_message(
            AuthResponse { token, user: user.into() },
            "User registered successfully",
        ),
    ))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let creds = state.db.get_user_by_email(&email).await.map_err(|e| {
        warn!("Login failed for {}: {:?}", email, e);
        ApiError::Port(PortError::Unauthorized)
    })?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Stored password hash is malformed".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::Port(PortError::Unauthorized));
    }

    let user: User = state.db.get_user_by_id(creds.user_id).await?;
    if !user.is_active {
        return Err(ApiError::Port(PortError::Unauthorized));
    }

    let (token, cookie) = issue_session(&state, user.id).await?;
    info!(user_id = %user.id, "User logged in");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok_with_message(AuthResponse { token, user: user.into() }, "Login successful"),
    ))
}

/// POST /auth/logout - Invalidate the presented session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(&headers).ok_or(ApiError::Port(PortError::Unauthorized))?;
    state.db.delete_auth_session(&token).await?;
    info!(user_id = %user.id, "User logged out");

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        ApiResponse::message("Logged out"),
    ))
}

/// GET /auth/me - The authenticated user's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(CurrentUser(user): CurrentUser) -> ApiResponse<UserDto> {
    ApiResponse::ok(user.into())
}

//=========================================================================================
// Helpers
//=========================================================================================

fn validate_registration(req: &RegisterRequest) -> Result<NewUser, PortError> {
    let name = req.name.trim();
    let email = req.email.trim().to_lowercase();
    let department = req.department.trim();
    if name.is_empty() || department.is_empty() {
        return Err(PortError::Validation("Name and department are required".to_string()));
    }
    if !email.contains('@') {
        return Err(PortError::Validation("A valid email is required".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(PortError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let role = match req.role.as_deref() {
        None => Role::Student,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| PortError::Validation(e.to_string()))?,
    };
    if role == Role::Admin {
        return Err(PortError::Validation(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    Ok(NewUser {
        name: name.to_string(),
        email,
        role,
        department: department.to_string(),
        year: req
            .year
            .as_deref()
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .map(str::to_string),
    })
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn session_expiry(now: DateTime<Utc>, days: i64) -> Result<(Duration, DateTime<Utc>), ApiError> {
    Duration::try_days(days)
        .and_then(|ttl| now.checked_add_signed(ttl).map(|at| (ttl, at)))
        .ok_or_else(|| ApiError::Internal(format!("Session lifetime of {days} days overflows")))
}

/// Creates a session row and the matching cookie.
async fn issue_session(state: &AppState, user_id: Uuid) -> Result<(String, String), ApiError> {
    let token = Uuid::new_v4().to_string();
    let (ttl, expires_at) = session_expiry(Utc::now(), state.config.session_ttl_days)?;
    state
        .db
        .create_auth_session(&token, user_id, expires_at)
        .await?;

    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        ttl.num_seconds()
    );
    Ok((token, cookie))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: "Asha".to_string(),
            email: " Asha@Campus.edu ".to_string(),
            password: "secret-pass".to_string(),
            role: role.map(str::to_string),
            department: "CSE".to_string(),
            year: Some("3".to_string()),
        }
    }

    #[test]
    fn registration_defaults_to_student_and_normalizes_email() {
        let user = validate_registration(&request(None)).unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.email, "asha@campus.edu");
    }

    #[test]
    fn registration_refuses_admin_and_short_passwords() {
        assert!(matches!(
            validate_registration(&request(Some("admin"))),
            Err(PortError::Validation(_))
        ));

        let mut short = request(Some("faculty"));
        short.password = "abc".to_string();
        assert!(matches!(validate_registration(&short), Err(PortError::Validation(_))));
    }

    #[test]
    fn session_expiry_refuses_overflowing_lifetimes() {
        let now = Utc::now();
        let (ttl, expires_at) = session_expiry(now, 7).unwrap();
        assert_eq!(ttl.num_days(), 7);
        assert_eq!(expires_at - now, ttl);

        assert!(session_expiry(now, i64::MAX).is_err());
        assert!(session_expiry(now, 100_000_000).is_err());
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("secret-pass").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"secret-pass", &parsed)
            .is_ok());
    }
}
