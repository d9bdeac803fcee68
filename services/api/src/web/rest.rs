//! services/api/src/web/rest.rs
//!
//! The JSON response envelope shared by every REST handler and the master
//! definition for the OpenAPI specification.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::web::{auth, comments, dto, notices, notifications};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        notices::list_notices_handler,
        notices::get_notice_handler,
        notices::create_notice_handler,
        notices::update_notice_handler,
        notices::delete_notice_handler,
        notices::acknowledge_notice_handler,
        comments::list_comments_handler,
        comments::create_comment_handler,
        comments::update_comment_handler,
        comments::delete_comment_handler,
        notifications::list_notifications_handler,
        notifications::unread_count_handler,
        notifications::mark_read_handler,
        notifications::mark_all_read_handler,
        notifications::delete_notification_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            dto::UserDto,
            dto::NoticeDto,
            dto::NoticeListDto,
            dto::NoticeViewDto,
            dto::NoticeAcknowledgmentDto,
            dto::AcknowledgeDto,
            dto::CommentDto,
            dto::CommentThreadDto,
            dto::NotificationDto,
            dto::NotificationListDto,
            dto::UnreadCountDto,
            dto::MarkAllReadDto,
            notices::CreateNoticeRequest,
            notices::UpdateNoticeRequest,
            comments::CreateCommentRequest,
            comments::UpdateCommentRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Notice Board API", description = "Notices, comments and notifications for the campus notice board.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// Response Envelope
//=========================================================================================

/// Every endpoint answers with `{success, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, ApiResponse::ok(HealthResponse { status: "ok".to_string() }))
}
