//! services/api/src/web/notices.rs
//!
//! REST handlers for notices: listing, reading, authoring and acknowledging.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use notice_board_core::domain::{
    NewNotice, NoticeCategory, NoticeChanges, NoticePriority, NoticeStatus, Page,
};
use notice_board_core::ports::PortError;
use notice_board_core::visibility::NoticeQuery;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{AcknowledgeDto, NoticeDto, NoticeListDto};
use crate::web::middleware::{CurrentUser, JsonBody, PathParam, QueryParams, Viewer};
use crate::web::rest::ApiResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListNoticesQuery {
    /// academic, events, exams or circulars.
    pub category: Option<String>,
    pub department: Option<String>,
    /// published, scheduled or draft.
    pub status: Option<String>,
    /// Case-insensitive match on title or content.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListNoticesQuery {
    fn to_notice_query(&self) -> Result<NoticeQuery, PortError> {
        Ok(NoticeQuery {
            category: parse_filter(self.category.as_deref())?,
            department: non_blank(self.department.as_deref()),
            status: parse_filter(self.status.as_deref())?,
            search: non_blank(self.search.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeRequest {
    pub title: String,
    pub content: String,
    #[schema(value_type = String, example = "academic")]
    pub category: NoticeCategory,
    pub department: String,
    #[serde(default)]
    pub target_year: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "medium")]
    pub priority: Option<NoticePriority>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "published")]
    pub status: Option<NoticeStatus>,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl From<CreateNoticeRequest> for NewNotice {
    fn from(req: CreateNoticeRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            content: req.content,
            category: req.category,
            department: req.department.trim().to_string(),
            target_year: req.target_year.filter(|y| !y.trim().is_empty()),
            priority: req.priority.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            scheduled_date: req.scheduled_date,
            attachments: req.attachments,
        }
    }
}

/// Absent fields stay unchanged; an explicit `null` clears `targetYear` or `scheduledDate`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoticeRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[schema(value_type = Option<String>)]
    pub category: Option<NoticeCategory>,
    pub department: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub target_year: Option<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub priority: Option<NoticePriority>,
    #[schema(value_type = Option<String>)]
    pub status: Option<NoticeStatus>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_date: Option<Option<DateTime<Utc>>>,
    pub attachments: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub is_archived: Option<bool>,
}

impl From<UpdateNoticeRequest> for NoticeChanges {
    fn from(req: UpdateNoticeRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            content: req.content,
            category: req.category,
            department: req.department.map(|d| d.trim().to_string()),
            target_year: req.target_year,
            priority: req.priority,
            status: req.status,
            scheduled_date: req.scheduled_date,
            attachments: req.attachments,
            is_pinned: req.is_pinned,
            is_archived: req.is_archived,
        }
    }
}

// Distinguishes a present `null` (Some(None)) from an absent field (None).
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// "all" and blank values mean "no filter".
fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, PortError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(value) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e: T::Err| PortError::Validation(e.to_string())),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /notices - List the notices visible to the caller
#[utoipa::path(
    get,
    path = "/notices",
    params(ListNoticesQuery),
    responses(
        (status = 200, description = "A page of notices, pinned first", body = NoticeListDto),
        (status = 400, description = "Unknown category or status")
    )
)]
pub async fn list_notices_handler(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    QueryParams(params): QueryParams<ListNoticesQuery>,
) -> Result<ApiResponse<NoticeListDto>, ApiError> {
    let query = params.to_notice_query()?;
    let page = Page::new(params.page, params.limit);
    let notices = state
        .notices
        .list_notices(viewer.as_ref(), &query, page)
        .await?;
    Ok(ApiResponse::ok(notices.into()))
}

/// GET /notices/{id} - Read one notice, recording a view for signed-in users
#[utoipa::path(
    get,
    path = "/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice id")),
    responses(
        (status = 200, description = "The notice", body = NoticeDto),
        (status = 404, description = "Notice not found")
    )
)]
pub async fn get_notice_handler(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    PathParam(notice_id): PathParam<Uuid>,
) -> Result<ApiResponse<NoticeDto>, ApiError> {
    let notice = state.notices.get_notice(viewer.as_ref(), notice_id).await?;
    Ok(ApiResponse::ok(notice.into()))
}

/// POST /notices - Publish, schedule or draft a notice
#[utoipa::path(
    post,
    path = "/notices",
    request_body = CreateNoticeRequest,
    responses(
        (status = 201, description = "Notice created", body = NoticeDto),
        (status = 400, description = "Invalid notice"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Students cannot create notices")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_notice_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateNoticeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notice = state.notices.create_notice(&user, req.into()).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(NoticeDto::from(notice), "Notice created successfully"),
    ))
}

/// PUT /notices/{id} - Update a notice (author or admin)
#[utoipa::path(
    put,
    path = "/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice id")),
    request_body = UpdateNoticeRequest,
    responses(
        (status = 200, description = "Notice updated", body = NoticeDto),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Notice not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_notice_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(notice_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateNoticeRequest>,
) -> Result<ApiResponse<NoticeDto>, ApiError> {
    let notice = state
        .notices
        .update_notice(&user, notice_id, req.into())
        .await?;
    Ok(ApiResponse::ok_with_message(notice.into(), "Notice updated successfully"))
}

/// DELETE /notices/{id} - Delete a notice with its comments (author or admin)
#[utoipa::path(
    delete,
    path = "/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice id")),
    responses(
        (status = 200, description = "Notice deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Notice not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_notice_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(notice_id): PathParam<Uuid>,
) -> Result<ApiResponse<()>, ApiError> {
    state.notices.delete_notice(&user, notice_id).await?;
    Ok(ApiResponse::message("Notice deleted successfully"))
}

/// POST /notices/{id}/acknowledge - Acknowledge a notice once
#[utoipa::path(
    post,
    path = "/notices/{id}/acknowledge",
    params(("id" = Uuid, Path, description = "Notice id")),
    responses(
        (status = 200, description = "Acknowledgment recorded", body = AcknowledgeDto),
        (status = 404, description = "Notice not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn acknowledge_notice_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(notice_id): PathParam<Uuid>,
) -> Result<ApiResponse<AcknowledgeDto>, ApiError> {
    let acknowledgment_count = state.notices.acknowledge(&user, notice_id).await?;
    Ok(ApiResponse::ok_with_message(
        AcknowledgeDto { acknowledgment_count },
        "Notice acknowledged",
    ))
}
