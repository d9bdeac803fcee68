//! services/api/src/web/dto.rs
//!
//! Response payloads. These mirror the core domain types in the JSON shape the
//! web client consumes, and carry the OpenAPI schema annotations.

use chrono::{DateTime, Utc};
use notice_board_core::domain::{
    Comment, CommentThread, Notice, NoticeCategory, NoticePriority, NoticeStatus, Notification,
    NotificationType, Paged, Role, User,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[schema(value_type = String, example = "student")]
    pub role: Role,
    pub department: String,
    pub year: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            department: user.department,
            year: user.year,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoticeViewDto {
    pub user_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoticeAcknowledgmentDto {
    pub user_id: Uuid,
    pub acknowledged_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoticeDto {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[schema(value_type = String, example = "academic")]
    pub category: NoticeCategory,
    pub department: String,
    pub target_year: Option<String>,
    pub author: Uuid,
    #[schema(value_type = String, example = "medium")]
    pub priority: NoticePriority,
    #[schema(value_type = String, example = "published")]
    pub status: NoticeStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
    pub views: Vec<NoticeViewDto>,
    pub acknowledged: Vec<NoticeAcknowledgmentDto>,
    pub view_count: usize,
    pub acknowledgment_count: usize,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Notice> for NoticeDto {
    fn from(notice: Notice) -> Self {
        Self {
            id: notice.id,
            title: notice.title,
            content: notice.content,
            category: notice.category,
            department: notice.department,
            target_year: notice.target_year,
            author: notice.author_id,
            priority: notice.priority,
            status: notice.status,
            scheduled_date: notice.scheduled_date,
            attachments: notice.attachments,
            view_count: notice.views.len(),
            acknowledgment_count: notice.acknowledged.len(),
            views: notice
                .views
                .into_iter()
                .map(|v| NoticeViewDto {
                    user_id: v.user_id,
                    viewed_at: v.viewed_at,
                })
                .collect(),
            acknowledged: notice
                .acknowledged
                .into_iter()
                .map(|a| NoticeAcknowledgmentDto {
                    user_id: a.user_id,
                    acknowledged_at: a.acknowledged_at,
                })
                .collect(),
            is_pinned: notice.is_pinned,
            is_archived: notice.is_archived,
            created_at: notice.created_at,
            updated_at: notice.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoticeListDto {
    pub notices: Vec<NoticeDto>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<Paged<Notice>> for NoticeListDto {
    fn from(paged: Paged<Notice>) -> Self {
        Self {
            total: paged.total,
            page: paged.page.page,
            limit: paged.page.limit,
            total_pages: paged.total_pages(),
            notices: paged.items.into_iter().map(NoticeDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeDto {
    pub acknowledgment_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: Uuid,
    pub notice: Uuid,
    pub author: Uuid,
    pub content: String,
    pub parent_comment: Option<Uuid>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentDto {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            notice: comment.notice_id,
            author: comment.author_id,
            content: comment.content,
            parent_comment: comment.parent_comment_id,
            is_edited: comment.is_edited,
            edited_at: comment.edited_at,
            created_at: comment.created_at,
        }
    }
}

/// A top-level comment with its replies inlined.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadDto {
    #[serde(flatten)]
    pub comment: CommentDto,
    pub replies: Vec<CommentDto>,
}

impl From<CommentThread> for CommentThreadDto {
    fn from(thread: CommentThread) -> Self {
        Self {
            comment: thread.comment.into(),
            replies: thread.replies.into_iter().map(CommentDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: Uuid,
    pub recipient: Uuid,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "new_notice")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_notice: Option<Uuid>,
    pub related_comment: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            recipient: n.recipient_id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            related_notice: n.related_notice_id,
            related_comment: n.related_comment_id,
            is_read: n.is_read,
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListDto {
    pub notifications: Vec<NotificationDto>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub unread_count: u64,
}

impl NotificationListDto {
    pub fn new(paged: Paged<Notification>, unread_count: u64) -> Self {
        Self {
            total: paged.total,
            page: paged.page.page,
            limit: paged.page.limit,
            total_pages: paged.total_pages(),
            notifications: paged.items.into_iter().map(NotificationDto::from).collect(),
            unread_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountDto {
    pub unread_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadDto {
    pub updated: u64,
}
