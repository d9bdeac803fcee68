//! crates/notice_board_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database; they serialize with serde so
//! that realtime events can carry them as payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel department value meaning "visible to every department".
pub const ALL_DEPARTMENTS: &str = "All Departments";

//=========================================================================================
// Enumerations
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeCategory {
    Academic,
    Events,
    Exams,
    Circulars,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticePriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeStatus {
    #[default]
    Published,
    Scheduled,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewNotice,
    Comment,
    Acknowledgment,
    Mention,
    System,
}

/// Error returned when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

// Generates `as_str`, `Display` and `FromStr` for the string-backed enums above.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(Role, "role", {
    Admin => "admin",
    Faculty => "faculty",
    Student => "student",
});

string_enum!(NoticeCategory, "category", {
    Academic => "academic",
    Events => "events",
    Exams => "exams",
    Circulars => "circulars",
});

string_enum!(NoticePriority, "priority", {
    High => "high",
    Medium => "medium",
    Low => "low",
});

string_enum!(NoticeStatus, "status", {
    Published => "published",
    Scheduled => "scheduled",
    Draft => "draft",
});

string_enum!(NotificationType, "notification type", {
    NewNotice => "new_notice",
    Comment => "comment",
    Acknowledgment => "acknowledgment",
    Mention => "mention",
    System => "system",
});

//=========================================================================================
// Users
//=========================================================================================

/// Represents a user - used throughout the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
    /// Only meaningful for students.
    pub year: Option<String>,
    pub is_active: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Fields required to register a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
    pub year: Option<String>,
}

// Represents a login session (bearer token)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Notices
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeView {
    pub user_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeAcknowledgment {
    pub user_id: Uuid,
    pub acknowledged_at: DateTime<Utc>,
}

/// A published announcement visible to a scoped audience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: NoticeCategory,
    pub department: String,
    pub target_year: Option<String>,
    pub author_id: Uuid,
    pub priority: NoticePriority,
    pub status: NoticeStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
    pub views: Vec<NoticeView>,
    pub acknowledged: Vec<NoticeAcknowledgment>,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_published(&self) -> bool {
        self.status == NoticeStatus::Published
    }

    pub fn has_viewed(&self, user_id: Uuid) -> bool {
        self.views.iter().any(|v| v.user_id == user_id)
    }

    pub fn has_acknowledged(&self, user_id: Uuid) -> bool {
        self.acknowledged.iter().any(|a| a.user_id == user_id)
    }

    pub fn targets_all_departments(&self) -> bool {
        self.department == ALL_DEPARTMENTS
    }
}

/// Fields supplied by an author when creating a notice.
#[derive(Debug, Clone)]
pub struct NewNotice {
    pub title: String,
    pub content: String,
    pub category: NoticeCategory,
    pub department: String,
    pub target_year: Option<String>,
    pub priority: NoticePriority,
    pub status: NoticeStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
}

/// A partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct NoticeChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<NoticeCategory>,
    pub department: Option<String>,
    pub target_year: Option<Option<String>>,
    pub priority: Option<NoticePriority>,
    pub status: Option<NoticeStatus>,
    pub scheduled_date: Option<Option<DateTime<Utc>>>,
    pub attachments: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub is_archived: Option<bool>,
}

impl NoticeChanges {
    /// Applies the changes to `notice` in place and bumps `updated_at`.
    pub fn apply_to(self, notice: &mut Notice, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            notice.title = title;
        }
        if let Some(content) = self.content {
            notice.content = content;
        }
        if let Some(category) = self.category {
            notice.category = category;
        }
        if let Some(department) = self.department {
            notice.department = department;
        }
        if let Some(target_year) = self.target_year {
            notice.target_year = target_year;
        }
        if let Some(priority) = self.priority {
            notice.priority = priority;
        }
        if let Some(status) = self.status {
            notice.status = status;
        }
        if let Some(scheduled_date) = self.scheduled_date {
            notice.scheduled_date = scheduled_date;
        }
        if let Some(attachments) = self.attachments {
            notice.attachments = attachments;
        }
        if let Some(is_pinned) = self.is_pinned {
            notice.is_pinned = is_pinned;
        }
        if let Some(is_archived) = self.is_archived {
            notice.is_archived = is_archived;
        }
        notice.updated_at = now;
    }
}

//=========================================================================================
// Comments
//=========================================================================================

/// A comment on a notice. Replies point at their parent through
/// `parent_comment_id`; the reply list of a comment is always looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub notice_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

/// A top-level comment together with its replies, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_notice_id: Option<Uuid>,
    pub related_comment_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A notification that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_notice_id: Option<Uuid>,
    pub related_comment_id: Option<Uuid>,
}

//=========================================================================================
// Paging
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a page from optional query values, clamping to sane bounds.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total number of matching items.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: Page,
}

impl<T> Paged<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page.limit))
    }
}
