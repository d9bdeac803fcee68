//! crates/notice_board_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific implementations like databases or socket servers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::broadcast::RealtimeEvent;
use crate::domain::{
    Comment, NewNotice, NewNotification, NewUser, Notice, Notification, Page, Paged, User,
    UserCredentials,
};
use crate::visibility::NoticeFilter;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and service operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, user: &NewUser, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Active students, optionally restricted to one department.
    async fn list_active_students(&self, department: Option<&str>) -> PortResult<Vec<User>>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Notices ---
    async fn create_notice(&self, author_id: Uuid, notice: NewNotice) -> PortResult<Notice>;

    async fn get_notice_by_id(&self, notice_id: Uuid) -> PortResult<Notice>;

    /// Lists notices matching `filter`, pinned first then newest first.
    async fn list_notices(&self, filter: &NoticeFilter, page: Page) -> PortResult<Paged<Notice>>;

    /// Persists the scalar fields of `notice`; views and acknowledgments are untouched.
    async fn update_notice(&self, notice: &Notice) -> PortResult<()>;

    /// Deletes the notice together with its comments and notifications.
    async fn delete_notice(&self, notice_id: Uuid) -> PortResult<()>;

    /// Returns `false` when the user already has a view entry.
    async fn add_notice_view(
        &self,
        notice_id: Uuid,
        user_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> PortResult<bool>;

    /// Returns `false` when the user already acknowledged the notice.
    async fn add_notice_acknowledgment(
        &self,
        notice_id: Uuid,
        user_id: Uuid,
        acknowledged_at: DateTime<Utc>,
    ) -> PortResult<bool>;

    // --- Comments ---
    async fn create_comment(
        &self,
        notice_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_comment_id: Option<Uuid>,
    ) -> PortResult<Comment>;

    async fn get_comment_by_id(&self, comment_id: Uuid) -> PortResult<Comment>;

    /// All comments of a notice, oldest first.
    async fn list_comments_for_notice(&self, notice_id: Uuid) -> PortResult<Vec<Comment>>;

    /// Direct replies of a comment, oldest first.
    async fn list_replies(&self, parent_comment_id: Uuid) -> PortResult<Vec<Comment>>;

    async fn update_comment(&self, comment: &Comment) -> PortResult<()>;

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()>;

    /// Deletes every direct reply of `parent_comment_id`, returning how many went.
    async fn delete_replies(&self, parent_comment_id: Uuid) -> PortResult<u64>;

    // --- Notifications ---
    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification>;

    async fn get_notification_by_id(&self, notification_id: Uuid) -> PortResult<Notification>;

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        page: Page,
    ) -> PortResult<Paged<Notification>>;

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> PortResult<u64>;

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> PortResult<Notification>;

    async fn mark_all_notifications_read(
        &self,
        recipient_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> PortResult<u64>;

    async fn delete_notification(&self, notification_id: Uuid) -> PortResult<()>;
}

/// Live push to connected clients. Implementations must never block the caller
/// and must treat "nobody is listening" as success.
pub trait RealtimeService: Send + Sync {
    /// Sends the event to every live connection.
    fn broadcast(&self, event: &RealtimeEvent);

    /// Sends the event only to connections that joined `user_id`'s room.
    fn send_to_user(&self, user_id: Uuid, event: &RealtimeEvent);
}
