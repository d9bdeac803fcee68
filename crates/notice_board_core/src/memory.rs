//! crates/notice_board_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Used by the test
//! suites and handy for running the API without Postgres.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    AuthSession, Comment, NewNotice, NewNotification, NewUser, Notice, NoticeAcknowledgment,
    NoticeView, Notification, Page, Paged, Role, User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::visibility::NoticeFilter;

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    passwords: HashMap<Uuid, String>,
    sessions: HashMap<String, AuthSession>,
    notices: HashMap<Uuid, Notice>,
    // Vecs keep insertion order, which doubles as creation order.
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
}

/// A `DatabaseService` backed by plain collections behind an async lock.
#[derive(Default)]
pub struct InMemoryDatabase {
    store: RwLock<Store>,
    failing_recipients: std::sync::RwLock<HashSet<Uuid>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every notification write for `user_id` fail, to exercise
    /// best-effort fan-out.
    pub fn fail_notifications_for(&self, user_id: Uuid) {
        if let Ok(mut failing) = self.failing_recipients.write() {
            failing.insert(user_id);
        }
    }

    /// Marks a user inactive. Returns `false` if no such user exists.
    pub async fn deactivate_user(&self, user_id: Uuid) -> bool {
        match self.store.write().await.users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        }
    }

    /// Number of comments stored, across all notices.
    pub async fn comment_count(&self) -> usize {
        self.store.read().await.comments.len()
    }

    /// Every notification stored, oldest first.
    pub async fn all_notifications(&self) -> Vec<Notification> {
        self.store.read().await.notifications.clone()
    }

    fn recipient_fails(&self, user_id: Uuid) -> bool {
        self.failing_recipients
            .read()
            .map(|failing| failing.contains(&user_id))
            .unwrap_or(false)
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> Paged<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Paged { items, total, page }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{what} {id} not found"))
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(&self, user: &NewUser, hashed_password: &str) -> PortResult<User> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(PortError::Validation(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            department: user.department.clone(),
            year: user.year.clone(),
            is_active: true,
        };
        store.users.insert(created.id, created.clone());
        store
            .passwords
            .insert(created.id, hashed_password.to_string());
        Ok(created)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.store
            .read()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let store = self.store.read().await;
        let user = store
            .users
            .values()
            .find(|u| u.email == email)
            .ok_or_else(|| not_found("User", email))?;
        Ok(UserCredentials {
            user_id: user.id,
            email: user.email.clone(),
            hashed_password: store.passwords.get(&user.id).cloned().unwrap_or_default(),
        })
    }

    async fn list_active_students(&self, department: Option<&str>) -> PortResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .filter(|u| u.is_active && u.role == Role::Student)
            .filter(|u| department.map_or(true, |d| u.department == d))
            .cloned()
            .collect())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.store.write().await.sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let store = self.store.read().await;
        match store.sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.store.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn create_notice(&self, author_id: Uuid, notice: NewNotice) -> PortResult<Notice> {
        let now = Utc::now();
        let created = Notice {
            id: Uuid::new_v4(),
            title: notice.title,
            content: notice.content,
            category: notice.category,
            department: notice.department,
            target_year: notice.target_year,
            author_id,
            priority: notice.priority,
            status: notice.status,
            scheduled_date: notice.scheduled_date,
            attachments: notice.attachments,
            views: Vec::new(),
            acknowledged: Vec::new(),
            is_pinned: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        self.store
            .write()
            .await
            .notices
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_notice_by_id(&self, notice_id: Uuid) -> PortResult<Notice> {
        self.store
            .read()
            .await
            .notices
            .get(&notice_id)
            .cloned()
            .ok_or_else(|| not_found("Notice", notice_id))
    }

    async fn list_notices(&self, filter: &NoticeFilter, page: Page) -> PortResult<Paged<Notice>> {
        let store = self.store.read().await;
        let mut matching: Vec<Notice> = store
            .notices
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        NoticeFilter::sort(&mut matching);
        Ok(paginate(matching, page))
    }

    async fn update_notice(&self, notice: &Notice) -> PortResult<()> {
        let mut store = self.store.write().await;
        let stored = store
            .notices
            .get_mut(&notice.id)
            .ok_or_else(|| not_found("Notice", notice.id))?;
        let views = std::mem::take(&mut stored.views);
        let acknowledged = std::mem::take(&mut stored.acknowledged);
        *stored = Notice {
            views,
            acknowledged,
            ..notice.clone()
        };
        Ok(())
    }

    async fn delete_notice(&self, notice_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        store
            .notices
            .remove(&notice_id)
            .ok_or_else(|| not_found("Notice", notice_id))?;
        store.comments.retain(|c| c.notice_id != notice_id);
        store
            .notifications
            .retain(|n| n.related_notice_id != Some(notice_id));
        Ok(())
    }

    async fn add_notice_view(
        &self,
        notice_id: Uuid,
        user_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let mut store = self.store.write().await;
        let notice = store
            .notices
            .get_mut(&notice_id)
            .ok_or_else(|| not_found("Notice", notice_id))?;
        if notice.has_viewed(user_id) {
            return Ok(false);
        }
        notice.views.push(NoticeView { user_id, viewed_at });
        Ok(true)
    }

    async fn add_notice_acknowledgment(
        &self,
        notice_id: Uuid,
        user_id: Uuid,
        acknowledged_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let mut store = self.store.write().await;
        let notice = store
            .notices
            .get_mut(&notice_id)
            .ok_or_else(|| not_found("Notice", notice_id))?;
        if notice.has_acknowledged(user_id) {
            return Ok(false);
        }
        notice.acknowledged.push(NoticeAcknowledgment {
            user_id,
            acknowledged_at,
        });
        Ok(true)
    }

    async fn create_comment(
        &self,
        notice_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_comment_id: Option<Uuid>,
    ) -> PortResult<Comment> {
        let mut store = self.store.write().await;
        if !store.notices.contains_key(&notice_id) {
            return Err(not_found("Notice", notice_id));
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            notice_id,
            author_id,
            content: content.to_string(),
            parent_comment_id,
            is_edited: false,
            edited_at: None,
            created_at: Utc::now(),
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment_by_id(&self, comment_id: Uuid) -> PortResult<Comment> {
        self.store
            .read()
            .await
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned()
            .ok_or_else(|| not_found("Comment", comment_id))
    }

    async fn list_comments_for_notice(&self, notice_id: Uuid) -> PortResult<Vec<Comment>> {
        let store = self.store.read().await;
        Ok(store
            .comments
            .iter()
            .filter(|c| c.notice_id == notice_id)
            .cloned()
            .collect())
    }

    async fn list_replies(&self, parent_comment_id: Uuid) -> PortResult<Vec<Comment>> {
        let store = self.store.read().await;
        Ok(store
            .comments
            .iter()
            .filter(|c| c.parent_comment_id == Some(parent_comment_id))
            .cloned()
            .collect())
    }

    async fn update_comment(&self, comment: &Comment) -> PortResult<()> {
        let mut store = self.store.write().await;
        let stored = store
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or_else(|| not_found("Comment", comment.id))?;
        *stored = comment.clone();
        Ok(())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let before = store.comments.len();
        store.comments.retain(|c| c.id != comment_id);
        if store.comments.len() == before {
            return Err(not_found("Comment", comment_id));
        }
        Ok(())
    }

    async fn delete_replies(&self, parent_comment_id: Uuid) -> PortResult<u64> {
        let mut store = self.store.write().await;
        let before = store.comments.len();
        store
            .comments
            .retain(|c| c.parent_comment_id != Some(parent_comment_id));
        Ok((before - store.comments.len()) as u64)
    }

    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        if self.recipient_fails(notification.recipient_id) {
            return Err(PortError::Unexpected(format!(
                "notification write for {} rejected",
                notification.recipient_id
            )));
        }
        let created = Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            related_notice_id: notification.related_notice_id,
            related_comment_id: notification.related_comment_id,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        self.store
            .write()
            .await
            .notifications
            .push(created.clone());
        Ok(created)
    }

    async fn get_notification_by_id(&self, notification_id: Uuid) -> PortResult<Notification> {
        self.store
            .read()
            .await
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
            .ok_or_else(|| not_found("Notification", notification_id))
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        page: Page,
    ) -> PortResult<Paged<Notification>> {
        let store = self.store.read().await;
        let newest_first: Vec<Notification> = store
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        Ok(paginate(newest_first, page))
    }

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> PortResult<u64> {
        let store = self.store.read().await;
        Ok(store
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> PortResult<Notification> {
        let mut store = self.store.write().await;
        let notification = store
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| not_found("Notification", notification_id))?;
        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(read_at);
        }
        Ok(notification.clone())
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let mut store = self.store.write().await;
        let mut updated = 0;
        for n in store
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(read_at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, notification_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let before = store.notifications.len();
        store.notifications.retain(|n| n.id != notification_id);
        if store.notifications.len() == before {
            return Err(not_found("Notification", notification_id));
        }
        Ok(())
    }
}
