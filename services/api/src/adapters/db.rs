//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notice_board_core::domain::{
    Comment, NewNotice, NewNotification, NewUser, Notice, NoticeAcknowledgment, NoticeView,
    Notification, Page, Paged, User, UserCredentials,
};
use notice_board_core::ports::{DatabaseService, PortError, PortResult};
use notice_board_core::visibility::NoticeFilter;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Loads views and acknowledgments for a batch of notice rows in two queries.
    async fn hydrate(&self, records: Vec<NoticeRecord>) -> PortResult<Vec<Notice>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();

        let views = sqlx::query_as::<_, ViewRecord>(
            "SELECT notice_id, user_id, viewed_at FROM notice_views
             WHERE notice_id = ANY($1) ORDER BY viewed_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let acks = sqlx::query_as::<_, AckRecord>(
            "SELECT notice_id, user_id, acknowledged_at FROM notice_acknowledgments
             WHERE notice_id = ANY($1) ORDER BY acknowledged_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut views_by_notice: HashMap<Uuid, Vec<NoticeView>> = HashMap::new();
        for v in views {
            views_by_notice.entry(v.notice_id).or_default().push(NoticeView {
                user_id: v.user_id,
                viewed_at: v.viewed_at,
            });
        }
        let mut acks_by_notice: HashMap<Uuid, Vec<NoticeAcknowledgment>> = HashMap::new();
        for a in acks {
            acks_by_notice
                .entry(a.notice_id)
                .or_default()
                .push(NoticeAcknowledgment {
                    user_id: a.user_id,
                    acknowledged_at: a.acknowledged_at,
                });
        }

        records
            .into_iter()
            .map(|r| {
                let views = views_by_notice.remove(&r.id).unwrap_or_default();
                let acks = acks_by_notice.remove(&r.id).unwrap_or_default();
                r.to_domain(views, acks)
            })
            .collect()
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, role, department, year, is_active";
const NOTICE_COLUMNS: &str = "id, title, content, category, department, target_year, author_id, \
     priority, status, scheduled_date, attachments, is_pinned, is_archived, created_at, updated_at";
const COMMENT_COLUMNS: &str =
    "id, notice_id, author_id, content, parent_comment_id, is_edited, edited_at, created_at";
const NOTIFICATION_COLUMNS: &str = "id, recipient_id, type AS kind, title, message, \
     related_notice_id, related_comment_id, is_read, read_at, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    department: String,
    year: Option<String>,
    is_active: bool,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: parse_column(&self.role)?,
            department: self.department,
            year: self.year,
            is_active: self.is_active,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct NoticeRecord {
    id: Uuid,
    title: String,
    content: String,
    category: String,
    department: String,
    target_year: Option<String>,
    author_id: Uuid,
    priority: String,
    status: String,
    scheduled_date: Option<DateTime<Utc>>,
    attachments: Vec<String>,
    is_pinned: bool,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl NoticeRecord {
    fn to_domain(
        self,
        views: Vec<NoticeView>,
        acknowledged: Vec<NoticeAcknowledgment>,
    ) -> PortResult<Notice> {
        Ok(Notice {
            id: self.id,
            title: self.title,
            content: self.content,
            category: parse_column(&self.category)?,
            department: self.department,
            target_year: self.target_year,
            author_id: self.author_id,
            priority: parse_column(&self.priority)?,
            status: parse_column(&self.status)?,
            scheduled_date: self.scheduled_date,
            attachments: self.attachments,
            views,
            acknowledged,
            is_pinned: self.is_pinned,
            is_archived: self.is_archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ViewRecord {
    notice_id: Uuid,
    user_id: Uuid,
    viewed_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AckRecord {
    notice_id: Uuid,
    user_id: Uuid,
    acknowledged_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    notice_id: Uuid,
    author_id: Uuid,
    content: String,
    parent_comment_id: Option<Uuid>,
    is_edited: bool,
    edited_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}
impl CommentRecord {
    fn to_domain(self) -> Comment {
        Comment {
            id: self.id,
            notice_id: self.notice_id,
            author_id: self.author_id,
            content: self.content,
            parent_comment_id: self.parent_comment_id,
            is_edited: self.is_edited,
            edited_at: self.edited_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    recipient_id: Uuid,
    kind: String,
    title: String,
    message: String,
    related_notice_id: Option<Uuid>,
    related_comment_id: Option<Uuid>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> PortResult<Notification> {
        Ok(Notification {
            id: self.id,
            recipient_id: self.recipient_id,
            kind: parse_column(&self.kind)?,
            title: self.title,
            message: self.message,
            related_notice_id: self.related_notice_id,
            related_comment_id: self.related_comment_id,
            is_read: self.is_read,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: &str, id: impl std::fmt::Display) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{what} {id} not found")),
        _ => unexpected(e),
    }
}

fn parse_column<T>(raw: &str) -> PortResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| PortError::Unexpected(format!("corrupt column value: {e}")))
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends the WHERE clause for a visibility filter.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &NoticeFilter) {
    qb.push(" WHERE is_archived = FALSE AND status = ")
        .push_bind(filter.status.as_str());
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(departments) = &filter.departments {
        qb.push(" AND department = ANY(")
            .push_bind(departments.clone())
            .push(")");
    }
    if let Some(year) = &filter.target_year {
        qb.push(" AND (target_year IS NULL OR target_year = '' OR target_year = ")
            .push_bind(year.clone())
            .push(")");
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn paged<T>(items: Vec<T>, total: i64, page: Page) -> Paged<T> {
    Paged {
        items,
        total: total.max(0) as u64,
        page,
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---

    async fn create_user(&self, user: &NewUser, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email, hashed_password, role, department, year)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(hashed_password)
        .bind(user.role.as_str())
        .bind(&user.department)
        .bind(&user.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Validation(format!("Email {} is already registered", user.email))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "User", user_id))?
        .to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "User", email))?;
        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn list_active_students(&self, department: Option<&str>) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE is_active AND role = 'student' AND ($1::TEXT IS NULL OR department = $1)"
        ))
        .bind(department)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Notices ---

    async fn create_notice(&self, author_id: Uuid, notice: NewNotice) -> PortResult<Notice> {
        let record = sqlx::query_as::<_, NoticeRecord>(&format!(
            "INSERT INTO notices (id, title, content, category, department, target_year,
                                  author_id, priority, status, scheduled_date, attachments)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {NOTICE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(notice.category.as_str())
        .bind(&notice.department)
        .bind(&notice.target_year)
        .bind(author_id)
        .bind(notice.priority.as_str())
        .bind(notice.status.as_str())
        .bind(notice.scheduled_date)
        .bind(&notice.attachments)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain(Vec::new(), Vec::new())
    }

    async fn get_notice_by_id(&self, notice_id: Uuid) -> PortResult<Notice> {
        let record = sqlx::query_as::<_, NoticeRecord>(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices WHERE id = $1"
        ))
        .bind(notice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "Notice", notice_id))?;

        self.hydrate(vec![record])
            .await?
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Notice {notice_id} not found")))
    }

    async fn list_notices(&self, filter: &NoticeFilter, page: Page) -> PortResult<Paged<Notice>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notices");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {NOTICE_COLUMNS} FROM notices"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY is_pinned DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let records: Vec<NoticeRecord> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(paged(self.hydrate(records).await?, total, page))
    }

    async fn update_notice(&self, notice: &Notice) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE notices SET title = $2, content = $3, category = $4, department = $5,
                    target_year = $6, priority = $7, status = $8, scheduled_date = $9,
                    attachments = $10, is_pinned = $11, is_archived = $12, updated_at = $13
             WHERE id = $1",
        )
        .bind(notice.id)
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(notice.category.as_str())
        .bind(&notice.department)
        .bind(&notice.target_year)
        .bind(notice.priority.as_str())
        .bind(notice.status.as_str())
        .bind(notice.scheduled_date)
        .bind(&notice.attachments)
        .bind(notice.is_pinned)
        .bind(notice.is_archived)
        .bind(notice.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Notice {} not found", notice.id)));
        }
        Ok(())
    }

    async fn delete_notice(&self, notice_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("DELETE FROM notifications WHERE related_notice_id = $1")
            .bind(notice_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query("DELETE FROM comments WHERE notice_id = $1")
            .bind(notice_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        let result = sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(notice_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Notice {notice_id} not found")));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    // --- Views & Acknowledgments ---

    async fn add_notice_view(
        &self,
        notice_id: Uuid,
        user_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO notice_views (notice_id, user_id, viewed_at) VALUES ($1, $2, $3)
             ON CONFLICT (notice_id, user_id) DO NOTHING",
        )
        .bind(notice_id)
        .bind(user_id)
        .bind(viewed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Notice {notice_id} not found"))
            }
            _ => unexpected(e),
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_notice_acknowledgment(
        &self,
        notice_id: Uuid,
        user_id: Uuid,
        acknowledged_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO notice_acknowledgments (notice_id, user_id, acknowledged_at)
             VALUES ($1, $2, $3) ON CONFLICT (notice_id, user_id) DO NOTHING",
        )
        .bind(notice_id)
        .bind(user_id)
        .bind(acknowledged_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Notice {notice_id} not found"))
            }
            _ => unexpected(e),
        })?;
        Ok(result.rows_affected() == 1)
    }

    // --- Comments ---

    async fn create_comment(
        &self,
        notice_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_comment_id: Option<Uuid>,
    ) -> PortResult<Comment> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "INSERT INTO comments (id, notice_id, author_id, content, parent_comment_id)
             VALUES ($1, $2, $3, $4, $5) RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(notice_id)
        .bind(author_id)
        .bind(content)
        .bind(parent_comment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Notice {notice_id} not found"))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_comment_by_id(&self, comment_id: Uuid) -> PortResult<Comment> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "Comment", comment_id))?;
        Ok(record.to_domain())
    }

    async fn list_comments_for_notice(&self, notice_id: Uuid) -> PortResult<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE notice_id = $1 ORDER BY created_at"
        ))
        .bind(notice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CommentRecord::to_domain).collect())
    }

    async fn list_replies(&self, parent_comment_id: Uuid) -> PortResult<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_comment_id = $1 ORDER BY created_at"
        ))
        .bind(parent_comment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CommentRecord::to_domain).collect())
    }

    async fn update_comment(&self, comment: &Comment) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE comments SET content = $2, is_edited = $3, edited_at = $4 WHERE id = $1",
        )
        .bind(comment.id)
        .bind(&comment.content)
        .bind(comment.is_edited)
        .bind(comment.edited_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Comment {} not found", comment.id)));
        }
        Ok(())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Comment {comment_id} not found")));
        }
        Ok(())
    }

    async fn delete_replies(&self, parent_comment_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE parent_comment_id = $1")
            .bind(parent_comment_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    // --- Notifications ---

    async fn create_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        sqlx::query_as::<_, NotificationRecord>(&format!(
            "INSERT INTO notifications (id, recipient_id, type, title, message,
                                        related_notice_id, related_comment_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(notification.recipient_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_notice_id)
        .bind(notification.related_comment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn get_notification_by_id(&self, notification_id: Uuid) -> PortResult<Notification> {
        sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(notification_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "Notification", notification_id))?
        .to_domain()
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        page: Page,
    ) -> PortResult<Paged<Notification>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE)",
        )
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE)
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(recipient_id)
        .bind(unread_only)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let items = records
            .into_iter()
            .map(NotificationRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        Ok(paged(items, total, page))
    }

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> PortResult<Notification> {
        sqlx::query_as::<_, NotificationRecord>(&format!(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, $2)
             WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification_id)
        .bind(read_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "Notification", notification_id))?
        .to_domain()
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2
             WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, notification_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Notification {notification_id} not found"
            )));
        }
        Ok(())
    }
}
