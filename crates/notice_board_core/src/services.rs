//! crates/notice_board_core/src/services.rs
//!
//! Use-case services. Each mutating call performs its primary write first, then
//! fans the change out through the `NotificationRecorder` and the `Broadcaster`.
//! Fan-out failures are logged by those components and never reach the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::broadcast::Broadcaster;
use crate::domain::{
    Comment, CommentThread, NewNotice, Notice, NoticeChanges, Notification, Page, Paged, Role,
    User,
};
use crate::notifier::NotificationRecorder;
use crate::ports::{DatabaseService, PortError, PortResult, RealtimeService};
use crate::threads::CommentThreadManager;
use crate::tracker::EngagementTracker;
use crate::visibility::{can_read, visible_predicate, NoticeQuery};

// Notices the viewer may not read are reported as missing.
async fn readable_notice(
    db: &dyn DatabaseService,
    viewer: Option<&User>,
    notice_id: Uuid,
) -> PortResult<Notice> {
    let notice = db.get_notice_by_id(notice_id).await?;
    if !can_read(viewer, &notice) {
        return Err(PortError::NotFound(format!("Notice {notice_id} not found")));
    }
    Ok(notice)
}

fn require_owner_or_admin(actor: &User, owner_id: Uuid, what: &str) -> PortResult<()> {
    if actor.id == owner_id || actor.is_admin() {
        Ok(())
    } else {
        Err(PortError::Forbidden(format!(
            "Only the author or an admin can modify this {what}"
        )))
    }
}

//=========================================================================================
// Notices
//=========================================================================================

#[derive(Clone)]
pub struct NoticeService {
    db: Arc<dyn DatabaseService>,
    recorder: NotificationRecorder,
    broadcaster: Broadcaster,
    tracker: EngagementTracker,
}

impl NoticeService {
    pub fn new(db: Arc<dyn DatabaseService>, realtime: Arc<dyn RealtimeService>) -> Self {
        Self {
            recorder: NotificationRecorder::new(db.clone()),
            broadcaster: Broadcaster::new(realtime),
            tracker: EngagementTracker::new(db.clone()),
            db,
        }
    }

    pub async fn list_notices(
        &self,
        viewer: Option<&User>,
        query: &NoticeQuery,
        page: Page,
    ) -> PortResult<Paged<Notice>> {
        let filter = visible_predicate(viewer, query);
        self.db.list_notices(&filter, page).await
    }

    /// Fetches a notice and records a view for the viewer, if any.
    /// Drafts, scheduled and archived notices are only visible to their author
    /// and admins; published ones follow the listing audience.
    pub async fn get_notice(&self, viewer: Option<&User>, notice_id: Uuid) -> PortResult<Notice> {
        let mut notice = readable_notice(self.db.as_ref(), viewer, notice_id).await?;
        if let Some(viewer) = viewer {
            self.tracker.record_view(&mut notice, viewer.id).await?;
        }
        Ok(notice)
    }

    pub async fn create_notice(&self, actor: &User, input: NewNotice) -> PortResult<Notice> {
        if !matches!(actor.role, Role::Admin | Role::Faculty) {
            return Err(PortError::Forbidden(
                "Only faculty and admins can create notices".to_string(),
            ));
        }
        if input.title.trim().is_empty() || input.content.trim().is_empty() {
            return Err(PortError::Validation("Title and content are required".to_string()));
        }
        if input.department.trim().is_empty() {
            return Err(PortError::Validation("Department is required".to_string()));
        }

        let notice = self.db.create_notice(actor.id, input).await?;
        info!(notice_id = %notice.id, author_id = %actor.id, status = %notice.status, "Notice created");

        if notice.is_published() {
            self.recorder.on_notice_published(&notice).await;
            self.broadcaster.notice_created(&notice);
        } else {
            self.broadcaster.notice_updated(&notice);
        }
        Ok(notice)
    }

    /// Applies `changes`. Moving a notice into `published` notifies its audience.
    pub async fn update_notice(
        &self,
        actor: &User,
        notice_id: Uuid,
        changes: NoticeChanges,
    ) -> PortResult<Notice> {
        let mut notice = self.db.get_notice_by_id(notice_id).await?;
        require_owner_or_admin(actor, notice.author_id, "notice")?;

        let was_published = notice.is_published();
        changes.apply_to(&mut notice, Utc::now());
        if notice.title.trim().is_empty() || notice.content.trim().is_empty() {
            return Err(PortError::Validation("Title and content are required".to_string()));
        }
        self.db.update_notice(&notice).await?;
        info!(notice_id = %notice.id, actor_id = %actor.id, "Notice updated");

        if !was_published && notice.is_published() {
            self.recorder.on_notice_published(&notice).await;
        }
        self.broadcaster.notice_updated(&notice);
        Ok(notice)
    }

    pub async fn delete_notice(&self, actor: &User, notice_id: Uuid) -> PortResult<()> {
        let notice = self.db.get_notice_by_id(notice_id).await?;
        require_owner_or_admin(actor, notice.author_id, "notice")?;

        self.db.delete_notice(notice_id).await?;
        info!(notice_id = %notice_id, actor_id = %actor.id, "Notice deleted");
        self.broadcaster.notice_deleted(notice_id);
        Ok(())
    }

    /// Records the actor's acknowledgment and returns the acknowledgment count.
    pub async fn acknowledge(&self, actor: &User, notice_id: Uuid) -> PortResult<usize> {
        let mut notice = readable_notice(self.db.as_ref(), Some(actor), notice_id).await?;
        if notice.is_archived {
            return Err(PortError::NotFound(format!("Notice {notice_id} not found")));
        }
        self.tracker.record_acknowledgment(&mut notice, actor.id).await
    }
}

//=========================================================================================
// Comments
//=========================================================================================

#[derive(Clone)]
pub struct CommentService {
    db: Arc<dyn DatabaseService>,
    threads: CommentThreadManager,
    recorder: NotificationRecorder,
    broadcaster: Broadcaster,
}

impl CommentService {
    pub fn new(db: Arc<dyn DatabaseService>, realtime: Arc<dyn RealtimeService>) -> Self {
        Self {
            threads: CommentThreadManager::new(db.clone()),
            recorder: NotificationRecorder::new(db.clone()),
            broadcaster: Broadcaster::new(realtime),
            db,
        }
    }

    pub async fn list_for_notice(
        &self,
        viewer: Option<&User>,
        notice_id: Uuid,
    ) -> PortResult<Vec<CommentThread>> {
        readable_notice(self.db.as_ref(), viewer, notice_id).await?;
        self.threads.threads_for_notice(notice_id).await
    }

    pub async fn create_comment(
        &self,
        actor: &User,
        notice_id: Uuid,
        content: &str,
        parent_comment_id: Option<Uuid>,
    ) -> PortResult<Comment> {
        let notice = readable_notice(self.db.as_ref(), Some(actor), notice_id).await?;
        let (comment, parent) = self
            .threads
            .create_comment(&notice, actor, content, parent_comment_id)
            .await?;

        self.recorder
            .on_comment_created(&comment, &notice, parent.map(|p| p.author_id))
            .await;
        let target = (notice.author_id != actor.id).then_some(notice.author_id);
        self.broadcaster.comment_created(&comment, &notice, target);
        Ok(comment)
    }

    pub async fn edit_comment(
        &self,
        actor: &User,
        comment_id: Uuid,
        content: &str,
    ) -> PortResult<Comment> {
        let mut comment = self.db.get_comment_by_id(comment_id).await?;
        self.threads.edit_comment(&mut comment, actor, content).await?;
        self.broadcaster.comment_edited(&comment);
        Ok(comment)
    }

    pub async fn delete_comment(&self, actor: &User, comment_id: Uuid) -> PortResult<()> {
        let comment = self.db.get_comment_by_id(comment_id).await?;
        require_owner_or_admin(actor, comment.author_id, "comment")?;

        let removed = self.threads.delete_comment(&comment).await?;
        info!(comment_id = %comment_id, removed, "Comment deleted");
        self.broadcaster.comment_deleted(comment_id);
        Ok(())
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<dyn DatabaseService>,
}

impl NotificationService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// One page of the user's notifications plus their overall unread count.
    pub async fn list(
        &self,
        user: &User,
        unread_only: bool,
        page: Page,
    ) -> PortResult<(Paged<Notification>, u64)> {
        let notifications = self.db.list_notifications(user.id, unread_only, page).await?;
        let unread = self.db.count_unread_notifications(user.id).await?;
        Ok((notifications, unread))
    }

    pub async fn unread_count(&self, user: &User) -> PortResult<u64> {
        self.db.count_unread_notifications(user.id).await
    }

    pub async fn mark_read(&self, user: &User, notification_id: Uuid) -> PortResult<Notification> {
        self.owned(user, notification_id).await?;
        self.db.mark_notification_read(notification_id, Utc::now()).await
    }

    pub async fn mark_all_read(&self, user: &User) -> PortResult<u64> {
        self.db.mark_all_notifications_read(user.id, Utc::now()).await
    }

    pub async fn delete(&self, user: &User, notification_id: Uuid) -> PortResult<()> {
        self.owned(user, notification_id).await?;
        self.db.delete_notification(notification_id).await
    }

    // Someone else's notification is reported as missing.
    async fn owned(&self, user: &User, notification_id: Uuid) -> PortResult<Notification> {
        let notification = self.db.get_notification_by_id(notification_id).await?;
        if notification.recipient_id != user.id {
            return Err(PortError::NotFound(format!(
                "Notification {notification_id} not found"
            )));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RealtimeEvent;
    use crate::domain::{NoticeStatus, NotificationType, ALL_DEPARTMENTS};
    use crate::memory::InMemoryDatabase;
    use crate::testing::{create_user, notice_input, RecordingRealtime};

    struct Board {
        db: Arc<InMemoryDatabase>,
        realtime: Arc<RecordingRealtime>,
        notices: NoticeService,
        comments: CommentService,
        notifications: NotificationService,
    }

    fn board() -> Board {
        let db = Arc::new(InMemoryDatabase::new());
        let realtime = Arc::new(RecordingRealtime::new());
        Board {
            notices: NoticeService::new(db.clone(), realtime.clone()),
            comments: CommentService::new(db.clone(), realtime.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
            realtime,
        }
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", Some("3rd Year")).await;

        let notice = b
            .notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();

        // View twice: still one view entry.
        b.notices.get_notice(Some(&student), notice.id).await.unwrap();
        let viewed = b.notices.get_notice(Some(&student), notice.id).await.unwrap();
        assert_eq!(viewed.views.len(), 1);

        // Acknowledge twice: count stays one.
        assert_eq!(b.notices.acknowledge(&student, notice.id).await.unwrap(), 1);
        assert_eq!(b.notices.acknowledge(&student, notice.id).await.unwrap(), 1);
        assert_eq!(b.db.get_notice_by_id(notice.id).await.unwrap().acknowledged.len(), 1);

        // The student's comment notifies the faculty author once.
        b.comments
            .create_comment(&student, notice.id, "When is the lab?", None)
            .await
            .unwrap();
        let (faculty_inbox, unread) = b
            .notifications
            .list(&faculty, false, Page::default())
            .await
            .unwrap();
        assert_eq!(faculty_inbox.total, 1);
        assert_eq!(unread, 1);
        assert_eq!(faculty_inbox.items[0].kind, NotificationType::Comment);

        // The faculty's own top-level comment notifies nobody new.
        let before = b.db.all_notifications().await.len();
        b.comments
            .create_comment(&faculty, notice.id, "At 9am", None)
            .await
            .unwrap();
        assert_eq!(b.db.all_notifications().await.len(), before);

        let (student_inbox, _) = b
            .notifications
            .list(&student, false, Page::default())
            .await
            .unwrap();
        assert!(student_inbox
            .items
            .iter()
            .all(|n| n.kind == NotificationType::NewNotice));
    }

    #[tokio::test]
    async fn students_cannot_create_notices() {
        let b = board();
        let student = create_user(&b.db, Role::Student, "CSE", None).await;
        let err = b
            .notices
            .create_notice(&student, notice_input("CSE"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));
        assert!(b.realtime.events().is_empty());
    }

    #[tokio::test]
    async fn publishing_broadcasts_and_notifies() {
        let b = board();
        let admin = create_user(&b.db, Role::Admin, "Office", None).await;
        create_user(&b.db, Role::Student, "CSE", None).await;
        create_user(&b.db, Role::Student, "ECE", None).await;

        b.notices
            .create_notice(&admin, notice_input(ALL_DEPARTMENTS))
            .await
            .unwrap();

        assert_eq!(b.db.all_notifications().await.len(), 2);
        assert_eq!(b.realtime.names(), vec!["notice-update", "new-notice"]);
    }

    #[tokio::test]
    async fn draft_then_publish_notifies_on_transition() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        create_user(&b.db, Role::Student, "CSE", None).await;

        let mut input = notice_input("CSE");
        input.status = NoticeStatus::Draft;
        let draft = b.notices.create_notice(&faculty, input).await.unwrap();
        assert!(b.db.all_notifications().await.is_empty());
        assert_eq!(b.realtime.names(), vec!["notice-update"]);

        let published = b
            .notices
            .update_notice(
                &faculty,
                draft.id,
                NoticeChanges {
                    status: Some(NoticeStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(published.is_published());
        assert_eq!(b.db.all_notifications().await.len(), 1);

        // A second edit of an already published notice does not re-notify.
        b.notices
            .update_notice(
                &faculty,
                draft.id,
                NoticeChanges {
                    is_pinned: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(b.db.all_notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn only_author_or_admin_may_update_or_delete() {
        let b = board();
        let author = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let colleague = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let admin = create_user(&b.db, Role::Admin, "Office", None).await;
        let notice = b
            .notices
            .create_notice(&author, notice_input("CSE"))
            .await
            .unwrap();

        let denied = b
            .notices
            .update_notice(&colleague, notice.id, NoticeChanges::default())
            .await;
        assert!(matches!(denied, Err(PortError::Forbidden(_))));
        let denied = b.notices.delete_notice(&colleague, notice.id).await;
        assert!(matches!(denied, Err(PortError::Forbidden(_))));

        b.notices.delete_notice(&admin, notice.id).await.unwrap();
        assert!(matches!(
            b.notices.get_notice(None, notice.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_notice_cascades() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", None).await;
        let notice = b
            .notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();
        b.comments
            .create_comment(&student, notice.id, "Hi", None)
            .await
            .unwrap();
        assert!(!b.db.all_notifications().await.is_empty());

        b.notices.delete_notice(&faculty, notice.id).await.unwrap();
        assert_eq!(b.db.comment_count().await, 0);
        assert!(b.db.all_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn comment_broadcast_targets_notice_author() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", None).await;
        let notice = b
            .notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();
        let already = b.realtime.events().len();

        b.comments
            .create_comment(&student, notice.id, "Hello", None)
            .await
            .unwrap();

        let events = &b.realtime.events()[already..];
        let targeted: Vec<_> = events.iter().filter(|(t, _)| t.is_some()).collect();
        assert_eq!(targeted.len(), 1);
        assert_eq!(targeted[0].0, Some(faculty.id));
        assert!(matches!(targeted[0].1, RealtimeEvent::NewComment(Some(_))));
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_the_comment() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", None).await;
        let notice = b
            .notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();
        b.db.fail_notifications_for(faculty.id);

        let comment = b
            .comments
            .create_comment(&student, notice.id, "Still posted", None)
            .await
            .unwrap();
        assert!(b.db.get_comment_by_id(comment.id).await.is_ok());
    }

    #[tokio::test]
    async fn comment_edit_and_delete_permissions() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", None).await;
        let other = create_user(&b.db, Role::Student, "CSE", None).await;
        let admin = create_user(&b.db, Role::Admin, "Office", None).await;
        let notice = b
            .notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();
        let comment = b
            .comments
            .create_comment(&student, notice.id, "Mine", None)
            .await
            .unwrap();

        let denied = b.comments.edit_comment(&other, comment.id, "Not mine").await;
        assert!(matches!(denied, Err(PortError::Forbidden(_))));
        let denied = b.comments.delete_comment(&other, comment.id).await;
        assert!(matches!(denied, Err(PortError::Forbidden(_))));

        let edited = b
            .comments
            .edit_comment(&student, comment.id, "Mine, edited")
            .await
            .unwrap();
        assert!(edited.is_edited);

        b.comments.delete_comment(&admin, comment.id).await.unwrap();
        assert!(b.realtime.names().ends_with(&["comment-edited", "comment-deleted"]));
    }

    #[tokio::test]
    async fn notifications_are_private_to_their_recipient() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let s1 = create_user(&b.db, Role::Student, "CSE", None).await;
        let s2 = create_user(&b.db, Role::Student, "CSE", None).await;
        b.notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();
        b.notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();

        let (inbox, unread) = b.notifications.list(&s1, false, Page::default()).await.unwrap();
        assert_eq!((inbox.total, unread), (2, 2));
        let first = inbox.items[0].id;

        let foreign = b.notifications.mark_read(&s2, first).await;
        assert!(matches!(foreign, Err(PortError::NotFound(_))));
        let foreign = b.notifications.delete(&s2, first).await;
        assert!(matches!(foreign, Err(PortError::NotFound(_))));

        let read = b.notifications.mark_read(&s1, first).await.unwrap();
        assert!(read.is_read && read.read_at.is_some());
        let (unread_only, _) = b.notifications.list(&s1, true, Page::default()).await.unwrap();
        assert_eq!(unread_only.total, 1);

        assert_eq!(b.notifications.mark_all_read(&s1).await.unwrap(), 1);
        assert_eq!(b.notifications.unread_count(&s1).await.unwrap(), 0);

        b.notifications.delete(&s1, first).await.unwrap();
        assert_eq!(b.notifications.unread_count(&s2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn listing_respects_visibility() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", Some("3rd Year")).await;

        let mut third = notice_input("CSE");
        third.target_year = Some("3rd Year".into());
        let mut second = notice_input("CSE");
        second.target_year = Some("2nd Year".into());
        let visible = b.notices.create_notice(&faculty, third).await.unwrap();
        b.notices.create_notice(&faculty, second).await.unwrap();
        b.notices
            .create_notice(&faculty, notice_input("ECE"))
            .await
            .unwrap();

        let page = b
            .notices
            .list_notices(Some(&student), &NoticeQuery::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, visible.id);

        let everything = b
            .notices
            .list_notices(None, &NoticeQuery::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(everything.total, 3);
    }

    #[tokio::test]
    async fn direct_reads_apply_the_audience_filter() {
        let b = board();
        let ece_faculty = create_user(&b.db, Role::Faculty, "ECE", None).await;
        let cse_student = create_user(&b.db, Role::Student, "CSE", Some("3rd Year")).await;

        let mut input = notice_input("ECE");
        input.target_year = Some("2nd Year".into());
        input.status = NoticeStatus::Draft;
        let draft = b.notices.create_notice(&ece_faculty, input).await.unwrap();

        for viewer in [Some(&cse_student), None] {
            assert!(matches!(
                b.notices.get_notice(viewer, draft.id).await,
                Err(PortError::NotFound(_))
            ));
            assert!(matches!(
                b.comments.list_for_notice(viewer, draft.id).await,
                Err(PortError::NotFound(_))
            ));
        }
        assert!(matches!(
            b.notices.acknowledge(&cse_student, draft.id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            b.comments
                .create_comment(&cse_student, draft.id, "Peeking", None)
                .await,
            Err(PortError::NotFound(_))
        ));

        let stored = b.db.get_notice_by_id(draft.id).await.unwrap();
        assert!(stored.views.is_empty() && stored.acknowledged.is_empty());
        assert!(b.notices.get_notice(Some(&ece_faculty), draft.id).await.is_ok());
    }

    #[tokio::test]
    async fn archived_notice_is_hidden_from_others() {
        let b = board();
        let faculty = create_user(&b.db, Role::Faculty, "CSE", None).await;
        let student = create_user(&b.db, Role::Student, "CSE", None).await;
        let notice = b
            .notices
            .create_notice(&faculty, notice_input("CSE"))
            .await
            .unwrap();
        b.notices
            .update_notice(
                &faculty,
                notice.id,
                NoticeChanges {
                    is_archived: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(b.notices.get_notice(Some(&faculty), notice.id).await.is_ok());
        assert!(matches!(
            b.notices.get_notice(Some(&student), notice.id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            b.notices.acknowledge(&student, notice.id).await,
            Err(PortError::NotFound(_))
        ));
    }
}
