//! crates/notice_board_core/src/notifier.rs
//!
//! Durable fan-out: decides who should hear about a change and writes one
//! notification per recipient. Every write is best-effort; failures are logged
//! and skipped so the request that triggered them still succeeds.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Comment, NewNotification, Notice, Notification, NotificationType};
use crate::ports::DatabaseService;

#[derive(Clone)]
pub struct NotificationRecorder {
    db: Arc<dyn DatabaseService>,
}

impl NotificationRecorder {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Notifies the students in the notice's audience. Only published notices
    /// notify; faculty and admins are never targeted.
    pub async fn on_notice_published(&self, notice: &Notice) -> Vec<Notification> {
        if !notice.is_published() {
            debug!(notice_id = %notice.id, status = %notice.status, "Notice not published; no notifications");
            return Vec::new();
        }

        let department = (!notice.targets_all_departments()).then_some(notice.department.as_str());
        let students = match self.db.list_active_students(department).await {
            Ok(students) => students,
            Err(e) => {
                warn!(notice_id = %notice.id, error = %e, "Failed to resolve notice audience");
                return Vec::new();
            }
        };

        let mut written = Vec::with_capacity(students.len());
        for student in students {
            let notification = NewNotification {
                recipient_id: student.id,
                kind: NotificationType::NewNotice,
                title: format!("New Notice: {}", notice.title),
                message: format!("A new {} notice has been published", notice.category),
                related_notice_id: Some(notice.id),
                related_comment_id: None,
            };
            if let Some(n) = self.write(notification).await {
                written.push(n);
            }
        }
        debug!(notice_id = %notice.id, count = written.len(), "Recorded new-notice notifications");
        written
    }

    /// Notifies the notice author and, for replies, the parent comment's author.
    /// The two are independent: when they are the same person they get two records.
    pub async fn on_comment_created(
        &self,
        comment: &Comment,
        notice: &Notice,
        parent_author: Option<Uuid>,
    ) -> Vec<Notification> {
        let commenter = self.commenter_name(comment.author_id).await;
        let mut written = Vec::new();

        if notice.author_id != comment.author_id {
            let notification = NewNotification {
                recipient_id: notice.author_id,
                kind: NotificationType::Comment,
                title: "New comment on your notice".to_string(),
                message: format!("{commenter} commented on \"{}\"", notice.title),
                related_notice_id: Some(notice.id),
                related_comment_id: Some(comment.id),
            };
            written.extend(self.write(notification).await);
        }

        if let Some(parent_author) = parent_author.filter(|a| *a != comment.author_id) {
            let notification = NewNotification {
                recipient_id: parent_author,
                kind: NotificationType::Comment,
                title: "New reply to your comment".to_string(),
                message: format!("{commenter} replied to your comment on \"{}\"", notice.title),
                related_notice_id: Some(notice.id),
                related_comment_id: Some(comment.id),
            };
            written.extend(self.write(notification).await);
        }

        written
    }

    async fn write(&self, notification: NewNotification) -> Option<Notification> {
        let recipient = notification.recipient_id;
        match self.db.create_notification(notification).await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(recipient_id = %recipient, error = %e, "Failed to record notification");
                None
            }
        }
    }

    async fn commenter_name(&self, user_id: Uuid) -> String {
        match self.db.get_user_by_id(user_id).await {
            Ok(user) => user.name,
            Err(_) => "Someone".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NoticeStatus, Role, ALL_DEPARTMENTS};
    use crate::memory::InMemoryDatabase;
    use crate::testing::{create_user, notice_input};

    #[tokio::test]
    async fn all_departments_notifies_every_active_student_only() {
        let db = Arc::new(InMemoryDatabase::new());
        let faculty = create_user(&db, Role::Faculty, "CSE", None).await;
        create_user(&db, Role::Admin, "Office", None).await;
        let s1 = create_user(&db, Role::Student, "CSE", Some("1st Year")).await;
        let s2 = create_user(&db, Role::Student, "ECE", Some("2nd Year")).await;
        let inactive = create_user(&db, Role::Student, "ECE", None).await;
        assert!(db.deactivate_user(inactive.id).await);

        let notice = db
            .create_notice(faculty.id, notice_input(ALL_DEPARTMENTS))
            .await
            .unwrap();
        let written = NotificationRecorder::new(db.clone())
            .on_notice_published(&notice)
            .await;

        let mut recipients: Vec<_> = written.iter().map(|n| n.recipient_id).collect();
        recipients.sort();
        let mut expected = vec![s1.id, s2.id];
        expected.sort();
        assert_eq!(recipients, expected);
        assert!(written.iter().all(|n| n.kind == NotificationType::NewNotice));
        assert!(written.iter().all(|n| n.related_notice_id == Some(notice.id)));
    }

    #[tokio::test]
    async fn department_notice_notifies_only_that_department() {
        let db = Arc::new(InMemoryDatabase::new());
        let faculty = create_user(&db, Role::Faculty, "ECE", None).await;
        let ece = create_user(&db, Role::Student, "ECE", None).await;
        create_user(&db, Role::Student, "CSE", None).await;

        let notice = db.create_notice(faculty.id, notice_input("ECE")).await.unwrap();
        let written = NotificationRecorder::new(db.clone())
            .on_notice_published(&notice)
            .await;

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].recipient_id, ece.id);
    }

    #[tokio::test]
    async fn drafts_and_scheduled_notices_notify_nobody() {
        let db = Arc::new(InMemoryDatabase::new());
        let faculty = create_user(&db, Role::Faculty, "CSE", None).await;
        create_user(&db, Role::Student, "CSE", None).await;
        let recorder = NotificationRecorder::new(db.clone());

        for status in [NoticeStatus::Draft, NoticeStatus::Scheduled] {
            let mut input = notice_input("CSE");
            input.status = status;
            let notice = db.create_notice(faculty.id, input).await.unwrap();
            assert!(recorder.on_notice_published(&notice).await.is_empty());
        }
        assert!(db.all_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn one_failed_write_does_not_stop_the_rest() {
        let db = Arc::new(InMemoryDatabase::new());
        let faculty = create_user(&db, Role::Faculty, "CSE", None).await;
        let broken = create_user(&db, Role::Student, "CSE", None).await;
        let fine = create_user(&db, Role::Student, "CSE", None).await;
        db.fail_notifications_for(broken.id);

        let notice = db.create_notice(faculty.id, notice_input("CSE")).await.unwrap();
        let written = NotificationRecorder::new(db.clone())
            .on_notice_published(&notice)
            .await;

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].recipient_id, fine.id);
    }

    #[tokio::test]
    async fn reply_to_notice_author_yields_two_records() {
        let db = Arc::new(InMemoryDatabase::new());
        let faculty = create_user(&db, Role::Faculty, "CSE", None).await;
        let student = create_user(&db, Role::Student, "CSE", None).await;
        let notice = db.create_notice(faculty.id, notice_input("CSE")).await.unwrap();
        let top = db
            .create_comment(notice.id, faculty.id, "Any questions?", None)
            .await
            .unwrap();
        let reply = db
            .create_comment(notice.id, student.id, "Yes, one", Some(top.id))
            .await
            .unwrap();

        let written = NotificationRecorder::new(db.clone())
            .on_comment_created(&reply, &notice, Some(faculty.id))
            .await;

        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|n| n.recipient_id == faculty.id));
        assert!(written[0].message.starts_with(&student.name));
    }

    #[tokio::test]
    async fn own_comment_notifies_nobody() {
        let db = Arc::new(InMemoryDatabase::new());
        let faculty = create_user(&db, Role::Faculty, "CSE", None).await;
        let notice = db.create_notice(faculty.id, notice_input("CSE")).await.unwrap();
        let comment = db
            .create_comment(notice.id, faculty.id, "Reminder", None)
            .await
            .unwrap();

        let written = NotificationRecorder::new(db.clone())
            .on_comment_created(&comment, &notice, None)
            .await;
        assert!(written.is_empty());
    }
}
