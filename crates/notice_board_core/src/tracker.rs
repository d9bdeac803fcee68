//! crates/notice_board_core/src/tracker.rs
//!
//! At-most-once view and acknowledgment facts per (notice, user) pair.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Notice, NoticeAcknowledgment, NoticeView};
use crate::ports::{DatabaseService, PortResult};

/// Adds a view entry unless the user already has one. The first view's
/// timestamp is kept. Returns whether an entry was added.
pub fn record_view(notice: &mut Notice, user_id: Uuid, at: DateTime<Utc>) -> bool {
    if notice.has_viewed(user_id) {
        return false;
    }
    notice.views.push(NoticeView {
        user_id,
        viewed_at: at,
    });
    true
}

/// Adds an acknowledgment unless the user already gave one, and returns the
/// number of distinct users who have acknowledged.
pub fn record_acknowledgment(notice: &mut Notice, user_id: Uuid, at: DateTime<Utc>) -> usize {
    if !notice.has_acknowledged(user_id) {
        notice.acknowledged.push(NoticeAcknowledgment {
            user_id,
            acknowledged_at: at,
        });
    }
    notice.acknowledged.len()
}

/// Persists views and acknowledgments. The membership check against the
/// loaded notice is best-effort; the store's per-pair uniqueness is what
/// guarantees at-most-once.
#[derive(Clone)]
pub struct EngagementTracker {
    db: Arc<dyn DatabaseService>,
}

impl EngagementTracker {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn record_view(&self, notice: &mut Notice, user_id: Uuid) -> PortResult<bool> {
        if notice.has_viewed(user_id) {
            return Ok(false);
        }
        let now = Utc::now();
        let inserted = self.db.add_notice_view(notice.id, user_id, now).await?;
        if inserted {
            record_view(notice, user_id, now);
        }
        Ok(inserted)
    }

    pub async fn record_acknowledgment(
        &self,
        notice: &mut Notice,
        user_id: Uuid,
    ) -> PortResult<usize> {
        if notice.has_acknowledged(user_id) {
            return Ok(notice.acknowledged.len());
        }
        let now = Utc::now();
        if self
            .db
            .add_notice_acknowledgment(notice.id, user_id, now)
            .await?
        {
            return Ok(record_acknowledgment(notice, user_id, now));
        }
        // Someone raced us; the store already holds the entry.
        Ok(self.db.get_notice_by_id(notice.id).await?.acknowledged.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDatabase;
    use crate::testing::{create_user, notice_input};
    use crate::domain::Role;
    use chrono::Duration;

    async fn seeded() -> (Arc<InMemoryDatabase>, Notice, Uuid) {
        let db = Arc::new(InMemoryDatabase::new());
        let author = create_user(&db, Role::Faculty, "CSE", None).await;
        let student = create_user(&db, Role::Student, "CSE", Some("3rd Year")).await;
        let notice = db
            .create_notice(author.id, notice_input("CSE"))
            .await
            .unwrap();
        (db, notice, student.id)
    }

    #[test]
    fn second_view_keeps_first_timestamp() {
        let (first, later) = (Utc::now(), Utc::now() + Duration::minutes(5));
        let mut notice = crate::testing::sample_notice();
        let user = Uuid::new_v4();

        assert!(record_view(&mut notice, user, first));
        assert!(!record_view(&mut notice, user, later));
        assert_eq!(notice.views.len(), 1);
        assert_eq!(notice.views[0].viewed_at, first);
    }

    #[test]
    fn acknowledgment_count_is_distinct_users() {
        let mut notice = crate::testing::sample_notice();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(record_acknowledgment(&mut notice, a, Utc::now()), 1);
        assert_eq!(record_acknowledgment(&mut notice, a, Utc::now()), 1);
        assert_eq!(record_acknowledgment(&mut notice, b, Utc::now()), 2);
    }

    #[tokio::test]
    async fn persisted_view_is_recorded_once() {
        let (db, mut notice, student) = seeded().await;
        let tracker = EngagementTracker::new(db.clone());

        assert!(tracker.record_view(&mut notice, student).await.unwrap());
        let first = db.get_notice_by_id(notice.id).await.unwrap().views[0].viewed_at;

        // A fresh load, as a second request would do.
        let mut reloaded = db.get_notice_by_id(notice.id).await.unwrap();
        assert!(!tracker.record_view(&mut reloaded, student).await.unwrap());

        let stored = db.get_notice_by_id(notice.id).await.unwrap();
        assert_eq!(stored.views.len(), 1);
        assert_eq!(stored.views[0].viewed_at, first);
    }

    #[tokio::test]
    async fn stale_copy_still_reports_true_count() {
        let (db, notice, student) = seeded().await;
        let tracker = EngagementTracker::new(db.clone());

        let mut first_copy = notice.clone();
        let mut stale_copy = notice;
        assert_eq!(tracker.record_acknowledgment(&mut first_copy, student).await.unwrap(), 1);
        assert_eq!(tracker.record_acknowledgment(&mut stale_copy, student).await.unwrap(), 1);
        assert_eq!(db.get_notice_by_id(first_copy.id).await.unwrap().acknowledged.len(), 1);
    }
}
