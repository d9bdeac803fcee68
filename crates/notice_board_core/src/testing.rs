//! Fixtures shared by the unit tests of this crate.

use chrono::Utc;
use uuid::Uuid;

use crate::broadcast::RealtimeEvent;

use crate::domain::{
    NewNotice, NewUser, Notice, NoticeCategory, NoticePriority, NoticeStatus, Role, User,
};
use crate::memory::InMemoryDatabase;
use crate::ports::{DatabaseService, RealtimeService};

pub fn sample_notice() -> Notice {
    let now = Utc::now();
    Notice {
        id: Uuid::new_v4(),
        title: "Library hours".into(),
        content: "The library closes at 8pm this week".into(),
        category: NoticeCategory::Circulars,
        department: "CSE".into(),
        target_year: None,
        author_id: Uuid::new_v4(),
        priority: NoticePriority::Medium,
        status: NoticeStatus::Published,
        scheduled_date: None,
        attachments: vec![],
        views: vec![],
        acknowledged: vec![],
        is_pinned: false,
        is_archived: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn notice_input(department: &str) -> NewNotice {
    NewNotice {
        title: "Lab timings".into(),
        content: "Labs open at 9".into(),
        category: NoticeCategory::Academic,
        department: department.into(),
        target_year: None,
        priority: NoticePriority::Medium,
        status: NoticeStatus::Published,
        scheduled_date: None,
        attachments: vec![],
    }
}

pub async fn create_user(
    db: &InMemoryDatabase,
    role: Role,
    department: &str,
    year: Option<&str>,
) -> User {
    let id = Uuid::new_v4();
    db.create_user(
        &NewUser {
            name: format!("{role} {id}"),
            email: format!("{id}@example.edu"),
            role,
            department: department.into(),
            year: year.map(Into::into),
        },
        "not-a-real-hash",
    )
    .await
    .expect("user fixture")
}

/// Records emitted events instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingRealtime {
    events: std::sync::Mutex<Vec<(Option<Uuid>, RealtimeEvent)>>,
}

impl RecordingRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far, paired with its target user (`None` for global).
    pub fn events(&self) -> Vec<(Option<Uuid>, RealtimeEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|(_, e)| e.name()).collect()
    }

    fn push(&self, target: Option<Uuid>, event: &RealtimeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((target, event.clone()));
        }
    }
}

impl RealtimeService for RecordingRealtime {
    fn broadcast(&self, event: &RealtimeEvent) {
        self.push(None, event);
    }

    fn send_to_user(&self, user_id: Uuid, event: &RealtimeEvent) {
        self.push(Some(user_id), event);
    }
}
