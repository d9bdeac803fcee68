//! crates/notice_board_core/src/broadcast.rs
//!
//! Real-time fan-out. `RealtimeEvent` is the wire protocol pushed to clients;
//! `Broadcaster` maps each state change onto the events clients expect and hands
//! them to whichever `RealtimeService` was injected at startup.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Notice};
use crate::ports::RealtimeService;

//=========================================================================================
// Wire Protocol
//=========================================================================================

/// An outbound event, serialized as `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// The notice list changed; clients re-fetch.
    NoticeUpdate,
    NewNotice(NewNoticePayload),
    /// The notification list changed; clients re-fetch.
    NotificationUpdate,
    /// Targeted when a payload is present, a bare thread-refresh signal otherwise.
    NewComment(Option<NewCommentPayload>),
    CommentEdited { comment: Comment },
    #[serde(rename_all = "camelCase")]
    CommentDeleted { comment_id: Uuid },
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoticeUpdate => "notice-update",
            Self::NewNotice(_) => "new-notice",
            Self::NotificationUpdate => "notification-update",
            Self::NewComment(_) => "new-comment",
            Self::CommentEdited { .. } => "comment-edited",
            Self::CommentDeleted { .. } => "comment-deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNoticePayload {
    pub notice: Notice,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCommentPayload {
    pub comment: Comment,
    pub notice: Notice,
    pub message: String,
}

//=========================================================================================
// Broadcaster
//=========================================================================================

/// Emits the events for each kind of state change. Every method is
/// fire-and-forget.
#[derive(Clone)]
pub struct Broadcaster {
    realtime: Arc<dyn RealtimeService>,
}

impl Broadcaster {
    pub fn new(realtime: Arc<dyn RealtimeService>) -> Self {
        Self { realtime }
    }

    pub fn notice_created(&self, notice: &Notice) {
        self.realtime.broadcast(&RealtimeEvent::NoticeUpdate);
        self.realtime
            .broadcast(&RealtimeEvent::NewNotice(NewNoticePayload {
                notice: notice.clone(),
                message: new_notice_message(notice),
            }));
    }

    pub fn notice_updated(&self, _notice: &Notice) {
        self.realtime.broadcast(&RealtimeEvent::NoticeUpdate);
    }

    pub fn notice_deleted(&self, _notice_id: Uuid) {
        self.realtime.broadcast(&RealtimeEvent::NoticeUpdate);
    }

    /// `target` is the notice author when someone else commented.
    pub fn comment_created(&self, comment: &Comment, notice: &Notice, target: Option<Uuid>) {
        self.realtime.broadcast(&RealtimeEvent::NotificationUpdate);
        if let Some(user_id) = target {
            self.realtime.send_to_user(
                user_id,
                &RealtimeEvent::NewComment(Some(NewCommentPayload {
                    comment: comment.clone(),
                    notice: notice.clone(),
                    message: format!("New comment on your notice: {}", notice.title),
                })),
            );
        }
        self.realtime.broadcast(&RealtimeEvent::NewComment(None));
    }

    pub fn comment_edited(&self, comment: &Comment) {
        self.realtime.broadcast(&RealtimeEvent::CommentEdited {
            comment: comment.clone(),
        });
    }

    pub fn comment_deleted(&self, comment_id: Uuid) {
        self.realtime
            .broadcast(&RealtimeEvent::CommentDeleted { comment_id });
    }
}

/// Human-readable headline for a freshly published notice.
pub fn new_notice_message(notice: &Notice) -> String {
    format!("New {} notice: {}", notice.category, notice.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NoticeCategory, NoticePriority, NoticeStatus};
    use crate::testing::RecordingRealtime;
    use chrono::Utc;

    fn notice() -> Notice {
        let now = Utc::now();
        Notice {
            id: Uuid::new_v4(),
            title: "Sports day".into(),
            content: "Friday on the main ground".into(),
            category: NoticeCategory::Events,
            department: "All Departments".into(),
            target_year: None,
            author_id: Uuid::new_v4(),
            priority: NoticePriority::High,
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

    fn comment(notice: &Notice) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            notice_id: notice.id,
            author_id: Uuid::new_v4(),
            content: "Will there be a relay?".into(),
            parent_comment_id: None,
            is_edited: false,
            edited_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn notice_created_emits_list_signal_and_new_notice() {
        let sink = Arc::new(RecordingRealtime::new());
        let broadcaster = Broadcaster::new(sink.clone());
        let n = notice();

        broadcaster.notice_created(&n);

        assert_eq!(sink.names(), vec!["notice-update", "new-notice"]);
        match &sink.events()[1].1 {
            RealtimeEvent::NewNotice(payload) => {
                assert_eq!(payload.message, "New events notice: Sports day");
                assert_eq!(payload.notice.id, n.id);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn comment_created_targets_only_the_known_user() {
        let sink = Arc::new(RecordingRealtime::new());
        let broadcaster = Broadcaster::new(sink.clone());
        let n = notice();
        let c = comment(&n);

        broadcaster.comment_created(&c, &n, Some(n.author_id));
        let events = sink.events();
        assert_eq!(sink.names(), vec!["notification-update", "new-comment", "new-comment"]);
        assert_eq!(events[1].0, Some(n.author_id));
        assert!(matches!(events[1].1, RealtimeEvent::NewComment(Some(_))));
        assert_eq!(events[2], (None, RealtimeEvent::NewComment(None)));

        let sink = Arc::new(RecordingRealtime::new());
        Broadcaster::new(sink.clone()).comment_created(&c, &n, None);
        assert!(sink.events().iter().all(|(target, _)| target.is_none()));
    }

    #[test]
    fn events_serialize_with_name_and_data() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(RealtimeEvent::CommentDeleted { comment_id: id }).unwrap();
        assert_eq!(json["event"], "comment-deleted");
        assert_eq!(json["data"]["commentId"], id.to_string());

        let json = serde_json::to_value(RealtimeEvent::NoticeUpdate).unwrap();
        assert_eq!(json["event"], "notice-update");
    }
}
