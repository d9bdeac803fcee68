pub mod broadcast;
pub mod domain;
pub mod memory;
pub mod notifier;
pub mod ports;
pub mod services;
pub mod threads;
pub mod tracker;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use broadcast::{Broadcaster, RealtimeEvent};
pub use domain::{
    Comment, CommentThread, NewNotice, NewUser, Notice, NoticeCategory, NoticeChanges,
    NoticePriority, NoticeStatus, Notification, NotificationType, Page, Paged, Role, User,
    ALL_DEPARTMENTS,
};
pub use memory::InMemoryDatabase;
pub use ports::{DatabaseService, PortError, PortResult, RealtimeService};
pub use services::{CommentService, NoticeService, NotificationService};
pub use visibility::{can_read, visible_predicate, NoticeFilter, NoticeQuery};
