//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::realtime::SocketHub;
use notice_board_core::ports::DatabaseService;
use notice_board_core::services::{CommentService, NoticeService, NotificationService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests and Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// Live socket connections and their per-user rooms.
    pub hub: Arc<SocketHub>,
    pub notices: NoticeService,
    pub comments: CommentService,
    pub notifications: NotificationService,
}

impl AppState {
    /// Wires the core services to the database and a fresh socket hub.
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        let hub = Arc::new(SocketHub::new(config.ws_buffer_size));
        Self {
            notices: NoticeService::new(db.clone(), hub.clone()),
            comments: CommentService::new(db.clone(), hub.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
            config,
            hub,
        }
    }
}
