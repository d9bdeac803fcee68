//! crates/notice_board_core/src/threads.rs
//!
//! Comment threads. The parent reference on each reply is the only stored
//! link; a comment's replies are always looked up by parent id.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Comment, CommentThread, Notice, User};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Clone)]
pub struct CommentThreadManager {
    db: Arc<dyn DatabaseService>,
}

impl CommentThreadManager {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Creates a comment, returning it together with its parent when it is a reply.
    ///
    /// Rejected before any write when the content is blank, the parent does not
    /// exist, belongs to another notice, or is itself a reply.
    pub async fn create_comment(
        &self,
        notice: &Notice,
        author: &User,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> PortResult<(Comment, Option<Comment>)> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PortError::Validation("Comment content is required".to_string()));
        }

        let parent = match parent_id {
            Some(parent_id) => Some(self.resolve_parent(notice, parent_id).await?),
            None => None,
        };

        let comment = self
            .db
            .create_comment(notice.id, author.id, content, parent_id)
            .await?;
        info!(comment_id = %comment.id, notice_id = %notice.id, reply = comment.is_reply(), "Comment created");
        Ok((comment, parent))
    }

    async fn resolve_parent(&self, notice: &Notice, parent_id: Uuid) -> PortResult<Comment> {
        let parent = match self.db.get_comment_by_id(parent_id).await {
            Ok(parent) => parent,
            Err(PortError::NotFound(_)) => {
                return Err(PortError::Validation(format!(
                    "Parent comment {parent_id} does not exist"
                )))
            }
            Err(e) => return Err(e),
        };
        if parent.notice_id != notice.id {
            return Err(PortError::Validation(
                "Parent comment belongs to a different notice".to_string(),
            ));
        }
        if parent.is_reply() {
            return Err(PortError::Validation(
                "Replies can only be made to top-level comments".to_string(),
            ));
        }
        Ok(parent)
    }

    /// Changes the content of a comment and marks it edited.
    pub async fn edit_comment(
        &self,
        comment: &mut Comment,
        actor: &User,
        content: &str,
    ) -> PortResult<()> {
        if comment.author_id != actor.id && !actor.is_admin() {
            return Err(PortError::Forbidden(
                "Only the author can edit this comment".to_string(),
            ));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(PortError::Validation("Comment content is required".to_string()));
        }
        comment.content = content.to_string();
        comment.is_edited = true;
        comment.edited_at = Some(Utc::now());
        self.db.update_comment(comment).await
    }

    /// Deletes a comment. A top-level comment takes its replies with it.
    /// Returns how many comments were removed.
    pub async fn delete_comment(&self, comment: &Comment) -> PortResult<u64> {
        let replies = if comment.is_reply() {
            0
        } else {
            self.db.delete_replies(comment.id).await?
        };
        self.db.delete_comment(comment.id).await?;
        Ok(replies + 1)
    }

    pub async fn replies(&self, parent_id: Uuid) -> PortResult<Vec<Comment>> {
        self.db.list_replies(parent_id).await
    }

    /// Top-level comments of a notice, newest first, each with its replies oldest first.
    pub async fn threads_for_notice(&self, notice_id: Uuid) -> PortResult<Vec<CommentThread>> {
        let comments = self.db.list_comments_for_notice(notice_id).await?;
        Ok(assemble_threads(comments))
    }
}

/// Groups a flat, oldest-first comment list into threads via a parent-id index.
pub fn assemble_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let (top_level, replies): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(|c| !c.is_reply());

    let mut by_parent: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent_comment_id {
            by_parent.entry(parent).or_default().push(reply);
        }
    }

    top_level
        .into_iter()
        .rev()
        .map(|comment| CommentThread {
            replies: by_parent.remove(&comment.id).unwrap_or_default(),
            comment,
        })
        .collect()
}
