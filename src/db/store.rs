use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::*;
use crate::models::*;

/// Result of a like/unlike write, with the comment's `like_count` after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeWrite {
  /// The like row was inserted or deleted and the counter moved with it.
  Applied(i64),
  /// Nothing to do: already liked, or not liked to begin with.
  Unchanged(i64),
}

impl LikeWrite {
  pub fn is_applied(&self) -> bool {
    matches!(self, LikeWrite::Applied(_))
  }

  pub fn like_count(&self) -> i64 {
    match *self {
      LikeWrite::Applied(count) | LikeWrite::Unchanged(count) => count,
    }
  }
}

impl From<LikeWrite> for LikeOutcome {
  fn from(write: LikeWrite) -> Self {
    LikeOutcome {
      changed: write.is_applied(),
      like_count: write.like_count(),
    }
  }
}

/// Persistence collaborator of the comment tree.
///
/// Every method is one atomic unit at the storage layer.  In particular
/// `insert_like`/`delete_like` must move the like row and the comment's
/// `like_count` together, with uniqueness enforced by the store itself.
#[async_trait(?Send)]
pub trait CommentStore {
  async fn find_article(&self, article_id: i32) -> Result<Option<Article>>;

  async fn find_comment(&self, comment_id: i32) -> Result<Option<Comment>>;

  /// Insert a comment.  Fails with `InvalidArgument` when `parent_id`
  /// doesn't name a comment of the same article.
  async fn insert_comment(&self, comment: &NewComment) -> Result<Comment>;

  async fn has_replies(&self, comment_id: i32) -> Result<bool>;

  /// Replace the body with the tombstone marker and flag the comment removed.
  async fn mark_comment_removed(&self, comment_id: i32) -> Result<()>;

  /// Delete a reply-less comment and its likes.  Returns `false` without
  /// touching anything if the comment has replies.
  async fn delete_comment(&self, comment_id: i32) -> Result<bool>;

  async fn insert_like(&self, user_id: i32, comment_id: i32) -> Result<LikeWrite>;

  async fn delete_like(&self, user_id: i32, comment_id: i32) -> Result<LikeWrite>;

  /// Root comments of an article sorted by `order`, strictly after `cursor`.
  async fn query_root_comments(&self,
    article_id: i32, order: ThreadOrder, cursor: Option<&PageCursor>, limit: usize,
  ) -> Result<Vec<Comment>>;

  /// Direct replies of each parent, oldest first, at most `per_parent` each.
  async fn query_replies(&self, parent_ids: &[i32], per_parent: usize)
    -> Result<HashMap<i32, Vec<Comment>>>;
}
