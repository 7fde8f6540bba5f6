use log::*;

use std::rc::Rc;

use crate::error::*;
use crate::models::*;
use crate::db::CommentStore;

use super::tree::ReplyForest;

pub const DEFAULT_MAX_REPLIES_PER_ROOT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreadSettings {
  /// Descendants returned per root before `replies_truncated` is set.
  pub max_replies_per_root: usize,
}

impl Default for ThreadSettings {
  fn default() -> Self {
    Self {
      max_replies_per_root: DEFAULT_MAX_REPLIES_PER_ROOT,
    }
  }
}

/// Creates, lists, deletes and likes comments of an article.
///
/// Holds no state of its own between calls: every read and write goes
/// through the injected store, so it is cheap to build one per request.
///
/// Cycles can't form because `parent_id` is fixed at creation and must
/// name a comment that already exists in the same article.
#[derive(Clone)]
pub struct CommentTreeManager {
  store: Rc<dyn CommentStore>,
  settings: ThreadSettings,
}

impl CommentTreeManager {
  pub fn new(store: Rc<dyn CommentStore>, settings: ThreadSettings) -> Self {
    Self { store, settings }
  }

  pub async fn create_comment(&self,
    article_id: i32, author_id: i32, content: &str, parent_id: Option<i32>,
  ) -> Result<Comment> {
    let body = content.trim();
    if body.is_empty() {
      return Err(Error::InvalidArgument("comment content can't be empty".to_string()));
    }
    if self.store.find_article(article_id).await?.is_none() {
      return Err(Error::not_found("article", article_id));
    }
    if let Some(parent_id) = parent_id {
      // removed parents still take replies, the thread outlives moderation.
      let parent = self.store.find_comment(parent_id).await?
        .ok_or_else(|| Error::not_found("comment", parent_id))?;
      if parent.article_id != article_id {
        return Err(Error::InvalidArgument(format!(
          "parent comment {} belongs to article {}, not {}",
          parent_id, parent.article_id, article_id)));
      }
    }

    let comment = self.store.insert_comment(&NewComment {
      article_id,
      author_id,
      parent_id,
      body: body.to_string(),
    }).await?;
    debug!("create_comment: article={} id={} parent={:?}", article_id, comment.id, parent_id);
    Ok(comment)
  }

  pub async fn list_thread(&self, article_id: i32, page: &ThreadPageRequest) -> Result<ThreadPage> {
    if self.store.find_article(article_id).await?.is_none() {
      return Err(Error::not_found("article", article_id));
    }
    if let Some(ref cursor) = page.cursor {
      if cursor.order() != page.order {
        return Err(Error::InvalidArgument("page token was issued for a different order".to_string()));
      }
    }
    let limit = page.limit.max(1);

    // one extra root tells us whether another page exists.
    let mut roots = self.store.query_root_comments(
      article_id, page.order, page.cursor.as_ref(), limit.saturating_add(1)).await?;
    let next_page = if roots.len() > limit {
      roots.truncate(limit);
      roots.last().map(|last| PageCursor::after(page.order, last).to_string())
    } else {
      None
    };

    let forest = ReplyForest::load(&*self.store, &roots, self.settings.max_replies_per_root).await?;
    let nodes = forest.flatten(roots);
    debug!("list_thread: article={} order={:?} nodes={} more={}",
      article_id, page.order, nodes.len(), next_page.is_some());
    Ok(ThreadPage {
      nodes,
      next_page,
    })
  }

  pub async fn delete_comment(&self, comment_id: i32, requestor: &Requestor) -> Result<DeleteOutcome> {
    let comment = self.store.find_comment(comment_id).await?
      .ok_or_else(|| Error::not_found("comment", comment_id))?;
    if !requestor.may_delete(&comment) {
      return Err(Error::Forbidden(format!(
        "user {} may not delete comment {}", requestor.user_id, comment_id)));
    }

    // a tombstone whose replies are all gone goes the same way as a leaf.
    if !self.store.has_replies(comment_id).await? && self.store.delete_comment(comment_id).await? {
      info!("delete_comment: id={} deleted by user={}", comment_id, requestor.user_id);
      return Ok(DeleteOutcome::Deleted);
    }
    if comment.removed {
      return Ok(DeleteOutcome::Tombstoned);
    }
    self.store.mark_comment_removed(comment_id).await?;
    info!("delete_comment: id={} tombstoned by user={}", comment_id, requestor.user_id);
    Ok(DeleteOutcome::Tombstoned)
  }

  pub async fn like_comment(&self, comment_id: i32, user_id: i32) -> Result<LikeOutcome> {
    let comment = self.store.find_comment(comment_id).await?
      .ok_or_else(|| Error::not_found("comment", comment_id))?;
    if comment.removed {
      return Err(Error::InvalidArgument(format!("comment {} was removed", comment_id)));
    }
    let write = self.store.insert_like(user_id, comment_id).await?;
    debug!("like_comment: id={} user={} {:?}", comment_id, user_id, write);
    Ok(LikeOutcome::from(write))
  }

  pub async fn unlike_comment(&self, comment_id: i32, user_id: i32) -> Result<LikeOutcome> {
    if self.store.find_comment(comment_id).await?.is_none() {
      return Err(Error::not_found("comment", comment_id));
    }
    let write = self.store.delete_like(user_id, comment_id).await?;
    debug!("unlike_comment: id={} user={} {:?}", comment_id, user_id, write);
    Ok(LikeOutcome::from(write))
  }
}
