use log::*;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::*;
use crate::models::*;
use crate::util;

use super::{CommentStore, LikeWrite};

#[derive(Debug, Default)]
struct MemoryState {
  articles: HashMap<i32, Article>,
  comments: BTreeMap<i32, Comment>,
  likes: HashMap<(i32, i32), CommentLike>,
  last_id: i32,
  last_created: Option<NaiveDateTime>,
}

impl MemoryState {
  fn like_count(&self, comment_id: i32) -> Result<i64> {
    self.comments.get(&comment_id)
      .map(|comment| comment.like_count)
      .ok_or_else(|| Error::not_found("comment", comment_id))
  }

  /// Creation times strictly increase, even inside one clock tick.
  fn next_created_at(&mut self) -> NaiveDateTime {
    let mut now = util::now();
    if let Some(last) = self.last_created {
      if now <= last {
        now = last + chrono::Duration::microseconds(1);
      }
    }
    self.last_created = Some(now);
    now
  }
}

/// In-process `CommentStore`.  Clones share the same data, so one store can
/// back every HTTP worker.  Each method holds the lock for its whole body,
/// which makes it a single atomic step.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Default::default()
  }

  /// Store with articles `1..=count` already present.
  pub fn with_articles(count: i32) -> Self {
    let store = Self::new();
    for id in 1..=count {
      store.add_article(Article {
        id,
        author_id: 0,
        slug: format!("article-{}", id),
        title: format!("Article {}", id),
      });
    }
    store
  }

  pub fn add_article(&self, article: Article) {
    self.lock().articles.insert(article.id, article);
  }

  pub fn like_rows(&self, comment_id: i32) -> usize {
    self.lock().likes.keys().filter(|(_, id)| *id == comment_id).count()
  }

  pub fn comment_count(&self) -> usize {
    self.lock().comments.len()
  }

  fn lock(&self) -> MutexGuard<'_, MemoryState> {
    // a panicking test thread must not wedge the others.
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[async_trait(?Send)]
impl CommentStore for MemoryStore {
  async fn find_article(&self, article_id: i32) -> Result<Option<Article>> {
    Ok(self.lock().articles.get(&article_id).cloned())
  }

  async fn find_comment(&self, comment_id: i32) -> Result<Option<Comment>> {
    Ok(self.lock().comments.get(&comment_id).cloned())
  }

  async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
    let mut state = self.lock();
    if !state.articles.contains_key(&comment.article_id) {
      return Err(Error::not_found("article", comment.article_id));
    }
    if let Some(parent_id) = comment.parent_id {
      match state.comments.get(&parent_id) {
        Some(parent) if parent.article_id == comment.article_id => (),
        Some(_) => {
          return Err(Error::InvalidArgument(
            format!("parent comment {} belongs to another article", parent_id)));
        },
        None => return Err(Error::not_found("comment", parent_id)),
      }
    }
    state.last_id += 1;
    let created_at = state.next_created_at();
    let comment = Comment {
      id: state.last_id,
      article_id: comment.article_id,
      author_id: comment.author_id,
      parent_id: comment.parent_id,
      body: comment.body.clone(),
      removed: false,
      like_count: 0,
      created_at,
      author: Relation::NotLoaded,
    };
    state.comments.insert(comment.id, comment.clone());
    Ok(comment)
  }

  async fn has_replies(&self, comment_id: i32) -> Result<bool> {
    Ok(self.lock().comments.values().any(|c| c.parent_id == Some(comment_id)))
  }

  async fn mark_comment_removed(&self, comment_id: i32) -> Result<()> {
    if let Some(comment) = self.lock().comments.get_mut(&comment_id) {
      comment.removed = true;
      comment.body = TOMBSTONE.to_string();
    }
    Ok(())
  }

  async fn delete_comment(&self, comment_id: i32) -> Result<bool> {
    let mut state = self.lock();
    if state.comments.values().any(|c| c.parent_id == Some(comment_id)) {
      return Ok(false);
    }
    if state.comments.remove(&comment_id).is_some() {
      state.likes.retain(|(_, id), _| *id != comment_id);
      debug!("memory: deleted comment {}", comment_id);
    }
    Ok(true)
  }

  async fn insert_like(&self, user_id: i32, comment_id: i32) -> Result<LikeWrite> {
    let mut state = self.lock();
    if !state.comments.contains_key(&comment_id) {
      return Err(Error::Conflict(format!("like references missing comment {}", comment_id)));
    }
    if state.likes.contains_key(&(user_id, comment_id)) {
      return Ok(LikeWrite::Unchanged(state.like_count(comment_id)?));
    }
    let created_at = util::now();
    state.likes.insert((user_id, comment_id), CommentLike { user_id, comment_id, created_at });
    if let Some(comment) = state.comments.get_mut(&comment_id) {
      comment.like_count += 1;
    }
    Ok(LikeWrite::Applied(state.like_count(comment_id)?))
  }

  async fn delete_like(&self, user_id: i32, comment_id: i32) -> Result<LikeWrite> {
    let mut state = self.lock();
    if state.likes.remove(&(user_id, comment_id)).is_none() {
      return Ok(LikeWrite::Unchanged(state.like_count(comment_id)?));
    }
    if let Some(comment) = state.comments.get_mut(&comment_id) {
      comment.like_count -= 1;
    }
    Ok(LikeWrite::Applied(state.like_count(comment_id)?))
  }

  async fn query_root_comments(&self,
    article_id: i32, order: ThreadOrder, cursor: Option<&PageCursor>, limit: usize,
  ) -> Result<Vec<Comment>> {
    let state = self.lock();
    let mut roots: Vec<Comment> = state.comments.values()
      .filter(|c| c.article_id == article_id && c.is_root())
      .filter(|c| cursor.map_or(true, |cursor| cursor.admits(c)))
      .cloned()
      .collect();
    roots.sort_by(|a, b| order.cmp_roots(a, b));
    roots.truncate(limit);
    Ok(roots)
  }

  async fn query_replies(&self, parent_ids: &[i32], per_parent: usize)
    -> Result<HashMap<i32, Vec<Comment>>>
  {
    let state = self.lock();
    let mut replies: HashMap<i32, Vec<Comment>> = HashMap::new();
    for comment in state.comments.values() {
      if let Some(parent_id) = comment.parent_id {
        if parent_ids.contains(&parent_id) {
          replies.entry(parent_id).or_default().push(comment.clone());
        }
      }
    }
    for list in replies.values_mut() {
      list.sort_by(cmp_replies);
      list.truncate(per_parent);
    }
    Ok(replies)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use futures::executor::block_on;

  fn new_comment(article_id: i32, parent_id: Option<i32>) -> NewComment {
    NewComment {
      article_id,
      author_id: 7,
      parent_id,
      body: "text".to_string(),
    }
  }

  #[test]
  fn test_insert_checks_parent_article() {
    let store = MemoryStore::with_articles(2);
    block_on(async {
      let root = store.insert_comment(&new_comment(1, None)).await.unwrap();
      let err = store.insert_comment(&new_comment(2, Some(root.id))).await.unwrap_err();
      assert!(matches!(err, Error::InvalidArgument(_)));
      let err = store.insert_comment(&new_comment(1, Some(99))).await.unwrap_err();
      assert!(matches!(err, Error::NotFound(_)));
    });
  }

  #[test]
  fn test_created_at_strictly_increases() {
    let store = MemoryStore::with_articles(1);
    block_on(async {
      let mut last = None;
      for _ in 0..50 {
        let c = store.insert_comment(&new_comment(1, None)).await.unwrap();
        if let Some(last) = last {
          assert!(c.created_at > last);
        }
        last = Some(c.created_at);
      }
    });
  }

  #[test]
  fn test_like_rows_move_with_counter() {
    let store = MemoryStore::with_articles(1);
    block_on(async {
      let c = store.insert_comment(&new_comment(1, None)).await.unwrap();
      assert_eq!(store.insert_like(1, c.id).await.unwrap(), LikeWrite::Applied(1));
      assert_eq!(store.insert_like(1, c.id).await.unwrap(), LikeWrite::Unchanged(1));
      assert_eq!(store.insert_like(2, c.id).await.unwrap(), LikeWrite::Applied(2));
      assert_eq!(store.find_comment(c.id).await.unwrap().unwrap().like_count, 2);
      assert_eq!(store.delete_like(3, c.id).await.unwrap(), LikeWrite::Unchanged(2));
      assert_eq!(store.delete_like(1, c.id).await.unwrap(), LikeWrite::Applied(1));
      assert_eq!(store.find_comment(c.id).await.unwrap().unwrap().like_count, 1);
      assert_eq!(store.like_rows(c.id), 1);
    });
  }

  #[test]
  fn test_replies_limited_per_parent() {
    let store = MemoryStore::with_articles(1);
    block_on(async {
      let a = store.insert_comment(&new_comment(1, None)).await.unwrap();
      let b = store.insert_comment(&new_comment(1, None)).await.unwrap();
      let mut under_a = Vec::new();
      for _ in 0..5 {
        under_a.push(store.insert_comment(&new_comment(1, Some(a.id))).await.unwrap().id);
      }
      let only_b = store.insert_comment(&new_comment(1, Some(b.id))).await.unwrap().id;

      let replies = store.query_replies(&[a.id, b.id], 2).await.unwrap();
      let ids: Vec<i32> = replies[&a.id].iter().map(|c| c.id).collect();
      assert_eq!(ids, under_a[..2].to_vec());
      assert_eq!(replies[&b.id].len(), 1);
      assert_eq!(replies[&b.id][0].id, only_b);
    });
  }

  #[test]
  fn test_delete_refuses_comment_with_replies() {
    let store = MemoryStore::with_articles(1);
    block_on(async {
      let root = store.insert_comment(&new_comment(1, None)).await.unwrap();
      let reply = store.insert_comment(&new_comment(1, Some(root.id))).await.unwrap();
      assert!(!store.delete_comment(root.id).await.unwrap());
      assert!(store.delete_comment(reply.id).await.unwrap());
      assert!(store.delete_comment(root.id).await.unwrap());
      assert_eq!(store.comment_count(), 0);
    });
  }
}
