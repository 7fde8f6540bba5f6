use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

use crate::error::*;
use crate::models::*;
use crate::util;

/// Body stored in place of a removed comment that still has replies.
pub const TOMBSTONE: &str = "[removed]";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: i32,
  pub article_id: i32,
  pub author_id: i32,
  pub parent_id: Option<i32>,
  pub body: String,
  pub removed: bool,
  pub like_count: i64,
  pub created_at: NaiveDateTime,
  #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
  pub author: Relation<Profile>,
}

impl Comment {
  pub fn is_root(&self) -> bool {
    self.parent_id.is_none()
  }
}

/// Validated input for a comment insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
  pub article_id: i32,
  pub author_id: i32,
  pub parent_id: Option<i32>,
  pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentLike {
  pub user_id: i32,
  pub comment_id: i32,
  pub created_at: NaiveDateTime,
}

/// Who is asking, and whether an outside authority granted them moderation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Requestor {
  pub user_id: i32,
  pub moderator: bool,
}

impl Requestor {
  pub fn user(user_id: i32) -> Self {
    Self { user_id, moderator: false }
  }

  pub fn moderator(user_id: i32) -> Self {
    Self { user_id, moderator: true }
  }

  pub fn may_delete(&self, comment: &Comment) -> bool {
    self.moderator || self.user_id == comment.author_id
  }
}

/// Ordering of root comments.  Replies are always oldest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreadOrder {
  Newest,
  MostLiked,
}

impl Default for ThreadOrder {
  fn default() -> Self {
    ThreadOrder::Newest
  }
}

impl ThreadOrder {
  /// Total order over roots: newest is `created_at`/`id` descending,
  /// most liked is `like_count` descending then `created_at`/`id` ascending.
  pub fn cmp_roots(&self, a: &Comment, b: &Comment) -> Ordering {
    match self {
      ThreadOrder::Newest => (b.created_at, b.id).cmp(&(a.created_at, a.id)),
      ThreadOrder::MostLiked => b.like_count.cmp(&a.like_count)
        .then_with(|| (a.created_at, a.id).cmp(&(b.created_at, b.id))),
    }
  }
}

/// Replies are read in conversation order.
pub fn cmp_replies(a: &Comment, b: &Comment) -> Ordering {
  (a.created_at, a.id).cmp(&(b.created_at, b.id))
}

/// Keyset position of the last root on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
  Newest {
    created_at: NaiveDateTime,
    id: i32,
  },
  MostLiked {
    like_count: i64,
    created_at: NaiveDateTime,
    id: i32,
  },
}

impl PageCursor {
  pub fn after(order: ThreadOrder, root: &Comment) -> Self {
    match order {
      ThreadOrder::Newest => PageCursor::Newest {
        created_at: root.created_at,
        id: root.id,
      },
      ThreadOrder::MostLiked => PageCursor::MostLiked {
        like_count: root.like_count,
        created_at: root.created_at,
        id: root.id,
      },
    }
  }

  pub fn order(&self) -> ThreadOrder {
    match self {
      PageCursor::Newest { .. } => ThreadOrder::Newest,
      PageCursor::MostLiked { .. } => ThreadOrder::MostLiked,
    }
  }

  /// Does `root` sort strictly after this cursor?
  pub fn admits(&self, root: &Comment) -> bool {
    match *self {
      PageCursor::Newest { created_at, id } => {
        (root.created_at, root.id) < (created_at, id)
      },
      PageCursor::MostLiked { like_count, created_at, id } => {
        root.like_count < like_count ||
          (root.like_count == like_count && (root.created_at, root.id) > (created_at, id))
      },
    }
  }
}

impl fmt::Display for PageCursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      PageCursor::Newest { created_at, id } => {
        write!(f, "n.{}.{}", util::to_micros(created_at), id)
      },
      PageCursor::MostLiked { like_count, created_at, id } => {
        write!(f, "l.{}.{}.{}", like_count, util::to_micros(created_at), id)
      },
    }
  }
}

impl FromStr for PageCursor {
  type Err = Error;

  fn from_str(token: &str) -> Result<Self> {
    let invalid = || Error::InvalidArgument(format!("invalid page token: {:?}", token));
    let parts: Vec<&str> = token.split('.').collect();
    let timestamp = |val: &str| util::parse_num::<i64>(val).and_then(util::from_micros);
    match parts.as_slice() {
      ["n", ts, id] => Ok(PageCursor::Newest {
        created_at: timestamp(*ts).ok_or_else(invalid)?,
        id: util::parse_num(*id).ok_or_else(invalid)?,
      }),
      ["l", likes, ts, id] => Ok(PageCursor::MostLiked {
        like_count: util::parse_num(*likes).ok_or_else(invalid)?,
        created_at: timestamp(*ts).ok_or_else(invalid)?,
        id: util::parse_num(*id).ok_or_else(invalid)?,
      }),
      _ => Err(invalid()),
    }
  }
}

/// Which slice of an article's roots to list.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadPageRequest {
  pub order: ThreadOrder,
  pub cursor: Option<PageCursor>,
  pub limit: usize,
}

/// One comment in a flattened thread listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
  pub comment: Comment,
  pub depth: u32,
  pub root_id: i32,
  /// Set on roots whose replies were cut at the per-root cap.
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub replies_truncated: bool,
}

/// Roots in request order, each followed by its replies in pre-order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
  pub nodes: Vec<CommentNode>,
  pub next_page: Option<String>,
}

impl ThreadPage {
  pub fn iter(&self) -> std::slice::Iter<'_, CommentNode> {
    self.nodes.iter()
  }

  pub fn roots(&self) -> impl Iterator<Item = &CommentNode> {
    self.nodes.iter().filter(|node| node.depth == 0)
  }
}

impl IntoIterator for ThreadPage {
  type Item = CommentNode;
  type IntoIter = std::vec::IntoIter<CommentNode>;

  fn into_iter(self) -> Self::IntoIter {
    self.nodes.into_iter()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteOutcome {
  /// Comment and its likes are gone.
  Deleted,
  /// Comment had replies and was kept as a placeholder.
  Tombstoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
  pub changed: bool,
  pub like_count: i64,
}
