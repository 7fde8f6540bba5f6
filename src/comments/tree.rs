use std::collections::{HashMap, HashSet};

use crate::error::*;
use crate::models::*;
use crate::db::CommentStore;

/// Replies gathered for one page of roots, keyed by parent id.
#[derive(Debug, Default)]
pub struct ReplyForest {
  children: HashMap<i32, Vec<Comment>>,
  truncated: HashSet<i32>,
}

impl ReplyForest {
  /// Fetch the replies under `roots` one level at a time, keeping at most
  /// `max_per_root` descendants for each root.
  pub async fn load(store: &dyn CommentStore, roots: &[Comment], max_per_root: usize) -> Result<Self> {
    let mut forest = ReplyForest::default();
    let mut root_of: HashMap<i32, i32> = roots.iter().map(|c| (c.id, c.id)).collect();
    let mut kept: HashMap<i32, usize> = HashMap::new();
    let mut frontier: Vec<i32> = roots.iter().map(|c| c.id).collect();
    // no parent can add more than the cap, one extra shows the cut.
    let per_parent = max_per_root.saturating_add(1);

    while !frontier.is_empty() {
      let mut replies = store.query_replies(&frontier, per_parent).await?;
      let mut next = Vec::new();
      for parent_id in frontier.iter() {
        let root_id = match root_of.get(parent_id) {
          Some(root_id) => *root_id,
          None => continue,
        };
        for reply in replies.remove(parent_id).unwrap_or_default() {
          if root_of.contains_key(&reply.id) {
            // already placed, the store handed back a loop.
            continue;
          }
          let count = kept.entry(root_id).or_insert(0);
          if *count >= max_per_root {
            forest.truncated.insert(root_id);
            continue;
          }
          *count += 1;
          root_of.insert(reply.id, root_id);
          next.push(reply.id);
          forest.children.entry(*parent_id).or_default().push(reply);
        }
      }
      frontier = next;
    }
    Ok(forest)
  }

  /// Pre-order walk of each root's subtree, without recursion.
  pub fn flatten(mut self, roots: Vec<Comment>) -> Vec<CommentNode> {
    let mut nodes = Vec::new();
    for root in roots {
      let root_id = root.id;
      let replies_truncated = self.truncated.contains(&root_id);
      let mut stack = vec![(root, 0u32)];
      while let Some((comment, depth)) = stack.pop() {
        if let Some(children) = self.children.remove(&comment.id) {
          // reversed so the oldest reply is visited first.
          stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        nodes.push(CommentNode {
          replies_truncated: depth == 0 && replies_truncated,
          comment,
          depth,
          root_id,
        });
      }
    }
    nodes
  }
}
