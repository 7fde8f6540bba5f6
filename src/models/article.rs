use serde::{Deserialize, Serialize};

/// The slice of an article the comment tree needs to know about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
  pub id: i32,
  pub author_id: i32,
  pub slug: String,
  pub title: String,
}
