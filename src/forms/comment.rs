use serde::{Deserialize, Serialize};

use crate::error::*;
use crate::models::comment::*;

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentOut<T> {
  pub comment: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentList {
  pub comments: Vec<CommentNode>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_page: Option<String>,
}

impl From<ThreadPage> for CommentList {
  fn from(page: ThreadPage) -> Self {
    Self {
      comments: page.nodes,
      next_page: page.next_page,
    }
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
  pub body: String,
  pub parent_id: Option<i32>,
}

impl CreateComment {
  /// Boundary checks run before the request reaches the comment tree.
  pub fn validate(&self, max_len: usize) -> Result<()> {
    let body = self.body.trim();
    if body.is_empty() {
      return Err(Error::InvalidArgument("comment body can't be empty".to_string()));
    }
    if body.chars().count() > max_len {
      return Err(Error::InvalidArgument(
        format!("comment body is longer than {} characters", max_len)));
    }
    if let Some(parent_id) = self.parent_id {
      if parent_id <= 0 {
        return Err(Error::InvalidArgument(format!("invalid parentId: {}", parent_id)));
      }
    }
    Ok(())
  }
}

/// Query string of the thread listing.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ThreadRequest {
  pub order: Option<ThreadOrder>,
  pub page: Option<String>,
  pub limit: Option<i64>,
}

impl ThreadRequest {
  pub fn into_page_request(self, default_limit: usize, max_limit: usize) -> Result<ThreadPageRequest> {
    let order = self.order.unwrap_or_default();
    let cursor = match self.page {
      Some(ref token) if !token.is_empty() => {
        let cursor: PageCursor = token.parse()?;
        if cursor.order() != order {
          return Err(Error::InvalidArgument(
            "page token was issued for a different order".to_string()));
        }
        Some(cursor)
      },
      _ => None,
    };
    let limit = match self.limit {
      Some(limit) if limit < 1 => {
        return Err(Error::InvalidArgument(format!("invalid limit: {}", limit)));
      },
      Some(limit) => (limit as usize).min(max_limit),
      None => default_limit.min(max_limit),
    };
    Ok(ThreadPageRequest {
      order,
      cursor,
      limit,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_create_comment_validation() {
    let form = CreateComment { body: "  ".to_string(), parent_id: None };
    assert!(matches!(form.validate(10), Err(Error::InvalidArgument(_))));

    let form = CreateComment { body: "hello world".to_string(), parent_id: None };
    assert!(matches!(form.validate(5), Err(Error::InvalidArgument(_))));

    let form = CreateComment { body: "hello".to_string(), parent_id: Some(0) };
    assert!(matches!(form.validate(10), Err(Error::InvalidArgument(_))));

    let form = CreateComment { body: " hello ".to_string(), parent_id: Some(3) };
    assert!(form.validate(5).is_ok());
  }

  #[test]
  fn test_create_comment_json() {
    let form: CommentOut<CreateComment> = serde_json::from_str(
      r#"{"comment":{"body":"hi","parentId":4}}"#).unwrap();
    assert_eq!(form.comment, CreateComment { body: "hi".to_string(), parent_id: Some(4) });
  }

  #[test]
  fn test_thread_request_defaults_and_caps() {
    let req = ThreadRequest::default().into_page_request(20, 100).unwrap();
    assert_eq!(req, ThreadPageRequest { order: ThreadOrder::Newest, cursor: None, limit: 20 });

    let req = ThreadRequest { limit: Some(500), ..Default::default() };
    assert_eq!(req.into_page_request(20, 100).unwrap().limit, 100);

    let req = ThreadRequest { limit: Some(0), ..Default::default() };
    assert!(req.into_page_request(20, 100).is_err());
  }

  #[test]
  fn test_thread_request_token_must_match_order() {
    let req = ThreadRequest {
      order: Some(ThreadOrder::MostLiked),
      page: Some("n.1000000.3".to_string()),
      limit: None,
    };
    assert!(matches!(req.into_page_request(20, 100), Err(Error::InvalidArgument(_))));

    let req = ThreadRequest {
      order: Some(ThreadOrder::MostLiked),
      page: Some("l.2.1000000.3".to_string()),
      limit: None,
    };
    let page = req.into_page_request(20, 100).unwrap();
    assert_eq!(page.cursor.map(|c| c.order()), Some(ThreadOrder::MostLiked));
  }

  #[test]
  fn test_thread_order_query_names() {
    let req: ThreadRequest = serde_json::from_str(r#"{"order":"mostLiked"}"#).unwrap();
    assert_eq!(req.order, Some(ThreadOrder::MostLiked));
  }
}
