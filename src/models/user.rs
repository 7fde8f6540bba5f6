use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
  #[serde(skip)]
  pub user_id: i32,
  pub username: String,
  pub image: Option<String>,
}
