pub mod user;
pub mod article;
pub mod comment;
pub mod relation;

pub use self::{
  user::*,
  article::*,
  comment::*,
  relation::*,
};
