pub mod util;
pub mod schema;

mod store;
mod memory;
mod article;
mod comment;
pub use self::{
  store::*,
  memory::*,
  article::*,
  comment::*,
};

mod service;
pub use service::*;
