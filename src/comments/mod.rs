//! Threaded comments of an article: creation, ordered listing, soft
//! deletion and like counting on top of a `CommentStore`.

mod manager;
mod tree;

pub use self::manager::*;
