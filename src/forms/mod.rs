pub mod comment;

pub use self::comment::*;
