pub mod serve;
pub mod schema;
