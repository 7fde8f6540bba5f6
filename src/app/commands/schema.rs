use crate::{
  error::*,
  db::schema::SCHEMA,
};

/// Print the Postgres DDL the comment store expects.
pub fn execute() -> Result<()> {
  println!("{}", SCHEMA.trim());
  Ok(())
}
