use tokio_postgres::Row;

use crate::error::*;

#[derive(Debug, Clone)]
pub struct ColumnMapper {
  pub name: &'static str,
  pub column: &'static str,
  /// Alias of the joined table, `None` for the main table.
  pub table: Option<&'static str>,
}

pub fn column(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    column: name,
    table: None,
  }
}

/// Column of a joined table, selected as `<table>.<column>`.
pub fn joined(table: &'static str, name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    column: name,
    table: Some(table),
  }
}

#[derive(Debug, Default, Clone)]
pub struct ColumnMappers {
  pub table_name: &'static str,
  pub alias: &'static str,
  pub columns: Vec<ColumnMapper>,
  pub joins: Vec<(&'static str, Vec<ColumnMapper>)>,
}

impl ColumnMappers {
  /// Select list with every column qualified by its table alias.
  pub fn get_columns(&self) -> String {
    self.columns.iter()
      .chain(self.joins.iter().flat_map(|(_, cols)| cols.iter()))
      .map(|col| format!("{}.{}", col.table.unwrap_or(self.alias), col.column))
      .collect::<Vec<String>>().join(", ")
  }

  pub fn build_select_query(&self) -> String {
    self.build_select_with(None)
  }

  /// Select query with one extra computed column appended to the list.
  pub fn build_select_with(&self, extra: Option<&str>) -> String {
    let mut columns = self.get_columns();
    if let Some(extra) = extra {
      columns.push_str(", ");
      columns.push_str(extra);
    }
    let mut query = format!("SELECT {} FROM {} {}", columns, self.table_name, self.alias);
    for (join, _) in self.joins.iter() {
      query.push(' ');
      query.push_str(join);
    }
    query
  }
}

pub fn opt_row<T>(row: Option<Row>, map: impl FnOnce(&Row) -> Result<T>) -> Result<Option<T>> {
  match row {
    Some(ref row) => Ok(Some(map(row)?)),
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mappers() -> ColumnMappers {
    ColumnMappers {
      table_name: "comments",
      alias: "c",
      columns: vec![column("id"), column("body")],
      joins: vec![
        ("LEFT JOIN users u ON u.id = c.author_id", vec![joined("u", "username")]),
      ],
    }
  }

  #[test]
  fn test_select_query_qualifies_columns() {
    assert_eq!(mappers().build_select_query(),
      "SELECT c.id, c.body, u.username FROM comments c LEFT JOIN users u ON u.id = c.author_id");
  }

  #[test]
  fn test_joined_column_keeps_its_name() {
    let col = joined("u", "username");
    assert_eq!(col.name, "username");
    assert_eq!(col.table, Some("u"));
    assert_eq!(column("id").table, None);
  }

  #[test]
  fn test_select_with_extra_column() {
    assert_eq!(mappers().build_select_with(Some("1 AS one")),
      "SELECT c.id, c.body, u.username, 1 AS one FROM comments c LEFT JOIN users u ON u.id = c.author_id");
  }
}
