use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

pub struct ArticleQueries {
  // get one article
  article_by_id: PreparedQuery,
}

lazy_static! {
  static ref ARTICLE_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "articles",
      alias: "a",
      columns: vec![
        column("id"),
        column("author_id"),
        column("slug"),
        column("title"),
      ],
      joins: vec![],
    }
  };
}

fn article_from_row(row: &Row) -> Result<Article> {
  Ok(Article {
    id: row.try_get("id")?,
    author_id: row.try_get("author_id")?,
    slug: row.try_get("slug")?,
    title: row.try_get("title")?,
  })
}

impl ArticleQueries {
  pub fn new(cl: &SharedClient) -> ArticleQueries {
    let select = ARTICLE_COLUMNS.build_select_query();
    ArticleQueries {
      article_by_id: PreparedQuery::new(cl, &format!("{} WHERE a.id = $1", select)),
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.article_by_id.prepare().await
  }

  pub async fn get_by_id(&self, article_id: i32) -> Result<Option<Article>> {
    let row = self.article_by_id.query_opt(&[&article_id]).await?;
    opt_row(row, article_from_row)
  }
}
