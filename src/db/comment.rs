use log::*;

use std::collections::HashMap;

use async_trait::async_trait;

use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

/// `CommentStore` over the `comments`/`comment_likes` tables.
pub struct PgCommentStore {
  articles: ArticleQueries,

  // get comment
  comment_by_id: PreparedQuery,

  // store comment
  store_comment: PreparedQuery,

  // removal
  has_replies: PreparedQuery,
  mark_removed: PreparedQuery,
  delete_leaf: PreparedQuery,

  // (un)like comment
  like_comment: PreparedQuery,
  unlike_comment: PreparedQuery,

  // listings
  roots_newest: PreparedQuery,
  roots_most_liked: PreparedQuery,
  replies_by_parent: PreparedQuery,
}

lazy_static! {
  static ref COMMENT_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "comments",
      alias: "c",
      columns: vec![
        column("id"),
        column("article_id"),
        column("author_id"),
        column("parent_id"),
        column("body"),
        column("removed"),
        column("like_count"),
        column("created_at"),
      ],
      joins: vec![
        ("LEFT JOIN users u ON u.id = c.author_id", vec![
          joined("u", "username"),
          joined("u", "image"),
        ]),
      ],
    }
  };
}

fn comment_from_row(row: &Row) -> Result<Comment> {
  let author_id: i32 = row.try_get("author_id")?;
  let username: Option<String> = row.try_get("username")?;
  let author = match username {
    Some(username) => Relation::Loaded(Profile {
      user_id: author_id,
      username,
      image: row.try_get("image")?,
    }),
    None => Relation::NotLoaded,
  };

  Ok(Comment {
    id: row.try_get("id")?,
    article_id: row.try_get("article_id")?,
    author_id,
    parent_id: row.try_get("parent_id")?,
    body: row.try_get("body")?,
    removed: row.try_get("removed")?,
    like_count: row.try_get("like_count")?,
    created_at: row.try_get("created_at")?,
    author,
  })
}

fn comments_from_rows(rows: &[Row]) -> Result<Vec<Comment>> {
  rows.iter().map(comment_from_row).collect()
}

// Inserts only when the parent is absent or lives in the same article.
static STORE_COMMENT: &'static str = r#"
INSERT INTO comments(article_id, author_id, parent_id, body)
SELECT $1::integer, $2::integer, $3::integer, $4::text
WHERE $3::integer IS NULL
  OR EXISTS (SELECT 1 FROM comments p WHERE p.id = $3::integer AND p.article_id = $1::integer)
RETURNING id
"#;

// Like row and counter move in one statement; the primary key absorbs duplicates.
// `applied_count` is the new count when a row was written, `current_count`
// the count the statement started from (NULL when the comment is missing).
static LIKE_COMMENT: &'static str = r#"
WITH liked AS (
  INSERT INTO comment_likes(user_id, comment_id) VALUES($1, $2)
  ON CONFLICT (user_id, comment_id) DO NOTHING
  RETURNING comment_id
), counted AS (
  UPDATE comments SET like_count = like_count + 1
  WHERE id IN (SELECT comment_id FROM liked)
  RETURNING like_count
)
SELECT (SELECT like_count FROM counted) AS applied_count,
  (SELECT like_count FROM comments WHERE id = $2) AS current_count
"#;

static UNLIKE_COMMENT: &'static str = r#"
WITH unliked AS (
  DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2
  RETURNING comment_id
), counted AS (
  UPDATE comments SET like_count = like_count - 1
  WHERE id IN (SELECT comment_id FROM unliked)
  RETURNING like_count
)
SELECT (SELECT like_count FROM counted) AS applied_count,
  (SELECT like_count FROM comments WHERE id = $2) AS current_count
"#;

fn like_write(row: &Row, comment_id: i32) -> Result<LikeWrite> {
  let applied: Option<i64> = row.try_get("applied_count")?;
  let current: Option<i64> = row.try_get("current_count")?;
  match (applied, current) {
    (Some(count), _) => Ok(LikeWrite::Applied(count)),
    (None, Some(count)) => Ok(LikeWrite::Unchanged(count)),
    (None, None) => Err(Error::not_found("comment", comment_id)),
  }
}

impl PgCommentStore {
  pub fn new(cl: &SharedClient) -> PgCommentStore {
    let select = COMMENT_COLUMNS.build_select_query();

    let comment_by_id = PreparedQuery::new(cl,
        &format!(r#"{} WHERE c.id = $1"#, select));

    let store_comment = PreparedQuery::new(cl, STORE_COMMENT);

    let has_replies = PreparedQuery::new(cl,
        r#"SELECT EXISTS(SELECT 1 FROM comments WHERE parent_id = $1)"#);
    let mark_removed = PreparedQuery::new(cl,
        r#"UPDATE comments SET removed = TRUE, body = $2 WHERE id = $1"#);
    let delete_leaf = PreparedQuery::new(cl,
        r#"DELETE FROM comments c WHERE c.id = $1
        AND NOT EXISTS (SELECT 1 FROM comments r WHERE r.parent_id = c.id)"#);

    let like_comment = PreparedQuery::new(cl, LIKE_COMMENT);
    let unlike_comment = PreparedQuery::new(cl, UNLIKE_COMMENT);

    let roots_newest = PreparedQuery::new(cl,
        &format!(r#"{} WHERE c.article_id = $1 AND c.parent_id IS NULL
          AND ($2::timestamp IS NULL OR (c.created_at, c.id) < ($2::timestamp, $3::integer))
          ORDER BY c.created_at DESC, c.id DESC
          LIMIT $4"#, select));
    let roots_most_liked = PreparedQuery::new(cl,
        &format!(r#"{} WHERE c.article_id = $1 AND c.parent_id IS NULL
          AND ($2::bigint IS NULL OR c.like_count < $2::bigint
            OR (c.like_count = $2::bigint AND (c.created_at, c.id) > ($3::timestamp, $4::integer)))
          ORDER BY c.like_count DESC, c.created_at ASC, c.id ASC
          LIMIT $5"#, select));
    let ranked = COMMENT_COLUMNS.build_select_with(Some(
        "row_number() OVER (PARTITION BY c.parent_id ORDER BY c.created_at, c.id) AS reply_rank"));
    let replies_by_parent = PreparedQuery::new(cl,
        &format!(r#"SELECT * FROM ({} WHERE c.parent_id = ANY($1)) r
          WHERE r.reply_rank <= $2
          ORDER BY r.created_at ASC, r.id ASC"#, ranked));

    PgCommentStore {
      articles: ArticleQueries::new(cl),

      comment_by_id,
      store_comment,

      has_replies,
      mark_removed,
      delete_leaf,

      like_comment,
      unlike_comment,

      roots_newest,
      roots_most_liked,
      replies_by_parent,
    }
  }

  pub async fn prepare(&self) -> Result<()> {
    self.articles.prepare().await?;

    self.comment_by_id.prepare().await?;
    self.store_comment.prepare().await?;

    self.has_replies.prepare().await?;
    self.mark_removed.prepare().await?;
    self.delete_leaf.prepare().await?;

    self.like_comment.prepare().await?;
    self.unlike_comment.prepare().await?;

    self.roots_newest.prepare().await?;
    self.roots_most_liked.prepare().await?;
    self.replies_by_parent.prepare().await?;
    Ok(())
  }
}

#[async_trait(?Send)]
impl CommentStore for PgCommentStore {
  async fn find_article(&self, article_id: i32) -> Result<Option<Article>> {
    self.articles.get_by_id(article_id).await
  }

  async fn find_comment(&self, comment_id: i32) -> Result<Option<Comment>> {
    let row = self.comment_by_id.query_opt(&[&comment_id]).await?;
    opt_row(row, comment_from_row)
  }

  async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
    let row = self.store_comment.query_opt(&[
      &comment.article_id, &comment.author_id, &comment.parent_id, &comment.body,
    ]).await?;
    let comment_id: i32 = match (row, comment.parent_id) {
      (Some(row), _) => row.try_get(0)?,
      (None, Some(parent_id)) => {
        // the parent check failed: gone, or in another article.
        return Err(match self.find_comment(parent_id).await? {
          None => Error::not_found("comment", parent_id),
          Some(parent) => Error::InvalidArgument(format!(
            "parent comment {} belongs to article {}, not {}",
            parent_id, parent.article_id, comment.article_id)),
        });
      },
      (None, None) => {
        return Err(Error::Conflict(format!("comment for article {} was not stored", comment.article_id)));
      },
    };
    self.find_comment(comment_id).await?
      .ok_or_else(|| Error::not_found("comment", comment_id))
  }

  async fn has_replies(&self, comment_id: i32) -> Result<bool> {
    let row = self.has_replies.query_one(&[&comment_id]).await?;
    Ok(row.try_get(0)?)
  }

  async fn mark_comment_removed(&self, comment_id: i32) -> Result<()> {
    self.mark_removed.execute(&[&comment_id, &TOMBSTONE]).await?;
    Ok(())
  }

  async fn delete_comment(&self, comment_id: i32) -> Result<bool> {
    match self.delete_leaf.execute(&[&comment_id]).await {
      Ok(0) => Ok(!self.has_replies(comment_id).await?),
      Ok(_) => Ok(true),
      Err(Error::Conflict(msg)) => {
        // a reply landed between the check and the delete.
        debug!("delete comment {}: {}", comment_id, msg);
        Ok(false)
      },
      Err(err) => Err(err),
    }
  }

  async fn insert_like(&self, user_id: i32, comment_id: i32) -> Result<LikeWrite> {
    let row = self.like_comment.query_one(&[&user_id, &comment_id]).await?;
    like_write(&row, comment_id)
  }

  async fn delete_like(&self, user_id: i32, comment_id: i32) -> Result<LikeWrite> {
    let row = self.unlike_comment.query_one(&[&user_id, &comment_id]).await?;
    like_write(&row, comment_id)
  }

  async fn query_root_comments(&self,
    article_id: i32, order: ThreadOrder, cursor: Option<&PageCursor>, limit: usize,
  ) -> Result<Vec<Comment>> {
    let limit = limit.min(i64::MAX as usize) as i64;
    let rows = match (order, cursor) {
      (ThreadOrder::Newest, Some(&PageCursor::Newest { created_at, id })) => {
        self.roots_newest.query(&[&article_id, &Some(created_at), &Some(id), &limit]).await?
      },
      (ThreadOrder::Newest, _) => {
        let (created_at, id): (Option<chrono::NaiveDateTime>, Option<i32>) = (None, None);
        self.roots_newest.query(&[&article_id, &created_at, &id, &limit]).await?
      },
      (ThreadOrder::MostLiked, Some(&PageCursor::MostLiked { like_count, created_at, id })) => {
        self.roots_most_liked.query(&[
          &article_id, &Some(like_count), &Some(created_at), &Some(id), &limit,
        ]).await?
      },
      (ThreadOrder::MostLiked, _) => {
        let (like_count, created_at, id): (Option<i64>, Option<chrono::NaiveDateTime>, Option<i32>) =
          (None, None, None);
        self.roots_most_liked.query(&[&article_id, &like_count, &created_at, &id, &limit]).await?
      },
    };
    comments_from_rows(&rows)
  }

  async fn query_replies(&self, parent_ids: &[i32], per_parent: usize)
    -> Result<HashMap<i32, Vec<Comment>>>
  {
    let mut replies: HashMap<i32, Vec<Comment>> = HashMap::new();
    if parent_ids.is_empty() || per_parent == 0 {
      return Ok(replies);
    }
    let per_parent = per_parent.min(i64::MAX as usize) as i64;
    let rows = self.replies_by_parent.query(&[&parent_ids, &per_parent]).await?;
    // rows arrive oldest first, grouping keeps that order per parent.
    for comment in comments_from_rows(&rows)? {
      if let Some(parent_id) = comment.parent_id {
        replies.entry(parent_id).or_default().push(comment);
      }
    }
    Ok(replies)
  }
}
