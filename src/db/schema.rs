/// Tables the comment tree reads and writes.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id SERIAL PRIMARY KEY,
  username VARCHAR(255) NOT NULL UNIQUE,
  image TEXT
);

CREATE TABLE IF NOT EXISTS articles (
  id SERIAL PRIMARY KEY,
  author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  slug VARCHAR(255) NOT NULL UNIQUE,
  title VARCHAR(255) NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
  id SERIAL PRIMARY KEY,
  article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
  author_id INTEGER NOT NULL,
  parent_id INTEGER REFERENCES comments(id) ON DELETE RESTRICT,
  body TEXT NOT NULL,
  removed BOOLEAN NOT NULL DEFAULT FALSE,
  like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
  created_at TIMESTAMP NOT NULL DEFAULT (now() AT TIME ZONE 'utc')
);

CREATE INDEX IF NOT EXISTS comments_roots_newest
  ON comments(article_id, created_at DESC, id DESC) WHERE parent_id IS NULL;
CREATE INDEX IF NOT EXISTS comments_roots_most_liked
  ON comments(article_id, like_count DESC, created_at, id) WHERE parent_id IS NULL;
CREATE INDEX IF NOT EXISTS comments_parent
  ON comments(parent_id, created_at, id);

CREATE TABLE IF NOT EXISTS comment_likes (
  user_id INTEGER NOT NULL,
  comment_id INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
  created_at TIMESTAMP NOT NULL DEFAULT (now() AT TIME ZONE 'utc'),
  PRIMARY KEY (user_id, comment_id)
);
"#;
