use log::*;

use actix_web::{
  get, post, delete, web, HttpResponse,
};

use crate::error::*;
use crate::app::*;
use crate::auth::AuthData;
use crate::comments::*;
use crate::forms::*;
use crate::models::*;

use super::StoreHandle;

/// List an article's comment threads.
#[get("/articles/{article_id}/comments")]
async fn list(
  cfg: web::Data<CommentService>,
  store: web::Data<StoreHandle>,
  article_id: web::Path<i32>,
  req: web::Query<ThreadRequest>,
) -> Result<HttpResponse> {
  let page = req.into_inner().into_page_request(cfg.page_size, cfg.max_page_size)?;
  let thread = cfg.manager(&store).list_thread(article_id.into_inner(), &page).await?;

  Ok(HttpResponse::Ok().json(CommentList::from(thread)))
}

/// post new comment or reply
#[post("/articles/{article_id}/comments")]
async fn store_comment(
  auth: AuthData,
  cfg: web::Data<CommentService>,
  store: web::Data<StoreHandle>,
  article_id: web::Path<i32>,
  comment: web::Json<CommentOut<CreateComment>>,
) -> Result<HttpResponse> {
  let form = comment.into_inner().comment;
  form.validate(cfg.max_content_len)?;

  let comment = cfg.manager(&store)
    .create_comment(article_id.into_inner(), auth.user_id, &form.body, form.parent_id)
    .await?;
  info!("Comment - new comment: id={} article={}", comment.id, comment.article_id);

  Ok(HttpResponse::Created().json(CommentOut { comment }))
}

/// delete a comment, or tombstone it when it has replies
#[delete("/articles/{article_id}/comments/{comment_id}")]
async fn delete_comment(
  auth: AuthData,
  cfg: web::Data<CommentService>,
  store: web::Data<StoreHandle>,
  path: web::Path<(i32, i32)>,
) -> Result<HttpResponse> {
  let (article_id, comment_id) = path.into_inner();
  check_article(&store, article_id, comment_id).await?;

  let outcome = cfg.manager(&store).delete_comment(comment_id, &auth.requestor()).await?;
  Ok(HttpResponse::Ok().json(json!({ "outcome": outcome })))
}

#[post("/articles/{article_id}/comments/{comment_id}/like")]
async fn like(
  auth: AuthData,
  cfg: web::Data<CommentService>,
  store: web::Data<StoreHandle>,
  path: web::Path<(i32, i32)>,
) -> Result<HttpResponse> {
  let (article_id, comment_id) = path.into_inner();
  check_article(&store, article_id, comment_id).await?;

  let outcome = cfg.manager(&store).like_comment(comment_id, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(outcome))
}

#[delete("/articles/{article_id}/comments/{comment_id}/like")]
async fn unlike(
  auth: AuthData,
  cfg: web::Data<CommentService>,
  store: web::Data<StoreHandle>,
  path: web::Path<(i32, i32)>,
) -> Result<HttpResponse> {
  let (article_id, comment_id) = path.into_inner();
  check_article(&store, article_id, comment_id).await?;

  let outcome = cfg.manager(&store).unlike_comment(comment_id, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(outcome))
}

/// Comment routes are nested under their article; a mismatch is a 404.
async fn check_article(store: &StoreHandle, article_id: i32, comment_id: i32) -> Result<()> {
  match store.0.find_comment(comment_id).await? {
    Some(comment) if comment.article_id == article_id => Ok(()),
    _ => Err(Error::not_found("comment", comment_id)),
  }
}

#[derive(Debug, Clone)]
pub struct CommentService {
  pub page_size: usize,
  pub max_page_size: usize,
  pub max_content_len: usize,
  pub settings: ThreadSettings,
}

impl Default for CommentService {
  fn default() -> Self {
    Self {
      page_size: 20,
      max_page_size: 100,
      max_content_len: 10_000,
      settings: ThreadSettings::default(),
    }
  }
}

impl CommentService {
  fn manager(&self, store: &StoreHandle) -> CommentTreeManager {
    CommentTreeManager::new(store.0.clone(), self.settings)
  }
}

fn get_usize(config: &AppConfig, key: &str, default: usize) -> Result<usize> {
  match config.get_int(key)? {
    Some(val) if val > 0 => Ok(val as usize),
    Some(val) => Err(Error::BadRequest(format!("{} must be > 0, got {}", key, val))),
    None => Ok(default),
  }
}

impl super::Service for CommentService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    let defaults = Self::default();
    self.page_size = get_usize(config, "comment.page_size", defaults.page_size)?;
    self.max_page_size = get_usize(config, "comment.max_page_size", defaults.max_page_size)?;
    self.max_content_len = get_usize(config, "comment.max_content_len", defaults.max_content_len)?;
    self.settings.max_replies_per_root = get_usize(config, "comment.max_replies_per_root",
      defaults.settings.max_replies_per_root)?;
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(list)
      .service(store_comment)
      .service(delete_comment)
      .service(like)
      .service(unlike);
  }
}

pub fn new_factory() -> CommentService {
  Default::default()
}
