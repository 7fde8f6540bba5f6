use log::*;

use std::collections::HashMap;
use std::rc::Rc;

use actix_web::{web};

use crate::error::*;
use crate::app::*;
use crate::db::{CommentStore, DbService, MemoryStore};

mod comment;
pub use self::comment::CommentService;

type BoxService = Box<dyn Service>;

pub trait Service: ServiceClone + Send {
  /// Load Service config from AppConfig.
  fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()>;

  /// Setup Service endpoints.
  fn web_config(&self, _web: &mut web::ServiceConfig) {
  }

  fn api_config(&self, _web: &mut web::ServiceConfig) {
  }
}

pub trait ServiceClone {
  fn clone_box(&self) -> BoxService;
}

impl<T> ServiceClone for T
where
    T: 'static + Service + Clone,
{
  fn clone_box(&self) -> BoxService {
    Box::new(self.clone())
  }
}

impl Clone for BoxService {
  fn clone(&self) -> BoxService {
    self.clone_box()
  }
}

/// Per-worker handle to the comment store.
#[derive(Clone)]
pub struct StoreHandle(pub Rc<dyn CommentStore>);

#[derive(Clone)]
enum Backend {
  Postgres(String),
  /// Shared by every worker of every server in this process.
  Memory(MemoryStore),
}

impl Default for Backend {
  fn default() -> Self {
    Backend::Memory(MemoryStore::new())
  }
}

#[derive(Clone, Default)]
pub struct Services {
  backend: Backend,
  services: Vec<BoxService>,
}

impl Services {
  pub fn new() -> Services {
    Default::default()
  }

  fn load_service(&mut self, name: &str, config: &AppConfig, prefix: &str) -> Result<BoxService> {
    let mut service: BoxService = match name {
      "Comment" => Box::new(comment::new_factory()),
      _ => {
        return Err(Error::BadRequest(format!("Unknown Service: {}", name)));
      },
    };

    service.load_app_config(&config, prefix)?;
    Ok(service)
  }

  /// Load Service config from AppConfig.
  pub fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()> {
    // DB config
    self.backend = if config.get_bool("db.memory")?.unwrap_or(false) {
      let articles = config.get_int("memory.articles")?.unwrap_or(0);
      info!("Using in-memory comment store with {} articles", articles);
      Backend::Memory(MemoryStore::with_articles(articles.max(0) as i32))
    } else {
      let db_url = config.get_str("db.url")?
        .ok_or_else(|| Error::BadRequest("db.url must be set".to_string()))?;
      Backend::Postgres(db_url)
    };

    let mut loaded: HashMap<String, bool> = HashMap::new();
    let list = config.get_array(&format!("{}.services", prefix))?
      .ok_or_else(|| Error::BadRequest(format!("missing list of services: {}.services", prefix)))?;
    for name in list.iter() {
      let name = name.clone().into_str()?;
      info!("Loading {}Service config", name);
      // check if it is loaded already.
      if let Some(_) = loaded.get(&name) {
        return Err(Error::BadRequest(format!("can't load service multiple times: {}", name)));
      }
      loaded.insert(name.clone(), true);
      // load service
      let service = self.load_service(&name, config, prefix)?;
      self.services.push(service);
    }
    Ok(())
  }

  fn worker_store(&self) -> Rc<dyn CommentStore> {
    match self.backend {
      Backend::Postgres(ref db_url) => {
        // Create DbService for worker.
        let db = DbService::new(db_url);
        let store: Rc<dyn CommentStore> = db.comments.clone();
        store
      },
      Backend::Memory(ref store) => Rc::new(store.clone()),
    }
  }

  /// Setup Service endpoints.
  pub fn web_config(&self, web: &mut web::ServiceConfig) {
    web.data(StoreHandle(self.worker_store()));

    for service in self.services.iter() {
      service.web_config(web);
    }
    web.service(
      web::scope("/api")
        .configure(|web| {
          for service in self.services.iter() {
            service.api_config(web);
          }
        })
    );
  }
}

pub fn config_services(config: &AppConfig, prefix: &str) -> Result<Services> {
  let mut services = Services::new();
  services.load_app_config(config, prefix)?;
  Ok(services)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn app_config(pairs: &[(&str, config::Value)]) -> AppConfig {
    let mut conf = config::Config::default();
    for (key, val) in pairs {
      conf.set(key, val.clone()).unwrap();
    }
    AppConfig { conf }
  }

  #[test]
  fn test_memory_backend() {
    let config = app_config(&[
      ("db.memory", true.into()),
      ("memory.articles", 3i64.into()),
      ("api.services", vec!["Comment"].into()),
    ]);
    let services = config_services(&config, "api").unwrap();
    assert_eq!(services.services.len(), 1);
    match services.backend {
      Backend::Memory(_) => (),
      Backend::Postgres(_) => panic!("expected memory backend"),
    }
  }

  #[test]
  fn test_rejects_unknown_or_duplicate_service() {
    let config = app_config(&[
      ("db.memory", true.into()),
      ("api.services", vec!["Tag"].into()),
    ]);
    assert!(matches!(config_services(&config, "api"), Err(Error::BadRequest(_))));

    let config = app_config(&[
      ("db.memory", true.into()),
      ("api.services", vec!["Comment", "Comment"].into()),
    ]);
    assert!(matches!(config_services(&config, "api"), Err(Error::BadRequest(_))));
  }

  #[test]
  fn test_postgres_requires_url() {
    let config = app_config(&[
      ("api.services", vec!["Comment"].into()),
    ]);
    assert!(config_services(&config, "api").is_err());
  }
}
