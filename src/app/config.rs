use serde::de::Deserialize;

use clap::ArgMatches;
use config::{Config, ConfigError, Value, File, Environment};

use crate::error::*;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub conf: Config
}

impl AppConfig {
  pub fn new_clap(cli: &ArgMatches) -> Result<Self> {
    let mut conf = Config::default();
    // Load defaults
    conf.merge(File::with_name("conf/default"))?;

    if let Some(config_file) = cli.value_of("config") {
      conf.merge(File::with_name(config_file))?;
    } else {
      // Get RUN_MODE from environment
      let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
      conf.merge(File::with_name(&format!("conf/{}", env)).required(false))?;
    }

    // Allow overrides from environment: APP_DB__URL -> db.url
    conf.merge(Environment::with_prefix("app").separator("__"))?;

    Ok(AppConfig {
      conf,
    })
  }

  pub fn get<'de, T: Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
    Ok(self.conf.get(key).map(Some).or_else(|e| {
      match e {
        ConfigError::NotFound(_) => Ok(None),
        err => Err(err),
      }
    })?)
  }

  pub fn get_str(&self, key: &str) -> Result<Option<String>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_str(val)?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_int(val)?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_bool(val)?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_array(&self, key: &str) -> Result<Option<Vec<Value>>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_array(val)?)
    } else {
      None
    };
    Ok(val)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_keys_are_none() {
    let mut conf = Config::default();
    conf.set("api.workers", 4i64).unwrap();
    conf.set("db.memory", "true").unwrap();
    let config = AppConfig { conf };

    assert_eq!(config.get_int("api.workers").unwrap(), Some(4));
    assert_eq!(config.get_bool("db.memory").unwrap(), Some(true));
    assert_eq!(config.get_str("db.url").unwrap(), None);
    assert!(config.get_array("api.services").unwrap().is_none());
  }

  #[test]
  fn test_wrong_type_is_an_error() {
    let mut conf = Config::default();
    conf.set("api.workers", "many").unwrap();
    let config = AppConfig { conf };

    assert!(matches!(config.get_int("api.workers"), Err(Error::ConfigError { .. })));
  }
}
