use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A joined value that may or may not have been loaded with its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation<T> {
  NotLoaded,
  Loaded(T),
}

impl<T> Relation<T> {
  pub fn is_not_loaded(&self) -> bool {
    matches!(self, Relation::NotLoaded)
  }

  pub fn loaded(&self) -> Option<&T> {
    match self {
      Relation::Loaded(val) => Some(val),
      Relation::NotLoaded => None,
    }
  }
}

impl<T> Default for Relation<T> {
  fn default() -> Self {
    Relation::NotLoaded
  }
}

impl<T> From<Option<T>> for Relation<T> {
  fn from(val: Option<T>) -> Self {
    match val {
      Some(val) => Relation::Loaded(val),
      None => Relation::NotLoaded,
    }
  }
}

impl<T: Serialize> Serialize for Relation<T> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Relation::Loaded(val) => serializer.serialize_some(val),
      Relation::NotLoaded => serializer.serialize_none(),
    }
  }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Relation<T> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Ok(Option::<T>::deserialize(deserializer)?.into())
  }
}
