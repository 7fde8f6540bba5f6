use serde::{Deserialize, Serialize};

use jsonwebtoken::{
  encode, Header, EncodingKey,
  decode, DecodingKey,
  Validation
};

use crate::error::*;
use crate::models::Requestor;

/// Identity of the caller, as vouched for by whoever issued the token.
#[derive(Debug, Default, Clone)]
pub struct AuthData {
  pub user_id: i32,
  /// Moderation capability granted by the issuer; never computed here.
  pub moderator: bool,
  pub token: String,
}

impl AuthData {
  pub fn requestor(&self) -> Requestor {
    Requestor {
      user_id: self.user_id,
      moderator: self.moderator,
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub id: i32,
  pub exp: i64,
  #[serde(default, rename = "mod")]
  pub moderator: bool,
}

pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String> {
  let key = EncodingKey::from_secret(secret.as_ref());
  Ok(encode(&Header::default(), claims, &key)?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthData> {
  let key = DecodingKey::from_secret(secret.as_ref());
  let token_data = decode::<Claims>(token, &key, &Validation::default())?;
  Ok(AuthData {
    user_id: token_data.claims.id,
    moderator: token_data.claims.moderator,
    token: token.to_string(),
  })
}

pub fn get_secret() -> Result<String> {
  dotenv::var("JWT_SECRET").map_err(|_| {
    log::error!("Missing JWT_SECRET environment variable.");
    Error::InternalServerError
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  use chrono::{Duration, Utc};

  fn exp() -> i64 {
    (Utc::now() + Duration::days(1)).timestamp()
  }

  #[test]
  fn test_decode_carries_moderator_claim() {
    let token = encode_claims(&Claims { id: 5, exp: exp(), moderator: true }, "s3cret").unwrap();
    let auth = decode_token(&token, "s3cret").unwrap();
    assert_eq!(auth.user_id, 5);
    assert_eq!(auth.requestor(), Requestor::moderator(5));
  }

  #[test]
  fn test_decode_rejects_wrong_secret() {
    let token = encode_claims(&Claims { id: 5, exp: exp(), moderator: false }, "one").unwrap();
    assert!(matches!(decode_token(&token, "two"), Err(Error::JwtError { .. })));
  }
}
