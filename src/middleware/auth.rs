use log::*;

use futures::future::{ready, Ready};

use actix_web::{
  http::header::{HeaderMap, AUTHORIZATION},
  dev::Payload,
  HttpRequest, FromRequest,
};

use crate::error::*;
use crate::auth::jwt::*;

const TOKEN_PREFIX: &str = "Token ";

pub fn token_from_headers(headers: &HeaderMap) -> Result<Option<String>> {
  let token = match headers.get(AUTHORIZATION) {
    Some(token) => token.to_str().map_err(|_| {
      Error::Unauthorized(json!({
        "error": "Invalid authorization token",
      }))
    })?,
    None => {
      // No authorization provided.  Allow caller to decide if this is an error.
      return Ok(None);
    },
  };
  if !token.starts_with(TOKEN_PREFIX) {
    return Err(Error::Unauthorized(json!({
      "error": "Invalid authorization method",
    })));
  }
  Ok(Some(token[TOKEN_PREFIX.len()..].to_string()))
}

fn authenticate(req: &HttpRequest) -> Result<AuthData> {
  let token = token_from_headers(req.headers())?.ok_or_else(|| {
    Error::Unauthorized(json!({
      "error": "authorization required",
    }))
  })?;
  let auth = decode_token(&token, &get_secret()?)?;
  debug!("Has authorization token: user_id={}", auth.user_id);
  Ok(auth)
}

/// Handlers taking `AuthData` require a valid `Authorization: Token <jwt>`.
impl FromRequest for AuthData {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(authenticate(req))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use actix_web::http::header::HeaderValue;

  #[test]
  fn test_token_prefix() {
    let mut headers = HeaderMap::new();
    assert_eq!(token_from_headers(&headers).unwrap(), None);

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc.def"));
    assert_eq!(token_from_headers(&headers).unwrap(), Some("abc.def".to_string()));

    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
    assert!(matches!(token_from_headers(&headers), Err(Error::Unauthorized(_))));
  }
}
