use log::*;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::Value as JsonValue;

use jsonwebtoken::errors::Error as JwtError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  // 401
  #[error("unauthorized: {0}")]
  Unauthorized(JsonValue),

  // 403
  #[error("forbidden: {0}")]
  Forbidden(String),

  // 404
  #[error("not found: {0}")]
  NotFound(String),

  // 409
  #[error("conflict: {0}")]
  Conflict(String),

  // 422
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  // 400
  #[error("bad request: {0}")]
  BadRequest(String),

  // 500
  #[error("internal server error")]
  InternalServerError,

  #[error("Json error: {source}")]
  JsonError {
    #[from]
    source: serde_json::Error,
  },

  #[error("JWT error")]
  JwtError {
    #[from]
    source: JwtError,
  },

  #[error("disconnected: {0}")]
  DisconnectedError(String),

  #[error("postgres error")]
  PgError {
    #[from]
    source: tokio_postgres::error::Error,
  },

  #[error("std io error")]
  IOError {
    #[from]
    source: std::io::Error,
  },

  #[error("config error")]
  ConfigError {
    #[from]
    source: config::ConfigError,
  },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl Error {
  pub fn not_found(what: &str, id: i32) -> Self {
    Error::NotFound(format!("{} {} does not exist", what, id))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn error_body(message: &str) -> JsonValue {
  json!({ "error": message })
}

// Domain errors map onto 4xx responses, everything else is logged and hidden.
impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::BadRequest(_) | Error::JsonError { .. } => StatusCode::BAD_REQUEST,
      Error::JwtError { .. } => StatusCode::UNAUTHORIZED,
      Error::DisconnectedError(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    match self {
      Error::Unauthorized(ref message) => HttpResponse::build(status).json(message),
      Error::Forbidden(ref message)
      | Error::NotFound(ref message)
      | Error::Conflict(ref message)
      | Error::InvalidArgument(ref message)
      | Error::BadRequest(ref message)
      | Error::DisconnectedError(ref message) => {
        HttpResponse::build(status).json(error_body(message))
      },
      Error::JsonError { ref source } => {
        HttpResponse::build(status).json(error_body(&source.to_string()))
      },
      Error::JwtError { .. } => {
        HttpResponse::build(status).json(error_body("Invalid authorization token"))
      },
      ref err => {
        error!("InternalServerError: {:?}", err);
        HttpResponse::build(status).json("Internal Server Error")
      },
    }
  }
}
