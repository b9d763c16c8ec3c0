use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Db(#[from] sea_orm::DbErr),

  #[error("license key not found")]
  KeyNotFound,

  #[error("user not found")]
  UserNotFound,

  #[error("game not found")]
  GameNotFound,

  #[error("session not found")]
  SessionNotFound,

  #[error("session expired")]
  SessionExpired,

  #[error("session is already being completed")]
  SessionBusy,

  #[error("provider `{provider}` is not configured")]
  ProviderNotConfigured {
    provider: String,
    session: Option<String>,
    hint: String,
  },

  #[error("provider `{provider}` rejected session `{session}`: {reason}")]
  Verification { provider: String, session: String, reason: String },

  #[error("invalid arguments: {0}")]
  InvalidArgs(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  fn status(&self) -> StatusCode {
    match self {
      Error::KeyNotFound
      | Error::UserNotFound
      | Error::GameNotFound
      | Error::SessionNotFound
      | Error::ProviderNotConfigured { .. } => StatusCode::NOT_FOUND,
      Error::SessionExpired => StatusCode::GONE,
      Error::SessionBusy => StatusCode::CONFLICT,
      Error::Verification { .. } | Error::InvalidArgs(_) => {
        StatusCode::BAD_REQUEST
      }
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Db(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let body = match &self {
      Error::ProviderNotConfigured { provider, session, hint } => {
        warn!("{self}: {hint}");
        json::json!({
          "success": false,
          "error": "Provider not configured",
          "provider": provider,
          "session": session,
          "hint": hint,
        })
      }
      Error::Verification { provider, session, reason } => {
        warn!("{self}");
        json::json!({
          "success": false,
          "error": "Verification failed",
          "provider": provider,
          "session": session,
          "hint": reason,
        })
      }
      Error::Db(_) | Error::Internal(_) => {
        error!("request failed: {self}");
        json::json!({ "success": false, "error": "Internal server error" })
      }
      other => json::json!({ "success": false, "error": other.to_string() }),
    };

    (self.status(), Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
