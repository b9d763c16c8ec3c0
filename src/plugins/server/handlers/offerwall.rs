use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::HeaderMap,
};
use serde::Deserialize;

use crate::{
  entity::SessionStatus,
  offerwall::Bridge,
  prelude::*,
  state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
  session: Option<String>,
  sr: Option<String>,
  token: Option<String>,
}

pub async fn callback(
  State(app): State<Arc<AppState>>,
  Path(provider): Path<String>,
  Query(query): Query<CallbackQuery>,
  headers: HeaderMap,
) -> Result<Json<json::Value>> {
  let session = query
    .session
    .or(query.sr)
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| Error::InvalidArgs("missing session id".into()))?;

  let issued = Bridge::new(&app)
    .complete(
      &provider,
      session.trim(),
      query.token.as_deref(),
      &utils::client_ip(&headers),
      SessionStatus::Completed,
    )
    .await?;

  let message =
    if issued.repeated { "Key already issued" } else { "Key issued" };

  Ok(Json(json::json!({
    "success": true,
    "message": message,
    "key": issued.key,
    "expires_at": issued.expires_at,
  })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyKeyBody {
  session_id: String,
  key: String,
}

pub async fn platoboost_verify(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Result<Json<VerifyKeyBody>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let Json(body) =
    body.map_err(|err| Error::InvalidArgs(err.body_text()))?;

  let issued = Bridge::new(&app)
    .complete(
      "platoboost",
      body.session_id.trim(),
      Some(&body.key),
      &utils::client_ip(&headers),
      SessionStatus::Redeemed,
    )
    .await?;

  Ok(Json(json::json!({
    "success": true,
    "game_key": issued.key,
    "expires_at": issued.expires_at,
  })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionBody {
  discord_id: Option<String>,
  session_id: Option<String>,
}

pub async fn create_session(
  State(app): State<Arc<AppState>>,
  Path(provider): Path<String>,
  body: Result<Json<SessionBody>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let body = body.map(|Json(body)| body).unwrap_or_default();
  let sv = app.sv();

  let active = sv.provider.by_id(&provider).await?.is_some_and(|p| p.is_active);
  if !active || app.providers.get(&provider).is_none() {
    return Err(Error::ProviderNotConfigured {
      hint: format!(
        "provider is missing or disabled, configure it with POST /admin/providers/{provider}"
      ),
      provider,
      session: None,
    });
  }

  let session = sv
    .provider
    .create_session(
      &provider,
      body.session_id,
      body.discord_id.filter(|id| !id.trim().is_empty()),
      app.session_ttl(),
    )
    .await?;

  info!("Opened `{provider}` session `{}`", session.session_id);

  Ok(Json(json::json!({
    "success": true,
    "session_id": session.session_id,
    "expires_at": session.expires_at,
  })))
}

pub async fn start_session(
  State(app): State<Arc<AppState>>,
  Path(session_id): Path<String>,
) -> Result<Json<json::Value>> {
  let sv = app.sv();
  let now = Utc::now().naive_utc();

  let session = sv.provider.session(&session_id).await?.ok_or(Error::SessionNotFound)?;
  if session.status == SessionStatus::Expired
    || (!session.status.is_terminal() && session.expires_at <= now)
  {
    return Err(Error::SessionExpired);
  }

  let started = sv.provider.start(&session_id).await?;
  let status = if started { SessionStatus::Started } else { session.status };

  Ok(Json(json::json!({ "success": true, "status": status })))
}
