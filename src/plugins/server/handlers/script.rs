use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::HeaderMap,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::truthy;
use crate::{
  gate::{Delivery, Gate, loader},
  prelude::*,
  state::AppState,
  sv::validate::Rejection,
};

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
  token: Option<String>,
}

pub async fn redeem(
  State(app): State<Arc<AppState>>,
  body: Result<Json<RedeemBody>, JsonRejection>,
) -> Response {
  let Some(token) = body.ok().and_then(|Json(body)| body.token) else {
    return Rejection::InvalidToken.into_response();
  };

  let now = Utc::now().naive_utc();
  let grant = match app.tokens.redeem(token.trim(), now).await {
    Ok(Some(grant)) => grant,
    Ok(None) => return Rejection::InvalidToken.into_response(),
    Err(err) => return Rejection::from(err).into_response(),
  };

  let version = match app.sv().game.by_id(grant.game_id).await {
    Ok(game) => game.map(|game| game.script_version),
    Err(err) => return Rejection::from(err).into_response(),
  };

  let url = loader::location(&grant.script_location, &app.config.public_url);

  Json(json::json!({
    "success": true,
    "version": version.unwrap_or_else(|| "1.0.0".into()),
    "script": loader::fetcher(&url),
  }))
  .into_response()
}

#[derive(Debug, Deserialize)]
pub struct DeliverQuery {
  key: Option<String>,
  hwid: Option<String>,
  player_id: Option<String>,
  player_name: Option<String>,
  game_id: Option<String>,
  bypass: Option<String>,
}

pub async fn deliver(
  State(app): State<Arc<AppState>>,
  Path(access_key): Path<String>,
  Query(query): Query<DeliverQuery>,
  headers: HeaderMap,
) -> Response {
  let req = Delivery {
    access_key,
    key: query.key,
    hwid: query.hwid,
    player_id: query.player_id,
    player_name: query.player_name,
    game_id: query.game_id,
    bypass: truthy(query.bypass.as_deref()),
  };

  Gate::new(&app).deliver(&headers, req).await.into_response()
}
