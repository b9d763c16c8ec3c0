use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::HeaderMap,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
  prelude::*,
  state::AppState,
  sv::validate::{Request, Validation},
};

#[derive(Debug, Default, Deserialize)]
pub struct ValidateBody {
  key: Option<String>,
  hwid: Option<String>,
  executor: Option<String>,
  game_id: Option<json::Value>,
  place_id: Option<json::Value>,
  player_id: Option<json::Value>,
  player_name: Option<String>,
}

/// Lua clients send ids as numbers or strings.
fn as_text(value: &json::Value) -> Option<String> {
  match value {
    json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
    json::Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn place_id(value: Option<&json::Value>) -> Option<i64> {
  match value? {
    json::Value::Number(n) => {
      n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
    }
    json::Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

pub async fn validate(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Result<Json<ValidateBody>, JsonRejection>,
) -> Response {
  let body = match body {
    Ok(Json(body)) => body,
    Err(err) => {
      debug!("Unreadable validate body: {err}");
      ValidateBody::default()
    }
  };

  let req = Request {
    place_id: place_id(body.game_id.as_ref())
      .or_else(|| place_id(body.place_id.as_ref())),
    key: body.key,
    hwid: body.hwid,
    executor: body.executor.filter(|e| !e.trim().is_empty()),
    player_id: body.player_id.as_ref().and_then(as_text),
    player_name: body.player_name,
    ip: utils::client_ip(&headers),
  };

  match Validation::new(&app).run(req).await {
    Ok(granted) => Json(json::json!({
      "success": true,
      "user": granted.user,
      "key_type": granted.key_type,
      "expires_at": granted.expires_at,
      "total_uses": granted.total_uses,
      "script_token": granted.token,
      "game": {
        "name": granted.game.name,
        "version": granted.game.script_version,
        "script_url": granted.game.script_url,
      },
    }))
    .into_response(),
    Err(rejection) => rejection.into_response(),
  }
}
