//! Machine-to-machine admin surface, guarded by a bearer secret.

use axum::{
  Json,
  extract::{FromRequestParts, Path, State, rejection::JsonRejection},
  http::{header, request::Parts},
};
use serde::Deserialize;

use crate::{
  entity::{BanKind, IpCheck, KeyType},
  prelude::*,
  state::AppState,
  sv::script::NewScript,
};

const MAX_BATCH: u32 = 100;

/// Proof that the request carried `Authorization: Bearer <ADMIN_SECRET>`.
pub struct Admin;

impl FromRequestParts<Arc<AppState>> for Admin {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self, Self::Rejection> {
    let presented = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .map(str::trim);

    match presented {
      Some(secret)
        if !app.config.admin_secret.is_empty()
          && utils::secret_matches(secret, &app.config.admin_secret) =>
      {
        Ok(Admin)
      }
      _ => {
        warn!("Rejected admin call to {}", parts.uri.path());
        Err(Error::Unauthorized)
      }
    }
  }
}

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T> {
  body.map(|Json(body)| body).map_err(|err| Error::InvalidArgs(err.body_text()))
}

fn ok() -> Json<json::Value> {
  Json(json::json!({ "success": true }))
}

#[derive(Debug, Deserialize)]
pub struct GenerateKeys {
  key_type: KeyType,
  duration_days: Option<u32>,
  discord_id: Option<String>,
  count: Option<u32>,
}

pub async fn generate_keys(
  _: Admin,
  State(app): State<Arc<AppState>>,
  req: Result<Json<GenerateKeys>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  let count = req.count.unwrap_or(1);
  if !(1..=MAX_BATCH).contains(&count) {
    return Err(Error::InvalidArgs(format!("count must be 1..={MAX_BATCH}")));
  }

  let mut keys = Vec::with_capacity(count as usize);
  for _ in 0..count {
    let key = app
      .sv()
      .key
      .generate(req.key_type, req.duration_days, req.discord_id.as_deref())
      .await?;
    keys.push(json::json!({
      "key": key.value,
      "key_type": key.key_type,
      "expires_at": key.expires_at,
    }));
  }

  info!("Generated {count} {:?} key(s)", req.key_type);
  Ok(Json(json::json!({ "success": true, "keys": keys })))
}

pub async fn reset_hwid(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(value): Path<String>,
) -> Result<Json<json::Value>> {
  let key = app.sv().key.reset_hwid(&value).await?;
  info!("HWID reset for key {}", key.id);
  Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct SetActive {
  active: bool,
}

pub async fn set_key_active(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(value): Path<String>,
  req: Result<Json<SetActive>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  let key = app.sv().key.set_active(&value, req.active).await?;
  Ok(Json(json::json!({ "success": true, "is_active": key.is_active })))
}

pub async fn delete_key(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(value): Path<String>,
) -> Result<Json<json::Value>> {
  app.sv().key.delete(&value).await?;
  Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct BlacklistEntry {
  kind: BanKind,
  value: String,
  reason: Option<String>,
}

pub async fn blacklist_add(
  _: Admin,
  State(app): State<Arc<AppState>>,
  req: Result<Json<BlacklistEntry>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  let value = req.value.trim();
  if value.is_empty() {
    return Err(Error::InvalidArgs("value must not be empty".into()));
  }

  let entry = app.sv().blacklist.add(req.kind, value, req.reason).await?;
  Ok(Json(json::json!({ "success": true, "id": entry.id })))
}

pub async fn blacklist_remove(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path((kind, value)): Path<(BanKind, String)>,
) -> Result<Json<json::Value>> {
  let removed = app.sv().blacklist.remove(kind, &value).await?;
  Ok(Json(json::json!({ "success": true, "removed": removed })))
}

#[derive(Debug, Default, Deserialize)]
pub struct Ban {
  reason: Option<String>,
}

pub async fn ban_user(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(discord_id): Path<String>,
  req: Result<Json<Ban>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = req.map(|Json(req)| req).unwrap_or_default();
  let sv = app.sv();

  sv.user.get_or_create(&discord_id, None).await?;
  sv.user.set_banned(&discord_id, true, req.reason).await?;

  info!("Banned user {discord_id}");
  Ok(ok())
}

pub async fn unban_user(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(discord_id): Path<String>,
) -> Result<Json<json::Value>> {
  app.sv().user.set_banned(&discord_id, false, None).await?;
  Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct NewGame {
  place_id: i64,
  name: String,
  script_url: String,
}

pub async fn create_game(
  _: Admin,
  State(app): State<Arc<AppState>>,
  req: Result<Json<NewGame>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  let game = app.sv().game.create(req.place_id, &req.name, &req.script_url).await?;
  Ok(Json(json::json!({ "success": true, "id": game.id })))
}

pub async fn set_game_active(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
  req: Result<Json<SetActive>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  app.sv().game.set_active(id, req.active).await?;
  Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct CreateScript {
  access_key: String,
  name: String,
  content: String,
  #[serde(default)]
  require_key: bool,
  #[serde(default)]
  allowed_games: Vec<String>,
  #[serde(default)]
  allowed_executors: Vec<String>,
}

pub async fn create_script(
  _: Admin,
  State(app): State<Arc<AppState>>,
  req: Result<Json<CreateScript>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  if req.access_key.trim().is_empty() {
    return Err(Error::InvalidArgs("access_key must not be empty".into()));
  }

  let script = app
    .sv()
    .script
    .create(NewScript {
      access_key: req.access_key.trim().to_string(),
      name: req.name,
      content: req.content,
      require_key: req.require_key,
      allowed_games: req.allowed_games,
      allowed_executors: req.allowed_executors,
    })
    .await?;
  Ok(Json(json::json!({ "success": true, "id": script.id })))
}

#[derive(Debug, Deserialize)]
pub struct ConfigureProvider {
  is_active: bool,
  key_duration_days: i32,
  #[serde(default)]
  ip_check: IpCheck,
}

pub async fn configure_provider(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(id): Path<String>,
  req: Result<Json<ConfigureProvider>, JsonRejection>,
) -> Result<Json<json::Value>> {
  let req = body(req)?;
  if app.providers.get(&id).is_none() {
    return Err(Error::InvalidArgs(format!("unknown provider `{id}`")));
  }

  let provider = app
    .sv()
    .provider
    .configure(&id, req.is_active, req.key_duration_days, req.ip_check)
    .await?;

  info!(
    "Provider `{id}` configured: active={}, days={}, ip_check={:?}",
    provider.is_active, provider.key_duration_days, provider.ip_check
  );
  Ok(Json(json::json!({ "success": true, "provider": provider })))
}
