//! License key validation.
//!
//! The checks run in a fixed order and the first failing one decides the
//! reported `error_code`. Every call leaves exactly one usage log row, with
//! whatever the engine resolved before it stopped.

use std::fmt;

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};

use crate::{
  entity::{BanKind, KeyType, game},
  prelude::*,
  state::AppState,
  sv::{
    key::Bind,
    limit::Throttle,
    token::Grant,
    usage::Attempt,
  },
};

#[derive(Debug, Clone, Default)]
pub struct Request {
  pub key: Option<String>,
  pub hwid: Option<String>,
  pub place_id: Option<i64>,
  pub executor: Option<String>,
  pub player_id: Option<String>,
  pub player_name: Option<String>,
  pub ip: String,
}

#[derive(Debug, Clone)]
pub struct Granted {
  pub user: String,
  pub key_type: KeyType,
  pub expires_at: Option<DateTime>,
  pub total_uses: i64,
  pub token: String,
  pub game: game::Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
  MissingKey,
  InvalidHwid,
  MissingGameId,
  RateLimited { retry_after: TimeDelta },
  GameNotSupported,
  HwidBanned,
  IpBanned,
  InvalidKey,
  KeyDeactivated,
  UserBanned { reason: Option<String> },
  KeyExpired,
  HwidMismatch,
  /// Unknown, spent or expired script token.
  InvalidToken,
  Internal,
}

impl Rejection {
  pub fn code(&self) -> &'static str {
    match self {
      Rejection::MissingKey => "MISSING_KEY",
      Rejection::InvalidHwid => "INVALID_HWID",
      Rejection::MissingGameId => "MISSING_GAME_ID",
      Rejection::RateLimited { .. } => "RATE_LIMITED",
      Rejection::GameNotSupported => "GAME_NOT_SUPPORTED",
      Rejection::HwidBanned => "HWID_BANNED",
      Rejection::IpBanned => "IP_BANNED",
      Rejection::InvalidKey => "INVALID_KEY",
      Rejection::KeyDeactivated => "KEY_DEACTIVATED",
      Rejection::UserBanned { .. } => "USER_BANNED",
      Rejection::KeyExpired => "KEY_EXPIRED",
      Rejection::HwidMismatch => "HWID_MISMATCH",
      Rejection::InvalidToken => "INVALID_TOKEN",
      Rejection::Internal => "INTERNAL_ERROR",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Rejection::MissingKey
      | Rejection::InvalidHwid
      | Rejection::MissingGameId
      | Rejection::GameNotSupported => StatusCode::BAD_REQUEST,
      Rejection::InvalidKey
      | Rejection::KeyDeactivated
      | Rejection::KeyExpired
      | Rejection::InvalidToken => StatusCode::UNAUTHORIZED,
      Rejection::HwidBanned
      | Rejection::IpBanned
      | Rejection::UserBanned { .. }
      | Rejection::HwidMismatch => StatusCode::FORBIDDEN,
      Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
      Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Rejection::MissingKey => f.write_str("License key is required"),
      Rejection::InvalidHwid => f.write_str("Invalid or missing HWID"),
      Rejection::MissingGameId => f.write_str("Game id is required"),
      Rejection::RateLimited { retry_after } => write!(
        f,
        "Too many requests, try again in {}s",
        retry_after.num_seconds().max(1)
      ),
      Rejection::GameNotSupported => f.write_str("This game is not supported"),
      Rejection::HwidBanned => f.write_str("This device has been banned"),
      Rejection::IpBanned => f.write_str("Your IP address has been banned"),
      Rejection::InvalidKey => f.write_str("Invalid license key"),
      Rejection::KeyDeactivated => {
        f.write_str("This key has been deactivated, contact support")
      }
      Rejection::UserBanned { reason: Some(reason) } => {
        write!(f, "Your account has been banned: {reason}")
      }
      Rejection::UserBanned { reason: None } => {
        f.write_str("Your account has been banned")
      }
      Rejection::KeyExpired => f.write_str("This key has expired"),
      Rejection::HwidMismatch => f.write_str(
        "This key is locked to another device, ask support for an HWID reset",
      ),
      Rejection::InvalidToken => f.write_str("Invalid or expired script token"),
      Rejection::Internal => f.write_str("Internal server error"),
    }
  }
}

impl From<Error> for Rejection {
  fn from(err: Error) -> Self {
    error!("Validation failed internally: {err}");
    Rejection::Internal
  }
}

impl IntoResponse for Rejection {
  fn into_response(self) -> Response {
    let mut body = json::json!({
      "success": false,
      "error_code": self.code(),
      "error": self.to_string(),
    });

    match &self {
      Rejection::RateLimited { retry_after } => {
        body["retry_after"] = retry_after.num_milliseconds().into();
        let secs = retry_after.num_seconds().max(1).to_string();
        (self.status(), [(header::RETRY_AFTER, secs)], Json(body))
          .into_response()
      }
      _ => (self.status(), Json(body)).into_response(),
    }
  }
}

/// Cheap structural check done before any storage access.
pub fn valid_hwid(hwid: &str) -> bool {
  (8..=256).contains(&hwid.len())
    && hwid
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "-_:.{}".contains(c))
}

pub struct Validation<'a> {
  app: &'a AppState,
}

impl<'a> Validation<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  pub async fn run(&self, req: Request) -> Result<Granted, Rejection> {
    let mut trail = Attempt {
      hwid: req.hwid.clone().filter(|h| !h.is_empty()),
      executor: req.executor.clone(),
      player_id: req.player_id.clone(),
      player_name: req.player_name.clone(),
      ip: req.ip.clone(),
      ..Default::default()
    };

    let rejection = match self.check(&req, &mut trail).await {
      Ok(granted) => {
        self.app.sv().usage.record(&trail, None).await;
        return Ok(granted);
      }
      Err(rejection) => rejection,
    };

    match rejection.status() {
      StatusCode::BAD_REQUEST => debug!(
        ip = %req.ip,
        "Validation rejected: {}",
        rejection.code()
      ),
      StatusCode::INTERNAL_SERVER_ERROR => {}
      _ => warn!(
        ip = %req.ip,
        hwid = trail.hwid.as_deref().unwrap_or_default(),
        key_id = trail.key_id,
        "Validation rejected: {}",
        rejection.code()
      ),
    }

    self.app.sv().usage.record(&trail, Some(rejection.code())).await;
    Err(rejection)
  }

  async fn check(
    &self,
    req: &Request,
    trail: &mut Attempt,
  ) -> Result<Granted, Rejection> {
    let sv = self.app.sv();
    let now = Utc::now().naive_utc();

    let value = req
      .key
      .as_deref()
      .map(str::trim)
      .filter(|key| !key.is_empty())
      .ok_or(Rejection::MissingKey)?;
    let hwid = req
      .hwid
      .as_deref()
      .map(str::trim)
      .filter(|hwid| valid_hwid(hwid))
      .ok_or(Rejection::InvalidHwid)?;
    let place_id = req.place_id.ok_or(Rejection::MissingGameId)?;

    if let Throttle::Limited { retry_after } =
      self.app.limiter.hit(hwid, now).await?
    {
      return Err(Rejection::RateLimited { retry_after });
    }

    let game = sv
      .game
      .active_by_place(place_id)
      .await?
      .ok_or(Rejection::GameNotSupported)?;
    trail.game_id = Some(game.id);
    trail.game_name = Some(game.name.clone());

    if sv.blacklist.is_banned(BanKind::Hwid, hwid).await? {
      return Err(Rejection::HwidBanned);
    }
    if sv.blacklist.is_banned(BanKind::Ip, &req.ip).await? {
      return Err(Rejection::IpBanned);
    }

    let (key, owner) = sv
      .key
      .by_value_with_owner(value)
      .await?
      .ok_or(Rejection::InvalidKey)?;
    trail.key_id = Some(key.id);

    if !key.is_active {
      return Err(Rejection::KeyDeactivated);
    }
    if let Some(owner) = &owner
      && owner.is_banned
    {
      return Err(Rejection::UserBanned { reason: owner.ban_reason.clone() });
    }
    if key.is_expired(now) {
      return Err(Rejection::KeyExpired);
    }

    match key.hwid.as_deref() {
      Some(bound) if key.hwid_locked && bound != hwid => {
        return Err(Rejection::HwidMismatch);
      }
      Some(_) => {}
      None => match sv.key.bind_hwid(key.id, hwid).await? {
        Bind::Bound => info!("Key {} bound to device {hwid}", key.id),
        Bind::Same => {}
        Bind::Mismatch(_) => return Err(Rejection::HwidMismatch),
      },
    }

    let total_uses =
      sv.key.record_use(key.id, &req.ip, req.executor.as_deref()).await?;

    if let Err(err) = sv.game.increment_executions(game.id).await {
      warn!("Failed to count execution of game {}: {err}", game.id);
    }

    let grant = Grant {
      key_id: key.id,
      game_id: game.id,
      script_location: game.script_url.clone(),
    };
    let token = self.app.tokens.issue(grant, self.app.token_ttl(), now).await?;

    Ok(Granted {
      user: owner
        .as_ref()
        .map_or("User", |owner| owner.display_name())
        .to_string(),
      key_type: key.key_type,
      expires_at: key.expires_at,
      total_uses,
      token,
      game,
    })
  }
}

#[cfg(test)]
mod tests {
  use futures::future::join_all;

  use super::*;
  use crate::{entity::key, sv::test_utils::test_app};

  const HWID: &str = "ABC123-DEVICE-0001";
  const IP: &str = "198.51.100.20";
  const PLACE: i64 = 9999;

  async fn fixture() -> (Arc<AppState>, key::Model) {
    let app = test_app::setup().await;
    let sv = app.sv();
    sv.game
      .create(PLACE, "Blox Fruits", "https://cdn.example.com/hub.lua")
      .await
      .unwrap();
    let key = sv.key.generate(KeyType::Weekly, None, Some("42")).await.unwrap();
    (app, key)
  }

  fn request(key: &str) -> Request {
    Request {
      key: Some(key.to_lowercase()),
      hwid: Some(HWID.into()),
      place_id: Some(PLACE),
      executor: Some("Krnl".into()),
      player_id: Some("1001".into()),
      player_name: Some("builderman".into()),
      ip: IP.into(),
    }
  }

  #[derive(Debug, Clone, Copy)]
  enum Rule {
    MissingKey,
    InvalidHwid,
    MissingGameId,
    RateLimited,
    GameNotSupported,
    HwidBanned,
    IpBanned,
    InvalidKey,
    KeyDeactivated,
    UserBanned,
    KeyExpired,
    HwidMismatch,
  }

  const RULES: [(Rule, &str); 12] = [
    (Rule::MissingKey, "MISSING_KEY"),
    (Rule::InvalidHwid, "INVALID_HWID"),
    (Rule::MissingGameId, "MISSING_GAME_ID"),
    (Rule::RateLimited, "RATE_LIMITED"),
    (Rule::GameNotSupported, "GAME_NOT_SUPPORTED"),
    (Rule::HwidBanned, "HWID_BANNED"),
    (Rule::IpBanned, "IP_BANNED"),
    (Rule::InvalidKey, "INVALID_KEY"),
    (Rule::KeyDeactivated, "KEY_DEACTIVATED"),
    (Rule::UserBanned, "USER_BANNED"),
    (Rule::KeyExpired, "KEY_EXPIRED"),
    (Rule::HwidMismatch, "HWID_MISMATCH"),
  ];

  async fn violate(
    app: &AppState,
    key: &key::Model,
    req: &mut Request,
    rule: Rule,
  ) {
    let sv = app.sv();
    let now = Utc::now().naive_utc();

    match rule {
      Rule::MissingKey => req.key = None,
      Rule::InvalidHwid => req.hwid = Some("bad".into()),
      Rule::MissingGameId => req.place_id = None,
      Rule::RateLimited => {
        let hwid = req.hwid.clone().unwrap();
        for _ in 0..app.config.rate_limit {
          app.limiter.hit(&hwid, now).await.unwrap();
        }
      }
      Rule::GameNotSupported => req.place_id = req.place_id.map(|_| 1),
      Rule::HwidBanned => {
        let hwid = req.hwid.clone().unwrap();
        sv.blacklist.add(BanKind::Hwid, &hwid, None).await.unwrap();
      }
      Rule::IpBanned => {
        sv.blacklist.add(BanKind::Ip, IP, None).await.unwrap();
      }
      Rule::InvalidKey => {
        req.key = req.key.as_ref().map(|_| "KEY-0000-0000-0000-0000".into())
      }
      Rule::KeyDeactivated => {
        sv.key.set_active(&key.value, false).await.unwrap();
      }
      Rule::UserBanned => {
        sv.user.set_banned("42", true, Some("chargeback".into())).await.unwrap();
      }
      Rule::KeyExpired => {
        let current = sv.key.by_id(key.id).await.unwrap().unwrap();
        key::ActiveModel {
          expires_at: Set(Some(now - TimeDelta::hours(1))),
          ..current.into()
        }
        .update(&app.db)
        .await
        .unwrap();
      }
      Rule::HwidMismatch => {
        sv.key.bind_hwid(key.id, "OTHER-DEVICE-9999").await.unwrap();
      }
    }
  }

  #[tokio::test]
  async fn test_first_violated_rule_wins() {
    for i in 0..RULES.len() {
      for j in i..RULES.len() {
        let (app, key) = fixture().await;
        let mut req = request(&key.value);

        for (rule, _) in [RULES[i], RULES[j]] {
          violate(&app, &key, &mut req, rule).await;
        }

        let expected = RULES[i].1;
        let err = Validation::new(&app).run(req).await.unwrap_err();
        assert_eq!(err.code(), expected, "{:?} + {:?}", RULES[i].0, RULES[j].0);

        let logs = app.sv().usage.attempts().await.unwrap();
        assert_eq!(logs.len(), 1, "{:?} + {:?}", RULES[i].0, RULES[j].0);
        assert!(!logs[0].success);
        assert_eq!(logs[0].error_type.as_deref(), Some(expected));
      }
    }
  }

  #[tokio::test]
  async fn test_happy_path() {
    let (app, key) = fixture().await;

    let granted = Validation::new(&app).run(request(&key.value)).await.unwrap();

    assert_eq!(granted.user, "User");
    assert_eq!(granted.key_type, KeyType::Weekly);
    assert_eq!(granted.expires_at, key.expires_at);
    assert_eq!(granted.total_uses, 1);
    assert_eq!(granted.game.place_id, PLACE);

    let now = Utc::now().naive_utc();
    let grant = app.tokens.redeem(&granted.token, now).await.unwrap().unwrap();
    assert_eq!(grant.key_id, key.id);
    assert_eq!(grant.script_location, "https://cdn.example.com/hub.lua");

    let key = app.sv().key.by_id(key.id).await.unwrap().unwrap();
    assert_eq!(key.hwid.as_deref(), Some(HWID));
    assert!(key.hwid_locked);
    assert_eq!(key.last_used_ip.as_deref(), Some(IP));
    assert_eq!(key.last_executor.as_deref(), Some("Krnl"));

    let game = app.sv().game.by_id(granted.game.id).await.unwrap().unwrap();
    assert_eq!(game.total_executions, 1);

    let logs = app.sv().usage.attempts().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].success);
    assert_eq!(logs[0].game_name.as_deref(), Some("Blox Fruits"));
  }

  #[tokio::test]
  async fn test_concurrent_first_use_binds_once() {
    let (app, key) = fixture().await;

    let requests = ["DEVICE-AAAA-0001", "DEVICE-BBBB-0002"]
      .map(|hwid| Request { hwid: Some(hwid.into()), ..request(&key.value) });
    let app = &app;
    let results = join_all(
      requests
        .into_iter()
        .map(|req| async move { Validation::new(app).run(req).await }),
    )
    .await;

    let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(
      results.iter().any(|r| matches!(r, Err(Rejection::HwidMismatch)))
    );

    let bound = app.sv().key.by_id(key.id).await.unwrap().unwrap().hwid;
    let winner =
      if results[0].is_ok() { "DEVICE-AAAA-0001" } else { "DEVICE-BBBB-0002" };
    assert_eq!(bound.as_deref(), Some(winner));

    let again = Request { hwid: Some(winner.into()), ..request(&key.value) };
    assert!(Validation::new(&app).run(again).await.is_ok());
  }

  #[tokio::test]
  async fn test_rate_limit_per_hwid() {
    let (app, key) = fixture().await;

    for _ in 0..10 {
      Validation::new(&app).run(request(&key.value)).await.unwrap();
    }

    let err = Validation::new(&app).run(request(&key.value)).await.unwrap_err();
    let Rejection::RateLimited { retry_after } = err else {
      panic!("expected rate limit, got {err:?}");
    };
    assert!(retry_after <= TimeDelta::seconds(60));
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

    let logs = app.sv().usage.attempts().await.unwrap();
    assert_eq!(logs.len(), 11);
    assert_eq!(logs[10].error_type.as_deref(), Some("RATE_LIMITED"));
  }

  #[tokio::test]
  async fn test_unlocked_binding_is_not_enforced() {
    let (app, key) = fixture().await;
    let sv = app.sv();

    sv.key.bind_hwid(key.id, "OTHER-DEVICE-9999").await.unwrap();
    let current = sv.key.by_id(key.id).await.unwrap().unwrap();
    key::ActiveModel { hwid_locked: Set(false), ..current.into() }
      .update(&app.db)
      .await
      .unwrap();

    assert!(Validation::new(&app).run(request(&key.value)).await.is_ok());
    let key = sv.key.by_id(key.id).await.unwrap().unwrap();
    assert_eq!(key.hwid.as_deref(), Some("OTHER-DEVICE-9999"));
  }

  #[test]
  fn test_ban_reason_in_message() {
    let banned = Rejection::UserBanned { reason: Some("chargeback".into()) };
    assert_eq!(banned.to_string(), "Your account has been banned: chargeback");
    assert_eq!(banned.status(), StatusCode::FORBIDDEN);
  }

  #[test]
  fn test_hwid_shape() {
    assert!(valid_hwid(HWID));
    assert!(valid_hwid("{1A2B3C4D-0000-1111-2222-333344445555}"));
    assert!(!valid_hwid("short"));
    assert!(!valid_hwid("has spaces in it"));
    assert!(!valid_hwid(&"A".repeat(257)));
  }
}
