//! Script delivery gate: decides whether a request gets Lua source, and in
//! which form.

pub mod executor;
pub mod loader;
pub mod obfuscation;

use axum::{
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};

use self::executor::Client;
use crate::{entity::script, prelude::*, state::AppState, sv::usage::Load};

const DENIED_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>403 Forbidden</title></head>
<body>
<h1>Access Denied</h1>
<p>You don't have permission to access this resource.</p>
</body>
</html>
"#;

#[derive(Debug, Clone, Default)]
pub struct Delivery {
  pub access_key: String,
  pub key: Option<String>,
  pub hwid: Option<String>,
  pub player_id: Option<String>,
  pub player_name: Option<String>,
  pub game_id: Option<String>,
  pub bypass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Browser-facing 403 page.
  Denied,
  /// Valid Lua that does nothing, served with 200.
  Inert(&'static str),
  Script(String),
  Failed,
}

impl Outcome {
  pub fn body(&self) -> String {
    match self {
      Outcome::Denied => DENIED_PAGE.to_string(),
      Outcome::Inert(reason) => format!("-- {reason}\nreturn nil\n"),
      Outcome::Script(lua) => lua.clone(),
      Outcome::Failed => "-- Internal error, try again later\nreturn nil\n".into(),
    }
  }
}

impl IntoResponse for Outcome {
  fn into_response(self) -> Response {
    let (status, content_type) = match &self {
      Outcome::Denied => (StatusCode::FORBIDDEN, "text/html; charset=utf-8"),
      Outcome::Failed => {
        (StatusCode::INTERNAL_SERVER_ERROR, "text/plain; charset=utf-8")
      }
      _ => (StatusCode::OK, "text/plain; charset=utf-8"),
    };

    let mut res = (status, self.body()).into_response();
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
      header::CACHE_CONTROL,
      HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert("x-robots-tag", HeaderValue::from_static("noindex, nofollow"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers
      .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    res
  }
}

pub struct Gate<'a> {
  app: &'a AppState,
}

impl<'a> Gate<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  pub async fn deliver(&self, headers: &HeaderMap, req: Delivery) -> Outcome {
    match self.try_deliver(headers, &req).await {
      Ok(outcome) => outcome,
      Err(err) => {
        error!("Delivery of `{}` failed: {err}", req.access_key);
        Outcome::Failed
      }
    }
  }

  async fn try_deliver(
    &self,
    headers: &HeaderMap,
    req: &Delivery,
  ) -> Result<Outcome> {
    let sv = self.app.sv();
    let bypass = req.bypass && self.app.config.dev_bypass_active();
    let client = executor::classify(headers, bypass);

    let mut load = Load {
      ip: utils::client_ip(headers),
      user_agent: Some(utils::user_agent(headers)).filter(|ua| !ua.is_empty()),
      executor: Some(client.name().to_string()),
      hwid: req.hwid.clone(),
      player_id: req.player_id.clone(),
      player_name: req.player_name.clone(),
      game_id: req.game_id.clone(),
      key_value: req.key.clone(),
      ..Default::default()
    };

    if !client.is_executor() {
      warn!(
        ip = %load.ip,
        "Denied `{}` to non-executor client `{}`",
        req.access_key,
        client.name()
      );
      sv.usage.record_load(&load, Some("not an executor")).await;
      return Ok(Outcome::Denied);
    }

    let Some(script) = sv.script.active_by_access_key(&req.access_key).await?
    else {
      debug!("Unknown script `{}`", req.access_key);
      return Ok(Outcome::Inert("Script not found"));
    };
    load.script_id = Some(script.id);

    if let Some(refusal) = refuse(&script, &client, req.game_id.as_deref()) {
      sv.usage.record_load(&load, Some(refusal)).await;
      return Ok(Outcome::Inert(refusal));
    }

    if let Err(err) = sv.script.record_load(script.id).await {
      warn!("Failed to count load of script {}: {err}", script.id);
    }
    sv.usage.record_load(&load, None).await;

    let check = script
      .require_key
      .then(|| loader::key_check(&self.app.config.public_url));

    let lua = if obfuscation::is_obfuscated(&script.script_content) {
      debug!("Serving `{}` as pre-obfuscated", script.access_key);
      loader::passthrough(&script.name, &script.script_content, check.as_deref())
    } else {
      let key = sv.script.encryption_key(&script).await?;
      loader::encrypted(
        &script.name,
        &script.script_content,
        &key,
        check.as_deref(),
      )
    };

    Ok(Outcome::Script(lua))
  }
}

/// Allow-list checks. Empty lists allow everything.
fn refuse(
  script: &script::Model,
  client: &Client,
  game_id: Option<&str>,
) -> Option<&'static str> {
  let games = script.allowed_games();
  if let Some(game_id) = game_id.map(str::trim).filter(|id| !id.is_empty())
    && !games.is_empty()
    && !games.iter().any(|allowed| allowed == game_id)
  {
    return Some("This script is not available in this game");
  }

  let executors = script.allowed_executors();
  let name = client.name().to_lowercase();
  if !executors.is_empty()
    && !executors.iter().any(|allowed| name.contains(&allowed.to_lowercase()))
  {
    return Some("This script does not support your executor");
  }

  None
}

#[cfg(test)]
mod tests {
  use axum::http::header::USER_AGENT;

  use super::*;
  use crate::{
    config::{Config, Mode},
    sv::{script::NewScript, test_utils::test_app},
  };

  fn headers(ua: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(ua));
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
    headers
  }

  fn delivery(access_key: &str) -> Delivery {
    Delivery { access_key: access_key.into(), ..Default::default() }
  }

  async fn hub(app: &AppState, require_key: bool) -> script::Model {
    app
      .sv()
      .script
      .create(NewScript {
        access_key: "hub".into(),
        name: "Hub".into(),
        content: "print('hub loaded')".into(),
        require_key,
        allowed_games: vec!["9999".into()],
        allowed_executors: vec!["krnl".into(), "synapse".into()],
      })
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_browser_gets_html_page() {
    let app = test_app::setup().await;
    hub(&app, false).await;

    let outcome = Gate::new(&app)
      .deliver(&headers("Mozilla/5.0 (X11; Linux) Firefox/128.0"), delivery("hub"))
      .await;
    assert_eq!(outcome, Outcome::Denied);

    let res = outcome.into_response();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert!(res.headers()[header::CONTENT_TYPE].to_str().unwrap().contains("html"));

    let loads = app.sv().usage.loads().await.unwrap();
    assert_eq!(loads.len(), 1);
    assert!(!loads[0].success);
    assert_eq!(loads[0].ip_address, "198.51.100.4");
  }

  #[tokio::test]
  async fn test_missing_script_is_inert() {
    let app = test_app::setup().await;

    let outcome = Gate::new(&app).deliver(&headers("KRNL/2.1"), delivery("nope")).await;
    assert_eq!(outcome, Outcome::Inert("Script not found"));

    let res = outcome.into_response();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-robots-tag"], "noindex, nofollow");
    assert!(res.headers()[header::CACHE_CONTROL].to_str().unwrap().contains("no-store"));
  }

  #[tokio::test]
  async fn test_allow_lists() {
    let app = test_app::setup().await;
    hub(&app, false).await;
    let gate = Gate::new(&app);

    let wrong_game = Delivery { game_id: Some("1".into()), ..delivery("hub") };
    let outcome = gate.deliver(&headers("KRNL/2.1"), wrong_game).await;
    assert!(matches!(outcome, Outcome::Inert(reason) if reason.contains("game")));

    let outcome = gate.deliver(&headers("Fluxus/1.0 Android"), delivery("hub")).await;
    assert!(matches!(outcome, Outcome::Inert(reason) if reason.contains("executor")));

    let loads = app.sv().usage.loads().await.unwrap();
    assert_eq!(loads.len(), 2);
    assert!(loads.iter().all(|load| !load.success && load.error.is_some()));
  }

  #[tokio::test]
  async fn test_encrypted_delivery_reuses_key() {
    let app = test_app::setup().await;
    let script = hub(&app, true).await;
    let gate = Gate::new(&app);

    let req = Delivery { game_id: Some("9999".into()), ..delivery("hub") };
    let Outcome::Script(first) = gate.deliver(&headers("KRNL/2.1"), req.clone()).await
    else {
      panic!("expected a script");
    };
    let Outcome::Script(second) = gate.deliver(&headers("KRNL/2.1"), req).await else {
      panic!("expected a script");
    };

    let stored = app.sv().script.active_by_access_key("hub").await.unwrap().unwrap();
    let key = stored.encryption_key.clone().unwrap();
    let payload = loader::encrypt(&script.script_content, &key);

    assert!(first.contains(&payload));
    assert!(second.contains(&payload));
    assert!(first.contains("script_key"));
    assert!(!first.contains("hub loaded"));
    assert_eq!(stored.total_loads, 2);
  }

  #[tokio::test]
  async fn test_obfuscated_script_passes_through() {
    let app = test_app::setup().await;
    let mut content = String::from("-- obfuscated with a real obfuscator\n");
    content.push_str(&format!("local {} = 1\n", "v".repeat(48)));
    content.push_str(&"bit32.bxor(1, 2)\n".repeat(3));
    content.push_str(&"table.concat(t)\n".repeat(3));
    content.push_str("local f = loadstring(s)\n");
    while content.len() < 120_000 {
      content.push_str("local value = value + 1\n");
    }

    app
      .sv()
      .script
      .create(NewScript {
        access_key: "packed".into(),
        name: "Packed".into(),
        content: content.clone(),
        ..Default::default()
      })
      .await
      .unwrap();

    let Outcome::Script(lua) =
      Gate::new(&app).deliver(&headers("Delta/Android"), delivery("packed")).await
    else {
      panic!("expected a script");
    };
    assert!(lua.ends_with(&content));
    assert!(!lua.contains("script_key"));

    let stored = app.sv().script.active_by_access_key("packed").await.unwrap().unwrap();
    assert_eq!(stored.encryption_key, None);
  }

  #[tokio::test]
  async fn test_tool_bypass_needs_development_mode() {
    let app = test_app::setup().await;
    hub(&app, false).await;
    let req = Delivery { bypass: true, ..delivery("nope") };

    let outcome =
      Gate::new(&app).deliver(&headers("PostmanRuntime/7.36.0"), req.clone()).await;
    assert_eq!(outcome, Outcome::Denied);

    let config = Config {
      mode: Mode::Development,
      dev_bypass: true,
      ..test_app::config()
    };
    let app = test_app::setup_with(config).await;
    let outcome =
      Gate::new(&app).deliver(&headers("PostmanRuntime/7.36.0"), req).await;
    assert_eq!(outcome, Outcome::Inert("Script not found"));
  }
}
