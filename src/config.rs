use std::env;

use anyhow::{Context, bail};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Production,
  Development,
}

/// Where script tokens and rate-limit windows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
  /// Shared across every instance pointing at the same database.
  Database,
  /// Process-local, only correct for a single instance.
  Memory,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
  pub base_url: Option<String>,
  pub service_id: Option<String>,
  pub secret: Option<String>,
  pub ip_salt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub admin_secret: String,
  pub mode: Mode,
  pub dev_bypass: bool,
  pub public_url: String,
  pub store: Store,
  pub rate_limit: u32,
  pub rate_window: Duration,
  pub token_ttl: Duration,
  pub session_ttl: Duration,
  pub provider_timeout: Duration,
  pub providers: HashMap<String, Credentials>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:keygate.db?mode=rwc"),
      port: 3000,
      admin_secret: String::new(),
      mode: Mode::Production,
      dev_bypass: false,
      public_url: String::from("http://localhost:3000"),
      store: Store::Database,
      rate_limit: 10,
      rate_window: Duration::from_secs(60),
      token_ttl: Duration::from_secs(5 * 60),
      session_ttl: Duration::from_secs(30 * 60),
      provider_timeout: Duration::from_secs(5),
      providers: HashMap::new(),
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let mut config = Self::default();

    config.admin_secret =
      env::var("ADMIN_SECRET").context("ADMIN_SECRET not set")?;
    if config.admin_secret.trim().is_empty() {
      bail!("ADMIN_SECRET must not be empty");
    }

    if let Ok(url) = env::var("DATABASE_URL") {
      config.database_url = url;
    }
    if let Ok(port) = env::var("PORT") {
      config.port = port.parse().context("Invalid PORT")?;
    }
    if let Ok(url) = env::var("PUBLIC_URL") {
      config.public_url = url.trim_end_matches('/').to_string();
    }

    config.mode = match env::var("APP_ENV").as_deref() {
      Ok("development") | Ok("dev") => Mode::Development,
      Ok("production") | Ok("prod") | Err(_) => Mode::Production,
      Ok(other) => bail!("Unknown APP_ENV `{other}`"),
    };
    config.dev_bypass = env::var("DEV_BYPASS")
      .is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes"));

    config.store = match env::var("STORE_BACKEND").as_deref() {
      Ok("memory") => Store::Memory,
      Ok("database") | Err(_) => Store::Database,
      Ok(other) => bail!("Unknown STORE_BACKEND `{other}`"),
    };

    if let Ok(limit) = env::var("RATE_LIMIT") {
      config.rate_limit = limit.parse().context("Invalid RATE_LIMIT")?;
    }
    config.rate_window = duration("RATE_WINDOW", config.rate_window)?;
    config.token_ttl = duration("TOKEN_TTL", config.token_ttl)?;
    config.session_ttl = duration("SESSION_TTL", config.session_ttl)?;
    config.provider_timeout =
      duration("PROVIDER_TIMEOUT", config.provider_timeout)?;

    config.providers = providers(env::vars());

    if config.dev_bypass && config.mode == Mode::Production {
      warn!("DEV_BYPASS is set but ignored in production mode");
    }

    Ok(config)
  }

  /// Testing-tool bypass only ever applies outside production.
  pub fn dev_bypass_active(&self) -> bool {
    self.dev_bypass && self.mode != Mode::Production
  }

  pub fn credentials(&self, provider: &str) -> Option<&Credentials> {
    self.providers.get(provider)
  }
}

fn duration(var: &str, default: Duration) -> anyhow::Result<Duration> {
  match env::var(var) {
    Ok(raw) => humantime::parse_duration(&raw)
      .with_context(|| format!("Invalid {var} `{raw}`")),
    Err(_) => Ok(default),
  }
}

/// Collects `PROVIDER_<ID>_<FIELD>` variables into per-provider credentials.
fn providers(
  vars: impl Iterator<Item = (String, String)>,
) -> HashMap<String, Credentials> {
  const FIELDS: [&str; 4] = ["_BASE_URL", "_SERVICE_ID", "_SECRET", "_IP_SALT"];

  let mut providers: HashMap<String, Credentials> = HashMap::new();

  for (name, value) in vars {
    let Some(rest) = name.strip_prefix("PROVIDER_") else {
      continue;
    };
    let Some((id, field)) = FIELDS
      .iter()
      .find_map(|field| rest.strip_suffix(field).map(|id| (id, *field)))
    else {
      continue;
    };
    if id.is_empty() || value.trim().is_empty() {
      continue;
    }

    let creds = providers.entry(id.to_lowercase()).or_default();
    let value = Some(value.trim().to_string());
    match field {
      "_BASE_URL" => creds.base_url = value,
      "_SERVICE_ID" => creds.service_id = value,
      "_SECRET" => creds.secret = value,
      _ => creds.ip_salt = value,
    }
  }

  providers
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_provider_vars() {
    let vars = [
      ("PROVIDER_WORKINK_SECRET", "s3cret"),
      ("PROVIDER_WORKINK_IP_SALT", "pepper"),
      ("PROVIDER_PLATOBOOST_SERVICE_ID", "1234"),
      ("PROVIDER_TIMEOUT", "5s"),
      ("PROVIDER_LOOTLABS_SECRET", "  "),
      ("PATH", "/usr/bin"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()));

    let providers = providers(vars);

    assert_eq!(providers.len(), 2);
    let workink = &providers["workink"];
    assert_eq!(workink.secret.as_deref(), Some("s3cret"));
    assert_eq!(workink.ip_salt.as_deref(), Some("pepper"));
    assert_eq!(providers["platoboost"].service_id.as_deref(), Some("1234"));
  }

  #[test]
  fn test_bypass_inert_in_production() {
    let mut config = Config { dev_bypass: true, ..Config::default() };
    assert!(!config.dev_bypass_active());

    config.mode = Mode::Development;
    assert!(config.dev_bypass_active());
  }
}
