use migration::Migrator;

use crate::{
  config::{Config, Store},
  offerwall::Registry,
  prelude::*,
  sv::{
    self,
    limit::{DbLimiter, MemoryLimiter, RateLimiter, Window},
    token::{DbTokens, MemoryTokens, TokenStore},
  },
};

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub key: sv::Key<'a>,
  pub game: sv::Game<'a>,
  pub blacklist: sv::Blacklist<'a>,
  pub usage: sv::Usage<'a>,
  pub script: sv::Script<'a>,
  pub provider: sv::Provider<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub tokens: Arc<dyn TokenStore>,
  pub limiter: Arc<dyn RateLimiter>,
  pub http: reqwest::Client,
  pub providers: Registry,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    Self::with_db(db, config)
  }

  pub fn with_db(db: DatabaseConnection, config: Config) -> anyhow::Result<Self> {
    let window = Window {
      limit: config.rate_limit,
      period: TimeDelta::from_std(config.rate_window)
        .unwrap_or(TimeDelta::seconds(60)),
    };

    let (tokens, limiter): (Arc<dyn TokenStore>, Arc<dyn RateLimiter>) =
      match config.store {
        Store::Database => (
          Arc::new(DbTokens::new(db.clone())),
          Arc::new(DbLimiter::new(db.clone(), window)),
        ),
        Store::Memory => {
          warn!("Using process-local token and rate-limit stores");
          (Arc::new(MemoryTokens::new()), Arc::new(MemoryLimiter::new(window)))
        }
      };

    let http = reqwest::Client::builder()
      .timeout(config.provider_timeout)
      .user_agent(concat!("keygate/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build provider HTTP client")?;

    Ok(Self {
      db,
      config,
      tokens,
      limiter,
      http,
      providers: Registry::default(),
    })
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      key: sv::Key::new(&self.db),
      game: sv::Game::new(&self.db),
      blacklist: sv::Blacklist::new(&self.db),
      usage: sv::Usage::new(&self.db),
      script: sv::Script::new(&self.db),
      provider: sv::Provider::new(&self.db),
    }
  }

  pub fn token_ttl(&self) -> TimeDelta {
    TimeDelta::from_std(self.config.token_ttl).unwrap_or(TimeDelta::minutes(5))
  }

  pub fn session_ttl(&self) -> TimeDelta {
    TimeDelta::from_std(self.config.session_ttl)
      .unwrap_or(TimeDelta::minutes(30))
  }

  pub async fn gc(&self) {
    let now = Utc::now().naive_utc();

    match self.limiter.gc(now).await {
      Ok(0) => {}
      Ok(n) => debug!("Dropped {n} stale rate-limit windows"),
      Err(err) => warn!("Rate-limit GC failed: {err}"),
    }

    match self.sv().provider.expire_stale(now).await {
      Ok(0) => {}
      Ok(n) => info!("Expired {n} offer-wall sessions"),
      Err(err) => warn!("Session GC failed: {err}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::{limit::Throttle, test_utils::test_db};

  #[tokio::test]
  async fn test_with_db_uses_configured_stores() {
    let config = Config {
      store: Store::Database,
      rate_limit: 2,
      provider_timeout: Duration::from_millis(1500),
      ..Config::default()
    };
    let app = AppState::with_db(test_db::setup().await, config).unwrap();

    let now = Utc::now().naive_utc();
    for _ in 0..2 {
      app.limiter.hit("HWID-1", now).await.unwrap();
    }
    let verdict = app.limiter.hit("HWID-1", now).await.unwrap();
    assert!(matches!(verdict, Throttle::Limited { .. }));

    // shared store: the window lives in the database
    let rows = crate::entity::rate_limit::Entity::find()
      .count(&app.db)
      .await
      .unwrap();
    assert_eq!(rows, 1);
  }
}
