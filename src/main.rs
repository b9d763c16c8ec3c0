mod config;
mod entity;
mod error;
mod gate;
mod offerwall;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  config::Config,
  plugins::{App, cron, server},
  prelude::*,
  state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "keygate=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;

  info!(
    "Starting keygate v{} ({:?}, {:?} store)",
    env!("CARGO_PKG_VERSION"),
    config.mode,
    config.store
  );

  let app = Arc::new(AppState::new(config).await?);

  App::new()
    .register(server::Plugin)
    .register(cron::GC)
    .run(app)
    .await?;

  tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
  info!("Shutting down");

  Ok(())
}
