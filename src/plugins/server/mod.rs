mod handlers;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

/// Every route, without middleware.
pub fn router(app: Arc<AppState>) -> Router {
  use handlers::{admin, offerwall, script, validate};

  let admin = Router::new()
    .route("/keys", post(admin::generate_keys))
    .route("/keys/{value}", delete(admin::delete_key))
    .route("/keys/{value}/reset-hwid", post(admin::reset_hwid))
    .route("/keys/{value}/active", post(admin::set_key_active))
    .route("/blacklist", post(admin::blacklist_add))
    .route("/blacklist/{kind}/{value}", delete(admin::blacklist_remove))
    .route(
      "/users/{discord_id}/ban",
      post(admin::ban_user).delete(admin::unban_user),
    )
    .route("/games", post(admin::create_game))
    .route("/games/{id}/active", post(admin::set_game_active))
    .route("/scripts", post(admin::create_script))
    .route("/providers/{id}", post(admin::configure_provider));

  Router::new()
    .route("/health", get(handlers::health))
    .route("/validate", post(validate::validate))
    .route("/script", post(script::redeem))
    .route("/script/{access_key}", get(script::deliver))
    .route(
      "/callback/{provider}",
      get(offerwall::callback).post(offerwall::callback),
    )
    .route("/platoboost/verify-key", post(offerwall::platoboost_verify))
    .route("/offerwall/{provider}/sessions", post(offerwall::create_session))
    .route(
      "/offerwall/sessions/{session_id}/start",
      post(offerwall::start_session),
    )
    .nest("/admin", admin)
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();

    tokio::spawn(async move {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        governor_limiter.retain_recent();
      }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));

    let router = router(app)
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;

    info!("HTTP Server listening on {addr}");

    tokio::spawn(async move {
      if let Err(err) = axum::serve(listener, router).await {
        error!("HTTP server stopped: {err}");
      }
    });

    Ok(())
  }
}
