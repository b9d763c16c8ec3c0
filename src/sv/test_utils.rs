//! Shared test utilities for database setup

#[cfg(test)]
pub mod test_db {
  use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};

  use crate::entity::*;

  /// Creates an in-memory SQLite database with all required tables
  pub async fn setup() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    macro_rules! create {
      ($($entity:path),* $(,)?) => {$(
        let stmt = schema.create_table_from_entity($entity);
        db.execute(db.get_database_backend().build(&stmt)).await.unwrap();
      )*};
    }

    create!(
      user::Entity,
      key::Entity,
      game::Entity,
      blacklist::Entity,
      usage_log::Entity,
      script::Entity,
      script_load::Entity,
      script_token::Entity,
      rate_limit::Entity,
      provider::Entity,
      provider_session::Entity,
    );

    db
  }
}

#[cfg(test)]
pub mod test_app {
  use crate::{
    config::{Config, Store},
    prelude::*,
    state::AppState,
  };

  pub fn config() -> Config {
    Config {
      admin_secret: "admin-secret".into(),
      store: Store::Memory,
      ..Config::default()
    }
  }

  pub async fn setup() -> Arc<AppState> {
    setup_with(config()).await
  }

  pub async fn setup_with(config: Config) -> Arc<AppState> {
    let db = super::test_db::setup().await;
    Arc::new(AppState::with_db(db, config).unwrap())
  }
}
