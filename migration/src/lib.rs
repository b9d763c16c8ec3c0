pub use sea_orm_migration::prelude::*;

mod m20261012_000001_create_users;
mod m20261012_000002_create_license_keys;
mod m20261012_000003_create_games;
mod m20261012_000004_create_blacklist;
mod m20261012_000005_create_usage_logs;
mod m20261013_000006_create_scripts;
mod m20261013_000007_create_script_tokens;
mod m20261013_000008_create_rate_limits;
mod m20261014_000009_create_providers;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261012_000001_create_users::Migration),
      Box::new(m20261012_000002_create_license_keys::Migration),
      Box::new(m20261012_000003_create_games::Migration),
      Box::new(m20261012_000004_create_blacklist::Migration),
      Box::new(m20261012_000005_create_usage_logs::Migration),
      Box::new(m20261013_000006_create_scripts::Migration),
      Box::new(m20261013_000007_create_script_tokens::Migration),
      Box::new(m20261013_000008_create_rate_limits::Migration),
      Box::new(m20261014_000009_create_providers::Migration),
    ]
  }
}
