use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scripts")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Public routing id, unrelated to license keys.
  #[sea_orm(unique)]
  pub access_key: String,
  pub name: String,
  #[sea_orm(column_type = "Text")]
  pub script_content: String,
  /// Set once on first dynamic delivery and never rotated.
  pub encryption_key: Option<String>,
  pub require_key: bool,
  pub allowed_games: Option<Json>,
  pub allowed_executors: Option<Json>,
  pub is_active: bool,
  pub total_loads: i64,
  pub last_loaded_at: Option<DateTime>,
  pub created_at: DateTime,
}

impl Model {
  /// Place ids the script may run in; empty means any.
  pub fn allowed_games(&self) -> Vec<String> {
    list(self.allowed_games.as_ref())
  }

  /// Executor name fragments the script may run on; empty means any.
  pub fn allowed_executors(&self) -> Vec<String> {
    list(self.allowed_executors.as_ref())
  }
}

fn list(value: Option<&Json>) -> Vec<String> {
  let Some(Json::Array(items)) = value else {
    return Vec::new();
  };

  items
    .iter()
    .filter_map(|item| match item {
      Json::String(s) => Some(s.trim().to_string()),
      Json::Number(n) => Some(n.to_string()),
      _ => None,
    })
    .filter(|s| !s.is_empty())
    .collect()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
