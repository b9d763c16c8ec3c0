use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "games")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Roblox place id, supplied by untrusted clients.
  #[sea_orm(unique)]
  pub place_id: i64,
  pub name: String,
  pub script_url: String,
  pub script_version: String,
  pub min_key_tier: Option<String>,
  pub is_active: bool,
  pub total_executions: i64,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
