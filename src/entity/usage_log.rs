use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit row, one per validation attempt.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_logs")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub key_id: Option<i32>,
  pub hwid: Option<String>,
  pub executor: Option<String>,
  pub game_id: Option<i32>,
  pub game_name: Option<String>,
  pub player_id: Option<String>,
  pub player_name: Option<String>,
  pub ip_address: String,
  pub success: bool,
  pub error_type: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
