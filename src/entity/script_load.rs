use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "script_load_logs")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub script_id: Option<i32>,
  pub ip_address: String,
  pub user_agent: Option<String>,
  pub executor: Option<String>,
  pub hwid: Option<String>,
  pub player_id: Option<String>,
  pub player_name: Option<String>,
  pub game_id: Option<String>,
  pub key_value: Option<String>,
  pub success: bool,
  pub error: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
