use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "script_tokens")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub token: String,
  pub key_id: i32,
  pub game_id: i32,
  pub script_location: String,
  pub expires_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
