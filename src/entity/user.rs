use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::key;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub discord_id: String,
  pub discord_username: Option<String>,
  pub is_banned: bool,
  pub ban_reason: Option<String>,
  pub created_at: DateTime,
}

impl Model {
  pub fn display_name(&self) -> &str {
    self.discord_username.as_deref().unwrap_or("User")
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "key::Entity")]
  Keys,
}

impl Related<key::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Keys.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
