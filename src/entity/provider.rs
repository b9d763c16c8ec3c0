use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a provider's recorded completion IP is compared to the requester.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum IpCheck {
  #[sea_orm(string_value = "none")]
  #[default]
  None,
  #[sea_orm(string_value = "raw")]
  Raw,
  #[sea_orm(string_value = "hashed")]
  Hashed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "providers")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub name: String,
  pub is_active: bool,
  pub key_duration_days: i32,
  pub ip_check: IpCheck,
  pub total_completions: i64,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::provider_session::Entity")]
  Sessions,
}

impl Related<super::provider_session::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Sessions.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
