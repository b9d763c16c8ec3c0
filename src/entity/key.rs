use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
  #[sea_orm(string_value = "daily")]
  #[default]
  Daily,
  #[sea_orm(string_value = "weekly")]
  Weekly,
  #[sea_orm(string_value = "monthly")]
  Monthly,
  #[sea_orm(string_value = "lifetime")]
  Lifetime,
  #[sea_orm(string_value = "custom")]
  Custom,
}

impl KeyType {
  /// Default lifetime in days, `None` for non-expiring keys.
  pub fn days(self) -> Option<u32> {
    match self {
      KeyType::Daily => Some(1),
      KeyType::Weekly => Some(7),
      KeyType::Monthly => Some(30),
      KeyType::Lifetime | KeyType::Custom => None,
    }
  }

  /// Tier picked for keys minted through an offer-wall provider.
  pub fn for_duration(days: u32) -> Self {
    match days {
      0..=1 => KeyType::Daily,
      2..=7 => KeyType::Weekly,
      _ => KeyType::Monthly,
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "license_keys")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub value: String,
  pub key_type: KeyType,
  pub owner_id: Option<i32>,
  pub hwid: Option<String>,
  pub hwid_locked: bool,
  pub hwid_locked_at: Option<DateTime>,
  pub is_active: bool,
  pub expires_at: Option<DateTime>,
  pub created_at: DateTime,
  pub last_used_at: Option<DateTime>,
  pub last_used_ip: Option<String>,
  pub last_executor: Option<String>,
  pub total_uses: i64,
}

impl Model {
  pub fn is_expired(&self, now: DateTime) -> bool {
    self.expires_at.is_some_and(|exp| exp <= now)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::OwnerId",
    to = "super::user::Column::Id"
  )]
  Owner,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Owner.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
