use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "started")]
  Started,
  #[sea_orm(string_value = "verified")]
  Verified,
  #[sea_orm(string_value = "completed")]
  Completed,
  #[sea_orm(string_value = "redeemed")]
  Redeemed,
  #[sea_orm(string_value = "expired")]
  Expired,
}

impl SessionStatus {
  /// A key has been issued; the session only ever reports it back.
  pub fn is_terminal(self) -> bool {
    matches!(self, SessionStatus::Completed | SessionStatus::Redeemed)
  }

  /// States a session may move into `self` from. Transitions never go back.
  pub fn predecessors(self) -> &'static [SessionStatus] {
    use SessionStatus::*;

    match self {
      Pending => &[],
      Started => &[Pending],
      Verified => &[Pending, Started],
      Completed | Redeemed => &[Verified],
      Expired => &[Pending, Started],
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "provider_sessions")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub session_id: String,
  pub provider: String,
  pub discord_id: Option<String>,
  pub status: SessionStatus,
  pub provider_token: Option<String>,
  pub ip_address: Option<String>,
  pub key_id: Option<i32>,
  pub key_value: Option<String>,
  pub created_at: DateTime,
  pub started_at: Option<DateTime>,
  pub completed_at: Option<DateTime>,
  pub expires_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::provider::Entity",
    from = "Column::Provider",
    to = "super::provider::Column::Id"
  )]
  Provider,
}

impl Related<super::provider::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Provider.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
