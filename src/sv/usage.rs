use crate::{
  entity::{script_load, usage_log},
  prelude::*,
};

/// One validation attempt, with whatever was resolved before it ended.
#[derive(Debug, Clone, Default)]
pub struct Attempt {
  pub key_id: Option<i32>,
  pub hwid: Option<String>,
  pub executor: Option<String>,
  pub game_id: Option<i32>,
  pub game_name: Option<String>,
  pub player_id: Option<String>,
  pub player_name: Option<String>,
  pub ip: String,
}

#[derive(Debug, Clone, Default)]
pub struct Load {
  pub script_id: Option<i32>,
  pub ip: String,
  pub user_agent: Option<String>,
  pub executor: Option<String>,
  pub hwid: Option<String>,
  pub player_id: Option<String>,
  pub player_name: Option<String>,
  pub game_id: Option<String>,
  pub key_value: Option<String>,
}

/// Append-only audit sinks. Writes are fire-and-forget: a failed insert is
/// logged and swallowed.
pub struct Usage<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Usage<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn record(&self, attempt: &Attempt, error_type: Option<&str>) {
    let row = usage_log::ActiveModel {
      id: NotSet,
      key_id: Set(attempt.key_id),
      hwid: Set(attempt.hwid.clone()),
      executor: Set(attempt.executor.clone()),
      game_id: Set(attempt.game_id),
      game_name: Set(attempt.game_name.clone()),
      player_id: Set(attempt.player_id.clone()),
      player_name: Set(attempt.player_name.clone()),
      ip_address: Set(attempt.ip.clone()),
      success: Set(error_type.is_none()),
      error_type: Set(error_type.map(str::to_string)),
      created_at: Set(Utc::now().naive_utc()),
    };

    if let Err(err) = row.insert(self.db).await {
      warn!("Failed to write usage log: {err}");
    }
  }

  pub async fn record_load(&self, load: &Load, error: Option<&str>) {
    let row = script_load::ActiveModel {
      id: NotSet,
      script_id: Set(load.script_id),
      ip_address: Set(load.ip.clone()),
      user_agent: Set(load.user_agent.clone()),
      executor: Set(load.executor.clone()),
      hwid: Set(load.hwid.clone()),
      player_id: Set(load.player_id.clone()),
      player_name: Set(load.player_name.clone()),
      game_id: Set(load.game_id.clone()),
      key_value: Set(load.key_value.clone()),
      success: Set(error.is_none()),
      error: Set(error.map(str::to_string)),
      created_at: Set(Utc::now().naive_utc()),
    };

    if let Err(err) = row.insert(self.db).await {
      warn!("Failed to write script load log: {err}");
    }
  }

  pub async fn attempts(&self) -> Result<Vec<usage_log::Model>> {
    Ok(
      usage_log::Entity::find()
        .order_by_asc(usage_log::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn loads(&self) -> Result<Vec<script_load::Model>> {
    Ok(
      script_load::Entity::find()
        .order_by_asc(script_load::Column::Id)
        .all(self.db)
        .await?,
    )
  }
}
