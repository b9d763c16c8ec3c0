use sea_orm::sea_query::Expr;

use crate::{entity::script, prelude::*};

pub struct Script<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Default)]
pub struct NewScript {
  pub access_key: String,
  pub name: String,
  pub content: String,
  pub require_key: bool,
  pub allowed_games: Vec<String>,
  pub allowed_executors: Vec<String>,
}

fn json_list(items: Vec<String>) -> Option<sea_orm::prelude::Json> {
  (!items.is_empty()).then(|| json::Value::from(items))
}

impl<'a> Script<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewScript) -> Result<script::Model> {
    let script = script::ActiveModel {
      id: NotSet,
      access_key: Set(new.access_key),
      name: Set(new.name),
      script_content: Set(new.content),
      encryption_key: Set(None),
      require_key: Set(new.require_key),
      allowed_games: Set(json_list(new.allowed_games)),
      allowed_executors: Set(json_list(new.allowed_executors)),
      is_active: Set(true),
      total_loads: Set(0),
      last_loaded_at: Set(None),
      created_at: Set(Utc::now().naive_utc()),
    };

    Ok(script.insert(self.db).await?)
  }

  pub async fn active_by_access_key(
    &self,
    access_key: &str,
  ) -> Result<Option<script::Model>> {
    let script = script::Entity::find()
      .filter(script::Column::AccessKey.eq(access_key))
      .filter(script::Column::IsActive.eq(true))
      .one(self.db)
      .await?;
    Ok(script)
  }

  /// Returns the script's cipher key, creating and persisting it on first
  /// use. Once stored it never changes, even under concurrent first loads.
  pub async fn encryption_key(&self, script: &script::Model) -> Result<String> {
    if let Some(key) = &script.encryption_key {
      return Ok(key.clone());
    }

    let candidate = uuid::Uuid::new_v4().simple().to_string();
    let res = script::Entity::update_many()
      .col_expr(script::Column::EncryptionKey, Expr::value(candidate.clone()))
      .filter(script::Column::Id.eq(script.id))
      .filter(script::Column::EncryptionKey.is_null())
      .exec(self.db)
      .await?;

    if res.rows_affected == 1 {
      info!("Generated encryption key for script `{}`", script.access_key);
      return Ok(candidate);
    }

    script::Entity::find_by_id(script.id)
      .one(self.db)
      .await?
      .and_then(|s| s.encryption_key)
      .ok_or_else(|| {
        Error::Internal(format!("script {} lost its encryption key", script.id))
      })
  }

  pub async fn record_load(&self, id: i32) -> Result<()> {
    script::Entity::update_many()
      .col_expr(
        script::Column::TotalLoads,
        Expr::col(script::Column::TotalLoads).add(1),
      )
      .col_expr(
        script::Column::LastLoadedAt,
        Expr::value(Utc::now().naive_utc()),
      )
      .filter(script::Column::Id.eq(id))
      .exec(self.db)
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  fn sample() -> NewScript {
    NewScript {
      access_key: "hub".into(),
      name: "Hub".into(),
      content: "print('hi')".into(),
      allowed_games: vec!["9999".into()],
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_encryption_key_is_stable() {
    let db = test_db::setup().await;
    let sv = Script::new(&db);
    let script = sv.create(sample()).await.unwrap();

    let first = sv.encryption_key(&script).await.unwrap();
    // a stale model without the key must still get the stored one
    let second = sv.encryption_key(&script).await.unwrap();
    assert_eq!(first, second);

    let reloaded = sv.active_by_access_key("hub").await.unwrap().unwrap();
    assert_eq!(reloaded.encryption_key.as_deref(), Some(first.as_str()));
  }

  #[tokio::test]
  async fn test_allow_lists_round_trip() {
    let db = test_db::setup().await;
    let sv = Script::new(&db);
    let script = sv.create(sample()).await.unwrap();

    assert_eq!(script.allowed_games(), vec!["9999".to_string()]);
    assert!(script.allowed_executors().is_empty());
  }

  #[tokio::test]
  async fn test_record_load() {
    let db = test_db::setup().await;
    let sv = Script::new(&db);
    let script = sv.create(sample()).await.unwrap();

    sv.record_load(script.id).await.unwrap();

    let script = sv.active_by_access_key("hub").await.unwrap().unwrap();
    assert_eq!(script.total_loads, 1);
    assert!(script.last_loaded_at.is_some());
  }
}
