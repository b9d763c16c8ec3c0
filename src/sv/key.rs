use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
  entity::{KeyType, key, user},
  prelude::*,
  sv,
};

pub struct Key<'a> {
  db: &'a DatabaseConnection,
}

/// Result of trying to tie a key to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bind {
  /// This call set the binding.
  Bound,
  /// The key was already bound to the same device.
  Same,
  /// Another device holds the lock.
  Mismatch(String),
}

pub fn generate_value() -> String {
  let raw = Uuid::new_v4().simple().to_string().to_uppercase();
  let groups: Vec<&str> =
    (0..4).map(|i| &raw[i * 4..i * 4 + 4]).collect();
  format!("KEY-{}", groups.join("-"))
}

impl<'a> Key<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Mints a key. `days` overrides the tier's default lifetime; lifetime
  /// keys never expire.
  pub async fn generate(
    &self,
    ty: KeyType,
    days: Option<u32>,
    owner: Option<&str>,
  ) -> Result<key::Model> {
    self.mint(generate_value(), ty, days, owner).await
  }

  /// Like [`Key::generate`] with a value reserved ahead of time.
  pub async fn mint(
    &self,
    value: String,
    ty: KeyType,
    days: Option<u32>,
    owner: Option<&str>,
  ) -> Result<key::Model> {
    let owner_id = match owner {
      Some(discord_id) => {
        Some(sv::User::new(self.db).get_or_create(discord_id, None).await?.id)
      }
      None => None,
    };

    let now = Utc::now().naive_utc();
    let days = match ty {
      KeyType::Lifetime => None,
      KeyType::Custom => Some(days.ok_or_else(|| {
        Error::InvalidArgs("custom keys need a duration".into())
      })?),
      _ => days.or(ty.days()),
    };
    let expires_at = days.map(|d| now + TimeDelta::days(d as i64));

    let key = key::ActiveModel {
      id: NotSet,
      value: Set(value),
      key_type: Set(ty),
      owner_id: Set(owner_id),
      hwid: Set(None),
      hwid_locked: Set(false),
      hwid_locked_at: Set(None),
      is_active: Set(true),
      expires_at: Set(expires_at),
      created_at: Set(now),
      last_used_at: Set(None),
      last_used_ip: Set(None),
      last_executor: Set(None),
      total_uses: Set(0),
    };

    Ok(key.insert(self.db).await?)
  }

  pub async fn by_value(&self, value: &str) -> Result<Option<key::Model>> {
    let key = key::Entity::find()
      .filter(key::Column::Value.eq(utils::canonical_key(value)))
      .one(self.db)
      .await?;
    Ok(key)
  }

  pub async fn by_value_with_owner(
    &self,
    value: &str,
  ) -> Result<Option<(key::Model, Option<user::Model>)>> {
    let found = key::Entity::find()
      .filter(key::Column::Value.eq(utils::canonical_key(value)))
      .find_also_related(user::Entity)
      .one(self.db)
      .await?;
    Ok(found)
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<key::Model>> {
    Ok(key::Entity::find_by_id(id).one(self.db).await?)
  }

  /// Binds `hwid` only while the key has no device. The condition lives in
  /// the UPDATE itself so concurrent first uses cannot both win.
  pub async fn bind_hwid(&self, id: i32, hwid: &str) -> Result<Bind> {
    let now = Utc::now().naive_utc();

    let res = key::Entity::update_many()
      .set(key::ActiveModel {
        hwid: Set(Some(hwid.to_string())),
        hwid_locked: Set(true),
        hwid_locked_at: Set(Some(now)),
        ..Default::default()
      })
      .filter(key::Column::Id.eq(id))
      .filter(key::Column::Hwid.is_null())
      .exec(self.db)
      .await?;

    if res.rows_affected == 1 {
      return Ok(Bind::Bound);
    }

    let key = self.by_id(id).await?.ok_or(Error::KeyNotFound)?;
    match key.hwid {
      Some(bound) if bound == hwid => Ok(Bind::Same),
      Some(bound) => Ok(Bind::Mismatch(bound)),
      // reset between our update and read
      None => Err(Error::Internal(format!("hwid of key {id} vanished"))),
    }
  }

  /// Records a successful use and returns the new use count.
  pub async fn record_use(
    &self,
    id: i32,
    ip: &str,
    executor: Option<&str>,
  ) -> Result<i64> {
    let now = Utc::now().naive_utc();

    key::Entity::update_many()
      .col_expr(key::Column::TotalUses, Expr::col(key::Column::TotalUses).add(1))
      .col_expr(key::Column::LastUsedAt, Expr::value(now))
      .col_expr(key::Column::LastUsedIp, Expr::value(ip.to_string()))
      .col_expr(
        key::Column::LastExecutor,
        Expr::value(executor.map(str::to_string)),
      )
      .filter(key::Column::Id.eq(id))
      .exec(self.db)
      .await?;

    let key = self.by_id(id).await?.ok_or(Error::KeyNotFound)?;
    Ok(key.total_uses)
  }

  pub async fn reset_hwid(&self, value: &str) -> Result<key::Model> {
    let key = self.by_value(value).await?.ok_or(Error::KeyNotFound)?;

    let updated = key::ActiveModel {
      hwid: Set(None),
      hwid_locked: Set(false),
      hwid_locked_at: Set(None),
      ..key.into()
    }
    .update(self.db)
    .await?;

    Ok(updated)
  }

  pub async fn set_active(
    &self,
    value: &str,
    active: bool,
  ) -> Result<key::Model> {
    let key = self.by_value(value).await?.ok_or(Error::KeyNotFound)?;

    let updated = key::ActiveModel { is_active: Set(active), ..key.into() }
      .update(self.db)
      .await?;

    Ok(updated)
  }

  pub async fn delete(&self, value: &str) -> Result<()> {
    let res = key::Entity::delete_many()
      .filter(key::Column::Value.eq(utils::canonical_key(value)))
      .exec(self.db)
      .await?;

    if res.rows_affected == 0 {
      return Err(Error::KeyNotFound);
    }
    Ok(())
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(key::Entity::find().count(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  #[tokio::test]
  async fn test_generate_key() {
    let db = test_db::setup().await;
    let sv = Key::new(&db);

    let key = sv.generate(KeyType::Weekly, None, Some("42")).await.unwrap();

    assert!(key.value.starts_with("KEY-"));
    assert_eq!(key.value.len(), 23);
    assert_eq!(key.value, key.value.to_uppercase());
    assert!(key.is_active);
    assert!(key.owner_id.is_some());

    let lifetime = (key.expires_at.unwrap() - key.created_at).num_days();
    assert_eq!(lifetime, 7);
  }

  #[tokio::test]
  async fn test_lifetime_never_expires() {
    let db = test_db::setup().await;
    let key =
      Key::new(&db).generate(KeyType::Lifetime, Some(3), None).await.unwrap();
    assert!(key.expires_at.is_none());
  }

  #[tokio::test]
  async fn test_custom_needs_duration() {
    let db = test_db::setup().await;
    let res = Key::new(&db).generate(KeyType::Custom, None, None).await;
    assert!(matches!(res, Err(Error::InvalidArgs(_))));
  }

  #[tokio::test]
  async fn test_lookup_is_case_insensitive() {
    let db = test_db::setup().await;
    let sv = Key::new(&db);
    let key = sv.generate(KeyType::Daily, None, None).await.unwrap();

    let lower = format!("  {}  ", key.value.to_lowercase());
    let found = sv.by_value(&lower).await.unwrap().unwrap();
    assert_eq!(found.id, key.id);
  }

  #[tokio::test]
  async fn test_bind_hwid_locks_once() {
    let db = test_db::setup().await;
    let sv = Key::new(&db);
    let key = sv.generate(KeyType::Daily, None, None).await.unwrap();

    assert_eq!(sv.bind_hwid(key.id, "DEVICE-AAAA").await.unwrap(), Bind::Bound);
    assert_eq!(sv.bind_hwid(key.id, "DEVICE-AAAA").await.unwrap(), Bind::Same);
    assert_eq!(
      sv.bind_hwid(key.id, "DEVICE-BBBB").await.unwrap(),
      Bind::Mismatch("DEVICE-AAAA".into())
    );

    let key = sv.by_id(key.id).await.unwrap().unwrap();
    assert!(key.hwid_locked);
    assert!(key.hwid_locked_at.is_some());
  }

  #[tokio::test]
  async fn test_reset_hwid_allows_rebind() {
    let db = test_db::setup().await;
    let sv = Key::new(&db);
    let key = sv.generate(KeyType::Daily, None, None).await.unwrap();

    sv.bind_hwid(key.id, "DEVICE-AAAA").await.unwrap();
    let reset = sv.reset_hwid(&key.value).await.unwrap();
    assert!(reset.hwid.is_none());
    assert!(!reset.hwid_locked);

    assert_eq!(sv.bind_hwid(key.id, "DEVICE-BBBB").await.unwrap(), Bind::Bound);
  }

  #[tokio::test]
  async fn test_record_use_counts() {
    let db = test_db::setup().await;
    let sv = Key::new(&db);
    let key = sv.generate(KeyType::Daily, None, None).await.unwrap();

    sv.record_use(key.id, "203.0.113.5", Some("krnl")).await.unwrap();
    let uses = sv.record_use(key.id, "203.0.113.6", None).await.unwrap();
    assert_eq!(uses, 2);

    let key = sv.by_id(key.id).await.unwrap().unwrap();
    assert_eq!(key.last_used_ip.as_deref(), Some("203.0.113.6"));
    assert!(key.last_executor.is_none());
  }

  #[tokio::test]
  async fn test_delete_missing_key() {
    let db = test_db::setup().await;
    let res = Key::new(&db).delete("KEY-NOPE").await;
    assert!(matches!(res, Err(Error::KeyNotFound)));
  }
}
