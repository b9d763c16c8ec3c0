use crate::{
  entity::{BanKind, blacklist},
  prelude::*,
};

pub struct Blacklist<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Blacklist<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn find(
    &self,
    kind: BanKind,
    value: &str,
  ) -> Result<Option<blacklist::Model>> {
    let entry = blacklist::Entity::find()
      .filter(blacklist::Column::Kind.eq(kind))
      .filter(blacklist::Column::Value.eq(value))
      .one(self.db)
      .await?;
    Ok(entry)
  }

  pub async fn is_banned(&self, kind: BanKind, value: &str) -> Result<bool> {
    Ok(self.find(kind, value).await?.is_some())
  }

  pub async fn add(
    &self,
    kind: BanKind,
    value: &str,
    reason: Option<String>,
  ) -> Result<blacklist::Model> {
    if let Some(existing) = self.find(kind, value).await? {
      return Ok(existing);
    }

    let entry = blacklist::ActiveModel {
      id: NotSet,
      kind: Set(kind),
      value: Set(value.to_string()),
      reason: Set(reason),
      created_at: Set(Utc::now().naive_utc()),
    };

    Ok(entry.insert(self.db).await?)
  }

  pub async fn remove(&self, kind: BanKind, value: &str) -> Result<bool> {
    let res = blacklist::Entity::delete_many()
      .filter(blacklist::Column::Kind.eq(kind))
      .filter(blacklist::Column::Value.eq(value))
      .exec(self.db)
      .await?;
    Ok(res.rows_affected > 0)
  }
}
