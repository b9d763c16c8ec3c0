use sea_orm::sea_query::Expr;

use crate::{
  entity::{IpCheck, SessionStatus, provider, provider_session as session},
  prelude::*,
};

pub struct Provider<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Provider<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, id: &str) -> Result<Option<provider::Model>> {
    Ok(provider::Entity::find_by_id(id).one(self.db).await?)
  }

  /// Creates or updates a provider row.
  pub async fn configure(
    &self,
    id: &str,
    is_active: bool,
    key_duration_days: i32,
    ip_check: IpCheck,
  ) -> Result<provider::Model> {
    if key_duration_days < 1 {
      return Err(Error::InvalidArgs("key duration must be at least 1 day".into()));
    }

    let model = match self.by_id(id).await? {
      Some(existing) => {
        provider::ActiveModel {
          is_active: Set(is_active),
          key_duration_days: Set(key_duration_days),
          ip_check: Set(ip_check),
          ..existing.into()
        }
        .update(self.db)
        .await?
      }
      None => {
        provider::ActiveModel {
          id: Set(id.to_string()),
          name: Set(id.to_string()),
          is_active: Set(is_active),
          key_duration_days: Set(key_duration_days),
          ip_check: Set(ip_check),
          total_completions: Set(0),
          created_at: Set(Utc::now().naive_utc()),
        }
        .insert(self.db)
        .await?
      }
    };

    Ok(model)
  }

  pub async fn increment_completions(&self, id: &str) -> Result<()> {
    provider::Entity::update_many()
      .col_expr(
        provider::Column::TotalCompletions,
        Expr::col(provider::Column::TotalCompletions).add(1),
      )
      .filter(provider::Column::Id.eq(id))
      .exec(self.db)
      .await?;
    Ok(())
  }

  pub async fn create_session(
    &self,
    provider: &str,
    session_id: Option<String>,
    discord_id: Option<String>,
    ttl: TimeDelta,
  ) -> Result<session::Model> {
    let session_id =
      session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if session_id.is_empty() || session_id.len() > 128 {
      return Err(Error::InvalidArgs("invalid session id".into()));
    }
    if self.session(&session_id).await?.is_some() {
      return Err(Error::InvalidArgs("session id already in use".into()));
    }

    let now = Utc::now().naive_utc();
    let session = session::ActiveModel {
      session_id: Set(session_id),
      provider: Set(provider.to_string()),
      discord_id: Set(discord_id),
      status: Set(SessionStatus::Pending),
      provider_token: Set(None),
      ip_address: Set(None),
      key_id: Set(None),
      key_value: Set(None),
      created_at: Set(now),
      started_at: Set(None),
      completed_at: Set(None),
      expires_at: Set(now + ttl),
    };

    Ok(session.insert(self.db).await?)
  }

  pub async fn session(&self, session_id: &str) -> Result<Option<session::Model>> {
    Ok(session::Entity::find_by_id(session_id).one(self.db).await?)
  }

  /// Moves a session to `to` only from one of its allowed predecessors.
  /// Returns whether this call made the transition.
  async fn advance(
    &self,
    session_id: &str,
    to: SessionStatus,
    patch: session::ActiveModel,
  ) -> Result<bool> {
    let res = session::Entity::update_many()
      .set(session::ActiveModel { status: Set(to), ..patch })
      .filter(session::Column::SessionId.eq(session_id))
      .filter(session::Column::Status.is_in(to.predecessors().iter().copied()))
      .exec(self.db)
      .await?;
    Ok(res.rows_affected == 1)
  }

  pub async fn start(&self, session_id: &str) -> Result<bool> {
    let patch = session::ActiveModel {
      started_at: Set(Some(Utc::now().naive_utc())),
      ..Default::default()
    };
    self.advance(session_id, SessionStatus::Started, patch).await
  }

  /// Reserves the session for the caller that passed verification, along
  /// with the value of the key it is about to mint.
  pub async fn claim(
    &self,
    session_id: &str,
    token: Option<&str>,
    ip: &str,
    key_value: &str,
  ) -> Result<bool> {
    let patch = session::ActiveModel {
      provider_token: Set(token.map(str::to_string)),
      ip_address: Set(Some(ip.to_string())),
      key_value: Set(Some(key_value.to_string())),
      ..Default::default()
    };
    self.advance(session_id, SessionStatus::Verified, patch).await
  }

  /// Stores the issued key together with the terminal status.
  pub async fn finish(
    &self,
    session_id: &str,
    status: SessionStatus,
    key_id: i32,
    key_value: &str,
  ) -> Result<bool> {
    let patch = session::ActiveModel {
      key_id: Set(Some(key_id)),
      key_value: Set(Some(key_value.to_string())),
      completed_at: Set(Some(Utc::now().naive_utc())),
      ..Default::default()
    };
    self.advance(session_id, status, patch).await
  }

  /// Marks open sessions past their deadline as expired.
  pub async fn expire_stale(&self, now: DateTime) -> Result<u64> {
    let res = session::Entity::update_many()
      .col_expr(session::Column::Status, Expr::value(SessionStatus::Expired))
      .filter(
        session::Column::Status
          .is_in(SessionStatus::Expired.predecessors().iter().copied()),
      )
      .filter(session::Column::ExpiresAt.lte(now))
      .exec(self.db)
      .await?;
    Ok(res.rows_affected)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  async fn seeded(db: &DatabaseConnection) -> session::Model {
    let sv = Provider::new(db);
    sv.configure("workink", true, 1, IpCheck::None).await.unwrap();
    sv.create_session("workink", None, Some("42".into()), TimeDelta::minutes(30))
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_forward_only_transitions() {
    let db = test_db::setup().await;
    let sv = Provider::new(&db);
    let session = seeded(&db).await;
    let id = session.session_id.as_str();

    assert!(sv.start(id).await.unwrap());
    assert!(!sv.start(id).await.unwrap());

    assert!(sv.claim(id, Some("tok"), "203.0.113.1", "KEY-A").await.unwrap());
    assert!(!sv.claim(id, Some("tok"), "203.0.113.1", "KEY-A").await.unwrap());

    assert!(sv.finish(id, SessionStatus::Completed, 1, "KEY-A").await.unwrap());
    assert!(!sv.start(id).await.unwrap());
    assert!(!sv.finish(id, SessionStatus::Completed, 2, "KEY-B").await.unwrap());

    let session = sv.session(id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.key_value.as_deref(), Some("KEY-A"));
  }

  #[tokio::test]
  async fn test_expire_stale_skips_terminal() {
    let db = test_db::setup().await;
    let sv = Provider::new(&db);
    let open = seeded(&db).await;
    let done = seeded(&db).await;

    sv.claim(&done.session_id, None, "ip", "KEY-B").await.unwrap();
    sv.finish(&done.session_id, SessionStatus::Completed, 1, "KEY-A")
      .await
      .unwrap();

    let later = Utc::now().naive_utc() + TimeDelta::hours(1);
    assert_eq!(sv.expire_stale(later).await.unwrap(), 1);

    let open = sv.session(&open.session_id).await.unwrap().unwrap();
    assert_eq!(open.status, SessionStatus::Expired);
    let done = sv.session(&done.session_id).await.unwrap().unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
  }

  #[tokio::test]
  async fn test_duplicate_session_id() {
    let db = test_db::setup().await;
    let sv = Provider::new(&db);
    sv.configure("lootlabs", true, 7, IpCheck::None).await.unwrap();

    let ttl = TimeDelta::minutes(5);
    sv.create_session("lootlabs", Some("abc".into()), None, ttl).await.unwrap();
    let res = sv.create_session("lootlabs", Some("abc".into()), None, ttl).await;
    assert!(matches!(res, Err(Error::InvalidArgs(_))));
  }
}
