//! One-time script delivery tokens.
//!
//! A token is minted by a successful validation and consumed by the script
//! endpoint. Redemption is destructive: the first lookup removes the entry,
//! expired or not, so a token can never be spent twice.

use async_trait::async_trait;

use crate::{entity::script_token, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
  pub key_id: i32,
  pub game_id: i32,
  pub script_location: String,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
  /// Stores `grant` under a fresh token. Expired entries are swept first.
  async fn issue(
    &self,
    grant: Grant,
    ttl: TimeDelta,
    now: DateTime,
  ) -> Result<String>;

  /// Removes the token and returns its grant if it was still live.
  async fn redeem(&self, token: &str, now: DateTime) -> Result<Option<Grant>>;
}

/// Shared store: every instance on the same database sees the same tokens.
pub struct DbTokens {
  db: DatabaseConnection,
}

impl DbTokens {
  pub fn new(db: DatabaseConnection) -> Self {
    Self { db }
  }
}

#[async_trait]
impl TokenStore for DbTokens {
  async fn issue(
    &self,
    grant: Grant,
    ttl: TimeDelta,
    now: DateTime,
  ) -> Result<String> {
    let swept = script_token::Entity::delete_many()
      .filter(script_token::Column::ExpiresAt.lte(now))
      .exec(&self.db)
      .await?;
    if swept.rows_affected > 0 {
      debug!("Evicted {} expired script tokens", swept.rows_affected);
    }

    let token = utils::random_token();
    script_token::ActiveModel {
      token: Set(token.clone()),
      key_id: Set(grant.key_id),
      game_id: Set(grant.game_id),
      script_location: Set(grant.script_location),
      expires_at: Set(now + ttl),
    }
    .insert(&self.db)
    .await?;

    Ok(token)
  }

  async fn redeem(&self, token: &str, now: DateTime) -> Result<Option<Grant>> {
    let Some(entry) =
      script_token::Entity::find_by_id(token).one(&self.db).await?
    else {
      return Ok(None);
    };

    // Whoever deletes the row owns it.
    let res = script_token::Entity::delete_by_id(token).exec(&self.db).await?;
    if res.rows_affected != 1 || entry.expires_at <= now {
      return Ok(None);
    }

    Ok(Some(Grant {
      key_id: entry.key_id,
      game_id: entry.game_id,
      script_location: entry.script_location,
    }))
  }
}

/// Process-local store for single-instance deployments.
#[derive(Default)]
pub struct MemoryTokens {
  entries: DashMap<String, (Grant, DateTime)>,
}

impl MemoryTokens {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl TokenStore for MemoryTokens {
  async fn issue(
    &self,
    grant: Grant,
    ttl: TimeDelta,
    now: DateTime,
  ) -> Result<String> {
    self.entries.retain(|_, (_, expires_at)| *expires_at > now);

    let token = utils::random_token();
    self.entries.insert(token.clone(), (grant, now + ttl));
    Ok(token)
  }

  async fn redeem(&self, token: &str, now: DateTime) -> Result<Option<Grant>> {
    Ok(
      self
        .entries
        .remove(token)
        .and_then(|(_, (grant, expires_at))| (expires_at > now).then_some(grant)),
    )
  }
}

#[cfg(test)]
mod tests {
  use futures::future::join_all;

  use super::*;
  use crate::sv::test_utils::test_db;

  fn grant() -> Grant {
    Grant {
      key_id: 1,
      game_id: 7,
      script_location: "https://cdn/script.lua".into(),
    }
  }

  async fn stores() -> Vec<Arc<dyn TokenStore>> {
    vec![
      Arc::new(MemoryTokens::new()),
      Arc::new(DbTokens::new(test_db::setup().await)),
    ]
  }

  #[tokio::test]
  async fn test_redeem_once() {
    for store in stores().await {
      let now = Utc::now().naive_utc();
      let token =
        store.issue(grant(), TimeDelta::minutes(5), now).await.unwrap();

      assert_eq!(store.redeem(&token, now).await.unwrap(), Some(grant()));
      assert_eq!(store.redeem(&token, now).await.unwrap(), None);
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_parallel_redeems_single_winner() {
    for store in stores().await {
      let now = Utc::now().naive_utc();
      let token =
        store.issue(grant(), TimeDelta::minutes(5), now).await.unwrap();

      let attempts = (0..16).map(|_| {
        let store = store.clone();
        let token = token.clone();
        tokio::spawn(async move { store.redeem(&token, now).await.unwrap() })
      });

      let wins = join_all(attempts)
        .await
        .into_iter()
        .filter(|res| matches!(res, Ok(Some(_))))
        .count();

      assert_eq!(wins, 1);
    }
  }

  #[tokio::test]
  async fn test_expired_lookup_consumes_token() {
    for store in stores().await {
      let now = Utc::now().naive_utc();
      let token =
        store.issue(grant(), TimeDelta::minutes(5), now).await.unwrap();

      let later = now + TimeDelta::minutes(6);
      assert_eq!(store.redeem(&token, later).await.unwrap(), None);
      // gone, even when asked with an earlier clock
      assert_eq!(store.redeem(&token, now).await.unwrap(), None);
    }
  }

  #[tokio::test]
  async fn test_issue_sweeps_expired() {
    let db = test_db::setup().await;
    let store = DbTokens::new(db.clone());
    let now = Utc::now().naive_utc();

    store.issue(grant(), TimeDelta::minutes(5), now).await.unwrap();
    store.issue(grant(), TimeDelta::minutes(5), now).await.unwrap();

    let later = now + TimeDelta::minutes(10);
    store.issue(grant(), TimeDelta::minutes(5), later).await.unwrap();

    assert_eq!(script_token::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_unknown_token() {
    for store in stores().await {
      let now = Utc::now().naive_utc();
      assert_eq!(store.redeem("nope", now).await.unwrap(), None);
    }
  }
}
