//! Fixed-window request counters keyed by an arbitrary string (the hwid for
//! validations).

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};

use crate::{entity::rate_limit, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
  Allowed { remaining: u32 },
  Limited { retry_after: TimeDelta },
}

#[derive(Debug, Clone, Copy)]
pub struct Window {
  pub limit: u32,
  pub period: TimeDelta,
}

impl Window {
  fn verdict(&self, hits: u32, start: DateTime, now: DateTime) -> Throttle {
    if hits > self.limit {
      let retry_after = (start + self.period - now).max(TimeDelta::zero());
      Throttle::Limited { retry_after }
    } else {
      Throttle::Allowed { remaining: self.limit - hits }
    }
  }
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
  /// Counts one hit for `key` and reports whether it fits the window.
  async fn hit(&self, key: &str, now: DateTime) -> Result<Throttle>;

  /// Drops windows that ended before `now`.
  async fn gc(&self, now: DateTime) -> Result<u64>;
}

pub struct DbLimiter {
  db: DatabaseConnection,
  window: Window,
}

impl DbLimiter {
  pub fn new(db: DatabaseConnection, window: Window) -> Self {
    Self { db, window }
  }

  async fn read(&self, key: &str) -> Result<rate_limit::Model> {
    rate_limit::Entity::find_by_id(key)
      .one(&self.db)
      .await?
      .ok_or_else(|| Error::Internal(format!("rate window `{key}` vanished")))
  }
}

#[async_trait]
impl RateLimiter for DbLimiter {
  async fn hit(&self, key: &str, now: DateTime) -> Result<Throttle> {
    use rate_limit::Column::{Hits, WindowStart};

    let live = || Expr::col(WindowStart).gt(now - self.window.period);

    // One statement: open a window, extend the live one, or restart a
    // closed one. The conflict branch reads the stored row.
    rate_limit::Entity::insert(rate_limit::ActiveModel {
      key: Set(key.to_string()),
      window_start: Set(now),
      hits: Set(1),
    })
    .on_conflict(
      OnConflict::column(rate_limit::Column::Key)
        .value(Hits, Expr::case(live(), Expr::col(Hits).add(1)).finally(1))
        .value(
          WindowStart,
          Expr::case(live(), Expr::col(WindowStart)).finally(now),
        )
        .to_owned(),
    )
    .exec_without_returning(&self.db)
    .await?;

    let row = self.read(key).await?;
    Ok(self.window.verdict(row.hits.max(0) as u32, row.window_start, now))
  }

  async fn gc(&self, now: DateTime) -> Result<u64> {
    let res = rate_limit::Entity::delete_many()
      .filter(rate_limit::Column::WindowStart.lte(now - self.window.period))
      .exec(&self.db)
      .await?;
    Ok(res.rows_affected)
  }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
  start: DateTime,
  hits: u32,
}

pub struct MemoryLimiter {
  slots: DashMap<String, Slot>,
  window: Window,
}

impl MemoryLimiter {
  pub fn new(window: Window) -> Self {
    Self { slots: DashMap::new(), window }
  }
}

#[async_trait]
impl RateLimiter for MemoryLimiter {
  async fn hit(&self, key: &str, now: DateTime) -> Result<Throttle> {
    let mut slot = self
      .slots
      .entry(key.to_string())
      .or_insert(Slot { start: now, hits: 0 });

    if slot.start + self.window.period <= now {
      *slot = Slot { start: now, hits: 0 };
    }
    slot.hits += 1;

    Ok(self.window.verdict(slot.hits, slot.start, now))
  }

  async fn gc(&self, now: DateTime) -> Result<u64> {
    let before = self.slots.len();
    self.slots.retain(|_, slot| slot.start + self.window.period > now);
    Ok((before - self.slots.len()) as u64)
  }
}
