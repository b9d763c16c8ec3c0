use std::sync::Arc;

use async_trait::async_trait;

use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Once-a-minute housekeeping: stale rate-limit windows and overdue
/// offer-wall sessions. Script tokens are evicted on issuance instead.
pub struct GC;

#[async_trait]
impl Plugin for GC {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    tokio::spawn(async move {
      let mut interval = time::interval(Duration::from_secs(60));
      loop {
        interval.tick().await;
        app.gc().await;
      }
    });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    entity::{IpCheck, SessionStatus},
    prelude::*,
    sv::test_utils::test_app,
  };

  #[tokio::test]
  async fn test_gc_expires_overdue_sessions() {
    let app = test_app::setup().await;
    let sv = app.sv();
    sv.provider.configure("workink", true, 1, IpCheck::None).await.unwrap();

    let overdue = sv
      .provider
      .create_session("workink", None, None, TimeDelta::seconds(-5))
      .await
      .unwrap();
    let live = sv
      .provider
      .create_session("workink", None, None, TimeDelta::minutes(30))
      .await
      .unwrap();

    app.gc().await;

    let overdue = sv.provider.session(&overdue.session_id).await.unwrap().unwrap();
    let live = sv.provider.session(&live.session_id).await.unwrap().unwrap();
    assert_eq!(overdue.status, SessionStatus::Expired);
    assert_eq!(live.status, SessionStatus::Pending);
  }
}
