//! Platoboost: two-phase check. An identifier already whitelisted for the
//! key passes, otherwise the key is redeemed for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Verifier, VerifyContext, base_url};
use crate::{config::Credentials, prelude::*};

pub const API_URL: &str = "https://api-gateway.platoboost.com/v1";

#[derive(Debug, Deserialize)]
struct Reply {
  success: bool,
  data: Option<Validity>,
  message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Validity {
  valid: bool,
}

impl Reply {
  fn valid(&self) -> bool {
    self.success && self.data.as_ref().is_some_and(|data| data.valid)
  }
}

#[derive(Debug, Serialize)]
struct Redeem<'a> {
  identifier: &'a str,
  key: &'a str,
}

/// Stable per-session identifier sent to Platoboost instead of the raw id.
pub fn identifier(session_id: &str) -> String {
  utils::sha256_hex(session_id)
}

pub struct Platoboost;

#[async_trait]
impl Verifier for Platoboost {
  fn id(&self) -> &'static str {
    "platoboost"
  }

  fn missing(&self, credentials: &Credentials) -> Option<String> {
    credentials
      .service_id
      .is_none()
      .then(|| "set PROVIDER_PLATOBOOST_SERVICE_ID".to_string())
  }

  async fn verify(&self, cx: &VerifyContext<'_>) -> Result<(), String> {
    let key = cx.token()?;
    let base = base_url(cx.credentials, API_URL);
    let service = cx.credentials.service_id.as_deref().unwrap_or_default();
    let identifier = identifier(&cx.session.session_id);

    let whitelist: Reply = cx
      .http
      .get(format!("{base}/public/whitelist/{service}"))
      .query(&[("identifier", identifier.as_str()), ("key", key)])
      .send()
      .await
      .map_err(|err| format!("platoboost unreachable: {err}"))?
      .json()
      .await
      .map_err(|err| format!("malformed platoboost whitelist reply: {err}"))?;

    if whitelist.valid() {
      return Ok(());
    }

    let redeem: Reply = cx
      .http
      .post(format!("{base}/public/redeem/{service}"))
      .json(&Redeem { identifier: &identifier, key })
      .send()
      .await
      .map_err(|err| format!("platoboost unreachable: {err}"))?
      .json()
      .await
      .map_err(|err| format!("malformed platoboost redeem reply: {err}"))?;

    if redeem.valid() {
      Ok(())
    } else {
      Err(
        redeem
          .message
          .or(whitelist.message)
          .unwrap_or_else(|| "platoboost rejected the key".into()),
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reply_validity() {
    let ok: Reply =
      json::from_str(r#"{"success": true, "data": {"valid": true}}"#).unwrap();
    assert!(ok.valid());

    let rejected: Reply = json::from_str(
      r#"{"success": false, "message": "Key has expired", "data": null}"#,
    )
    .unwrap();
    assert!(!rejected.valid());
    assert_eq!(rejected.message.as_deref(), Some("Key has expired"));
  }

  #[test]
  fn test_identifier_is_hashed() {
    let id = identifier("session-1");
    assert_eq!(id.len(), 64);
    assert_eq!(id, identifier("session-1"));
    assert_ne!(id, identifier("session-2"));
  }
}
