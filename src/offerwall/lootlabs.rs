//! LootLabs: the completion token is an HMAC of the session id, checked
//! locally.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{Verifier, VerifyContext};
use crate::{config::Credentials, prelude::*};

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, session_id: &str) -> Result<HmacSha256, String> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|err| format!("bad lootlabs secret: {err}"))?;
  mac.update(session_id.as_bytes());
  Ok(mac)
}

/// Token LootLabs hands back for `session_id`.
pub fn sign(secret: &str, session_id: &str) -> Result<String, String> {
  Ok(hex::encode(mac(secret, session_id)?.finalize().into_bytes()))
}

pub struct LootLabs;

#[async_trait]
impl Verifier for LootLabs {
  fn id(&self) -> &'static str {
    "lootlabs"
  }

  fn missing(&self, credentials: &Credentials) -> Option<String> {
    credentials
      .secret
      .is_none()
      .then(|| "set PROVIDER_LOOTLABS_SECRET".to_string())
  }

  async fn verify(&self, cx: &VerifyContext<'_>) -> Result<(), String> {
    let token = cx.token()?;
    let secret = cx.credentials.secret.as_deref().unwrap_or_default();

    let signature = hex::decode(token)
      .map_err(|_| "lootlabs token is not hex".to_string())?;
    mac(secret, &cx.session.session_id)?
      .verify_slice(&signature)
      .map_err(|_| "lootlabs signature mismatch".to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    config::Credentials,
    entity::{IpCheck, SessionStatus, provider, provider_session},
  };

  #[tokio::test]
  async fn test_signature_check() {
    let now = Utc::now().naive_utc();
    let session = provider_session::Model {
      session_id: "loot-session".into(),
      provider: "lootlabs".into(),
      discord_id: None,
      status: SessionStatus::Started,
      provider_token: None,
      ip_address: None,
      key_id: None,
      key_value: None,
      created_at: now,
      started_at: Some(now),
      completed_at: None,
      expires_at: now + TimeDelta::minutes(30),
    };
    let provider = provider::Model {
      id: "lootlabs".into(),
      name: "LootLabs".into(),
      is_active: true,
      key_duration_days: 1,
      ip_check: IpCheck::None,
      total_completions: 0,
      created_at: now,
    };
    let credentials =
      Credentials { secret: Some("loot-secret".into()), ..Default::default() };
    let http = reqwest::Client::new();

    let good = sign("loot-secret", "loot-session").unwrap();
    let forged = sign("other-secret", "loot-session").unwrap();

    for (token, ok) in [(good.as_str(), true), (forged.as_str(), false), ("zz", false)] {
      let cx = VerifyContext {
        session: &session,
        provider: &provider,
        credentials: &credentials,
        token: Some(token),
        ip: "203.0.113.5",
        http: &http,
      };
      assert_eq!(LootLabs.verify(&cx).await.is_ok(), ok, "{token}");
    }
  }
}
