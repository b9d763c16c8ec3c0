//! Linkvertise anti-bypass check: the completion hash is confirmed with the
//! publisher token.

use async_trait::async_trait;
use serde::Deserialize;

use super::{Verifier, VerifyContext, base_url};
use crate::{config::Credentials, prelude::*};

pub const API_URL: &str = "https://publisher.linkvertise.com";

#[derive(Debug, Deserialize)]
struct AntiBypass {
  status: bool,
}

pub struct Linkvertise;

#[async_trait]
impl Verifier for Linkvertise {
  fn id(&self) -> &'static str {
    "linkvertise"
  }

  fn missing(&self, credentials: &Credentials) -> Option<String> {
    credentials
      .secret
      .is_none()
      .then(|| "set PROVIDER_LINKVERTISE_SECRET".to_string())
  }

  async fn verify(&self, cx: &VerifyContext<'_>) -> Result<(), String> {
    let hash = cx.token()?;
    let secret = cx.credentials.secret.as_deref().unwrap_or_default();

    let reply: AntiBypass = cx
      .http
      .post(format!(
        "{}/api/v1/anti_bypassing",
        base_url(cx.credentials, API_URL)
      ))
      .query(&[("token", secret), ("hash", hash)])
      .send()
      .await
      .map_err(|err| format!("linkvertise unreachable: {err}"))?
      .json()
      .await
      .map_err(|err| format!("malformed linkvertise response: {err}"))?;

    if reply.status {
      Ok(())
    } else {
      Err("linkvertise hash was not accepted".into())
    }
  }
}
