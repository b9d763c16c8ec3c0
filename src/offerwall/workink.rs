//! Work.ink: the completion token is checked (and consumed) upstream, which
//! also reports the address the offer was completed from.

use async_trait::async_trait;
use serde::Deserialize;

use super::{Verifier, VerifyContext, base_url};
use crate::prelude::*;

pub const API_URL: &str = "https://work.ink";

#[derive(Debug, Deserialize)]
struct TokenCheck {
  valid: bool,
  info: Option<TokenInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
  by_ip: Option<String>,
}

pub struct WorkInk;

#[async_trait]
impl Verifier for WorkInk {
  fn id(&self) -> &'static str {
    "workink"
  }

  async fn verify(&self, cx: &VerifyContext<'_>) -> Result<(), String> {
    let token = cx.token()?;
    let url = format!(
      "{}/_api/v2/token/isValid/{token}",
      base_url(cx.credentials, API_URL)
    );

    let check: TokenCheck = cx
      .http
      .get(url)
      .query(&[("deleteToken", "1")])
      .send()
      .await
      .map_err(|err| format!("work.ink unreachable: {err}"))?
      .json()
      .await
      .map_err(|err| format!("malformed work.ink response: {err}"))?;

    if !check.valid {
      return Err("work.ink token is not valid".into());
    }

    let recorded = check.info.and_then(|info| info.by_ip);
    cx.check_ip(recorded.as_deref())
  }
}
