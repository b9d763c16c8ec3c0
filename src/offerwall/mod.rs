//! Offer-wall redemption bridge.
//!
//! Each provider only knows how to verify a completion proof. The session
//! state machine, key minting and idempotency live here and are shared.

pub mod linkvertise;
pub mod lootlabs;
pub mod platoboost;
pub mod workink;

use async_trait::async_trait;

use crate::{
  config::Credentials,
  entity::{IpCheck, KeyType, SessionStatus, provider, provider_session},
  prelude::*,
  state::AppState,
  sv::key::generate_value,
};

/// Everything a verifier may look at for one completion attempt.
pub struct VerifyContext<'a> {
  pub session: &'a provider_session::Model,
  pub provider: &'a provider::Model,
  pub credentials: &'a Credentials,
  pub token: Option<&'a str>,
  pub ip: &'a str,
  pub http: &'a reqwest::Client,
}

impl VerifyContext<'_> {
  pub fn token(&self) -> Result<&str, String> {
    self
      .token
      .map(str::trim)
      .filter(|token| !token.is_empty())
      .ok_or_else(|| "missing completion token".to_string())
  }

  /// Compares the address the provider saw with the requester's.
  pub fn check_ip(&self, recorded: Option<&str>) -> Result<(), String> {
    let expected = match self.provider.ip_check {
      IpCheck::None => return Ok(()),
      IpCheck::Raw => self.ip.to_string(),
      IpCheck::Hashed => {
        let salt = self.credentials.ip_salt.as_deref().ok_or_else(|| {
          format!(
            "hashed IP check needs PROVIDER_{}_IP_SALT",
            self.provider.id.to_uppercase()
          )
        })?;
        utils::hash_ip(salt, self.ip)
      }
    };

    match recorded {
      Some(recorded) if recorded.eq_ignore_ascii_case(&expected) => Ok(()),
      Some(_) => Err("completion was made from a different IP".into()),
      None => Err("provider did not report the completion IP".into()),
    }
  }
}

#[async_trait]
pub trait Verifier: Send + Sync {
  fn id(&self) -> &'static str;

  /// Hint naming the missing credential, if any.
  fn missing(&self, _credentials: &Credentials) -> Option<String> {
    None
  }

  /// Checks the completion proof. Transport problems and malformed upstream
  /// payloads are failures too, reported as a human readable reason.
  async fn verify(&self, cx: &VerifyContext<'_>) -> Result<(), String>;
}

pub struct Registry {
  verifiers: HashMap<&'static str, Arc<dyn Verifier>>,
}

impl Registry {
  pub fn empty() -> Self {
    Self { verifiers: HashMap::new() }
  }

  pub fn register<V: Verifier + 'static>(&mut self, verifier: V) {
    self.verifiers.insert(verifier.id(), Arc::new(verifier));
  }

  pub fn get(&self, id: &str) -> Option<Arc<dyn Verifier>> {
    self.verifiers.get(id).cloned()
  }
}

impl Default for Registry {
  fn default() -> Self {
    let mut registry = Self::empty();
    registry.register(workink::WorkInk);
    registry.register(platoboost::Platoboost);
    registry.register(linkvertise::Linkvertise);
    registry.register(lootlabs::LootLabs);
    registry
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
  pub key: String,
  pub expires_at: Option<DateTime>,
  /// The session was already completed and this is the stored key.
  pub repeated: bool,
}

pub struct Bridge<'a> {
  app: &'a AppState,
}

impl<'a> Bridge<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  /// Turns a verified completion into a key. Calling it again for a session
  /// that already has a key returns that key.
  pub async fn complete(
    &self,
    provider_id: &str,
    session_id: &str,
    token: Option<&str>,
    ip: &str,
    finish: SessionStatus,
  ) -> Result<Issued> {
    let sv = self.app.sv();
    let now = Utc::now().naive_utc();

    let session = sv
      .provider
      .session(session_id)
      .await?
      .filter(|session| session.provider == provider_id)
      .ok_or(Error::SessionNotFound)?;

    if let Some(issued) = self.issued(&session).await? {
      return Ok(issued);
    }
    if session.status == SessionStatus::Verified {
      return self.resume(&session, finish).await;
    }
    if session.status == SessionStatus::Expired || session.expires_at <= now {
      return Err(Error::SessionExpired);
    }

    let (provider, verifier, credentials) =
      self.resolve(provider_id, session_id).await?;

    let cx = VerifyContext {
      session: &session,
      provider: &provider,
      credentials: &credentials,
      token,
      ip,
      http: &self.app.http,
    };
    verifier.verify(&cx).await.map_err(|reason| Error::Verification {
      provider: provider_id.to_string(),
      session: session_id.to_string(),
      reason,
    })?;

    let value = generate_value();
    if !sv.provider.claim(session_id, token, ip, &value).await? {
      let current = sv.provider.session(session_id).await?;
      return match current {
        Some(current) => match self.issued(&current).await? {
          Some(issued) => Ok(issued),
          None if current.status == SessionStatus::Expired => {
            Err(Error::SessionExpired)
          }
          None => Err(Error::SessionBusy),
        },
        None => Err(Error::SessionNotFound),
      };
    }

    self.settle(&session, &provider, value, finish).await
  }

  /// Finishes a session whose key mint was interrupted after the claim. The
  /// completion was already verified, so the provider is not asked again.
  async fn resume(
    &self,
    session: &provider_session::Model,
    finish: SessionStatus,
  ) -> Result<Issued> {
    let Some(value) = session.key_value.clone() else {
      return Err(Error::SessionBusy);
    };

    let provider = self
      .app
      .sv()
      .provider
      .by_id(&session.provider)
      .await?
      .ok_or_else(|| Error::ProviderNotConfigured {
        provider: session.provider.clone(),
        session: Some(session.session_id.clone()),
        hint: "provider row disappeared while a key was pending".into(),
      })?;

    warn!("Resuming key mint for session `{}`", session.session_id);
    self.settle(session, &provider, value, finish).await
  }

  /// Mints the reserved key (or picks it up if an earlier attempt already
  /// stored it) and moves the session to `finish`.
  async fn settle(
    &self,
    session: &provider_session::Model,
    provider: &provider::Model,
    value: String,
    finish: SessionStatus,
  ) -> Result<Issued> {
    let sv = self.app.sv();
    let session_id = session.session_id.as_str();
    let provider_id = provider.id.as_str();

    let key = match sv.key.by_value(&value).await? {
      Some(key) => key,
      None => {
        let days = provider.key_duration_days.max(1) as u32;
        let minted = sv
          .key
          .mint(
            value.clone(),
            KeyType::for_duration(days),
            Some(days),
            session.discord_id.as_deref(),
          )
          .await;
        match minted {
          Ok(key) => key,
          // a concurrent resume may have inserted the same value
          Err(err) => sv.key.by_value(&value).await?.ok_or(err)?,
        }
      }
    };

    if !sv.provider.finish(session_id, finish, key.id, &key.value).await? {
      let current = sv.provider.session(session_id).await?;
      return match current {
        Some(current) => {
          self.issued(&current).await?.ok_or(Error::SessionBusy)
        }
        None => Err(Error::SessionNotFound),
      };
    }

    if let Err(err) = sv.provider.increment_completions(provider_id).await {
      warn!("Failed to count completion for `{provider_id}`: {err}");
    }

    info!(
      "Provider `{provider_id}` session `{session_id}` redeemed for key {}",
      key.id
    );

    Ok(Issued { key: key.value, expires_at: key.expires_at, repeated: false })
  }

  async fn issued(
    &self,
    session: &provider_session::Model,
  ) -> Result<Option<Issued>> {
    if !session.status.is_terminal() {
      return Ok(None);
    }

    let Some(value) = session.key_value.clone() else {
      return Err(Error::Internal(format!(
        "session `{}` is {:?} without a key",
        session.session_id, session.status
      )));
    };

    let expires_at = match session.key_id {
      Some(id) => self.app.sv().key.by_id(id).await?.and_then(|k| k.expires_at),
      None => None,
    };

    Ok(Some(Issued { key: value, expires_at, repeated: true }))
  }

  async fn resolve(
    &self,
    provider_id: &str,
    session_id: &str,
  ) -> Result<(provider::Model, Arc<dyn Verifier>, Credentials)> {
    let not_configured = |hint: String| Error::ProviderNotConfigured {
      provider: provider_id.to_string(),
      session: Some(session_id.to_string()),
      hint,
    };

    let Some(verifier) = self.app.providers.get(provider_id) else {
      return Err(not_configured(format!("no verifier for `{provider_id}`")));
    };

    let provider = match self.app.sv().provider.by_id(provider_id).await? {
      Some(provider) if provider.is_active => provider,
      Some(_) => {
        return Err(not_configured(format!(
          "provider is disabled, enable it with POST /admin/providers/{provider_id}"
        )));
      }
      None => {
        return Err(not_configured(format!(
          "no provider row, create it with POST /admin/providers/{provider_id}"
        )));
      }
    };

    let credentials =
      self.app.config.credentials(provider_id).cloned().unwrap_or_default();
    if let Some(hint) = verifier.missing(&credentials) {
      return Err(not_configured(hint));
    }

    Ok((provider, verifier, credentials))
  }
}

/// Base URL override from the environment, or the provider's public API.
pub(crate) fn base_url<'a>(credentials: &'a Credentials, default: &'a str) -> &'a str {
  credentials
    .base_url
    .as_deref()
    .unwrap_or(default)
    .trim_end_matches('/')
}
