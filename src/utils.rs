use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Reported when no proxy header carries the caller's address.
pub const UNKNOWN_IP: &str = "unknown";

/// Best-effort caller address: CDN header, then real-ip, then the first
/// forwarded-for hop.
pub fn client_ip(headers: &HeaderMap) -> String {
  let header = |name: &str| {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
  };

  header("cf-connecting-ip")
    .or_else(|| header("x-real-ip"))
    .or_else(|| {
      header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    })
    .unwrap_or(UNKNOWN_IP)
    .to_string()
}

pub fn user_agent(headers: &HeaderMap) -> String {
  headers
    .get(axum::http::header::USER_AGENT)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string()
}

pub fn sha256_hex(input: &str) -> String {
  hex::encode(Sha256::digest(input.as_bytes()))
}

pub fn hash_ip(salt: &str, ip: &str) -> String {
  sha256_hex(&format!("{salt}{ip}"))
}

/// Compares two secrets in constant time by checking fixed-length HMAC tags.
pub fn secret_matches(presented: &str, expected: &str) -> bool {
  let tag = |secret: &str| {
    Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map(|mut mac| {
      mac.update(b"keygate-admin");
      mac
    })
  };

  match (tag(presented), tag(expected)) {
    (Ok(presented), Ok(expected)) => {
      expected.verify_slice(&presented.finalize().into_bytes()).is_ok()
    }
    _ => false,
  }
}

/// 244 bits of OS randomness as 64 hex chars.
pub fn random_token() -> String {
  format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn canonical_key(key: &str) -> String {
  key.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn test_client_ip_precedence() {
    let mut headers = HeaderMap::new();
    assert_eq!(client_ip(&headers), UNKNOWN_IP);

    headers.insert(
      "x-forwarded-for",
      HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
    );
    assert_eq!(client_ip(&headers), "198.51.100.7");

    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.8"));
    assert_eq!(client_ip(&headers), "198.51.100.8");

    headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.1"));
    assert_eq!(client_ip(&headers), "203.0.113.1");
  }

  #[test]
  fn test_tokens_are_unique() {
    let a = random_token();
    let b = random_token();
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
  }

  #[test]
  fn test_secret_matches() {
    assert!(secret_matches("admin-secret", "admin-secret"));
    assert!(!secret_matches("admin-secre", "admin-secret"));
    assert!(!secret_matches("admin-secret ", "admin-secret"));
    assert!(!secret_matches("", "admin-secret"));
  }

  #[test]
  fn test_canonical_key() {
    assert_eq!(canonical_key("  key-ab12-cd34 "), "KEY-AB12-CD34");
  }
}
