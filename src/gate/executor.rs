//! Tells Roblox executors apart from browsers and API testing tools.

use axum::http::HeaderMap;

/// Vendor headers that identify an executor outright.
const VENDOR_HEADERS: &[(&str, &str)] =
  &[("syn-fingerprint", "Synapse X"), ("krnl-fingerprint", "KRNL")];

/// User-agent fragments of known executors. First match names the client.
const EXECUTORS: &[(&str, &str)] = &[
  ("synapse", "Synapse X"),
  ("krnl", "KRNL"),
  ("fluxus", "Fluxus"),
  ("oxygen", "Oxygen U"),
  ("hydrogen", "Hydrogen"),
  ("electron", "Electron"),
  ("evon", "Evon"),
  ("arceus", "Arceus X"),
  ("comet", "Comet"),
  ("delta", "Delta"),
  ("trigon", "Trigon"),
  ("vega", "Vega X"),
  ("wininet", "WinInet"),
  ("roblox studio", "Roblox Studio"),
  ("robloxstudio", "Roblox Studio"),
  ("roblox", "Roblox"),
];

const TESTING_TOOLS: &[(&str, &str)] = &[
  ("curl", "curl"),
  ("postmanruntime", "Postman"),
  ("insomnia", "Insomnia"),
  ("httpie", "HTTPie"),
  ("wget", "Wget"),
  ("node-fetch", "fetch"),
  ("undici", "fetch"),
];

const BROWSERS: &[&str] = &[
  "mozilla",
  "chrome",
  "safari",
  "firefox",
  "edge",
  "opera",
  "webkit",
  "gecko",
  "trident",
  "applewebkit",
];

/// Marks a browser-looking user agent as a Roblox HTTP client.
const HTTP_CLIENT_OVERRIDE: &str = "roblox-id";

/// Shorter user agents carry no usable signal.
const MIN_USER_AGENT: usize = 10;

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Client {
  /// Allowed through the gate, with the best name available.
  Executor(String),
  Browser,
  /// An API testing tool while the development bypass is off.
  Tool(&'static str),
}

impl Client {
  pub fn is_executor(&self) -> bool {
    matches!(self, Client::Executor(_))
  }

  pub fn name(&self) -> &str {
    match self {
      Client::Executor(name) => name,
      Client::Browser => "browser",
      Client::Tool(name) => name,
    }
  }
}

pub fn classify(headers: &HeaderMap, bypass: bool) -> Client {
  if let Some((_, name)) =
    VENDOR_HEADERS.iter().find(|(header, _)| headers.contains_key(*header))
  {
    return Client::Executor(name.to_string());
  }

  let ua = crate::utils::user_agent(headers).to_lowercase();

  if let Some((_, name)) =
    EXECUTORS.iter().find(|(needle, _)| ua.contains(needle))
  {
    return Client::Executor(name.to_string());
  }

  if let Some((_, name)) =
    TESTING_TOOLS.iter().find(|(needle, _)| ua.contains(needle))
  {
    return if bypass {
      Client::Executor(name.to_string())
    } else {
      Client::Tool(name)
    };
  }

  if ua.trim().len() < MIN_USER_AGENT {
    return Client::Executor(UNKNOWN.into());
  }

  if BROWSERS.iter().any(|needle| ua.contains(needle))
    && !headers.contains_key(HTTP_CLIENT_OVERRIDE)
  {
    return Client::Browser;
  }

  Client::Executor(UNKNOWN.into())
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, header::USER_AGENT};

  use super::*;

  const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

  fn headers(ua: &str, extra: &[&'static str]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if !ua.is_empty() {
      headers.insert(USER_AGENT, HeaderValue::from_str(ua).unwrap());
    }
    for name in extra {
      headers.insert(*name, HeaderValue::from_static("1"));
    }
    headers
  }

  #[test]
  fn test_classification_table() {
    let table: &[(&str, &[&'static str], bool, bool, &str)] = &[
      ("", &[], false, true, UNKNOWN),
      ("Lua", &[], false, true, UNKNOWN),
      (CHROME, &[], false, false, "browser"),
      (CHROME, &["roblox-id"], false, true, UNKNOWN),
      ("KRNL/2.1 (Windows)", &[], false, true, "KRNL"),
      (CHROME, &["syn-fingerprint"], false, true, "Synapse X"),
      ("Roblox/WinInet", &[], false, true, "WinInet"),
      ("RobloxStudio/WinHttp", &[], false, true, "Roblox Studio"),
      ("PostmanRuntime/7.36.0", &[], false, false, "Postman"),
      ("PostmanRuntime/7.36.0", &[], true, true, "Postman"),
      ("curl/8.4.0", &[], false, false, "curl"),
      ("SomeCustomHttpClient/1.0", &[], false, true, UNKNOWN),
    ];

    for &(ua, extra, bypass, executor, name) in table {
      let client = classify(&headers(ua, extra), bypass);
      assert_eq!(client.is_executor(), executor, "{ua:?} {extra:?} {bypass}");
      assert_eq!(client.name(), name, "{ua:?} {extra:?} {bypass}");
    }
  }
}
