//! Lua emitted to executors: the encrypted loader stub, the passthrough form
//! for pre-obfuscated scripts, and the in-game key check.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::prelude::*;

const DECRYPTOR: &str = r#"local alphabet = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/"
local function decode(data)
  data = string.gsub(data, "[^%w%+/=]", "")
  return (data:gsub(".", function(x)
    if x == "=" then return "" end
    local bits, index = "", alphabet:find(x, 1, true) - 1
    for i = 6, 1, -1 do
      bits = bits .. (index % 2 ^ i - index % 2 ^ (i - 1) > 0 and "1" or "0")
    end
    return bits
  end):gsub("%d%d%d?%d?%d?%d?%d?%d?", function(x)
    if #x ~= 8 then return "" end
    local byte = 0
    for i = 1, 8 do
      byte = byte + (x:sub(i, i) == "1" and 2 ^ (8 - i) or 0)
    end
    return string.char(byte)
  end))
end
local function decrypt(data, secret)
  local out = {}
  for i = 1, #data do
    local k = string.byte(secret, (i - 1) % #secret + 1)
    out[i] = string.char(bit32.bxor(string.byte(data, i), k))
  end
  return table.concat(out)
end
local chunk, err = loadstring(decrypt(decode(payload), secret))
if not chunk then
  error("failed to load script: " .. tostring(err))
end
return chunk()
"#;

const KEY_CHECK: &str = r#"do
  local key = (getgenv and getgenv().script_key) or _G.script_key
  if not key then
    error("No key provided, set script_key before running this script")
  end
  local http = game:GetService("HttpService")
  local send = (syn and syn.request) or http_request or request
  local hwid = (gethwid and gethwid())
    or game:GetService("RbxAnalyticsService"):GetClientId()
  local response = send({
    Url = "__VALIDATE_URL__",
    Method = "POST",
    Headers = { ["Content-Type"] = "application/json" },
    Body = http:JSONEncode({
      key = key,
      hwid = hwid,
      place_id = game.PlaceId,
      executor = identifyexecutor and identifyexecutor() or nil,
    }),
  })
  local ok, data = pcall(http.JSONDecode, http, response.Body)
  if not ok or not data.success then
    error((ok and data.error) or "Key validation failed")
  end
end
"#;

/// XOR with the repeating key, then base64.
pub fn encrypt(content: &str, key: &str) -> String {
  let key = key.as_bytes();
  let bytes: Vec<u8> = content
    .bytes()
    .zip(key.iter().cycle())
    .map(|(byte, k)| byte ^ k)
    .collect();
  STANDARD.encode(bytes)
}

pub fn watermark(name: &str) -> String {
  format!(
    "-- {name} | delivered by keygate | {}\n",
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
  )
}

/// Stanza that validates the player's key against `public_url` before the
/// payload runs.
pub fn key_check(public_url: &str) -> String {
  let url = format!("{}/validate", public_url.trim_end_matches('/'));
  KEY_CHECK.replace("__VALIDATE_URL__", &url)
}

/// Absolute URL for a game's script location; relative paths are served by
/// this service.
pub fn location(script_location: &str, public_url: &str) -> String {
  if script_location.starts_with("http://") || script_location.starts_with("https://") {
    return script_location.to_string();
  }
  format!(
    "{}/{}",
    public_url.trim_end_matches('/'),
    script_location.trim_start_matches('/')
  )
}

/// One-liner handed out by `POST /script`.
pub fn fetcher(url: &str) -> String {
  format!("loadstring(game:HttpGet({url:?}))()")
}

pub fn passthrough(name: &str, content: &str, check: Option<&str>) -> String {
  let mut out = watermark(name);
  out.extend(check);
  out.push_str(content);
  out
}

pub fn encrypted(
  name: &str,
  content: &str,
  key: &str,
  check: Option<&str>,
) -> String {
  let payload = encrypt(content, key);

  let mut out = watermark(name);
  out.extend(check);
  out.push_str(&format!("local payload = \"{payload}\"\n"));
  out.push_str(&format!("local secret = \"{key}\"\n"));
  out.push_str(DECRYPTOR);
  out
}
