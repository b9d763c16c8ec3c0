pub mod admin;
pub mod offerwall;
pub mod script;
pub mod validate;

pub async fn health() -> &'static str {
  "OK"
}

/// Query flags arrive as `1`, `true` or `yes`.
pub(crate) fn truthy(value: Option<&str>) -> bool {
  value.is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}
