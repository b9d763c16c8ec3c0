//! Heuristic for scripts that already went through an obfuscator.
//!
//! A script counts as obfuscated only when it is large AND enough of the
//! structural signals below fire. Either condition alone is common in
//! ordinary hand-written scripts.

/// Minimum raw size in bytes.
pub const MIN_SIZE: usize = 100_000;

/// Signals that must fire, out of `SIGNALS.len()`.
pub const MIN_SIGNALS: usize = 5;

type Signal = (&'static str, fn(&str) -> bool);

pub const SIGNALS: &[Signal] = &[
  ("long_identifier", |src: &str| longest_word(src) >= 40),
  ("hex_escapes", |src: &str| hex_escapes(src) >= 20),
  ("decimal_escapes", |src: &str| decimal_escapes(src) >= 50),
  ("wrapped_getfenv", |src: &str| {
    src.contains("getfenv") && src.matches("(function(").count() >= 3
  }),
  ("bxor_helpers", |src: &str| src.matches("bxor").count() >= 3),
  ("radix_parses", |src: &str| src.matches("tonumber(").count() >= 3),
  ("table_concat", |src: &str| src.matches("table.concat").count() >= 3),
  ("marker_comment", marker_comment),
  ("string_char", |src: &str| src.matches("string.char").count() >= 10),
  ("loadstring", |src: &str| src.contains("loadstring(")),
  ("long_line", |src: &str| src.lines().any(|line| line.len() > 5000)),
];

pub fn is_obfuscated(src: &str) -> bool {
  src.len() > MIN_SIZE && signals(src) >= MIN_SIGNALS
}

pub fn signals(src: &str) -> usize {
  SIGNALS.iter().filter(|(_, fires)| fires(src)).count()
}

fn longest_word(src: &str) -> usize {
  src
    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
    .map(str::len)
    .max()
    .unwrap_or(0)
}

fn hex_escapes(src: &str) -> usize {
  src
    .match_indices("\\x")
    .filter(|(at, _)| {
      src
        .get(at + 2..at + 4)
        .is_some_and(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
    })
    .count()
}

fn decimal_escapes(src: &str) -> usize {
  src
    .match_indices('\\')
    .filter(|(at, _)| {
      src.as_bytes().get(at + 1).is_some_and(|b| b.is_ascii_digit())
    })
    .count()
}

fn marker_comment(src: &str) -> bool {
  src.lines().filter_map(|line| line.split_once("--")).any(|(_, comment)| {
    let comment = comment.to_lowercase();
    ["obfuscated", "protected", "encrypted"]
      .iter()
      .any(|word| comment.contains(word))
  })
}
