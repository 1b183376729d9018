//! Small utility helpers used across modules.

/// Log-safe truncation for large strings.
/// Avoids spamming logs (and error details) with huge backend bodies.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Key that groups quiz results: platform|technology|topic, lowercased.
pub fn context_key(platform: &str, technology: &str, topic: &str) -> String {
  [platform, technology, topic]
    .iter()
    .map(|p| p.trim().to_lowercase())
    .collect::<Vec<_>>()
    .join("|")
}

/// Reduce arbitrary text to something usable inside an HTML id.
pub fn dom_id(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    if ch.is_ascii_alphanumeric() {
      out.push(ch.to_ascii_lowercase());
    } else if !out.ends_with('-') {
      out.push('-');
    }
  }
  let trimmed = out.trim_matches('-');
  if trimmed.is_empty() { "any".to_string() } else { trimmed.to_string() }
}
