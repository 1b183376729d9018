//! Fenced-code splitting for backend text.
//!
//! A code block is recognized only between a matching pair of ``` markers. The
//! optional language tag sits right after the opening marker on the same line.
//! An opening marker without a partner stays plain text.

const FENCE: &str = "```";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
  Text(&'a str),
  Code { lang: Option<&'a str>, body: &'a str },
}

/// Split `text` into plain and fenced segments, in order. Empty plain runs are skipped.
pub fn split_fences(text: &str) -> Vec<Segment<'_>> {
  let mut out = Vec::new();
  let mut rest = text;

  while let Some(open) = rest.find(FENCE) {
    let after_open = &rest[open + FENCE.len()..];
    let Some(close) = after_open.find(FENCE) else { break };

    if open > 0 {
      out.push(Segment::Text(&rest[..open]));
    }
    let (lang, body) = split_info_line(&after_open[..close]);
    out.push(Segment::Code { lang, body });
    rest = &after_open[close + FENCE.len()..];
  }

  if !rest.is_empty() {
    out.push(Segment::Text(rest));
  }
  out
}

/// Separate the language tag (first line, single token) from the code body.
fn split_info_line(inner: &str) -> (Option<&str>, &str) {
  let (first, body) = match inner.find('\n') {
    Some(nl) => (&inner[..nl], &inner[nl + 1..]),
    None => return (None, inner.trim_matches('\n')),
  };
  let tag = first.trim();
  let body = body.strip_suffix('\n').map(|b| b.strip_suffix('\r').unwrap_or(b)).unwrap_or(body);

  if tag.is_empty() {
    (None, body)
  } else if is_lang_token(tag) {
    (Some(tag), body)
  } else {
    // Not a tag, so the first line belongs to the code.
    (None, inner.trim_end_matches('\n'))
  }
}

fn is_lang_token(s: &str) -> bool {
  s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.'))
}
