//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a single
/// left-to-right pass; substituted values are never rescanned, so braces inside a
/// value are emitted verbatim. Unknown placeholders are left untouched.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let hit = after.find('}').and_then(|close| {
      let key = &after[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, close))
    });
    match hit {
      Some((value, close)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge oracle payloads. Cuts on a char boundary.
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

/// Length in characters (not bytes) after trimming.
pub fn trimmed_len(s: &str) -> usize {
  s.trim().chars().count()
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```), if any.
/// Text without a fence is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
  let t = raw.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let Some(body) = rest.strip_suffix("```") else { return t };
  // Drop the info string ("json", "JSON", ...) on the opening line.
  match body.find('\n') {
    Some(nl) if body[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => body[nl + 1..].trim(),
    _ => body.trim(),
  }
}
