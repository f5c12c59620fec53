//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Values are inserted once; placeholders inside values are not expanded again.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  'outer: while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open..];
    for (k, v) in pairs {
      let needle = format!("{{{}}}", k);
      if after.starts_with(&needle) {
        out.push_str(v);
        rest = &after[needle.len()..];
        continue 'outer;
      }
    }
    out.push('{');
    rest = &after[1..];
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_known_keys_and_keeps_json_braces() {
    let out = fill_template("key={k} json={\"a\":1}", &[("k", "v")]);
    assert_eq!(out, "key=v json={\"a\":1}");
  }

  #[test]
  fn substituted_values_are_not_reexpanded() {
    let out = fill_template("{a}|{b}", &[("a", "{b}"), ("b", "x")]);
    assert_eq!(out, "{b}|x");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let out = trunc_for_log("ééééé", 3);
    assert!(out.starts_with('é'));
    assert!(out.ends_with("(10 bytes total)"));
  }
}
