//! Normalization of untrusted completion text into something a JSON parser can take.
//!
//! Models often wrap the array in ```json fences or add a sentence around it.
//! `extract_json_payload` never fails; whether the result parses is the caller's concern.

use std::sync::OnceLock;

use regex::Regex;

fn json_array_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").ok()).as_ref()
}

/// Return the first `[ { ... } ]` structure in `raw`, or `raw` with code fences stripped.
pub fn extract_json_payload(raw: &str) -> String {
  if let Some(m) = json_array_re().and_then(|re| re.find(raw)) {
    return m.as_str().to_string();
  }
  strip_fences(raw)
}

fn strip_fences(raw: &str) -> String {
  let mut s = raw.trim();
  if let Some(rest) = s.strip_prefix("```") {
    s = rest.strip_prefix("json").or_else(|| rest.strip_prefix("JSON")).unwrap_or(rest);
  }
  if let Some(rest) = s.trim_end().strip_suffix("```") {
    s = rest;
  }
  s.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  const ARRAY: &str = r#"[{"id": 1, "question": "Q?", "options": ["a", "b"], "correct_answer": "a"}]"#;

  #[test]
  fn bare_array_is_returned_unchanged() {
    assert_eq!(extract_json_payload(ARRAY), ARRAY);
  }

  #[test]
  fn fenced_array_loses_only_the_fences() {
    let raw = format!("```json\n{ARRAY}\n```");
    assert_eq!(extract_json_payload(&raw), ARRAY);
  }

  #[test]
  fn prose_around_the_array_is_dropped() {
    let raw = format!("Sure! Here is your test:\n\n{ARRAY}\n\nGood luck with your exam.");
    assert_eq!(extract_json_payload(&raw), ARRAY);
  }

  #[test]
  fn multiline_arrays_with_nested_lists_are_kept_whole() {
    let raw = "[\n  {\n    \"id\": 1,\n    \"key_points\": [\"x\", \"y\"]\n  },\n  {\n    \"id\": 2,\n    \"key_points\": []\n  }\n]";
    assert_eq!(extract_json_payload(raw), raw);
  }

  #[test]
  fn no_array_falls_back_to_fence_stripping() {
    assert_eq!(extract_json_payload("```json\n{\"questions\": 1}\n```"), "{\"questions\": 1}");
    assert_eq!(extract_json_payload("  I cannot help with that.  "), "I cannot help with that.");
  }
}
