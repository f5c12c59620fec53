//! Question set construction from a raw generation response.
//!
//! Flow:
//! 1) Sanitize the completion text (`sanitize::extract_json_payload`).
//! 2) Parse as JSON and decode into the typed variant for the requested format.
//! 3) Validate the shape needed to render and grade the form.
//!
//! Any failure is a `MalformedGeneration`; callers never see a half-built set.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{ChoiceQuestion, DescriptiveQuestion, QuestionFormat, QuestionSet};
use crate::error::MockTestError;
use crate::sanitize::extract_json_payload;
use crate::util::trunc_for_log;

/// Build a `QuestionSet` of `format` from raw completion text.
/// `expected` is the requested count; a mismatch is tolerated and logged.
pub fn parse_question_set(raw: &str, format: QuestionFormat, expected: u32) -> Result<QuestionSet, MockTestError> {
  let payload = extract_json_payload(raw);
  let value: Value = serde_json::from_str(&payload).map_err(|e| {
    debug!(target: "mock_test", payload = %trunc_for_log(&payload, 120), "Generation payload is not JSON");
    MockTestError::MalformedGeneration(format!("not JSON: {e}"))
  })?;
  let items = question_array(value)?;

  let set = match format {
    QuestionFormat::MultipleChoice => QuestionSet::MultipleChoice(decode_choice(items)?),
    QuestionFormat::Numerical => QuestionSet::Numerical(decode_choice(items)?),
    QuestionFormat::Descriptive => QuestionSet::Descriptive(decode_descriptive(items)?),
  };

  ensure_unique_ids(&set.ids())?;
  if set.len() != expected as usize {
    warn!(target: "mock_test", expected, received = set.len(), %format, "Generated question count differs from request");
  }
  Ok(set)
}

fn question_array(value: Value) -> Result<Vec<Value>, MockTestError> {
  let items = match value {
    Value::Array(items) => items,
    Value::Object(mut obj) => match obj.remove("questions") {
      Some(Value::Array(items)) => items,
      _ => return Err(MockTestError::MalformedGeneration("expected a JSON array of questions".into())),
    },
    _ => return Err(MockTestError::MalformedGeneration("expected a JSON array of questions".into())),
  };
  if items.is_empty() {
    return Err(MockTestError::MalformedGeneration("question array is empty".into()));
  }
  Ok(items)
}

fn decode<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, MockTestError> {
  items
    .into_iter()
    .enumerate()
    .map(|(idx, item)| {
      serde_json::from_value::<T>(item)
        .map_err(|e| MockTestError::MalformedGeneration(format!("question #{}: {e}", idx + 1)))
    })
    .collect()
}

fn decode_choice(items: Vec<Value>) -> Result<Vec<ChoiceQuestion>, MockTestError> {
  let questions: Vec<ChoiceQuestion> = decode(items)?;
  for q in &questions {
    validate_choice(q)?;
  }
  Ok(questions)
}

fn decode_descriptive(items: Vec<Value>) -> Result<Vec<DescriptiveQuestion>, MockTestError> {
  let questions: Vec<DescriptiveQuestion> = decode(items)?;
  for q in &questions {
    if q.question.trim().is_empty() {
      return Err(MockTestError::MalformedGeneration(format!("Q{}: empty question text", q.id)));
    }
    if q.marks == 0 {
      return Err(MockTestError::MalformedGeneration(format!("Q{}: marks must be positive", q.id)));
    }
  }
  Ok(questions)
}

/// A choice question is usable only if its answer is exactly one of its options.
pub fn validate_choice(q: &ChoiceQuestion) -> Result<(), MockTestError> {
  if q.question.trim().is_empty() {
    return Err(MockTestError::MalformedGeneration(format!("Q{}: empty question text", q.id)));
  }
  if q.options.len() < 2 {
    return Err(MockTestError::MalformedGeneration(format!("Q{}: needs at least 2 options, got {}", q.id, q.options.len())));
  }
  if q.options.iter().any(|o| o.trim().is_empty()) {
    return Err(MockTestError::MalformedGeneration(format!("Q{}: blank option", q.id)));
  }
  let matches = q.options.iter().filter(|o| **o == q.correct_answer).count();
  if matches != 1 {
    return Err(MockTestError::MalformedGeneration(format!(
      "Q{}: correct_answer matches {} options (expected exactly 1)",
      q.id, matches
    )));
  }
  if q.options.len() != 4 {
    debug!(target: "mock_test", id = q.id, options = q.options.len(), "Choice question without exactly 4 options");
  }
  Ok(())
}

fn ensure_unique_ids(ids: &[u32]) -> Result<(), MockTestError> {
  let mut seen = HashSet::new();
  for id in ids {
    if !seen.insert(*id) {
      return Err(MockTestError::MalformedGeneration(format!("duplicate question id {id}")));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const MCQ: &str = r#"[
    {"id": 1, "question": "Unit of resistance?", "options": ["ohm", "volt", "ampere", "watt"], "correct_answer": "ohm", "explanation": "R = V/I"},
    {"id": 2, "question": "Unit of charge?", "options": ["coulomb", "tesla", "joule", "henry"], "correct_answer": "coulomb"}
  ]"#;

  #[test]
  fn fenced_mcq_array_parses_into_typed_set() {
    let raw = format!("```json\n{MCQ}\n```");
    let set = parse_question_set(&raw, QuestionFormat::MultipleChoice, 2).expect("set");
    assert_eq!(set.format(), QuestionFormat::MultipleChoice);
    assert_eq!(set.ids(), vec![1, 2]);
    match set {
      QuestionSet::MultipleChoice(qs) => {
        assert_eq!(qs[0].explanation, "R = V/I");
        assert_eq!(qs[1].explanation, "");
      }
      other => panic!("unexpected variant {other:?}"),
    }
  }

  #[test]
  fn count_mismatch_is_tolerated() {
    let set = parse_question_set(MCQ, QuestionFormat::Numerical, 5).expect("set");
    assert_eq!(set.len(), 2);
    assert_eq!(set.format(), QuestionFormat::Numerical);
  }

  #[test]
  fn prose_without_json_is_malformed() {
    let err = parse_question_set("I'm sorry, I can't generate that test.", QuestionFormat::MultipleChoice, 3).unwrap_err();
    assert!(matches!(err, MockTestError::MalformedGeneration(_)));
  }

  #[test]
  fn answer_not_among_options_is_rejected() {
    let raw = r#"[{"id": 1, "question": "2+2?", "options": ["3", "4", "5", "6"], "correct_answer": "4 "}]"#;
    let err = parse_question_set(raw, QuestionFormat::MultipleChoice, 1).unwrap_err();
    assert!(err.to_string().contains("correct_answer matches 0 options"));
  }

  #[test]
  fn duplicated_correct_option_is_rejected() {
    let raw = r#"[{"id": 1, "question": "2+2?", "options": ["4", "4", "5", "6"], "correct_answer": "4"}]"#;
    assert!(parse_question_set(raw, QuestionFormat::MultipleChoice, 1).is_err());
  }

  #[test]
  fn missing_fields_are_reported_per_question() {
    let raw = r#"[{"id": 1, "question": "Q", "options": ["a", "b"]}]"#;
    let err = parse_question_set(raw, QuestionFormat::MultipleChoice, 1).unwrap_err();
    assert!(err.to_string().contains("question #1"));
    assert!(err.to_string().contains("correct_answer"));
  }

  #[test]
  fn descriptive_needs_positive_marks() {
    let ok = r#"[{"id": 1, "question": "Explain entropy.", "marks": 5, "key_points": ["disorder"]}]"#;
    let set = parse_question_set(ok, QuestionFormat::Descriptive, 1).expect("set");
    assert_eq!(set.len(), 1);

    let zero = r#"[{"id": 1, "question": "Explain entropy.", "marks": 0}]"#;
    assert!(parse_question_set(zero, QuestionFormat::Descriptive, 1).is_err());
  }

  #[test]
  fn duplicate_ids_and_empty_arrays_are_rejected() {
    let dup = r#"[{"id": 1, "question": "A", "marks": 2}, {"id": 1, "question": "B", "marks": 2}]"#;
    assert!(parse_question_set(dup, QuestionFormat::Descriptive, 2).is_err());
    assert!(parse_question_set("[]", QuestionFormat::Descriptive, 2).is_err());
  }

  #[test]
  fn questions_wrapped_in_an_object_are_accepted() {
    let raw = r#"{"questions": [{"id": 1, "question": "A", "marks": 2}]}"#;
    assert_eq!(parse_question_set(raw, QuestionFormat::Descriptive, 1).expect("set").len(), 1);
  }
}
