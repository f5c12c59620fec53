//! Answer collection: turn the submitted form fields into an `AnswerMap`.

use std::collections::HashMap;

use crate::domain::{AnswerMap, QuestionSet};
use crate::error::MockTestError;

/// Read back one value per question, keyed by the question id as string.
///
/// Absent or whitespace-only values count as unanswered. For choice formats a
/// single unanswered question rejects the whole submission; descriptive
/// submissions go through with blanks recorded as empty strings.
/// Values are kept exactly as submitted.
pub fn collect_answers(questions: &QuestionSet, submitted: &HashMap<String, String>) -> Result<AnswerMap, MockTestError> {
  let mut answers = AnswerMap::new();
  let mut missing = Vec::new();

  for id in questions.ids() {
    match submitted.get(&id.to_string()) {
      Some(v) if !v.trim().is_empty() => answers.insert(id, v.clone()),
      _ => {
        missing.push(id);
        answers.insert(id, String::new());
      }
    }
  }

  if questions.format().is_choice() && !missing.is_empty() {
    return Err(MockTestError::IncompleteSubmission { missing });
  }
  Ok(answers)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ChoiceQuestion, DescriptiveQuestion};

  fn mcq_set() -> QuestionSet {
    QuestionSet::MultipleChoice(
      (1..=3)
        .map(|id| ChoiceQuestion {
          id,
          question: format!("Q{id}"),
          options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
          correct_answer: "a".into(),
          explanation: String::new(),
        })
        .collect(),
    )
  }

  fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn complete_choice_submission_is_collected_verbatim() {
    let answers = collect_answers(&mcq_set(), &form(&[("1", "a"), ("2", " b"), ("3", "d")])).expect("answers");
    assert_eq!(answers.len(), 3);
    assert_eq!(answers.get(2), Some(" b"));
  }

  #[test]
  fn blank_or_absent_choice_answers_reject_submission() {
    let err = collect_answers(&mcq_set(), &form(&[("1", "a"), ("2", "   ")])).unwrap_err();
    match err {
      MockTestError::IncompleteSubmission { missing } => assert_eq!(missing, vec![2, 3]),
      other => panic!("unexpected error {other:?}"),
    }
  }

  #[test]
  fn unknown_keys_are_ignored() {
    let answers = collect_answers(&mcq_set(), &form(&[("1", "a"), ("2", "b"), ("3", "c"), ("99", "x")])).expect("answers");
    assert_eq!(answers.len(), 3);
    assert_eq!(answers.get(99), None);
  }

  #[test]
  fn descriptive_blanks_are_allowed() {
    let set = QuestionSet::Descriptive(vec![
      DescriptiveQuestion { id: 1, question: "A".into(), marks: 2, key_points: vec![], explanation: String::new() },
      DescriptiveQuestion { id: 2, question: "B".into(), marks: 3, key_points: vec![], explanation: String::new() },
    ]);
    let answers = collect_answers(&set, &form(&[("1", "An answer")])).expect("answers");
    assert_eq!(answers.get(1), Some("An answer"));
    assert_eq!(answers.get(2), Some(""));
  }
}
