//! Domain models: test request parameters, question variants, answers and grading reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Examination board the test is written for.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Board {
  #[serde(rename = "CBSE", alias = "cbse")]
  Cbse,
  #[serde(rename = "ICSE", alias = "icse")]
  Icse,
  #[serde(rename = "State Board", alias = "state_board")]
  StateBoard,
  #[serde(rename = "NEET/JEE Foundation", alias = "foundation")]
  Foundation,
}

impl fmt::Display for Board {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Board::Cbse => "CBSE",
      Board::Icse => "ICSE",
      Board::StateBoard => "State Board",
      Board::Foundation => "NEET/JEE Foundation",
    })
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
  #[serde(alias = "easy")]
  Easy,
  #[serde(alias = "medium")]
  Medium,
  #[serde(alias = "hard")]
  Hard,
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    })
  }
}

/// Question format of a whole test. Every question in a set shares it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuestionFormat {
  #[serde(rename = "MCQ", alias = "multiple_choice")]
  MultipleChoice,
  #[serde(rename = "Numerical", alias = "numerical")]
  Numerical,
  #[serde(rename = "Descriptive", alias = "descriptive")]
  Descriptive,
}

impl QuestionFormat {
  /// Label used inside prompts ("generate exactly 5 MCQ questions").
  pub fn label(self) -> &'static str {
    match self {
      QuestionFormat::MultipleChoice => "MCQ",
      QuestionFormat::Numerical => "Numerical",
      QuestionFormat::Descriptive => "Descriptive",
    }
  }

  /// Formats answered by picking one of the options.
  pub fn is_choice(self) -> bool {
    match self {
      QuestionFormat::MultipleChoice | QuestionFormat::Numerical => true,
      QuestionFormat::Descriptive => false,
    }
  }
}

impl fmt::Display for QuestionFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Immutable parameters of a requested test.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
  pub board: Board,
  pub grade_level: String,
  pub subject: String,
  #[serde(alias = "chapterTopic")]
  pub chapter: String,
  pub difficulty: Difficulty,
  pub question_count: u32,
  pub format: QuestionFormat,
}

/// MultipleChoice and Numerical item. `correct_answer` must equal one of `options`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceQuestion {
  pub id: u32,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: String,
  #[serde(default)]
  pub explanation: String,
}

/// Descriptive item graded against a marking scheme.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptiveQuestion {
  pub id: u32,
  pub question: String,
  pub marks: u32,
  #[serde(default)]
  pub key_points: Vec<String>,
  #[serde(default)]
  pub explanation: String,
}

/// A generated test. One constructor per format, so a set never mixes formats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionSet {
  MultipleChoice(Vec<ChoiceQuestion>),
  Numerical(Vec<ChoiceQuestion>),
  Descriptive(Vec<DescriptiveQuestion>),
}

impl QuestionSet {
  pub fn format(&self) -> QuestionFormat {
    match self {
      QuestionSet::MultipleChoice(_) => QuestionFormat::MultipleChoice,
      QuestionSet::Numerical(_) => QuestionFormat::Numerical,
      QuestionSet::Descriptive(_) => QuestionFormat::Descriptive,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      QuestionSet::MultipleChoice(qs) | QuestionSet::Numerical(qs) => qs.len(),
      QuestionSet::Descriptive(qs) => qs.len(),
    }
  }

  /// Question ids in presentation order.
  pub fn ids(&self) -> Vec<u32> {
    match self {
      QuestionSet::MultipleChoice(qs) | QuestionSet::Numerical(qs) => qs.iter().map(|q| q.id).collect(),
      QuestionSet::Descriptive(qs) => qs.iter().map(|q| q.id).collect(),
    }
  }

  /// The set in its wire form (the JSON array the generator produced).
  pub fn answer_key_json(&self) -> serde_json::Result<String> {
    match self {
      QuestionSet::MultipleChoice(qs) | QuestionSet::Numerical(qs) => serde_json::to_string(qs),
      QuestionSet::Descriptive(qs) => serde_json::to_string(qs),
    }
  }
}

/// One submitted response per question, ordered by question id.
/// Serialises as a JSON object keyed by the id as string.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<u32, String>);

impl AnswerMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, question_id: u32, answer: String) {
    self.0.insert(question_id, answer);
  }

  pub fn get(&self, question_id: u32) -> Option<&str> {
    self.0.get(&question_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
  pub question_id: u32,
  pub correct: bool,
  pub user_answer: String,
  pub correct_answer: String,
  pub explanation: String,
}

/// Locally computed score for choice formats.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
  pub score: u32,
  pub total: u32,
  pub feedback: Vec<QuestionFeedback>,
}

impl ScoreReport {
  pub fn to_markdown(&self) -> String {
    let mut out = format!("### Final Score: {}/{}\n\n", self.score, self.total);
    for f in &self.feedback {
      if f.correct {
        out.push_str(&format!(
          "✅ **Q{}: Correct!**\n*AyA's Note:* {}\n\n---\n",
          f.question_id, f.explanation
        ));
      } else {
        out.push_str(&format!(
          "❌ **Q{}: Incorrect.**\nYour Answer: '{}'\nCorrect Answer: **{}**\n*AyA's Note:* {}\n\n---\n",
          f.question_id, f.user_answer, f.correct_answer, f.explanation
        ));
      }
    }
    out
  }
}

/// Outcome of grading a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GradingReport {
  /// Deterministic grading result.
  Scored(ScoreReport),
  /// Markdown returned by the grading call, kept verbatim.
  Narrative(String),
}

impl GradingReport {
  pub fn to_markdown(&self) -> String {
    match self {
      GradingReport::Scored(r) => r.to_markdown(),
      GradingReport::Narrative(text) => text.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_accepts_ui_labels() {
    let f: QuestionFormat = serde_json::from_str("\"MCQ\"").unwrap();
    assert_eq!(f, QuestionFormat::MultipleChoice);
    let f: QuestionFormat = serde_json::from_str("\"descriptive\"").unwrap();
    assert_eq!(f, QuestionFormat::Descriptive);
  }

  #[test]
  fn request_decodes_from_camel_case() {
    let req: TestRequest = serde_json::from_value(serde_json::json!({
      "board": "NEET/JEE Foundation",
      "gradeLevel": "10",
      "subject": "Physics",
      "chapter": "Thermodynamics",
      "difficulty": "Hard",
      "questionCount": 5,
      "format": "Numerical"
    }))
    .unwrap();
    assert_eq!(req.board, Board::Foundation);
    assert_eq!(req.format, QuestionFormat::Numerical);
    assert_eq!(req.question_count, 5);
  }

  #[test]
  fn answer_map_serialises_with_string_keys_in_id_order() {
    let mut answers = AnswerMap::new();
    answers.insert(10, "b".into());
    answers.insert(2, "a".into());
    assert_eq!(serde_json::to_string(&answers).unwrap(), r#"{"2":"a","10":"b"}"#);
  }

  #[test]
  fn narrative_report_renders_verbatim() {
    let text = "## Total: 7/10\n\n* Q1 lost marks for units ";
    assert_eq!(GradingReport::Narrative(text.into()).to_markdown(), text);
  }
}
