//! Per-session test lifecycle.
//!
//! `Configuring → Generated → (Graded | GenerationFailed)`, and back to
//! `Configuring` on reset. Every transition consumes the old session and
//! returns the next one; a rejected transition hands back an error and the
//! caller keeps the session it already had.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::answers::collect_answers;
use crate::domain::{AnswerMap, GradingReport, QuestionSet, TestRequest};
use crate::error::MockTestError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Configuring,
  Generated,
  Graded,
  GenerationFailed,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::Configuring => "configuring",
      Stage::Generated => "generated",
      Stage::Graded => "graded",
      Stage::GenerationFailed => "generation_failed",
    })
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
  Configuring,
  Generated {
    request: TestRequest,
    questions: QuestionSet,
    /// Answers of a submission whose grading call failed, kept for the retry.
    last_submission: Option<AnswerMap>,
  },
  Graded {
    request: TestRequest,
    questions: QuestionSet,
    answers: AnswerMap,
    report: GradingReport,
  },
  GenerationFailed {
    request: TestRequest,
    reason: String,
  },
}

/// Everything one student's test run holds. Nothing here outlives a reset.
#[derive(Clone, Debug, PartialEq)]
pub struct TestSession {
  pub id: String,
  /// Bumped on every transition. A remote result is stored only if no other
  /// transition happened since its call was issued.
  pub version: u64,
  pub phase: Phase,
}

/// What a submission needs for grading, captured before the grading call.
#[derive(Clone, Debug)]
pub struct PendingGrading {
  pub version: u64,
  pub request: TestRequest,
  pub questions: QuestionSet,
  pub answers: AnswerMap,
}

impl TestSession {
  pub fn new(id: impl Into<String>) -> Self {
    Self { id: id.into(), version: 0, phase: Phase::Configuring }
  }

  pub fn stage(&self) -> Stage {
    match self.phase {
      Phase::Configuring => Stage::Configuring,
      Phase::Generated { .. } => Stage::Generated,
      Phase::Graded { .. } => Stage::Graded,
      Phase::GenerationFailed { .. } => Stage::GenerationFailed,
    }
  }

  /// Guard for issuing a generation call. Retrying after a failure is allowed.
  pub fn check_can_generate(&self) -> Result<(), MockTestError> {
    match self.stage() {
      Stage::Configuring | Stage::GenerationFailed => Ok(()),
      stage => Err(MockTestError::InvalidTransition { action: "generate a test", stage }),
    }
  }

  /// Record the outcome of a generation call.
  pub fn with_generation(self, request: TestRequest, outcome: &Result<QuestionSet, MockTestError>) -> Self {
    let phase = match outcome {
      Ok(questions) => Phase::Generated { request, questions: questions.clone(), last_submission: None },
      Err(e) => Phase::GenerationFailed { request, reason: e.user_message() },
    };
    Self { phase, version: self.version + 1, ..self }
  }

  /// Collect and validate a submission. An incomplete one leaves the session as it was.
  pub fn prepare_submission(&self, submitted: &HashMap<String, String>) -> Result<PendingGrading, MockTestError> {
    match &self.phase {
      Phase::Generated { request, questions, .. } => {
        let answers = collect_answers(questions, submitted)?;
        Ok(PendingGrading {
          version: self.version,
          request: request.clone(),
          questions: questions.clone(),
          answers,
        })
      }
      _ => Err(MockTestError::InvalidTransition { action: "submit answers", stage: self.stage() }),
    }
  }

  /// Record a grading outcome. A failed call keeps the test open with the answers retained.
  pub fn with_grading(self, pending: PendingGrading, outcome: &Result<GradingReport, MockTestError>) -> Self {
    let phase = match outcome {
      Ok(report) => Phase::Graded {
        request: pending.request,
        questions: pending.questions,
        answers: pending.answers,
        report: report.clone(),
      },
      Err(_) => Phase::Generated {
        request: pending.request,
        questions: pending.questions,
        last_submission: Some(pending.answers),
      },
    };
    Self { phase, version: self.version + 1, ..self }
  }

  /// Discard questions, answers and report.
  pub fn reset(self) -> Self {
    Self { id: self.id, version: self.version + 1, phase: Phase::Configuring }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Board, ChoiceQuestion, Difficulty, QuestionFormat, ScoreReport};

  fn request() -> TestRequest {
    TestRequest {
      board: Board::Cbse,
      grade_level: "8".into(),
      subject: "Maths".into(),
      chapter: "Linear Equations".into(),
      difficulty: Difficulty::Easy,
      question_count: 3,
      format: QuestionFormat::MultipleChoice,
    }
  }

  fn set() -> QuestionSet {
    QuestionSet::MultipleChoice(vec![ChoiceQuestion {
      id: 1,
      question: "x + 1 = 3, x = ?".into(),
      options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
      correct_answer: "2".into(),
      explanation: String::new(),
    }])
  }

  fn generated() -> TestSession {
    TestSession::new("s1").with_generation(request(), &Ok(set()))
  }

  #[test]
  fn generation_outcomes_move_to_generated_or_failed() {
    assert_eq!(generated().stage(), Stage::Generated);

    let failed = TestSession::new("s1").with_generation(request(), &Err(MockTestError::MalformedGeneration("x".into())));
    assert_eq!(failed.stage(), Stage::GenerationFailed);
    assert!(failed.check_can_generate().is_ok());
  }

  #[test]
  fn cannot_regenerate_without_reset() {
    let err = generated().check_can_generate().unwrap_err();
    assert!(matches!(err, MockTestError::InvalidTransition { stage: Stage::Generated, .. }));
  }

  #[test]
  fn incomplete_submission_leaves_session_untouched() {
    let session = generated();
    let before = session.clone();
    assert!(session.prepare_submission(&HashMap::new()).is_err());
    assert_eq!(session, before);
  }

  #[test]
  fn grading_failure_keeps_answers_for_retry() {
    let session = generated();
    let pending = session
      .prepare_submission(&HashMap::from([("1".to_string(), "3".to_string())]))
      .expect("pending");
    let session = session.with_grading(pending, &Err(MockTestError::GradingUnreachable("down".into())));
    match &session.phase {
      Phase::Generated { last_submission: Some(a), .. } => assert_eq!(a.get(1), Some("3")),
      other => panic!("unexpected phase {other:?}"),
    }
  }

  #[test]
  fn graded_is_terminal_until_reset() {
    let session = generated();
    let pending = session
      .prepare_submission(&HashMap::from([("1".to_string(), "2".to_string())]))
      .expect("pending");
    let report = GradingReport::Scored(ScoreReport { score: 1, total: 1, feedback: vec![] });
    let session = session.with_grading(pending, &Ok(report));
    assert_eq!(session.stage(), Stage::Graded);
    assert!(session.prepare_submission(&HashMap::new()).is_err());
    assert!(session.check_can_generate().is_err());

    let session = session.reset();
    assert_eq!(session.stage(), Stage::Configuring);
    assert_eq!(session.version, 3);
    assert!(session.check_can_generate().is_ok());
  }
}
