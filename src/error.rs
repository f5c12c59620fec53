//! Error taxonomy for the mock-test flow and the completion client.
//!
//! Remote failures are caught in `logic` and surfaced with a user-facing
//! message; nothing is retried automatically.

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::protocol::ErrorOut;
use crate::session::Stage;

#[derive(Debug, Error)]
pub enum MockTestError {
  #[error("invalid test request: {0}")]
  InvalidRequest(String),

  #[error("unknown session: {0}")]
  UnknownSession(String),

  #[error("cannot {action} while the session is {stage}")]
  InvalidTransition { action: &'static str, stage: Stage },

  /// The generation call failed or timed out.
  #[error("generation service unreachable: {0}")]
  GenerationUnreachable(String),

  /// The generation call returned text that is not a usable question set.
  #[error("malformed generation: {0}")]
  MalformedGeneration(String),

  /// Choice questions left blank; nothing was graded.
  #[error("incomplete submission: unanswered questions {missing:?}")]
  IncompleteSubmission { missing: Vec<u32> },

  #[error("grading service unreachable: {0}")]
  GradingUnreachable(String),
}

impl MockTestError {
  /// Message safe to show to a student. Both generation failures read the same.
  pub fn user_message(&self) -> String {
    match self {
      MockTestError::InvalidRequest(reason) => format!("Please check the test settings: {reason}."),
      MockTestError::UnknownSession(_) => "This test session no longer exists. Start a new test.".into(),
      MockTestError::InvalidTransition { action, stage } => {
        format!("Cannot {action} right now (test is {stage}). Start a new test first.")
      }
      MockTestError::GenerationUnreachable(_) | MockTestError::MalformedGeneration(_) => {
        "Engine failed to format correctly. Try reducing question count.".into()
      }
      MockTestError::IncompleteSubmission { .. } => {
        "You cannot submit yet! Please answer all questions before submitting the exam.".into()
      }
      MockTestError::GradingUnreachable(_) => "Grading Engine offline. Try again.".into(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      MockTestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      MockTestError::UnknownSession(_) => StatusCode::NOT_FOUND,
      MockTestError::InvalidTransition { .. } => StatusCode::CONFLICT,
      MockTestError::IncompleteSubmission { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      MockTestError::GenerationUnreachable(_)
      | MockTestError::MalformedGeneration(_)
      | MockTestError::GradingUnreachable(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl IntoResponse for MockTestError {
  fn into_response(self) -> axum::response::Response {
    (self.status(), Json(ErrorOut { message: self.user_message() })).into_response()
  }
}

/// Unreadable request bodies are invalid requests, reported in the usual error shape.
impl From<JsonRejection> for MockTestError {
  fn from(rejection: JsonRejection) -> Self {
    MockTestError::InvalidRequest(rejection.body_text())
  }
}

/// Failures of a single chat-completion call.
#[derive(Debug, Error)]
pub enum LlmError {
  #[error("no completion service configured (OPENAI_API_KEY unset)")]
  Disabled,

  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("network error: {0}")]
  Network(String),

  #[error("response decode error: {0}")]
  Decode(String),

  #[error("completion had no content")]
  EmptyCompletion,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generation_failures_look_the_same_to_users() {
    let a = MockTestError::GenerationUnreachable("timeout".into());
    let b = MockTestError::MalformedGeneration("expected value at line 1".into());
    assert_eq!(a.user_message(), b.user_message());
    assert_eq!(a.status(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn incomplete_submission_is_a_client_error() {
    let e = MockTestError::IncompleteSubmission { missing: vec![2] };
    assert_eq!(e.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(e.user_message().contains("answer all questions"));
  }
}
