//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating a test (prompt → completion → sanitize → question set)
//!   - Collecting and grading a submission
//!   - Resetting a session
//!   - Tutor chat replies
//!
//! Remote failures are caught here and turned into `MockTestError`s carrying
//! user-facing messages. Nothing is retried.

use std::collections::HashMap;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::TestRequest;
use crate::error::{LlmError, MockTestError};
use crate::grader;
use crate::llm::{CompletionCall, ModelTier};
use crate::prompt::build_generation_prompt;
use crate::protocol::{to_view, SessionView};
use crate::questions::parse_question_set;
use crate::session::TestSession;
use crate::state::AppState;

pub const GENERATION_TEMPERATURE: f32 = 0.1;
const TUTOR_TEMPERATURE: f32 = 0.3;

pub fn validate_request(state: &AppState, req: &TestRequest) -> Result<(), MockTestError> {
  let limits = state.limits;
  if req.subject.trim().is_empty() || req.chapter.trim().is_empty() {
    return Err(MockTestError::InvalidRequest("subject and chapter are required".into()));
  }
  if req.grade_level.trim().is_empty() {
    return Err(MockTestError::InvalidRequest("class is required".into()));
  }
  if req.question_count < limits.min_questions || req.question_count > limits.max_questions {
    return Err(MockTestError::InvalidRequest(format!(
      "question count must be between {} and {}",
      limits.min_questions, limits.max_questions
    )));
  }
  Ok(())
}

async fn session_or_err(state: &AppState, session_id: &str) -> Result<TestSession, MockTestError> {
  state
    .get_session(session_id)
    .await
    .ok_or_else(|| MockTestError::UnknownSession(session_id.to_string()))
}

/// Results of a call overtaken by another transition are dropped; report that as a conflict.
fn stale(session: &TestSession) -> MockTestError {
  MockTestError::InvalidTransition { action: "store the result", stage: session.stage() }
}

#[instrument(level = "info", skip(state))]
pub async fn create_session(state: &AppState) -> SessionView {
  let session = state.create_session().await;
  info!(target: "mock_test", id = %session.id, "Session created");
  to_view(&session)
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn get_session(state: &AppState, session_id: &str) -> Result<SessionView, MockTestError> {
  Ok(to_view(&session_or_err(state, session_id).await?))
}

/// Generate a question set for the session. On failure the session moves to
/// `GenerationFailed` and the error is returned for display.
#[instrument(
  level = "info",
  skip(state, request),
  fields(%session_id, board = %request.board, format = %request.format, count = request.question_count)
)]
pub async fn generate_test(state: &AppState, session_id: &str, request: TestRequest) -> Result<SessionView, MockTestError> {
  validate_request(state, &request)?;
  let session = session_or_err(state, session_id).await?;
  session.check_can_generate()?;
  let version = session.version;

  let outcome = match state.completion_service() {
    Some(service) => {
      let prompt = build_generation_prompt(&request);
      let start = std::time::Instant::now();
      let reply = service
        .complete(CompletionCall {
          tier: ModelTier::Strong,
          system: &state.prompts.generation_system,
          user: &prompt,
          temperature: GENERATION_TEMPERATURE,
        })
        .await;
      debug!(target: "mock_test", elapsed = ?start.elapsed(), ok = reply.is_ok(), "Generation call returned");
      match reply {
        Ok(text) => parse_question_set(&text, request.format, request.question_count),
        Err(e) => Err(MockTestError::GenerationUnreachable(e.to_string())),
      }
    }
    None => Err(MockTestError::GenerationUnreachable(LlmError::Disabled.to_string())),
  };

  match &outcome {
    Ok(set) => info!(target: "mock_test", %session_id, questions = set.len(), "Test generated"),
    Err(e) => error!(target: "mock_test", %session_id, error = %e, "Test generation failed"),
  }

  let next = session.with_generation(request, &outcome);
  if !state.store_if_current(version, next.clone()).await {
    warn!(target: "mock_test", %session_id, "Session changed during generation; result dropped");
    let current = session_or_err(state, session_id).await?;
    return Err(stale(&current));
  }
  outcome.map(|_| to_view(&next))
}

/// Validate and grade a submission. Incomplete choice submissions are rejected
/// without touching the session or calling out.
#[instrument(level = "info", skip(state, submitted), fields(%session_id, answered = submitted.len()))]
pub async fn submit_answers(
  state: &AppState,
  session_id: &str,
  submitted: &HashMap<String, String>,
) -> Result<SessionView, MockTestError> {
  let session = session_or_err(state, session_id).await?;
  let pending = match session.prepare_submission(submitted) {
    Ok(p) => p,
    Err(e) => {
      info!(target: "mock_test", %session_id, error = %e, "Submission rejected");
      return Err(e);
    }
  };
  let version = pending.version;
  debug!(target: "mock_test", %session_id, answers = pending.answers.len(), format = %pending.questions.format(), "Submission accepted");

  let outcome = grader::grade(
    state.completion_service(),
    &state.prompts,
    &pending.request,
    &pending.questions,
    &pending.answers,
  )
  .await;

  match &outcome {
    Ok(report) => info!(target: "mock_test", %session_id, report_len = report.to_markdown().len(), "Submission graded"),
    Err(e) => error!(target: "mock_test", %session_id, error = %e, "Grading failed"),
  }

  let next = session.with_grading(pending, &outcome);
  if !state.store_if_current(version, next.clone()).await {
    warn!(target: "mock_test", %session_id, "Session changed during grading; result dropped");
    let current = session_or_err(state, session_id).await?;
    return Err(stale(&current));
  }
  outcome.map(|_| to_view(&next))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn reset_session(state: &AppState, session_id: &str) -> Result<SessionView, MockTestError> {
  let next = state
    .update_session(session_id, TestSession::reset)
    .await
    .ok_or_else(|| MockTestError::UnknownSession(session_id.to_string()))?;
  info!(target: "mock_test", %session_id, version = next.version, "Session reset");
  Ok(to_view(&next))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn delete_session(state: &AppState, session_id: &str) -> Result<(), MockTestError> {
  if state.remove_session(session_id).await {
    Ok(())
  } else {
    Err(MockTestError::UnknownSession(session_id.to_string()))
  }
}

/// Answer a free-form study question. Falls back to a local message when the
/// completion service is missing or fails.
#[instrument(level = "info", skip(state, text), fields(text_len = text.len(), has_subject = subject.is_some()))]
pub async fn tutor_reply(state: &AppState, text: &str, subject: Option<&str>, grade_level: Option<&str>) -> String {
  let question = text.trim();
  if question.is_empty() {
    return "Ask me anything about your subjects!".into();
  }

  let mut context: Vec<String> = vec![];
  if let Some(g) = grade_level.map(str::trim).filter(|g| !g.is_empty()) { context.push(format!("Class: {g}")); }
  if let Some(s) = subject.map(str::trim).filter(|s| !s.is_empty()) { context.push(format!("Subject: {s}")); }
  let user = if context.is_empty() {
    format!("Question: {question}")
  } else {
    format!("Question: {question}\n\nContext:\n{}", context.join("\n"))
  };

  if let Some(service) = state.completion_service() {
    let call = CompletionCall {
      tier: ModelTier::Fast,
      system: &state.prompts.tutor_system,
      user: &user,
      temperature: TUTOR_TEMPERATURE,
    };
    match service.complete(call).await {
      Ok(t) => {
        debug!(target: "tutor", reply_len = t.len(), "Tutor reply via completion service.");
        t
      }
      Err(e) => {
        error!(target: "tutor", error = %e, "Tutor reply failed; using stub.");
        tutor_reply_stub()
      }
    }
  } else {
    debug!(target: "tutor", "Tutor reply via stub.");
    tutor_reply_stub()
  }
}

fn tutor_reply_stub() -> String {
  "AyA is offline right now. Try again in a moment, or start a mock test to practise.".into()
}
