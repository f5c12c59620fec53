//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{FromRequest, Path, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::domain::TestRequest;
use crate::error::MockTestError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

/// JSON body extractor whose rejection is a `MockTestError::InvalidRequest`
/// (400 with `{ message }`) instead of axum's plain-text 422.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(MockTestError))]
pub struct ApiJson<T>(pub T);

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let view = create_session(&state).await;
  info!(target: "mock_test", id = %view.session_id, "HTTP session created");
  Json(view)
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, MockTestError> {
  Ok(Json(get_session(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<HealthOut>, MockTestError> {
  delete_session(&state, &id).await?;
  Ok(Json(HealthOut { ok: true }))
}

#[instrument(level = "info", skip(state, body), fields(%id, format = %body.format, count = body.question_count))]
pub async fn http_generate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  ApiJson(body): ApiJson<TestRequest>,
) -> Result<Json<SessionView>, MockTestError> {
  let view = generate_test(&state, &id, body).await?;
  info!(target: "mock_test", %id, questions = view.questions.as_ref().map(Vec::len).unwrap_or(0), "HTTP test generated");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, body), fields(%id, answered = body.answers.len()))]
pub async fn http_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  ApiJson(body): ApiJson<SubmitIn>,
) -> Result<Json<SessionView>, MockTestError> {
  let view = submit_answers(&state, &id, &body.answers).await?;
  info!(target: "mock_test", %id, stage = %view.stage, "HTTP submission graded");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_reset(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, MockTestError> {
  Ok(Json(reset_session(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_tutor_message(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<TutorIn>,
) -> impl IntoResponse {
  let text = tutor_reply(&state, &body.text, body.subject.as_deref(), body.grade_level.as_deref()).await;
  Json(TutorOut { text })
}
