//! Grading of a collected submission.
//!
//! Choice formats are scored locally by exact string equality. Descriptive
//! answers are sent to the completion service together with the answer key,
//! and whatever markdown comes back is the report; no score is re-extracted.

use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{AnswerMap, ChoiceQuestion, GradingReport, QuestionFeedback, QuestionSet, ScoreReport, TestRequest};
use crate::error::MockTestError;
use crate::llm::{CompletionCall, CompletionService, ModelTier};
use crate::prompt::build_grading_prompt;

pub const GRADING_TEMPERATURE: f32 = 0.2;

/// Exact-match scoring. Missing answers count as wrong. Pure and repeatable.
pub fn grade_deterministic(questions: &[ChoiceQuestion], answers: &AnswerMap) -> ScoreReport {
  let feedback: Vec<QuestionFeedback> = questions
    .iter()
    .map(|q| {
      let user_answer = answers.get(q.id).unwrap_or_default();
      QuestionFeedback {
        question_id: q.id,
        correct: user_answer == q.correct_answer,
        user_answer: user_answer.to_string(),
        correct_answer: q.correct_answer.clone(),
        explanation: q.explanation.clone(),
      }
    })
    .collect();
  let score = feedback.iter().filter(|f| f.correct).count() as u32;
  ScoreReport { score, total: questions.len() as u32, feedback }
}

/// Ask the completion service to grade free-text answers against the marking scheme.
#[instrument(level = "info", skip_all, fields(service = %service.name(), questions = questions.len()))]
pub async fn grade_delegated(
  service: &dyn CompletionService,
  prompts: &Prompts,
  request: &TestRequest,
  questions: &QuestionSet,
  answers: &AnswerMap,
) -> Result<GradingReport, MockTestError> {
  let user = build_grading_prompt(prompts, request, questions, answers)
    .map_err(|e| MockTestError::GradingUnreachable(format!("could not encode answer key: {e}")))?;
  let start = std::time::Instant::now();
  let text = service
    .complete(CompletionCall {
      tier: ModelTier::Strong,
      system: &prompts.grading_system,
      user: &user,
      temperature: GRADING_TEMPERATURE,
    })
    .await
    .map_err(|e| {
      error!(target: "mock_test", elapsed = ?start.elapsed(), error = %e, "Grading call failed");
      MockTestError::GradingUnreachable(e.to_string())
    })?;
  info!(target: "mock_test", elapsed = ?start.elapsed(), report_len = text.len(), "Delegated grading report received");
  Ok(GradingReport::Narrative(text))
}

/// Grade by format: choice sets are scored locally, descriptive sets go to the service.
pub async fn grade(
  service: Option<&dyn CompletionService>,
  prompts: &Prompts,
  request: &TestRequest,
  questions: &QuestionSet,
  answers: &AnswerMap,
) -> Result<GradingReport, MockTestError> {
  match questions {
    QuestionSet::MultipleChoice(qs) | QuestionSet::Numerical(qs) => Ok(GradingReport::Scored(grade_deterministic(qs, answers))),
    QuestionSet::Descriptive(_) => {
      let service = service.ok_or_else(|| MockTestError::GradingUnreachable(crate::error::LlmError::Disabled.to_string()))?;
      grade_delegated(service, prompts, request, questions, answers).await
    }
  }
}
