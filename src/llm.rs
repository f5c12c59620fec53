//! The seam between the mock-test flow and whatever produces text completions.

use async_trait::async_trait;

use crate::error::LlmError;

/// Which configured model a call should go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTier {
  /// Cheap model for conversational replies.
  Fast,
  /// Accurate model for question generation and grading.
  Strong,
}

#[derive(Clone, Debug)]
pub struct CompletionCall<'a> {
  pub tier: ModelTier,
  pub system: &'a str,
  pub user: &'a str,
  pub temperature: f32,
}

/// One prompt in, one completion out. Implementations do not retry.
#[async_trait]
pub trait CompletionService: Send + Sync {
  fn name(&self) -> &str;

  async fn complete(&self, call: CompletionCall<'_>) -> Result<String, LlmError>;
}
