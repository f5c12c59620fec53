//! Loading agent configuration (prompts + test limits) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `TestLimits` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: TestLimits,
}

/// Bounds applied to incoming test requests and to how long idle sessions are kept.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TestLimits {
  #[serde(default = "default_min_questions")]
  pub min_questions: u32,
  #[serde(default = "default_max_questions")]
  pub max_questions: u32,
  /// Sessions untouched for longer than this are evicted.
  #[serde(default = "default_session_ttl_secs")]
  pub session_ttl_secs: u64,
}

fn default_min_questions() -> u32 { 3 }
fn default_max_questions() -> u32 { 20 }
fn default_session_ttl_secs() -> u64 { 2 * 60 * 60 }

impl Default for TestLimits {
  fn default() -> Self {
    Self {
      min_questions: default_min_questions(),
      max_questions: default_max_questions(),
      session_ttl_secs: default_session_ttl_secs(),
    }
  }
}

/// Prompts used around the completion service. The question-generation body is
/// built in `prompt.rs`; these are the system framings and the grading template.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_system: String,
  pub grading_system: String,
  /// Placeholders: {grade_level} {board} {answer_key_json} {answers_json}
  pub grading_user_template: String,
  pub tutor_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are an exam paper setter for Indian school boards. Respond ONLY with a strict JSON array.".into(),
      grading_system: "You are AyA, a strict but encouraging tutor who grades written exam answers. Reply in Markdown.".into(),
      grading_user_template: "You are AyA, the Lead Tutor grading a Class {grade_level} {board} student.\n\
Official Answer Key & Marking Scheme: {answer_key_json}\n\
Student's Answers: {answers_json}\n\n\
Evaluate each answer. Be strict but fair. Assign partial marks based on the key points/steps. \
An empty answer earns zero marks for that question.\n\
Format as Markdown. Start with an estimated Total Score, then detailed feedback for each question explaining where they lost marks.".into(),
      tutor_system: "You are AyA, a patient tutor for students in classes 6 to 12. Explain step by step, stay within the school syllabus, and keep answers short.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "mocktest_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mocktest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mocktest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, String> {
  let cfg = toml::from_str::<AgentConfig>(s).map_err(|e| e.to_string())?;
  if cfg.limits.min_questions == 0 || cfg.limits.min_questions > cfg.limits.max_questions {
    return Err(format!(
      "invalid limits: min_questions={} max_questions={}",
      cfg.limits.min_questions, cfg.limits.max_questions
    ));
  }
  if cfg.limits.session_ttl_secs == 0 {
    return Err("invalid limits: session_ttl_secs must be positive".into());
  }
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_prompt_override_keeps_other_defaults() {
    let cfg = parse_agent_config(
      r#"
      [prompts]
      tutor_system = "Be brief."

      [limits]
      max_questions = 10
      "#,
    )
    .expect("config");
    assert_eq!(cfg.prompts.tutor_system, "Be brief.");
    assert!(cfg.prompts.grading_user_template.contains("{answers_json}"));
    assert_eq!(cfg.limits.min_questions, 3);
    assert_eq!(cfg.limits.max_questions, 10);
    assert_eq!(cfg.limits.session_ttl_secs, 7200);
  }

  #[test]
  fn inverted_limits_are_rejected() {
    let err = parse_agent_config("[limits]\nmin_questions = 12\nmax_questions = 5\n").unwrap_err();
    assert!(err.contains("invalid limits"));
    assert!(parse_agent_config("[limits]\nsession_ttl_secs = 0\n").is_err());
  }
}
