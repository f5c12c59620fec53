//! Prompt construction for the generation and grading calls.
//!
//! `build_generation_prompt` is a pure function of the request: the same
//! request always renders the same text.

use crate::config::Prompts;
use crate::domain::{AnswerMap, QuestionFormat, QuestionSet, TestRequest};
use crate::util::fill_template;

const MCQ_BLOCK: &str = r#"
3. The `correct_answer` MUST EXACTLY MATCH one of the strings in the `options` array, character for character.
FORMAT:
[
  {
    "id": 1,
    "question": "Clear, unambiguous question text",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correct_answer": "Exact match to one option",
    "explanation": "Detailed, step-by-step reason why this is correct."
  }
]
"#;

const NUMERICAL_BLOCK: &str = r#"
3. For Numerical problems, work out and verify the arithmetic BEFORE writing the options. Calculate the correct answer with exact proper units.
4. Provide exactly 4 options. Exactly one MUST be the correct answer. The other three must be plausible near-miss distractors (e.g., answers resulting from sign errors, unit errors or common calculation mistakes).
5. The `correct_answer` MUST EXACTLY MATCH the correct string in the `options` array.
FORMAT:
[
  {
    "id": 1,
    "question": "Clear numerical problem with exact values",
    "options": ["Value A + Units", "Value B + Units", "Value C + Units", "Value D + Units"],
    "correct_answer": "Exact match to the correct option",
    "explanation": "Step-by-step mathematical derivation showing the formula used."
  }
]
"#;

const DESCRIPTIVE_BLOCK: &str = r#"
3. For Descriptive questions, provide a clear marking scheme with essential key points. `marks` is a positive integer.
FORMAT:
[
  {
    "id": 1,
    "question": "Clear descriptive question",
    "marks": 5,
    "key_points": ["Essential point 1", "Essential point 2"],
    "explanation": "A complete, ideal textbook answer."
  }
]
"#;

/// Render the instruction for the generation call.
pub fn build_generation_prompt(req: &TestRequest) -> String {
  let mut prompt = format!(
    "Act as the Chief Examiner and strict syllabus setter for the {board} Board in India.\n\
Create a highly accurate, syllabus-aligned test for Class {class} {subject}, focusing STRICTLY on the chapter: '{chapter}'.\n\
Difficulty level: {difficulty}. You must generate exactly {count} {format} questions, numbered with `id` from 1 to {count}.\n\n\
CRITICAL INSTRUCTIONS:\n\
1. NO HALLUCINATIONS. Every fact, formula, and concept must be 100% accurate and strictly within the official {board} syllabus for Class {class}. Do not invent facts or formulas outside it.\n\
2. Output ONLY a valid JSON array. No prose before or after it, and no markdown formatting like ```json fences.\n",
    board = req.board,
    class = req.grade_level.trim(),
    subject = req.subject.trim(),
    chapter = req.chapter.trim(),
    difficulty = req.difficulty,
    count = req.question_count,
    format = req.format.label(),
  );

  prompt.push_str(match req.format {
    QuestionFormat::MultipleChoice => MCQ_BLOCK,
    QuestionFormat::Numerical => NUMERICAL_BLOCK,
    QuestionFormat::Descriptive => DESCRIPTIVE_BLOCK,
  });
  prompt
}

/// Render the instruction for the delegated grading call. The full question set
/// is embedded as the answer key and marking scheme.
pub fn build_grading_prompt(
  prompts: &Prompts,
  req: &TestRequest,
  questions: &QuestionSet,
  answers: &AnswerMap,
) -> Result<String, serde_json::Error> {
  let answer_key_json = questions.answer_key_json()?;
  let answers_json = serde_json::to_string(answers)?;
  let board = req.board.to_string();
  Ok(fill_template(
    &prompts.grading_user_template,
    &[
      ("grade_level", req.grade_level.trim()),
      ("board", &board),
      ("answer_key_json", &answer_key_json),
      ("answers_json", &answers_json),
    ],
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Board, DescriptiveQuestion, Difficulty};

  fn request(format: QuestionFormat) -> TestRequest {
    TestRequest {
      board: Board::Cbse,
      grade_level: "10".into(),
      subject: "Physics".into(),
      chapter: "Electricity".into(),
      difficulty: Difficulty::Medium,
      question_count: 5,
      format,
    }
  }

  #[test]
  fn generation_prompt_is_deterministic() {
    let req = request(QuestionFormat::MultipleChoice);
    assert_eq!(build_generation_prompt(&req), build_generation_prompt(&req));
  }

  #[test]
  fn mcq_prompt_carries_framing_and_exact_match_rule() {
    let p = build_generation_prompt(&request(QuestionFormat::MultipleChoice));
    assert!(p.contains("Chief Examiner"));
    assert!(p.contains("CBSE Board"));
    assert!(p.contains("Class 10 Physics"));
    assert!(p.contains("'Electricity'"));
    assert!(p.contains("exactly 5 MCQ questions"));
    assert!(p.contains("Output ONLY a valid JSON array"));
    assert!(p.contains("MUST EXACTLY MATCH one of the strings"));
    assert!(p.contains("\"correct_answer\""));
    assert!(!p.contains("\"key_points\""));
  }

  #[test]
  fn numerical_prompt_demands_verified_arithmetic_and_distractors() {
    let p = build_generation_prompt(&request(QuestionFormat::Numerical));
    assert!(p.contains("verify the arithmetic BEFORE writing the options"));
    assert!(p.contains("exactly 4 options"));
    assert!(p.contains("near-miss distractors"));
  }

  #[test]
  fn descriptive_prompt_uses_marking_scheme_schema() {
    let p = build_generation_prompt(&request(QuestionFormat::Descriptive));
    assert!(p.contains("\"marks\": 5"));
    assert!(p.contains("\"key_points\""));
    assert!(!p.contains("\"options\""));
  }

  #[test]
  fn grading_prompt_embeds_answer_key_and_answers() {
    let set = QuestionSet::Descriptive(vec![DescriptiveQuestion {
      id: 1,
      question: "State Ohm's law.".into(),
      marks: 3,
      key_points: vec!["V = IR".into()],
      explanation: "Current is proportional to voltage.".into(),
    }]);
    let mut answers = AnswerMap::new();
    answers.insert(1, "V is I times R {board}".into());
    let p = build_grading_prompt(&Prompts::default(), &request(QuestionFormat::Descriptive), &set, &answers)
      .expect("prompt");
    assert!(p.contains("Class 10 CBSE student"));
    assert!(p.contains(r#""key_points":["V = IR"]"#));
    assert!(p.contains(r#"{"1":"V is I times R {board}"}"#));
    assert!(p.contains("Start with an estimated Total Score"));
  }
}
