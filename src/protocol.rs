//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Answer keys never leave the server before a test is graded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AnswerMap, GradingReport, QuestionFeedback, QuestionSet, TestRequest};
use crate::session::{Phase, Stage, TestSession};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    CreateSession,
    GetSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    GenerateTest {
        #[serde(rename = "sessionId")]
        session_id: String,
        request: TestRequest,
    },
    SubmitAnswers {
        #[serde(rename = "sessionId")]
        session_id: String,
        answers: HashMap<String, String>,
    },
    ResetSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    TutorMessage {
        text: String,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default, rename = "gradeLevel")]
        grade_level: Option<String>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionView,
    },
    TutorReply {
        text: String,
    },
    Error {
        message: String,
    },
}

/// How a question should be answered in the form.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Choice,
    Text,
}

/// Question as shown while the test is being taken.
#[derive(Debug, Serialize, Clone)]
pub struct QuestionOut {
    pub id: u32,
    pub question: String,
    pub input: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportOut {
    Scored {
        score: u32,
        total: u32,
        feedback: Vec<QuestionFeedback>,
    },
    Narrative {
        markdown: String,
    },
}

/// DTO used by both WS and HTTP for session state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<TestRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionOut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_answers: Option<AnswerMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn questions_out(set: &QuestionSet) -> Vec<QuestionOut> {
    match set {
        QuestionSet::MultipleChoice(qs) | QuestionSet::Numerical(qs) => qs
            .iter()
            .map(|q| QuestionOut {
                id: q.id,
                question: q.question.clone(),
                input: InputKind::Choice,
                options: Some(q.options.clone()),
                marks: None,
            })
            .collect(),
        QuestionSet::Descriptive(qs) => qs
            .iter()
            .map(|q| QuestionOut {
                id: q.id,
                question: q.question.clone(),
                input: InputKind::Text,
                options: None,
                marks: Some(q.marks),
            })
            .collect(),
    }
}

fn report_out(report: &GradingReport) -> ReportOut {
    match report {
        GradingReport::Scored(r) => ReportOut::Scored {
            score: r.score,
            total: r.total,
            feedback: r.feedback.clone(),
        },
        GradingReport::Narrative(md) => ReportOut::Narrative { markdown: md.clone() },
    }
}

/// Convert a session (internal) to the public DTO.
pub fn to_view(s: &TestSession) -> SessionView {
    let mut view = SessionView {
        session_id: s.id.clone(),
        stage: s.stage(),
        request: None,
        questions: None,
        last_answers: None,
        report: None,
        report_markdown: None,
        error: None,
    };
    match &s.phase {
        Phase::Configuring => {}
        Phase::Generated { request, questions, last_submission } => {
            view.request = Some(request.clone());
            view.questions = Some(questions_out(questions));
            view.last_answers = last_submission.clone();
        }
        Phase::Graded { request, questions, answers, report } => {
            view.request = Some(request.clone());
            view.questions = Some(questions_out(questions));
            view.last_answers = Some(answers.clone());
            view.report = Some(report_out(report));
            view.report_markdown = Some(report.to_markdown());
        }
        Phase::GenerationFailed { request, reason } => {
            view.request = Some(request.clone());
            view.error = Some(reason.clone());
        }
    }
    view
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorIn {
    pub text: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
}
#[derive(Serialize)]
pub struct TutorOut {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
