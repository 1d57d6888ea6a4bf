//! Applicant form: configuration, rendering, answers and autosave.

mod autosave;
pub mod form;
pub mod render;
mod session;

pub use autosave::Autosaver;
pub use form::{ConfigField, ConfigSection, FieldKind, FormConfig};
pub use render::{render_field, render_form};
pub use session::{ApplicationSession, SessionRegistry};

use serde::{Deserialize, Serialize};

/// One answered question, keyed by the field name it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationAnswer {
    pub question: String,
    pub answer: String,
}

/// Record an answer, replacing an earlier one for the same question
pub fn set_answer(answers: &mut Vec<ApplicationAnswer>, question: &str, value: &str) {
    match answers.iter_mut().find(|a| a.question == question) {
        Some(existing) => existing.answer = value.to_string(),
        None => answers.push(ApplicationAnswer {
            question: question.to_string(),
            answer: value.to_string(),
        }),
    }
}

/// The stored answer for a question, or "" when unanswered
pub fn answer_for<'a>(answers: &'a [ApplicationAnswer], question: &str) -> &'a str {
    answers
        .iter()
        .find(|a| a.question == question)
        .map(|a| a.answer.as_str())
        .unwrap_or("")
}
