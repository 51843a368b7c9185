//! Answer generation from retrieved context

mod answer;

pub use answer::{AnswerGenerator, TemplateAnswerGenerator, ANSWER_PREFIX, NOT_FOUND_ANSWER};
