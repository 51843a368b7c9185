//! Answer synthesis
//!
//! [`TemplateAnswerGenerator`] fills a fixed template with the leading characters of
//! the ranked context. A language-model backed generator can replace it behind the
//! same trait without touching the retrieval pipeline.

use async_trait::async_trait;

use crate::error::Result;

/// Answer returned when retrieval finds nothing
pub const NOT_FOUND_ANSWER: &str = "The answer is not found in the uploaded documents.";

/// Lead-in placed before the quoted context
pub const ANSWER_PREFIX: &str = "Based on the document content:\n\n";

/// Turns a question and ranked context passages into an answer
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// `contexts` are chunk texts, best match first
    async fn generate(&self, question: &str, contexts: &[String]) -> Result<String>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Concatenate-and-truncate generator
#[derive(Debug, Clone)]
pub struct TemplateAnswerGenerator {
    max_chars: usize,
}

impl TemplateAnswerGenerator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Build the answer synchronously
    pub fn render(&self, contexts: &[String]) -> String {
        if contexts.is_empty() {
            return NOT_FOUND_ANSWER.to_string();
        }

        let combined = contexts.join(" ");
        let excerpt: String = combined.chars().take(self.max_chars).collect();
        format!("{}{}", ANSWER_PREFIX, excerpt)
    }
}

impl Default for TemplateAnswerGenerator {
    fn default() -> Self {
        Self::new(800)
    }
}

#[async_trait]
impl AnswerGenerator for TemplateAnswerGenerator {
    async fn generate(&self, _question: &str, contexts: &[String]) -> Result<String> {
        Ok(self.render(contexts))
    }

    fn name(&self) -> &str {
        "template"
    }
}
