use std::sync::Arc;

use helpdesk_core::domain::sales::SalesFields;
use helpdesk_core::domain::session::Turn;
use helpdesk_core::flows::FlowType;
use thiserror::Error;

use crate::conversation::{is_affirmative_verdict, parse_classification, parse_extraction, ExtractionOutcome};
use crate::llm::{CompletionRequest, LlmClient, LlmError, PromptKind};
use crate::prompts::{PromptError, PromptLibrary};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// LLM-backed judgments. Every method except `technical_answer` absorbs failures into the
/// conservative default and logs them.
#[derive(Clone)]
pub struct Analyst {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLibrary,
}

impl Analyst {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLibrary) -> Self {
        Self { llm, prompts }
    }

    /// Failures count as "not negative".
    pub async fn is_negative_sentiment(&self, message: &str) -> bool {
        let verdict = async {
            let prompt = self.prompts.sentiment(message)?;
            let request = CompletionRequest::user_prompt(PromptKind::Sentiment, prompt)
                .temperature(0.0)
                .max_tokens(5);
            Ok::<_, AnalysisError>(self.llm.complete(request).await?)
        }
        .await;

        match verdict {
            Ok(reply) => is_affirmative_verdict(&reply),
            Err(error) => {
                tracing::warn!(
                    event_name = "analysis.sentiment_failed",
                    error = %error,
                    "sentiment check failed; treating message as not negative"
                );
                false
            }
        }
    }

    /// `None` when the reply carries no known label or the call fails.
    pub async fn classify(&self, history: &[Turn], message: &str) -> Option<FlowType> {
        let reply = async {
            let prompt = self.prompts.classification(history, message)?;
            let request = CompletionRequest::user_prompt(PromptKind::Classification, prompt)
                .temperature(0.2)
                .max_tokens(20);
            Ok::<_, AnalysisError>(self.llm.complete(request).await?)
        }
        .await;

        match reply {
            Ok(reply) => {
                let flow = parse_classification(&reply);
                tracing::debug!(
                    event_name = "analysis.classified",
                    reply = %reply,
                    flow = flow.map(|flow| flow.as_str()).unwrap_or("none"),
                    "message classified"
                );
                flow
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "analysis.classification_failed",
                    error = %error,
                    "classification failed"
                );
                None
            }
        }
    }

    /// Failures count as "not complex".
    pub async fn is_complex_sales_inquiry(&self, message: &str) -> bool {
        let verdict = async {
            let prompt = self.prompts.sales_complexity(message)?;
            let request = CompletionRequest::user_prompt(PromptKind::SalesComplexity, prompt)
                .temperature(0.0)
                .max_tokens(5);
            Ok::<_, AnalysisError>(self.llm.complete(request).await?)
        }
        .await;

        match verdict {
            Ok(reply) => is_affirmative_verdict(&reply),
            Err(error) => {
                tracing::warn!(
                    event_name = "analysis.complexity_failed",
                    error = %error,
                    "sales complexity check failed; treating inquiry as standard"
                );
                false
            }
        }
    }

    /// Non-JSON replies fall back to the message heuristic; call failures extract nothing.
    pub async fn extract_sales_fields(&self, message: &str) -> SalesFields {
        let reply = async {
            let system = self.prompts.field_extraction_system()?;
            let request = CompletionRequest::user_prompt(PromptKind::FieldExtraction, message)
                .with_system(system)
                .temperature(0.2)
                .json_response();
            Ok::<_, AnalysisError>(self.llm.complete(request).await?)
        }
        .await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    event_name = "analysis.extraction_failed",
                    error = %error,
                    "sales field extraction failed"
                );
                return SalesFields::default();
            }
        };

        let outcome = parse_extraction(&reply, message);
        match &outcome {
            ExtractionOutcome::Parsed(fields) => tracing::debug!(
                event_name = "analysis.fields_extracted",
                missing = fields.missing().len(),
                "sales fields extracted"
            ),
            ExtractionOutcome::Heuristic(_) => tracing::warn!(
                event_name = "analysis.extraction_not_json",
                "extraction reply was not json; using message heuristic"
            ),
            ExtractionOutcome::Unusable => tracing::warn!(
                event_name = "analysis.extraction_unusable",
                "extraction reply was not a json object"
            ),
        }
        outcome.into_fields()
    }

    pub async fn technical_answer(
        &self,
        history: &[Turn],
        documents: &[String],
    ) -> Result<String, AnalysisError> {
        let prompt = self.prompts.technical_answer(history, documents)?;
        let request = CompletionRequest::user_prompt(PromptKind::TechnicalAnswer, prompt)
            .temperature(0.5)
            .max_tokens(1024);
        Ok(self.llm.complete(request).await?)
    }
}
