use helpdesk_core::domain::session::{Role, Turn};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

const CLASSIFICATION: &str = "classification.tera";
const SENTIMENT: &str = "sentiment.tera";
const SALES_COMPLEXITY: &str = "sales_complexity.tera";
const FIELD_EXTRACTION: &str = "field_extraction.tera";
const TECHNICAL_ANSWER: &str = "technical_answer.tera";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(String),
}

impl From<tera::Error> for PromptError {
    fn from(error: tera::Error) -> Self {
        Self::Template(error.to_string())
    }
}

#[derive(Serialize)]
struct PromptTurn<'a> {
    speaker: &'static str,
    content: &'a str,
}

/// Prompt templates for every LLM judgment the router makes.
#[derive(Clone, Debug)]
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (CLASSIFICATION, include_str!("../templates/classification.tera")),
            (SENTIMENT, include_str!("../templates/sentiment.tera")),
            (SALES_COMPLEXITY, include_str!("../templates/sales_complexity.tera")),
            (FIELD_EXTRACTION, include_str!("../templates/field_extraction.tera")),
            (TECHNICAL_ANSWER, include_str!("../templates/technical_answer.tera")),
        ])?;
        Ok(Self { tera })
    }

    /// `history` should already be limited to the turns the classifier may see.
    pub fn classification(&self, history: &[Turn], message: &str) -> Result<String, PromptError> {
        let turns = history
            .iter()
            .map(|turn| PromptTurn {
                speaker: match turn.role {
                    Role::User => "Customer",
                    Role::Assistant => "Agent",
                },
                content: &turn.content,
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("history", &turns);
        context.insert("message", message);
        self.render(CLASSIFICATION, &context)
    }

    pub fn sentiment(&self, message: &str) -> Result<String, PromptError> {
        self.render_message(SENTIMENT, message)
    }

    pub fn sales_complexity(&self, message: &str) -> Result<String, PromptError> {
        self.render_message(SALES_COMPLEXITY, message)
    }

    pub fn field_extraction_system(&self) -> Result<String, PromptError> {
        self.render(FIELD_EXTRACTION, &Context::new())
    }

    pub fn technical_answer(
        &self,
        history: &[Turn],
        documents: &[String],
    ) -> Result<String, PromptError> {
        let turns = history
            .iter()
            .map(|turn| PromptTurn {
                speaker: match turn.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                },
                content: &turn.content,
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("history", &turns);
        context.insert("documents", documents);
        self.render(TECHNICAL_ANSWER, &context)
    }

    fn render_message(&self, template: &str, message: &str) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("message", message);
        self.render(template, &context)
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, PromptError> {
        Ok(self.tera.render(template, context)?.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use helpdesk_core::domain::session::Turn;

    use super::PromptLibrary;

    fn library() -> PromptLibrary {
        PromptLibrary::new().expect("templates compile")
    }

    #[test]
    fn classification_lists_history_with_customer_and_agent_labels() {
        let history = vec![
            Turn::user("hello"),
            Turn::assistant("How can I help?"),
            Turn::user("my app crashes"),
        ];
        let prompt = library().classification(&history, "my app crashes").expect("renders");

        assert!(prompt.starts_with("Classify this customer message into Technical, Feature, or Sales."));
        assert!(prompt.contains(
            "Conversation History:\nCustomer: hello\nAgent: How can I help?\nCustomer: my app crashes\nCurrent Message: my app crashes\nClassification:"
        ));
        assert!(prompt.ends_with("Classification:"));
    }

    #[test]
    fn yes_no_prompts_embed_the_message() {
        let prompts = library();
        let sentiment = prompts.sentiment("this is useless!!").expect("renders");
        assert!(sentiment.contains("VERY NEGATIVE"));
        assert!(sentiment.ends_with("Message: this is useless!!"));

        let complexity = prompts.sales_complexity("custom pricing for 500 seats").expect("renders");
        assert!(complexity.starts_with("Is this sales inquiry complex?"));
        assert!(complexity.ends_with("Message: custom pricing for 500 seats"));
    }

    #[test]
    fn messages_are_not_html_escaped() {
        let prompt = library().sentiment("<b>R&D</b> team \"urgent\"").expect("renders");
        assert!(prompt.ends_with("Message: <b>R&D</b> team \"urgent\""));
    }

    #[test]
    fn technical_answer_includes_context_and_snippets() {
        let history = vec![Turn::user("printer offline"), Turn::assistant("Try restarting it.")];
        let documents = vec![
            "Issue: Printer offline\nSolution: Restart the spooler".to_string(),
            "Issue: Paper jam\nSolution: Open tray B".to_string(),
        ];
        let prompt = library().technical_answer(&history, &documents).expect("renders");

        assert!(prompt.starts_with(
            "Conversation Context:\nUser: printer offline\nAssistant: Try restarting it.\n\nKnowledge Base Snippets:\nIssue: Printer offline"
        ));
        assert!(prompt.contains("Solution: Open tray B\n\nGenerate a helpful response that:"));
        assert!(prompt.ends_with("4. Asks if this resolves their issue"));
    }

    #[test]
    fn extraction_system_prompt_names_all_keys() {
        let prompt = library().field_extraction_system().expect("renders");
        assert!(prompt.contains("name, company, team_size, sales_query"));
    }
}
