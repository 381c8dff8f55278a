//! Agent runtime: routes customer messages into support flows.
//!
//! The LLM is used for judgments (classification, sentiment, sales complexity, field
//! extraction) and for drafting technical answers. Everything else is deterministic:
//!
//! 1. **Guardrails** (`guardrails`) end the session on closing phrases.
//! 2. **Analysis** (`analysis`) wraps each LLM judgment with a conservative fallback.
//! 3. **Flows** (`technical`, `sales`, `feature`) advance the per-session state machine.
//! 4. **Knowledge** (`knowledge`) retrieves candidate solutions from a vector store.
//!
//! `AgentRuntime` in `runtime` ties these together per session.

pub mod analysis;
pub mod conversation;
mod feature;
pub mod guardrails;
pub mod knowledge;
pub mod llm;
pub mod prompts;
pub mod replies;
pub mod runtime;
mod sales;
pub mod session_store;
mod technical;
#[cfg(test)]
mod testing;

pub use knowledge::{
    knowledge_base_from_config, store_from_config, KnowledgeBase, KnowledgeError, KnowledgeStore,
    LoadReport,
};
pub use llm::{LlmClient, LlmError, OpenAiCompatibleClient};
pub use runtime::{AgentRuntime, RecordBook};
