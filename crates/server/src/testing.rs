use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use helpdesk_agent::knowledge::InMemoryKnowledgeStore;
use helpdesk_agent::llm::{CompletionRequest, PromptKind};
use helpdesk_agent::{AgentRuntime, KnowledgeBase, LlmClient, LlmError, RecordBook};
use helpdesk_core::records::InMemoryRecordSink;

/// Answers every request of a kind with the same canned reply.
#[derive(Default)]
struct StubLlm {
    replies: HashMap<PromptKind, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(&request.purpose)
            .cloned()
            .ok_or_else(|| LlmError::Transport(format!("no stub for {}", request.purpose.as_str())))
    }
}

pub struct TestRuntime {
    llm: Arc<StubLlm>,
    sales: InMemoryRecordSink,
    features: InMemoryRecordSink,
    knowledge: KnowledgeBase,
}

impl TestRuntime {
    pub fn new() -> Self {
        Self {
            llm: Arc::new(StubLlm::default()),
            sales: InMemoryRecordSink::default(),
            features: InMemoryRecordSink::default(),
            knowledge: KnowledgeBase::new(Arc::new(InMemoryKnowledgeStore::default()), 5),
        }
    }

    pub fn reply(mut self, kind: PromptKind, text: &str) -> Self {
        if let Some(llm) = Arc::get_mut(&mut self.llm) {
            llm.replies.insert(kind, text.to_owned());
        }
        self
    }

    pub fn runtime(&self) -> Arc<AgentRuntime> {
        let records =
            RecordBook::new(Arc::new(self.sales.clone()), Arc::new(self.features.clone()));
        let runtime = AgentRuntime::new(self.llm.clone(), self.knowledge.clone(), records)
            .expect("prompt templates compile");
        Arc::new(runtime)
    }

    pub fn sales(&self) -> Vec<String> {
        self.sales.entries()
    }

    pub fn features(&self) -> Vec<String> {
        self.features.entries()
    }

    pub fn llm_calls(&self) -> usize {
        self.llm.calls.load(Ordering::SeqCst)
    }
}
