use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError, PromptKind};

/// Replies per prompt kind: queued replies first, then the standing reply, else an error.
#[derive(Default)]
pub struct ScriptedLlm {
    queued: Mutex<HashMap<PromptKind, VecDeque<String>>>,
    standing: HashMap<PromptKind, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn reply(mut self, kind: PromptKind, text: &str) -> Self {
        self.queued
            .get_mut()
            .expect("script lock")
            .entry(kind)
            .or_default()
            .push_back(text.to_string());
        self
    }

    pub fn always(mut self, kind: PromptKind, text: &str) -> Self {
        self.standing.insert(kind, text.to_string());
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, kind: PromptKind) -> usize {
        self.requests().iter().filter(|request| request.purpose == kind).count()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let kind = request.purpose;
        self.requests.lock().expect("requests lock").push(request);

        let queued = self
            .queued
            .lock()
            .expect("script lock")
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        queued
            .or_else(|| self.standing.get(&kind).cloned())
            .ok_or_else(|| LlmError::Transport(format!("no scripted reply for {}", kind.as_str())))
    }
}
