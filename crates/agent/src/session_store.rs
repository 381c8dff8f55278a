use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use helpdesk_core::domain::session::{Session, SessionId};
use tokio::sync::Mutex as AsyncMutex;

pub type SessionHandle = Arc<AsyncMutex<Session>>;

/// Process-lifetime session map. Sessions are created on first use and never evicted.
///
/// Each session sits behind its own async mutex so one turn holds it across LLM and
/// knowledge-base awaits while other sessions proceed.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionStore {
    pub fn handle(&self, id: &SessionId) -> SessionHandle {
        let mut sessions = match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new(id.clone()))))
            .clone()
    }

    pub async fn snapshot(&self, id: &SessionId) -> Option<Session> {
        let handle = {
            let sessions = match self.sessions.lock() {
                Ok(sessions) => sessions,
                Err(poisoned) => poisoned.into_inner(),
            };
            sessions.get(id).cloned()
        }?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    pub fn len(&self) -> usize {
        match self.sessions.lock() {
            Ok(sessions) => sessions.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
