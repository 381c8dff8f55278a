use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use helpdesk_agent::KnowledgeBase;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    knowledge: KnowledgeBase,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub knowledge: HealthCheck,
    pub checked_at: String,
}

pub fn router(knowledge: KnowledgeBase) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { knowledge })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let knowledge = knowledge_check(&state.knowledge).await;
    let ready = knowledge.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "helpdesk-server runtime initialized".to_string(),
        },
        knowledge,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn knowledge_check(knowledge: &KnowledgeBase) -> HealthCheck {
    let backend = knowledge.backend_name();
    match knowledge.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: format!("{backend} store reachable") },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("{backend} store unreachable: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{extract::State, http::StatusCode, Json};
    use helpdesk_agent::knowledge::{ChromaKnowledgeStore, HttpEmbedder, InMemoryKnowledgeStore};
    use helpdesk_agent::KnowledgeBase;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_for_memory_store() {
        let knowledge = KnowledgeBase::new(Arc::new(InMemoryKnowledgeStore::default()), 5);

        let (status, Json(payload)) = health(State(HealthState { knowledge })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.knowledge.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_store_is_unreachable() {
        let timeout = Duration::from_millis(500);
        let embedder = HttpEmbedder::new("http://127.0.0.1:9/v1/embeddings", "all-minilm", timeout)
            .expect("embedder");
        let store =
            ChromaKnowledgeStore::new("http://127.0.0.1:9", "tech_kb", Arc::new(embedder), timeout)
                .expect("store");
        let knowledge = KnowledgeBase::new(Arc::new(store), 5);

        let (status, Json(payload)) = health(State(HealthState { knowledge })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.knowledge.status, "degraded");
        assert!(payload.knowledge.detail.starts_with("chroma"));
        assert_eq!(payload.service.status, "ready");
    }
}
