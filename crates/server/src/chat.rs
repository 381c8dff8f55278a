use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use helpdesk_agent::AgentRuntime;
use helpdesk_core::domain::session::SessionId;
use helpdesk_core::errors::{ApplicationError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatError {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/", post(chat))
        .with_state(ChatState { runtime })
}

/// Session ids are opaque; the text sent is the key, whitespace and empty strings included.
pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatError>)> {
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let error = ApplicationError::InvalidInput(rejection.body_text())
                .into_interface(correlation_id);
            warn!(
                event_name = "chat.request_rejected",
                correlation_id = %error.correlation_id(),
                error = %error,
                "chat request rejected"
            );
            return Err(error_response(error));
        }
    };

    let session_id = SessionId::from(request.session_id);
    info!(
        event_name = "chat.request_received",
        session_id = %session_id,
        correlation_id = %correlation_id,
        message_len = request.message.len(),
        "chat request received"
    );

    let response = state.runtime.handle_message(&session_id, &request.message, &correlation_id).await;
    Ok(Json(ChatResponse { response }))
}

fn error_response(error: InterfaceError) -> (StatusCode, Json<ChatError>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ChatError {
            error: error.user_message().to_owned(),
            correlation_id: error.correlation_id().to_owned(),
        }),
    )
}
