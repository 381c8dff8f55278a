use std::sync::Arc;

use axum::Router;
use helpdesk_agent::AgentRuntime;
use helpdesk_core::config::ServerConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{chat, health};

pub fn build(runtime: Arc<AgentRuntime>, server: &ServerConfig) -> Router {
    let router = Router::new()
        .merge(health::router(runtime.knowledge().clone()))
        .merge(chat::router(runtime))
        .layer(TraceLayer::new_for_http());

    if server.allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use helpdesk_agent::llm::PromptKind;
    use helpdesk_agent::replies;
    use helpdesk_core::config::AppConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::build;
    use crate::testing::TestRuntime;

    fn chat_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn chat_accepts_trailing_slash_and_completes_sales_lead() {
        let harness = TestRuntime::new()
            .reply(PromptKind::Sentiment, "NO")
            .reply(PromptKind::Classification, "Sales")
            .reply(PromptKind::SalesComplexity, "NO")
            .reply(
                PromptKind::FieldExtraction,
                r#"{"name": "John", "company": "Acme Inc", "team_size": "10", "sales_query": "need sales info"}"#,
            );
        let app = build(harness.runtime(), &AppConfig::default().server);

        let response = app
            .oneshot(chat_request(
                "/chat/",
                json!({
                    "session_id": "s1",
                    "message": "I'm John from Acme Inc with 10 people, need sales info"
                }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let reply = body["response"].as_str().expect("response field");
        assert!(reply.contains("John"));
        assert!(reply.contains("Acme Inc"));
        assert_eq!(harness.sales().len(), 1);
        assert!(harness.sales()[0].contains("need sales info"));
    }

    #[tokio::test]
    async fn chat_without_trailing_slash_accepts_empty_session_id() {
        let app = build(TestRuntime::new().runtime(), &AppConfig::default().server);

        let response = app
            .oneshot(chat_request(
                "/chat",
                json!({ "session_id": "", "message": "thanks, that's all" }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["response"], replies::CLOSING);
    }

    #[tokio::test]
    async fn chat_rejects_body_missing_fields_with_correlation_id() {
        let harness = TestRuntime::new();
        let app = build(harness.runtime(), &AppConfig::default().server);

        let response = app
            .oneshot(chat_request("/chat/", json!({ "message": "hi" })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(
            body["error"],
            "The request could not be processed. Check inputs and try again."
        );
        assert_eq!(harness.llm_calls(), 0);
    }

    #[tokio::test]
    async fn health_route_reports_ready() {
        let app = build(TestRuntime::new().runtime(), &AppConfig::default().server);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");
    }
}
