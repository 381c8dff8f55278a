use std::sync::Arc;
use std::time::Duration;

use helpdesk_agent::knowledge::knowledge_base_from_config;
use helpdesk_agent::prompts::PromptError;
use helpdesk_agent::{AgentRuntime, KnowledgeError, LlmError, OpenAiCompatibleClient, RecordBook};
use helpdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("knowledge store setup failed: {0}")]
    Knowledge(#[source] KnowledgeError),
    #[error("prompt templates failed to compile: {0}")]
    Prompts(#[source] PromptError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        knowledge_backend = config.knowledge.backend.as_str(),
        "starting application bootstrap"
    );

    let llm = OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        endpoint = llm.endpoint(),
        model = %config.llm.model,
        "llm client configured"
    );

    let timeout = Duration::from_secs(config.llm.timeout_secs);
    let knowledge =
        knowledge_base_from_config(&config.knowledge, timeout).map_err(BootstrapError::Knowledge)?;
    knowledge.bootstrap(&config.knowledge.kb_file).await;

    let runtime = AgentRuntime::new(Arc::new(llm), knowledge, RecordBook::from_config(&config.records))
        .map_err(BootstrapError::Prompts)?
        .with_context_documents(config.knowledge.context_documents);

    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        sales_log = %config.records.sales_log_path.display(),
        feature_log = %config.records.feature_log_path.display(),
        "application bootstrap complete"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use helpdesk_core::config::{ConfigOverrides, KnowledgeBackend, LlmProvider, LoadOptions};
    use tempfile::TempDir;

    use crate::bootstrap::bootstrap;

    fn overrides(dir: &TempDir, provider: LlmProvider, api_key: Option<&str>) -> LoadOptions {
        LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: false,
            overrides: ConfigOverrides {
                llm_provider: Some(provider),
                llm_api_key: api_key.map(str::to_string),
                knowledge_backend: Some(KnowledgeBackend::Memory),
                kb_file: Some(dir.path().join("knowledge_base.json")),
                sales_log_path: Some(dir.path().join("sales_req.txt")),
                feature_log_path: Some(dir.path().join("features.txt")),
                ..ConfigOverrides::default()
            },
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_hosted_provider_key() {
        let dir = TempDir::new().expect("tempdir");
        let result = bootstrap(overrides(&dir, LlmProvider::OpenAi, None)).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("api_key"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_loads_knowledge_file_into_memory_store() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("knowledge_base.json"),
            r#"[
                {"id": 1, "category": "login", "issue": "Cannot log in", "solution": "Reset the password"},
                {"id": "2", "category": "billing", "issue": "Invoice missing", "solution": "Check the billing tab"}
            ]"#,
        )
        .expect("write kb");

        let app = bootstrap(overrides(&dir, LlmProvider::Ollama, None)).await.expect("bootstrap");

        let results = app.runtime.knowledge().search("cannot log in").await;
        assert!(!results.is_empty());
        assert!(results.documents[0].contains("Reset the password"));
        assert_eq!(app.runtime.knowledge().backend_name(), "memory");
    }

    #[tokio::test]
    async fn bootstrap_tolerates_missing_knowledge_file() {
        let dir = TempDir::new().expect("tempdir");
        let app = bootstrap(overrides(&dir, LlmProvider::Groq, Some("gsk-test")))
            .await
            .expect("missing kb file must not be fatal");

        assert!(app.runtime.knowledge().search("anything").await.is_empty());
    }
}
