use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use helpdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// One rendered setting: dotted key, display value, and the env vars that can set it.
struct Setting {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Setting {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(&config) {
        let source = field_source(
            setting.key,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", setting.key, setting.value));
    }

    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    let llm = &config.llm;
    let knowledge = &config.knowledge;
    let api_key = llm
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        Setting::new("llm.provider", llm.provider.as_str(), &["HELPDESK_LLM_PROVIDER"]),
        Setting::new("llm.api_key", api_key, &["HELPDESK_LLM_API_KEY", "GROQ_API_KEY"]),
        Setting::new(
            "llm.base_url",
            llm.effective_base_url(),
            &["HELPDESK_LLM_BASE_URL"],
        ),
        Setting::new("llm.model", llm.model.as_str(), &["HELPDESK_LLM_MODEL"]),
        Setting::new(
            "llm.timeout_secs",
            llm.timeout_secs.to_string(),
            &["HELPDESK_LLM_TIMEOUT_SECS"],
        ),
        Setting::new(
            "knowledge.backend",
            knowledge.backend.as_str(),
            &["HELPDESK_KNOWLEDGE_BACKEND"],
        ),
        Setting::new(
            "knowledge.chroma_url",
            knowledge.chroma_url.as_str(),
            &["HELPDESK_KNOWLEDGE_CHROMA_URL"],
        ),
        Setting::new(
            "knowledge.collection",
            knowledge.collection.as_str(),
            &["HELPDESK_KNOWLEDGE_COLLECTION"],
        ),
        Setting::new(
            "knowledge.kb_file",
            knowledge.kb_file.display().to_string(),
            &["HELPDESK_KNOWLEDGE_KB_FILE"],
        ),
        Setting::new(
            "knowledge.embedding_url",
            knowledge.embedding_url.as_str(),
            &["HELPDESK_KNOWLEDGE_EMBEDDING_URL"],
        ),
        Setting::new(
            "knowledge.embedding_model",
            knowledge.embedding_model.as_str(),
            &["HELPDESK_KNOWLEDGE_EMBEDDING_MODEL"],
        ),
        Setting::new(
            "knowledge.result_count",
            knowledge.result_count.to_string(),
            &["HELPDESK_KNOWLEDGE_RESULT_COUNT"],
        ),
        Setting::new(
            "knowledge.context_documents",
            knowledge.context_documents.to_string(),
            &["HELPDESK_KNOWLEDGE_CONTEXT_DOCUMENTS"],
        ),
        Setting::new(
            "records.sales_log_path",
            config.records.sales_log_path.display().to_string(),
            &["HELPDESK_RECORDS_SALES_LOG_PATH"],
        ),
        Setting::new(
            "records.feature_log_path",
            config.records.feature_log_path.display().to_string(),
            &["HELPDESK_RECORDS_FEATURE_LOG_PATH"],
        ),
        Setting::new(
            "server.bind_address",
            config.server.bind_address.as_str(),
            &["HELPDESK_SERVER_BIND_ADDRESS"],
        ),
        Setting::new("server.port", config.server.port.to_string(), &["HELPDESK_SERVER_PORT"]),
        Setting::new(
            "server.allow_any_origin",
            config.server.allow_any_origin.to_string(),
            &["HELPDESK_SERVER_ALLOW_ANY_ORIGIN"],
        ),
        Setting::new(
            "logging.level",
            config.logging.level.as_str(),
            &["HELPDESK_LOGGING_LEVEL", "HELPDESK_LOG_LEVEL"],
        ),
        Setting::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["HELPDESK_LOGGING_FORMAT", "HELPDESK_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a provider prefix such as `gsk_` or `sk-` and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(['_', '-']) {
        Some(index) if index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::redact_secret;

    #[test]
    fn redaction_keeps_short_provider_prefix_only() {
        assert_eq!(redact_secret("gsk_abcdef123"), "gsk_***");
        assert_eq!(redact_secret("sk-proj-xyz"), "sk-***");
        assert_eq!(redact_secret("plainsecretvalue"), "<redacted>");
        assert_eq!(redact_secret("  "), "<empty>");
    }
}
