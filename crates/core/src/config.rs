use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub knowledge: KnowledgeConfig,
    pub records: RecordsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub backend: KnowledgeBackend,
    pub chroma_url: String,
    pub collection: String,
    pub kb_file: PathBuf,
    pub embedding_url: String,
    pub embedding_model: String,
    pub result_count: usize,
    pub context_documents: usize,
}

#[derive(Clone, Debug)]
pub struct RecordsConfig {
    pub sales_log_path: PathBuf,
    pub feature_log_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub allow_any_origin: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Groq,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Chat-completions base URL used when `llm.base_url` is not set.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Groq | Self::OpenAi)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBackend {
    Chroma,
    Memory,
}

impl KnowledgeBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chroma => "chroma",
            Self::Memory => "memory",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub knowledge_backend: Option<KnowledgeBackend>,
    pub kb_file: Option<PathBuf>,
    pub sales_log_path: Option<PathBuf>,
    pub feature_log_path: Option<PathBuf>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: None,
                base_url: None,
                model: "llama3-70b-8192".to_string(),
                timeout_secs: 30,
            },
            knowledge: KnowledgeConfig {
                backend: KnowledgeBackend::Chroma,
                chroma_url: "http://localhost:8000".to_string(),
                collection: "tech_kb".to_string(),
                kb_file: PathBuf::from("knowledge_base.json"),
                embedding_url: "http://localhost:11434/v1/embeddings".to_string(),
                embedding_model: "all-minilm".to_string(),
                result_count: 5,
                context_documents: 3,
            },
            records: RecordsConfig {
                sales_log_path: PathBuf::from("sales_req.txt"),
                feature_log_path: PathBuf::from("features.txt"),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                allow_any_origin: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected groq|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for KnowledgeBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chroma" => Ok(Self::Chroma),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported knowledge backend `{other}` (expected chroma|memory)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("helpdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(backend) = knowledge.backend {
                self.knowledge.backend = backend;
            }
            if let Some(chroma_url) = knowledge.chroma_url {
                self.knowledge.chroma_url = chroma_url;
            }
            if let Some(collection) = knowledge.collection {
                self.knowledge.collection = collection;
            }
            if let Some(kb_file) = knowledge.kb_file {
                self.knowledge.kb_file = kb_file;
            }
            if let Some(embedding_url) = knowledge.embedding_url {
                self.knowledge.embedding_url = embedding_url;
            }
            if let Some(embedding_model) = knowledge.embedding_model {
                self.knowledge.embedding_model = embedding_model;
            }
            if let Some(result_count) = knowledge.result_count {
                self.knowledge.result_count = result_count;
            }
            if let Some(context_documents) = knowledge.context_documents {
                self.knowledge.context_documents = context_documents;
            }
        }

        if let Some(records) = patch.records {
            if let Some(sales_log_path) = records.sales_log_path {
                self.records.sales_log_path = sales_log_path;
            }
            if let Some(feature_log_path) = records.feature_log_path {
                self.records.feature_log_path = feature_log_path;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(allow_any_origin) = server.allow_any_origin {
                self.server.allow_any_origin = allow_any_origin;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HELPDESK_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("HELPDESK_LLM_API_KEY").or_else(|| read_env("GROQ_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("HELPDESK_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("HELPDESK_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("HELPDESK_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("HELPDESK_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_BACKEND") {
            self.knowledge.backend = value.parse()?;
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_CHROMA_URL") {
            self.knowledge.chroma_url = value;
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_COLLECTION") {
            self.knowledge.collection = value;
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_KB_FILE") {
            self.knowledge.kb_file = PathBuf::from(value);
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_EMBEDDING_URL") {
            self.knowledge.embedding_url = value;
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_EMBEDDING_MODEL") {
            self.knowledge.embedding_model = value;
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_RESULT_COUNT") {
            self.knowledge.result_count = parse_usize("HELPDESK_KNOWLEDGE_RESULT_COUNT", &value)?;
        }
        if let Some(value) = read_env("HELPDESK_KNOWLEDGE_CONTEXT_DOCUMENTS") {
            self.knowledge.context_documents =
                parse_usize("HELPDESK_KNOWLEDGE_CONTEXT_DOCUMENTS", &value)?;
        }

        if let Some(value) = read_env("HELPDESK_RECORDS_SALES_LOG_PATH") {
            self.records.sales_log_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("HELPDESK_RECORDS_FEATURE_LOG_PATH") {
            self.records.feature_log_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("HELPDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HELPDESK_SERVER_PORT") {
            self.server.port = parse_u16("HELPDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("HELPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("HELPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("HELPDESK_SERVER_ALLOW_ANY_ORIGIN") {
            self.server.allow_any_origin = parse_bool("HELPDESK_SERVER_ALLOW_ANY_ORIGIN", &value)?;
        }

        let log_level =
            read_env("HELPDESK_LOGGING_LEVEL").or_else(|| read_env("HELPDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HELPDESK_LOGGING_FORMAT").or_else(|| read_env("HELPDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(backend) = overrides.knowledge_backend {
            self.knowledge.backend = backend;
        }
        if let Some(kb_file) = overrides.kb_file {
            self.knowledge.kb_file = kb_file;
        }
        if let Some(sales_log_path) = overrides.sales_log_path {
            self.records.sales_log_path = sales_log_path;
        }
        if let Some(feature_log_path) = overrides.feature_log_path {
            self.records.feature_log_path = feature_log_path;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_knowledge(&self.knowledge)?;
        validate_records(&self.records)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Returns the config file that `AppConfig::load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("helpdesk.toml"), PathBuf::from("config/helpdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for groq/openai providers (set HELPDESK_LLM_API_KEY or GROQ_API_KEY)"
                    .to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.result_count == 0 {
        return Err(ConfigError::Validation(
            "knowledge.result_count must be greater than zero".to_string(),
        ));
    }

    if knowledge.context_documents == 0 {
        return Err(ConfigError::Validation(
            "knowledge.context_documents must be greater than zero".to_string(),
        ));
    }

    if knowledge.backend == KnowledgeBackend::Chroma {
        for (key, url) in [
            ("knowledge.chroma_url", &knowledge.chroma_url),
            ("knowledge.embedding_url", &knowledge.embedding_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }

        if knowledge.collection.trim().is_empty() {
            return Err(ConfigError::Validation(
                "knowledge.collection must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_records(records: &RecordsConfig) -> Result<(), ConfigError> {
    if records.sales_log_path.as_os_str().is_empty()
        || records.feature_log_path.as_os_str().is_empty()
    {
        return Err(ConfigError::Validation(
            "records.sales_log_path and records.feature_log_path must not be empty".to_string(),
        ));
    }

    if records.sales_log_path == records.feature_log_path {
        return Err(ConfigError::Validation(
            "records.sales_log_path and records.feature_log_path must be different files"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    knowledge: Option<KnowledgePatch>,
    records: Option<RecordsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    backend: Option<KnowledgeBackend>,
    chroma_url: Option<String>,
    collection: Option<String>,
    kb_file: Option<PathBuf>,
    embedding_url: Option<String>,
    embedding_model: Option<String>,
    result_count: Option<usize>,
    context_documents: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsPatch {
    sales_log_path: Option<PathBuf>,
    feature_log_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    allow_any_origin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, KnowledgeBackend, LlmProvider, LoadOptions,
        LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const MANAGED_VARS: &[&str] = &[
        "GROQ_API_KEY",
        "HELPDESK_LLM_API_KEY",
        "HELPDESK_LLM_PROVIDER",
        "HELPDESK_LOG_LEVEL",
        "HELPDESK_LOG_FORMAT",
        "HELPDESK_KNOWLEDGE_BACKEND",
        "HELPDESK_KNOWLEDGE_RESULT_COUNT",
        "HELPDESK_SERVER_PORT",
        "TEST_HELPDESK_API_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("TEST_HELPDESK_API_KEY", "gsk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("helpdesk.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_HELPDESK_API_KEY}"
model = "llama3-8b-8192"

[knowledge]
collection = "support_kb"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "gsk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(config.llm.model == "llama3-8b-8192", "model should come from file")?;
            ensure(config.knowledge.collection == "support_kb", "collection should come from file")?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn groq_api_key_env_is_accepted_as_fallback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("GROQ_API_KEY", "gsk-legacy");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.llm.provider == LlmProvider::Groq, "default provider should be groq")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "gsk-legacy")
                    == Some(true),
                "GROQ_API_KEY should populate llm.api_key",
            )?;
            ensure(
                config.llm.effective_base_url() == "https://api.groq.com/openai/v1",
                "groq base url should be the provider default",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("HELPDESK_LLM_API_KEY", "gsk-test");
        env::set_var("HELPDESK_LOG_LEVEL", "warn");
        env::set_var("HELPDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("HELPDESK_LLM_API_KEY", "gsk-from-env");
        env::set_var("HELPDESK_SERVER_PORT", "9100");
        env::set_var("HELPDESK_KNOWLEDGE_BACKEND", "memory");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("helpdesk.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "gsk-from-file"

[server]
port = 9000

[records]
sales_log_path = "leads/from-file.txt"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    sales_log_path: Some(PathBuf::from("leads/from-override.txt")),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.records.sales_log_path == PathBuf::from("leads/from-override.txt"),
                "override sales log path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 9100, "env port should win over file")?;
            ensure(
                config.knowledge.backend == KnowledgeBackend::Memory,
                "env knowledge backend should win over default",
            )?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "gsk-from-env")
                    == Some(true),
                "env api key should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn ollama_provider_does_not_require_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("HELPDESK_LLM_PROVIDER", "ollama");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.llm.api_key.is_none(), "ollama should load without an api key")?;
            ensure(
                config.llm.effective_base_url() == "http://localhost:11434/v1",
                "ollama base url should be the provider default",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("HELPDESK_LLM_API_KEY", "gsk-test");
        env::set_var("HELPDESK_KNOWLEDGE_RESULT_COUNT", "many");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "HELPDESK_KNOWLEDGE_RESULT_COUNT"
                ),
                "invalid override should name the variable",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        env::set_var("HELPDESK_LLM_API_KEY", "gsk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("gsk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn missing_required_file_is_reported() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/definitely/not/here/helpdesk.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing file must fail when required");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }
}
