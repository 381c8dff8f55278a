use std::path::Path;
use std::time::Duration;

use helpdesk_agent::knowledge::{knowledge_base_from_config, KnowledgeError};
use helpdesk_core::config::{AppConfig, LoadOptions};
use serde_json::json;

use super::{block_on, CommandResult, EXIT_CONFIG, EXIT_DEPENDENCY};

const COMMAND: &str = "kb-load";

/// Loads the entries file into the configured store. `file` overrides `knowledge.kb_file`.
pub fn run(file: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };
    let path = file.unwrap_or(&config.knowledge.kb_file);

    let timeout = Duration::from_secs(config.llm.timeout_secs);
    let knowledge = match knowledge_base_from_config(&config.knowledge, timeout) {
        Ok(knowledge) => knowledge,
        Err(error) => {
            return CommandResult::failure(COMMAND, "knowledge_store", error.to_string(), EXIT_CONFIG)
        }
    };

    let report = match block_on(knowledge.load_file(path)) {
        Ok(Ok(report)) => report,
        Ok(Err(error)) => {
            let error_class = match &error {
                KnowledgeError::ReadFile { .. } | KnowledgeError::ParseFile { .. } => {
                    "knowledge_file"
                }
                _ => "knowledge_store",
            };
            return CommandResult::failure(COMMAND, error_class, error.to_string(), EXIT_DEPENDENCY);
        }
        Err(error) => return CommandResult::failure(COMMAND, "runtime", error, EXIT_DEPENDENCY),
    };

    CommandResult::success(
        COMMAND,
        format!(
            "loaded {} of {} entries from `{}` into the {} store",
            report.added,
            report.total,
            path.display(),
            knowledge.backend_name()
        ),
        Some(json!({
            "backend": knowledge.backend_name(),
            "file": path.display().to_string(),
            "total": report.total,
            "added": report.added,
            "skipped": report.skipped,
        })),
    )
}
