use std::time::Duration;

use helpdesk_agent::knowledge::knowledge_base_from_config;
use helpdesk_core::config::{AppConfig, LoadOptions};
use helpdesk_core::domain::knowledge::parse_entries;
use serde::Serialize;

use super::{block_on, CommandResult, EXIT_CONFIG, EXIT_DEPENDENCY};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = match report.checks.first() {
        Some(check) if check.status == CheckStatus::Fail => EXIT_CONFIG,
        _ if report.overall_status == CheckStatus::Fail => EXIT_DEPENDENCY,
        _ => 0,
    };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_llm_credentials(&config));
            checks.push(check_knowledge_file(&config));
            checks.push(check_knowledge_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped("llm_credentials"));
            checks.push(DoctorCheck::skipped("knowledge_file"));
            checks.push(DoctorCheck::skipped("knowledge_store"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let provider = config.llm.provider.as_str();
    let endpoint = config.llm.effective_base_url();
    if !config.llm.provider.requires_api_key() {
        return DoctorCheck::pass(
            "llm_credentials",
            format!("provider `{provider}` needs no api key ({endpoint})"),
        );
    }

    match config.llm.api_key {
        Some(_) => DoctorCheck::pass(
            "llm_credentials",
            format!("api key present for provider `{provider}` ({endpoint})"),
        ),
        None => DoctorCheck::fail(
            "llm_credentials",
            format!("provider `{provider}` requires llm.api_key"),
        ),
    }
}

fn check_knowledge_file(config: &AppConfig) -> DoctorCheck {
    let path = &config.knowledge.kb_file;
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return DoctorCheck::fail(
                "knowledge_file",
                format!("cannot read `{}`: {error}", path.display()),
            );
        }
    };

    match parse_entries(&raw) {
        Ok(entries) => DoctorCheck::pass(
            "knowledge_file",
            format!("`{}` holds {} entries", path.display(), entries.len()),
        ),
        Err(error) => DoctorCheck::fail(
            "knowledge_file",
            format!("`{}` is not a valid entries file: {error}", path.display()),
        ),
    }
}

fn check_knowledge_store(config: &AppConfig) -> DoctorCheck {
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    let knowledge = match knowledge_base_from_config(&config.knowledge, timeout) {
        Ok(knowledge) => knowledge,
        Err(error) => return DoctorCheck::fail("knowledge_store", error.to_string()),
    };

    match block_on(knowledge.ping()) {
        Ok(Ok(())) => DoctorCheck::pass(
            "knowledge_store",
            format!("{} store reachable", knowledge.backend_name()),
        ),
        Ok(Err(error)) => DoctorCheck::fail(
            "knowledge_store",
            format!("{} store unreachable: {error}", knowledge.backend_name()),
        ),
        Err(error) => DoctorCheck::fail("knowledge_store", error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
