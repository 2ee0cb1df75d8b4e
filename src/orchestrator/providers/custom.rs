// orchestrator/providers/custom.rs — user-hosted backend with task-named bodies

use crate::config::ProviderConfig;
use crate::transport::{HeaderPlan, HttpRequest};
use crate::types::AssistError;
use reqwest::Url;
use serde_json::{json, Value};
use std::time::Duration;

/// Body contract spoken to a custom backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    Current,
    /// Older deployments: `grammar_rephrase` / `translation` tasks
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomTask<'a> {
    Grammar { text: &'a str },
    Translate { text: &'a str, target_language: &'a str },
}

impl CustomTask<'_> {
    pub fn task_name(&self, contract: Contract) -> &'static str {
        match (self, contract) {
            (CustomTask::Grammar { .. }, Contract::Current) => "grammar_check",
            (CustomTask::Grammar { .. }, Contract::Legacy) => "grammar_rephrase",
            (CustomTask::Translate { .. }, Contract::Current) => "translate",
            (CustomTask::Translate { .. }, Contract::Legacy) => "translation",
        }
    }

    pub fn body(&self, contract: Contract, model: &str) -> Value {
        let mut body = match (self, contract) {
            (CustomTask::Grammar { text }, Contract::Current) => json!({
                "text": text,
                "styles": ["clean_up", "better_flow", "concise"],
            }),
            (CustomTask::Grammar { text }, Contract::Legacy) => json!({ "input": text }),
            (
                CustomTask::Translate {
                    text,
                    target_language,
                },
                Contract::Current,
            ) => json!({
                "text": text,
                "target_language": target_language,
            }),
            (
                CustomTask::Translate {
                    text,
                    target_language,
                },
                Contract::Legacy,
            ) => json!({
                "input": text,
                "target_lang": target_language,
            }),
        };

        if let Value::Object(map) = &mut body {
            map.insert("task".to_string(), Value::from(self.task_name(contract)));
            if !model.is_empty() {
                map.insert("model".to_string(), Value::from(model));
            }
        }
        body
    }
}

/// Base URL of a custom backend, which must be absolute http(s)
pub fn parse_base_url(config: &ProviderConfig) -> Result<Url, AssistError> {
    let raw = config.trimmed_base_url();
    if raw.is_empty() {
        return Err(AssistError::InvalidConfig(
            "Custom provider base URL is missing".to_string(),
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| AssistError::InvalidConfig(format!("Invalid base URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AssistError::InvalidConfig(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

pub fn build_request(
    config: &ProviderConfig,
    task: &CustomTask<'_>,
    contract: Contract,
    timeout: Duration,
) -> Result<HttpRequest, AssistError> {
    let url = parse_base_url(config)?;

    let headers = HeaderPlan {
        provider: Vec::new(),
        custom_json: &config.headers_json,
        credential: &config.api_key,
        bearer: true,
    }
    .build();

    Ok(HttpRequest::post(
        url.to_string(),
        headers,
        task.body(contract, config.trimmed_model()),
    )
    .with_timeout(Some(timeout)))
}
