// orchestrator/providers/mod.rs — request builders per provider preset

pub mod custom;
pub mod gemini;
pub mod glm;

use super::prompts::Prompt;
use crate::config::{Endpoints, ProviderConfig};
use crate::normalizer::ResponseShape;
use crate::transport::HttpRequest;
use crate::types::AssistError;
use std::time::Duration;

/// A vendor API called directly with a model id and a credential
pub trait DirectProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Tried in order after the configured model is rejected
    fn fallback_models(&self) -> &'static [&'static str];

    fn response_shape(&self) -> ResponseShape;

    fn build_request(
        &self,
        endpoints: &Endpoints,
        config: &ProviderConfig,
        model: &str,
        prompt: &Prompt,
        timeout: Duration,
    ) -> Result<HttpRequest, AssistError>;
}

pub(crate) fn require_api_key<'a>(
    provider: &str,
    config: &'a ProviderConfig,
) -> Result<&'a str, AssistError> {
    let key = config.api_key.trim();
    if key.is_empty() {
        return Err(AssistError::InvalidConfig(format!(
            "{} API key is missing",
            provider
        )));
    }
    Ok(key)
}

pub(crate) fn to_body<T: serde::Serialize>(request: &T) -> Result<serde_json::Value, AssistError> {
    serde_json::to_value(request)
        .map_err(|e| AssistError::InvalidConfig(format!("Unserializable request: {}", e)))
}
