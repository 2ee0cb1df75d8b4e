// orchestrator/providers/glm.rs — Zhipu GLM chat completions

use super::{require_api_key, to_body, DirectProvider};
use crate::config::{Endpoints, ProviderConfig};
use crate::normalizer::ResponseShape;
use crate::orchestrator::prompts::Prompt;
use crate::transport::{HeaderPlan, HttpRequest};
use crate::types::AssistError;
use serde::Serialize;
use std::time::Duration;

const FALLBACK_MODELS: &[&str] = &["glm-4-flash-250414", "glm-4.5-flash", "glm-5-air"];
const TEMPERATURE: f64 = 0.2;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

pub struct GlmProvider;

impl DirectProvider for GlmProvider {
    fn name(&self) -> &str {
        "glm"
    }

    fn fallback_models(&self) -> &'static [&'static str] {
        FALLBACK_MODELS
    }

    fn response_shape(&self) -> ResponseShape {
        ResponseShape::ChatCompletion
    }

    fn build_request(
        &self,
        endpoints: &Endpoints,
        config: &ProviderConfig,
        model: &str,
        prompt: &Prompt,
        timeout: Duration,
    ) -> Result<HttpRequest, AssistError> {
        let api_key = require_api_key("GLM", config)?;

        let request = ChatRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let headers = HeaderPlan {
            provider: Vec::new(),
            custom_json: &config.headers_json,
            credential: api_key,
            bearer: true,
        }
        .build();

        Ok(
            HttpRequest::post(endpoints.glm_chat_url.clone(), headers, to_body(&request)?)
                .with_timeout(Some(timeout)),
        )
    }
}
