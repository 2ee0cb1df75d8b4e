// orchestrator/providers/gemini.rs — Google Gemini generateContent

use super::{require_api_key, to_body, DirectProvider};
use crate::config::{Endpoints, ProviderConfig};
use crate::normalizer::ResponseShape;
use crate::orchestrator::prompts::Prompt;
use crate::transport::{HeaderPlan, HttpRequest};
use crate::types::AssistError;
use serde::Serialize;
use std::time::Duration;

const FALLBACK_MODELS: &[&str] = &["gemini-3-flash-preview", "gemini-2.5-flash"];
const TEMPERATURE: f64 = 0.2;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

pub struct GeminiProvider;

impl GeminiProvider {
    pub fn endpoint(base_url: &str, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            urlencoding::encode(model)
        )
    }
}

impl DirectProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn fallback_models(&self) -> &'static [&'static str] {
        FALLBACK_MODELS
    }

    fn response_shape(&self) -> ResponseShape {
        ResponseShape::Gemini
    }

    fn build_request(
        &self,
        endpoints: &Endpoints,
        config: &ProviderConfig,
        model: &str,
        prompt: &Prompt,
        timeout: Duration,
    ) -> Result<HttpRequest, AssistError> {
        let api_key = require_api_key("Gemini", config)?;

        let request = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.combined(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: "application/json",
            },
        };

        // Key travels in its own header; no bearer auth
        let headers = HeaderPlan {
            provider: vec![(API_KEY_HEADER.to_string(), api_key.to_string())],
            custom_json: &config.headers_json,
            credential: api_key,
            bearer: false,
        }
        .build();

        Ok(HttpRequest::post(
            Self::endpoint(&endpoints.gemini_base_url, model),
            headers,
            to_body(&request)?,
        )
        .with_timeout(Some(timeout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_model() {
        assert_eq!(
            GeminiProvider::endpoint(
                "https://generativelanguage.googleapis.com/",
                "gemini-2.5-flash",
            ),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            GeminiProvider::endpoint("http://localhost", "tuned/my model"),
            "http://localhost/v1beta/models/tuned%2Fmy%20model:generateContent"
        );
    }

    #[test]
    fn test_gemini_request_shape() {
        let config = ProviderConfig {
            api_key: " AIza-key ".to_string(),
            headers_json: r#"{"Authorization":"Bearer stray"}"#.to_string(),
            ..Default::default()
        };
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let request = GeminiProvider
            .build_request(
                &Endpoints::default(),
                &config,
                "gemini-2.5-flash",
                &prompt,
                Duration::from_secs(20),
            )
            .unwrap();

        assert_eq!(request.headers.get("x-goog-api-key"), Some("AIza-key"));
        // user headers pass through, but none is synthesized
        assert_eq!(request.headers.get("authorization"), Some("Bearer stray"));
        assert_eq!(request.body["contents"][0]["role"], "user");
        assert_eq!(request.body["contents"][0]["parts"][0]["text"], "sys\n\nusr");
        assert_eq!(
            request.body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }
}
