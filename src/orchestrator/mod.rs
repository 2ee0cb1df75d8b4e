// orchestrator/mod.rs — grammar, translation and speech call chains

pub mod fallback;
pub mod prompts;
pub mod providers;
pub mod retry;

use self::fallback::{candidate_models, run_model_chain, with_legacy_fallback};
use self::prompts::Prompt;
use self::providers::custom::{self, Contract, CustomTask};
use self::providers::gemini::GeminiProvider;
use self::providers::glm::GlmProvider;
use self::providers::DirectProvider;
use crate::config::{ClientSettings, ProviderConfig, ProviderPreset, SpeechProviderPreset};
use crate::normalizer::{self, ResponseShape};
use crate::speech;
use crate::transport::{self, HttpRequest, HttpResponse, HttpTransport, Transport};
use crate::types::{AssistError, GrammarCheckResult, TranslationResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point for the UI action handlers. Holds no per-call state, so one
/// client can serve concurrent actions; each call gets its own config.
pub struct AssistClient {
    transport: Arc<dyn Transport>,
    settings: ClientSettings,
}

impl AssistClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()), settings)
    }

    pub fn from_env() -> Self {
        Self::new(ClientSettings::from_env())
    }

    pub fn with_transport(transport: Arc<dyn Transport>, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Three rewrites of `text`
    pub async fn grammar_check(
        &self,
        text: &str,
        preset: ProviderPreset,
        config: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<GrammarCheckResult, AssistError> {
        let source = require_text(text)?;
        tracing::info!(
            "Grammar check via {}: {} chars",
            preset,
            source.chars().count()
        );

        let outcome = match direct_provider(preset) {
            Some(provider) => {
                let prompt = prompts::grammar(source);
                self.run_direct(provider, config, &prompt, cancel, normalizer::normalize_grammar)
                    .await
                    .map(|rewrite| (rewrite, false))
            }
            None => {
                let task = CustomTask::Grammar { text: source };
                let decode = normalizer::normalize_grammar;
                with_legacy_fallback(
                    || self.run_custom(&task, Contract::Current, config, cancel, decode),
                    || self.run_custom(&task, Contract::Legacy, config, cancel, decode),
                )
                .await
            }
        };

        let (rewrite, used_legacy_fallback) = report("Grammar check", outcome)?;
        Ok(GrammarCheckResult {
            source_text: source.to_string(),
            clean_up: rewrite.clean_up,
            better_flow: rewrite.better_flow,
            concise: rewrite.concise,
            notes: rewrite.notes,
            used_legacy_fallback,
        })
    }

    /// Translation of `text` into `target_language` (any language code)
    pub async fn translate(
        &self,
        text: &str,
        preset: ProviderPreset,
        config: &ProviderConfig,
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, AssistError> {
        let source = require_text(text)?;
        let target = target_language.trim();
        if target.is_empty() {
            return Err(AssistError::InvalidConfig(
                "Target language is empty".to_string(),
            ));
        }
        tracing::info!(
            "Translate via {} to '{}': {} chars",
            preset,
            target,
            source.chars().count()
        );

        let outcome = match direct_provider(preset) {
            Some(provider) => {
                let prompt = prompts::translation(source, target);
                self.run_direct(
                    provider,
                    config,
                    &prompt,
                    cancel,
                    normalizer::normalize_translation,
                )
                .await
                .map(|payload| (payload, false))
            }
            None => {
                let task = CustomTask::Translate {
                    text: source,
                    target_language: target,
                };
                let decode = normalizer::normalize_translation;
                with_legacy_fallback(
                    || self.run_custom(&task, Contract::Current, config, cancel, decode),
                    || self.run_custom(&task, Contract::Legacy, config, cancel, decode),
                )
                .await
            }
        };

        let (payload, used_legacy_fallback) = report("Translation", outcome)?;
        Ok(TranslationResult {
            source_text: source.to_string(),
            translated_text: payload.translated_text,
            detected_source_language: payload.source_language,
            target_language: target.to_string(),
            notes: payload.notes,
            used_legacy_fallback,
        })
    }

    /// Audio bytes (mp3 for the Doubao presets). Single attempt: no retry,
    /// no model fallback.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        preset: SpeechProviderPreset,
        config: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AssistError> {
        let source = require_text(text)?;
        let route = speech::resolve_route(preset, config, &self.settings.endpoints)?;
        let request = speech::build_request(&route, source, config, self.settings.speech_timeout)?;

        tracing::info!(
            "Speech synthesis via {:?}: {} chars",
            preset,
            source.chars().count()
        );

        let outcome = match self.send_once(request, cancel).await {
            Ok(response) => speech::decode_audio(&response.body, response.content_type.as_deref()),
            Err(e) => Err(e),
        };

        report("Speech synthesis", outcome)
    }

    async fn run_direct<R, D>(
        &self,
        provider: &dyn DirectProvider,
        config: &ProviderConfig,
        prompt: &Prompt,
        cancel: &CancellationToken,
        decode: D,
    ) -> Result<R, AssistError>
    where
        D: Fn(ResponseShape, &[u8]) -> Option<R>,
    {
        let models = candidate_models(config.trimmed_model(), provider.fallback_models())?;
        providers::require_api_key(provider.name(), config)?;

        let decode = &decode;
        run_model_chain(&models, move |model| async move {
            let request = provider.build_request(
                &self.settings.endpoints,
                config,
                &model,
                prompt,
                self.settings.request_timeout,
            )?;
            let response = self.execute(request, cancel).await?;

            decode(provider.response_shape(), &response.body).ok_or_else(|| {
                tracing::warn!(
                    "{} model '{}' returned an unusable payload ({} bytes)",
                    provider.name(),
                    model,
                    response.body.len()
                );
                AssistError::InvalidResponse
            })
        })
        .await
    }

    async fn run_custom<R, D>(
        &self,
        task: &CustomTask<'_>,
        contract: Contract,
        config: &ProviderConfig,
        cancel: &CancellationToken,
        decode: D,
    ) -> Result<R, AssistError>
    where
        D: Fn(ResponseShape, &[u8]) -> Option<R>,
    {
        let request = custom::build_request(config, task, contract, self.settings.request_timeout)?;
        tracing::info!("Custom backend task '{}'", task.task_name(contract));

        let response = self.execute(request, cancel).await?;
        decode(ResponseShape::Custom, &response.body).ok_or_else(|| {
            tracing::warn!(
                "Custom backend returned an unusable payload ({} bytes)",
                response.body.len()
            );
            AssistError::InvalidResponse
        })
    }

    /// One logical request: `send_once` under the retry policy
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, AssistError> {
        self.settings
            .retry
            .run(cancel, || self.send_once(request.clone(), cancel))
            .await
    }

    /// One physical attempt, raced against cancellation
    async fn send_once(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, AssistError> {
        if cancel.is_cancelled() {
            return Err(AssistError::Cancelled);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AssistError::Cancelled),
            result = self.transport.send(request) => result?,
        };

        transport::classify(response)
    }
}

/// Vendor API behind a direct preset; `None` for the custom backend
fn direct_provider(preset: ProviderPreset) -> Option<&'static dyn DirectProvider> {
    match preset {
        ProviderPreset::GlmDirect => Some(&GlmProvider),
        ProviderPreset::GeminiDirect => Some(&GeminiProvider),
        ProviderPreset::Custom => None,
    }
}

fn require_text(text: &str) -> Result<&str, AssistError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AssistError::InvalidConfig("Text is empty".to_string()));
    }
    Ok(trimmed)
}

/// Logs the final outcome; cancellation is not a failure
fn report<T>(action: &str, outcome: Result<T, AssistError>) -> Result<T, AssistError> {
    match &outcome {
        Ok(_) => tracing::info!("{} succeeded", action),
        Err(AssistError::Cancelled) => tracing::debug!("{} cancelled", action),
        Err(e) => tracing::error!("{} failed: {}", action, e),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::orchestrator::retry::RetryPolicy;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned outcomes and records every request it receives
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<HttpResponse, AssistError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<HttpResponse, AssistError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AssistError> {
            self.seen.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AssistError::Network("script exhausted".to_string())))
        }
    }

    /// Never answers
    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, AssistError> {
            std::future::pending().await
        }
    }

    fn json_response(status: u16, body: Value) -> Result<HttpResponse, AssistError> {
        Ok(HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: serde_json::to_vec(&body).unwrap(),
        })
    }

    fn glm_reply(content: &str) -> Result<HttpResponse, AssistError> {
        json_response(200, json!({"choices":[{"message":{"role":"assistant","content":content}}]}))
    }

    fn client(transport: Arc<dyn Transport>) -> AssistClient {
        AssistClient::with_transport(
            transport,
            ClientSettings::default().with_retry(RetryPolicy::immediate()),
        )
    }

    fn direct_config(model: &str) -> ProviderConfig {
        ProviderConfig {
            model: model.to_string(),
            api_key: "secret".to_string(),
            ..Default::default()
        }
    }

    fn custom_config() -> ProviderConfig {
        ProviderConfig {
            base_url: "https://assist.example.com/v1/run".to_string(),
            api_key: "token".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_glm_model_fallback_on_model_404() {
        let transport = ScriptedTransport::new(vec![
            json_response(404, json!({"error":{"code":"1211","message":"Model not found"}})),
            glm_reply(
                r#"{"clean_up":"I have a pen.","better_flow":"I've got a pen.","concise":"Pen."}"#,
            ),
        ]);
        let result = client(transport.clone())
            .grammar_check(
                "i has a pen",
                ProviderPreset::GlmDirect,
                &direct_config("glm-x"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.source_text, "i has a pen");
        assert_eq!(result.clean_up, "I have a pen.");
        assert!(!result.used_legacy_fallback);

        let models: Vec<Value> = transport
            .requests()
            .iter()
            .map(|r| r.body["model"].clone())
            .collect();
        assert_eq!(models, vec![json!("glm-x"), json!("glm-4-flash-250414")]);
    }

    #[tokio::test]
    async fn test_glm_unrelated_404_fails_immediately() {
        let transport = ScriptedTransport::new(vec![json_response(
            404,
            json!({"message":"route /v4/chat does not match"}),
        )]);
        let result = client(transport.clone())
            .grammar_check(
                "text",
                ProviderPreset::GlmDirect,
                &direct_config("glm-x"),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            result,
            Err(AssistError::http(404, Some("route /v4/chat does not match".to_string())))
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_plain_not_found_page_fails_immediately() {
        let not_found = || {
            Ok(HttpResponse {
                status: 404,
                content_type: Some("text/plain".to_string()),
                body: b"404 page not found".to_vec(),
            })
        };
        let transport = ScriptedTransport::new(vec![not_found(), not_found(), not_found()]);
        let result = client(transport.clone())
            .translate(
                "hello",
                ProviderPreset::GeminiDirect,
                &direct_config("gemini-x"),
                "fr",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            result,
            Err(AssistError::http(404, Some("404 page not found".to_string())))
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_gemini_chain_exhaustion_surfaces_last_error() {
        let transport = ScriptedTransport::new(vec![
            json_response(404, json!({"error":{"message":"models/gemini-old is not found"}})),
            json_response(
                400,
                json!({"error":{"message":"model gemini-3-flash-preview unsupported"}}),
            ),
            json_response(404, json!({"error":{"message":"model gemini-2.5-flash not found"}})),
        ]);
        let result = client(transport.clone())
            .translate(
                "hi",
                ProviderPreset::GeminiDirect,
                &direct_config("gemini-old"),
                "fr",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            result,
            Err(AssistError::http(404, Some("model gemini-2.5-flash not found".to_string())))
        );
        let urls: Vec<String> = transport.requests().iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls.len(), 3);
        assert!(urls[0].ends_with("/v1beta/models/gemini-old:generateContent"));
        assert!(urls[2].ends_with("/v1beta/models/gemini-2.5-flash:generateContent"));
        assert_eq!(
            transport.requests()[0].headers.get("x-goog-api-key"),
            Some("secret")
        );
    }

    #[tokio::test]
    async fn test_gemini_fenced_translation() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            json!({"candidates":[{"content":{"parts":[{"text":"```json\n{\"translation\":\"你好\"}\n```"}]}}]}),
        )]);
        let result = client(transport)
            .translate(
                "hello",
                ProviderPreset::GeminiDirect,
                &direct_config("gemini-2.5-flash"),
                "zh-Hans",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.translated_text, "你好");
        assert_eq!(result.target_language, "zh-Hans");
        assert_eq!(result.detected_source_language, None);
    }

    #[tokio::test]
    async fn test_custom_422_uses_legacy_contract_once() {
        let transport = ScriptedTransport::new(vec![
            json_response(422, json!({"detail":"unknown task"})),
            json_response(200, json!({"corrected":"Fixed text.","rephrased":"Better text."})),
        ]);
        let result = client(transport.clone())
            .grammar_check(
                "fix me",
                ProviderPreset::Custom,
                &custom_config(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(result.used_legacy_fallback);
        assert_eq!(result.clean_up, "Fixed text.");
        assert_eq!(result.better_flow, "Better text.");
        assert_eq!(result.concise, "Fixed text.");

        let tasks: Vec<Value> = transport
            .requests()
            .iter()
            .map(|r| r.body["task"].clone())
            .collect();
        assert_eq!(tasks, vec![json!("grammar_check"), json!("grammar_rephrase")]);
    }

    #[tokio::test]
    async fn test_custom_legacy_failure_propagates() {
        let transport = ScriptedTransport::new(vec![
            json_response(404, json!({})),
            json_response(400, json!({"msg":"bad input"})),
        ]);
        let result = client(transport.clone())
            .translate(
                "x",
                ProviderPreset::Custom,
                &custom_config(),
                "de",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result, Err(AssistError::http(400, Some("bad input".to_string()))));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_401_is_not_retried() {
        let transport =
            ScriptedTransport::new(vec![json_response(401, json!({"message":"bad key"}))]);
        let result = client(transport.clone())
            .translate(
                "x",
                ProviderPreset::Custom,
                &custom_config(),
                "de",
                &CancellationToken::new(),
            )
            .await;

        let err = result.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_503_then_200_takes_two_attempts() {
        let transport = ScriptedTransport::new(vec![
            json_response(503, json!({"message":"busy"})),
            json_response(200, json!({"translation":"Hallo"})),
        ]);
        let result = client(transport.clone())
            .translate(
                "hello",
                ProviderPreset::Custom,
                &custom_config(),
                "de",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.translated_text, "Hallo");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_second_503_is_final() {
        let transport = ScriptedTransport::new(vec![
            json_response(503, json!({"message":"busy"})),
            json_response(503, json!({"message":"still busy"})),
            json_response(200, json!({"translation":"never"})),
        ]);
        let result = client(transport.clone())
            .translate(
                "hello",
                ProviderPreset::Custom,
                &custom_config(),
                "de",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result, Err(AssistError::http(503, Some("still busy".to_string()))));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_payload_stops_chain() {
        let transport = ScriptedTransport::new(vec![json_response(200, json!({"choices":[]}))]);
        let result = client(transport.clone())
            .grammar_check(
                "text",
                ProviderPreset::GlmDirect,
                &direct_config("glm-x"),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result, Err(AssistError::InvalidResponse));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_before_network() {
        let transport = ScriptedTransport::new(Vec::new());
        let client = client(transport.clone());
        let cancel = CancellationToken::new();

        let missing_model = client
            .grammar_check("text", ProviderPreset::GlmDirect, &direct_config("  "), &cancel)
            .await;
        assert!(matches!(missing_model, Err(AssistError::InvalidConfig(_))));

        let missing_key = client
            .grammar_check(
                "text",
                ProviderPreset::GeminiDirect,
                &ProviderConfig { model: "m".into(), ..Default::default() },
                &cancel,
            )
            .await;
        assert!(matches!(missing_key, Err(AssistError::InvalidConfig(_))));

        let empty_text = client
            .translate("   ", ProviderPreset::Custom, &custom_config(), "de", &cancel)
            .await;
        assert!(matches!(empty_text, Err(AssistError::InvalidConfig(_))));

        let empty_target = client
            .translate("x", ProviderPreset::Custom, &custom_config(), " ", &cancel)
            .await;
        assert!(matches!(empty_target, Err(AssistError::InvalidConfig(_))));

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let client = client(Arc::new(HangingTransport));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = client
            .translate("hello", ProviderPreset::GlmDirect, &direct_config("glm-x"), "ja", &cancel)
            .await;
        assert_eq!(result, Err(AssistError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let transport = ScriptedTransport::new(Vec::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client(transport.clone())
            .grammar_check("text", ProviderPreset::Custom, &custom_config(), &cancel)
            .await;
        assert_eq!(result, Err(AssistError::Cancelled));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_speech_binary_audio_single_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse {
            status: 200,
            content_type: Some("audio/mpeg".to_string()),
            body: vec![1, 2, 3],
        })]);
        let config = ProviderConfig {
            model: "doubao-tts".to_string(),
            api_key: "ark-key".to_string(),
            voice: Some("zh_male_1".to_string()),
            ..Default::default()
        };
        let audio = client(transport.clone())
            .synthesize_speech(
                "你好",
                SpeechProviderPreset::DoubaoArk,
                &config,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(audio, vec![1, 2, 3]);
        let requests = transport.requests();
        assert_eq!(requests[0].url, "https://ark.cn-beijing.volces.com/api/v3/audio/speech");
        assert_eq!(requests[0].timeout, None);
    }

    #[tokio::test]
    async fn test_speech_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            json_response(503, json!({"message":"busy"})),
            json_response(200, json!({"audio":"AAEC"})),
        ]);
        let config = ProviderConfig {
            base_url: "http://localhost:9000/tts".to_string(),
            ..Default::default()
        };
        let result = client(transport.clone())
            .synthesize_speech(
                "hi",
                SpeechProviderPreset::Custom,
                &config,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result, Err(AssistError::http(503, Some("busy".to_string()))));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.requests()[0].body["task"], "tts");
    }

    #[tokio::test]
    async fn test_speech_stream_chunks() {
        let body = "{\"data\":\"AAE=\"}\n{\"data\":\"AgM=\"}\n{\"code\":20000000,\"data\":null}\n";
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.as_bytes().to_vec(),
        })]);
        let config = ProviderConfig {
            api_key: "access".to_string(),
            app_id: Some("app".to_string()),
            voice: Some("speaker".to_string()),
            ..Default::default()
        };
        let mut settings = ClientSettings::default().with_retry(RetryPolicy::immediate());
        settings.endpoints = Endpoints {
            openspeech_url: "http://localhost:9001/api/v3/tts/unidirectional".to_string(),
            ..Endpoints::default()
        };
        let audio = AssistClient::with_transport(transport.clone(), settings)
            .synthesize_speech(
                "hi",
                SpeechProviderPreset::DoubaoOpenSpeech,
                &config,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(audio, vec![0, 1, 2, 3]);
        assert_eq!(
            transport.requests()[0].headers.get("X-Api-App-Id"),
            Some("app")
        );
    }
}
