use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::orchestrator::retry::RetryPolicy;
use crate::types::AssistError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_GLM_CHAT_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com";
pub const DEFAULT_OPENSPEECH_URL: &str = "https://openspeech.bytedance.com/api/v3/tts/unidirectional";

const ENV_REQUEST_TIMEOUT: &str = "TEXTLENS_REQUEST_TIMEOUT_SECS";
const ENV_RETRY_ATTEMPTS: &str = "TEXTLENS_RETRY_ATTEMPTS";
const ENV_RETRY_DELAY_MS: &str = "TEXTLENS_RETRY_DELAY_MS";

/// Provider profile for grammar checks and translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPreset {
    GlmDirect,
    GeminiDirect,
    Custom,
}

/// Provider profile for speech synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProviderPreset {
    DoubaoArk,
    DoubaoOpenSpeech,
    Custom,
}

impl ProviderPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPreset::GlmDirect => "glm_direct",
            ProviderPreset::GeminiDirect => "gemini_direct",
            ProviderPreset::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderPreset {
    type Err = AssistError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "glm" | "glm_direct" | "glm-direct" => Ok(ProviderPreset::GlmDirect),
            "gemini" | "gemini_direct" | "gemini-direct" => Ok(ProviderPreset::GeminiDirect),
            "custom" => Ok(ProviderPreset::Custom),
            other => Err(AssistError::InvalidConfig(format!(
                "Unknown provider preset '{}'",
                other
            ))),
        }
    }
}

impl FromStr for SpeechProviderPreset {
    type Err = AssistError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ark" | "doubao_ark" | "doubao-ark" => Ok(SpeechProviderPreset::DoubaoArk),
            "openspeech" | "doubao_open_speech" | "doubao-openspeech" => {
                Ok(SpeechProviderPreset::DoubaoOpenSpeech)
            }
            "custom" => Ok(SpeechProviderPreset::Custom),
            other => Err(AssistError::InvalidConfig(format!(
                "Unknown speech preset '{}'",
                other
            ))),
        }
    }
}

/// Connection parameters handed over by the settings store on every call.
/// Fields that do not apply to the active preset are ignored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    /// User-authored JSON object of extra request headers
    pub headers_json: String,
    pub voice: Option<String>,
    pub app_id: Option<String>,
    pub resource_id: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("headers_json", &self.headers_json)
            .field("voice", &self.voice)
            .field("app_id", &self.app_id)
            .field("resource_id", &self.resource_id)
            .finish()
    }
}

impl ProviderConfig {
    /// Reads `<PREFIX>_BASE_URL`, `<PREFIX>_MODEL`, `<PREFIX>_API_KEY`,
    /// `<PREFIX>_HEADERS`, `<PREFIX>_VOICE`, `<PREFIX>_APP_ID` and
    /// `<PREFIX>_RESOURCE_ID`. Missing variables stay empty.
    pub fn from_env(prefix: &str) -> Self {
        let read = |suffix: &str| env::var(format!("{}_{}", prefix, suffix)).unwrap_or_default();
        let read_opt = |suffix: &str| normalize_optional(Some(read(suffix)));

        Self {
            base_url: read("BASE_URL").trim().to_string(),
            model: read("MODEL").trim().to_string(),
            api_key: read("API_KEY"),
            headers_json: read("HEADERS"),
            voice: read_opt("VOICE"),
            app_id: read_opt("APP_ID"),
            resource_id: read_opt("RESOURCE_ID"),
        }
    }

    pub fn trimmed_model(&self) -> &str {
        self.model.trim()
    }

    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim()
    }

    pub fn voice(&self) -> Option<&str> {
        non_empty(self.voice.as_deref())
    }

    pub fn app_id(&self) -> Option<&str> {
        non_empty(self.app_id.as_deref())
    }

    pub fn resource_id(&self) -> Option<&str> {
        non_empty(self.resource_id.as_deref())
    }
}

/// Fixed provider endpoints, overridable so tests can point at a local server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub glm_chat_url: String,
    pub gemini_base_url: String,
    pub ark_base_url: String,
    pub openspeech_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            glm_chat_url: DEFAULT_GLM_CHAT_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            ark_base_url: DEFAULT_ARK_BASE_URL.to_string(),
            openspeech_url: DEFAULT_OPENSPEECH_URL.to_string(),
        }
    }
}

/// Timing and endpoint knobs of the client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    /// `None` leaves speech calls on the transport default
    pub speech_timeout: Option<Duration>,
    pub endpoints: Endpoints,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            speech_timeout: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientSettings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(secs) = parse_env::<u64>(ENV_REQUEST_TIMEOUT).filter(|s| *s > 0) {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env::<u8>(ENV_RETRY_ATTEMPTS).filter(|a| *a > 0) {
            settings.retry = settings.retry.with_max_attempts(attempts);
        }
        if let Some(delay_ms) = parse_env::<u64>(ENV_RETRY_DELAY_MS) {
            settings.retry = settings.retry.with_delay(Duration::from_millis(delay_ms));
        }

        tracing::debug!(
            "Client settings: timeout={}s, attempts={}, delay={}ms",
            settings.request_timeout.as_secs(),
            settings.retry.max_attempts(),
            settings.retry.delay().as_millis()
        );

        settings
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

pub fn mask_api_key(api_key: &str) -> String {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.len() <= 10 || !trimmed.is_ascii() {
        return "******".to_string();
    }

    let prefix = &trimmed[..6];
    let suffix = &trimmed[trimmed.len().saturating_sub(4)..];
    format!("{}********{}", prefix, suffix)
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
