// src/speech/mod.rs
// Speech synthesis request routing: OpenSpeech, Ark or a generic backend

pub mod decoder;

pub use decoder::decode_audio;

use crate::config::{Endpoints, ProviderConfig, SpeechProviderPreset};
use crate::transport::{HeaderPlan, HttpRequest};
use crate::types::AssistError;
use reqwest::Url;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

const OPENSPEECH_HOST: &str = "openspeech.bytedance.com";
const ARK_HOST_SUFFIXES: &[&str] = &["volces.com", "volcengineapi.com", "bytepluses.com"];
const ARK_SPEECH_PATH: &str = "/api/v3/audio/speech";
const ARK_API_ROOT: &str = "/api/v3";
const DEFAULT_RESOURCE_ID: &str = "seed-tts-1.0";
const AUDIO_FORMAT: &str = "mp3";
const SAMPLE_RATE: u32 = 24000;

/// Request builder picked for a speech call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechRoute {
    OpenSpeech { url: String },
    Ark { url: String },
    Generic { url: String },
}

impl SpeechRoute {
    pub fn url(&self) -> &str {
        match self {
            SpeechRoute::OpenSpeech { url }
            | SpeechRoute::Ark { url }
            | SpeechRoute::Generic { url } => url.as_str(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SpeechRoute::OpenSpeech { .. } => "openspeech",
            SpeechRoute::Ark { .. } => "ark",
            SpeechRoute::Generic { .. } => "generic",
        }
    }
}

#[derive(Serialize)]
struct ArkSpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// Picks the builder for `preset`. `Custom` sniffs the host: OpenSpeech,
/// then an Ark-shaped host, then the generic body.
pub fn resolve_route(
    preset: SpeechProviderPreset,
    config: &ProviderConfig,
    endpoints: &Endpoints,
) -> Result<SpeechRoute, AssistError> {
    let configured = config.trimmed_base_url();

    match preset {
        SpeechProviderPreset::DoubaoOpenSpeech => {
            let url = if configured.is_empty() {
                endpoints.openspeech_url.as_str()
            } else {
                configured
            };
            Ok(SpeechRoute::OpenSpeech {
                url: parse_http_url(url)?.to_string(),
            })
        }
        SpeechProviderPreset::DoubaoArk => {
            let base = if configured.is_empty() {
                endpoints.ark_base_url.as_str()
            } else {
                configured
            };
            Ok(SpeechRoute::Ark {
                url: ark_speech_url(&parse_http_url(base)?),
            })
        }
        SpeechProviderPreset::Custom => {
            if configured.is_empty() {
                return Err(AssistError::InvalidConfig(
                    "Speech base URL is missing".to_string(),
                ));
            }
            let url = parse_http_url(configured)?;
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

            if host.contains(OPENSPEECH_HOST) {
                Ok(SpeechRoute::OpenSpeech {
                    url: url.to_string(),
                })
            } else if is_ark_host(&host) {
                Ok(SpeechRoute::Ark {
                    url: ark_speech_url(&url),
                })
            } else {
                Ok(SpeechRoute::Generic {
                    url: url.to_string(),
                })
            }
        }
    }
}

fn is_ark_host(host: &str) -> bool {
    ARK_HOST_SUFFIXES
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
}

/// Rewrites the path to end in `/api/v3/audio/speech`, keeping any prefix
/// before `/api/v3`
pub fn ark_speech_url(base: &Url) -> String {
    let path = base.path().trim_end_matches('/');
    if path.ends_with(ARK_SPEECH_PATH) {
        let mut url = base.clone();
        url.set_path(path);
        url.set_query(None);
        return url.to_string();
    }

    let prefix = match path.find(ARK_API_ROOT) {
        Some(index) => &path[..index],
        None => path,
    };

    let mut url = base.clone();
    url.set_path(&format!("{}{}", prefix, ARK_SPEECH_PATH));
    url.set_query(None);
    url.to_string()
}

fn parse_http_url(raw: &str) -> Result<Url, AssistError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AssistError::InvalidConfig(format!("Invalid speech URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AssistError::InvalidConfig(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

fn require<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, AssistError> {
    value.ok_or_else(|| AssistError::InvalidConfig(format!("{} is missing", what)))
}

/// Builds the HTTP request for `route`
pub fn build_request(
    route: &SpeechRoute,
    text: &str,
    config: &ProviderConfig,
    timeout: Option<Duration>,
) -> Result<HttpRequest, AssistError> {
    tracing::debug!("Speech route: {} -> {}", route.name(), route.url());

    let request = match route {
        SpeechRoute::OpenSpeech { url } => {
            let app_id = require(config.app_id(), "OpenSpeech app id")?;
            let access_key = config.api_key.trim();
            if access_key.is_empty() {
                return Err(AssistError::InvalidConfig(
                    "OpenSpeech access key is missing".to_string(),
                ));
            }
            let speaker = require(config.voice(), "OpenSpeech speaker")?;
            let resource_id = config.resource_id().unwrap_or(DEFAULT_RESOURCE_ID);

            let headers = HeaderPlan {
                provider: vec![
                    ("X-Api-App-Id".to_string(), app_id.to_string()),
                    ("X-Api-Access-Key".to_string(), access_key.to_string()),
                    ("X-Api-Resource-Id".to_string(), resource_id.to_string()),
                    ("X-Api-Request-Id".to_string(), uuid::Uuid::new_v4().to_string()),
                ],
                custom_json: &config.headers_json,
                credential: access_key,
                bearer: false,
            }
            .build();

            let body = json!({
                "user": { "uid": app_id },
                "req_params": {
                    "text": text,
                    "speaker": speaker,
                    "audio_params": {
                        "format": AUDIO_FORMAT,
                        "sample_rate": SAMPLE_RATE,
                    },
                },
            });

            HttpRequest::post(url.clone(), headers, body)
        }
        SpeechRoute::Ark { url } => {
            let model = config.trimmed_model();
            if model.is_empty() {
                return Err(AssistError::InvalidConfig(
                    "Ark speech model is missing".to_string(),
                ));
            }
            let voice = require(config.voice(), "Ark voice")?;

            let headers = HeaderPlan {
                provider: Vec::new(),
                custom_json: &config.headers_json,
                credential: &config.api_key,
                bearer: true,
            }
            .build();

            let body = serde_json::to_value(ArkSpeechRequest {
                model,
                input: text,
                voice,
                response_format: AUDIO_FORMAT,
            })
            .map_err(|e| AssistError::InvalidConfig(format!("Unserializable request: {}", e)))?;

            HttpRequest::post(url.clone(), headers, body)
        }
        SpeechRoute::Generic { url } => {
            let headers = HeaderPlan {
                provider: Vec::new(),
                custom_json: &config.headers_json,
                credential: &config.api_key,
                bearer: true,
            }
            .build();

            let body = json!({
                "task": "tts",
                "text": text,
                "model": config.trimmed_model(),
                "voice": config.voice(),
            });

            HttpRequest::post(url.clone(), headers, body)
        }
    };

    Ok(request.with_timeout(timeout))
}
