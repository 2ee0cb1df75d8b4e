// src/types.rs
// Result types and the error enum shared by every provider workflow

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Three alternative rewrites of the captured text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarCheckResult {
    pub source_text: String,
    /// Minimal correction of spelling and grammar
    pub clean_up: String,
    /// Reworded for a smoother read
    pub better_flow: String,
    /// Shortest faithful version
    pub concise: String,
    pub notes: String,
    /// True when the custom backend only answered the legacy contract
    pub used_legacy_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub source_text: String,
    pub translated_text: String,
    /// Language reported by the provider, if any
    pub detected_source_language: Option<String>,
    pub target_language: String,
    pub notes: String,
    pub used_legacy_fallback: bool,
}

/// Errors surfaced to the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid response from provider")]
    InvalidResponse,

    #[error("HTTP {code}: {}", .message.as_deref().unwrap_or("request failed"))]
    HttpError { code: u16, message: Option<String> },

    #[error("Request timeout")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(String),
}

impl AssistError {
    pub fn http(code: u16, message: Option<String>) -> Self {
        AssistError::HttpError { code, message }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            AssistError::HttpError { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AssistError::Cancelled)
    }

    /// 401/403, which the UI maps to a "check your API key" hint
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }
}
