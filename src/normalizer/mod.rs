// src/normalizer/mod.rs
// Locates the meaningful payload inside each provider's response

pub mod embedded;
pub mod envelope;
pub mod grammar;
pub mod search;
pub mod translation;

pub use embedded::parse_embedded_json;
pub use grammar::{normalize_grammar, GrammarRewrite};
pub use search::{find_grammar_payload, find_translation_payload};
pub use translation::{normalize_translation, TranslationPayload};

use serde_json::{Map, Value};

/// Which envelope the response body is expected to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// OpenAI-style `choices`, as returned by GLM
    ChatCompletion,
    /// `candidates`, as returned by Gemini
    Gemini,
    /// Directly shaped JSON from a user-hosted backend
    Custom,
}

/// What the untyped fallback path recovered
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// A keyed object that `decode` accepted
    Decoded(T),
    /// Message text that is not JSON at all
    Text(String),
}

/// Untyped fallback shared by every provider: a keyed object anywhere in
/// the tree that `decode` accepts, else the envelope's message text mined
/// for embedded JSON, else that text as-is.
pub fn try_extract<T, F>(
    shape: ResponseShape,
    tree: &Value,
    keys: &[&str],
    decode: F,
) -> Option<Payload<T>>
where
    F: Fn(&Map<String, Value>) -> Option<T>,
{
    if let Some(found) = search::find_decoded(tree, keys, &decode) {
        return Some(Payload::Decoded(found));
    }

    let text = envelope::message_text(shape, tree)?;
    match embedded::parse_embedded_json(&text) {
        Some(inner) => search::find_decoded(&inner, keys, &decode).map(Payload::Decoded),
        None => Some(Payload::Text(text.trim().to_string())),
    }
}
