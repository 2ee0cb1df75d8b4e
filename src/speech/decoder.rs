// src/speech/decoder.rs
// Recovers audio bytes from raw, JSON-embedded or line-streamed responses

use crate::types::AssistError;
use base64::engine::general_purpose::{
    GeneralPurpose, STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD,
};
use base64::Engine as _;
use serde_json::Value;

const AUDIO_KEYS: &[&str] = &["audio", "data", "output_audio", "audio_base64", "b64_audio"];
const CONTAINER_KEYS: &[&str] = &["data", "result"];
const GENERIC_KEY: &str = "data";
const SSE_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// Audio bytes from a speech response body
pub fn decode_audio(body: &[u8], content_type: Option<&str>) -> Result<Vec<u8>, AssistError> {
    if is_binary_audio(content_type) {
        if body.is_empty() {
            tracing::warn!("Speech response declared audio but body is empty");
            return Err(AssistError::InvalidResponse);
        }
        return Ok(body.to_vec());
    }

    let audio = match serde_json::from_slice::<Value>(body) {
        Ok(value) => audio_from_value(&value),
        Err(_) => audio_from_lines(body),
    };

    if audio.is_empty() {
        tracing::warn!(
            "No audio found in {} byte speech response (content-type {:?})",
            body.len(),
            content_type
        );
        return Err(AssistError::InvalidResponse);
    }

    Ok(audio)
}

fn is_binary_audio(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("audio/") || mime == "application/octet-stream"
}

/// Searches one JSON document for base64 audio. Arrays concatenate the
/// audio of every element in order.
fn audio_from_value(value: &Value) -> Vec<u8> {
    match value {
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::String(encoded) => {
                    decode_base64(encoded, Padding::Required).unwrap_or_default()
                }
                other => audio_from_value(other),
            })
            .collect(),
        Value::Object(map) => {
            for key in AUDIO_KEYS {
                match map.get(*key) {
                    Some(Value::String(encoded)) => {
                        if let Some(bytes) = decode_base64(encoded, Padding::for_key(key)) {
                            return bytes;
                        }
                    }
                    Some(Value::Object(inner)) => {
                        let nested = AUDIO_KEYS.iter().find_map(|k| {
                            inner
                                .get(*k)
                                .and_then(Value::as_str)
                                .and_then(|encoded| decode_base64(encoded, Padding::for_key(k)))
                        });
                        if let Some(bytes) = nested {
                            return bytes;
                        }
                    }
                    _ => {}
                }
            }

            CONTAINER_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .filter(|v| v.is_object() || v.is_array())
                .map(audio_from_value)
                .find(|bytes| !bytes.is_empty())
                .unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

/// Newline-delimited JSON chunks, optionally SSE-framed
fn audio_from_lines(body: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(body);
    let mut audio = Vec::new();

    for line in text.lines() {
        let mut line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(SSE_PREFIX) {
            line = rest.trim();
        }
        if line.is_empty() || line == DONE_MARKER {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(chunk) => audio.extend(audio_from_value(&chunk)),
            Err(_) => tracing::debug!("Skipping non-JSON stream line ({} chars)", line.len()),
        }
    }

    audio
}

static PADDED_ENGINES: [GeneralPurpose; 2] = [STANDARD, URL_SAFE];
static LENIENT_ENGINES: [GeneralPurpose; 4] =
    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD];

/// Whether a field's base64 must be padded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Padding {
    /// Generic fields such as `data` also carry status words ("success")
    /// that unpadded decoding would accept
    Required,
    /// Fields that only ever hold audio
    Optional,
}

impl Padding {
    fn for_key(key: &str) -> Self {
        if key == GENERIC_KEY {
            Padding::Required
        } else {
            Padding::Optional
        }
    }
}

/// Accepts plain base64 or a `<header>,<base64>` data URL, standard or
/// URL-safe alphabet
fn decode_base64(encoded: &str, padding: Padding) -> Option<Vec<u8>> {
    let trimmed = encoded.trim();
    let payload = match trimmed.split_once(',') {
        Some((_, rest)) => rest.trim(),
        None => trimmed,
    };
    if payload.is_empty() {
        return None;
    }

    let engines: &[GeneralPurpose] = match padding {
        Padding::Required => &PADDED_ENGINES,
        Padding::Optional => &LENIENT_ENGINES,
    };

    engines
        .iter()
        .find_map(|engine| engine.decode(payload).ok())
        .filter(|bytes| !bytes.is_empty())
}
