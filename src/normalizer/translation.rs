// src/normalizer/translation.rs
// Translation payload decoding

use super::search::{self, first_string, get_ci, notes_of};
use super::{try_extract, Payload, ResponseShape};
use serde::Deserialize;
use serde_json::{Map, Value};

const TRANSLATED_KEYS: &[&str] = &[
    "translation",
    "translated_text",
    "translatedText",
    "output",
    "result",
];
const SOURCE_LANGUAGE_KEYS: &[&str] = &[
    "detected_source_language",
    "detectedSourceLanguage",
    "source_language",
    "sourceLanguage",
    "from",
];
const NESTED_KEYS: &[&str] = &["data", "result", "output"];

/// Preferred contract `{translation, detected_source_language, notes}`
#[derive(Debug, Deserialize)]
struct TranslationContract {
    #[serde(default, alias = "translated_text", alias = "translatedText")]
    translation: Option<String>,
    #[serde(default, alias = "detectedSourceLanguage", alias = "source_language")]
    detected_source_language: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPayload {
    /// Never empty
    pub translated_text: String,
    pub source_language: Option<String>,
    pub notes: String,
}

/// Reads translated text and metadata from one object, descending into
/// `data`/`result`/`output` sub-objects when the text is not at this level
pub fn decode_translation_map(map: &Map<String, Value>) -> Option<TranslationPayload> {
    let source_language = first_string(map, SOURCE_LANGUAGE_KEYS);
    let notes = notes_of(map);

    if let Some(translated_text) = first_string(map, TRANSLATED_KEYS) {
        return Some(TranslationPayload {
            translated_text,
            source_language,
            notes,
        });
    }

    let nested = NESTED_KEYS
        .iter()
        .filter_map(|key| get_ci(map, key).and_then(Value::as_object))
        .find_map(decode_translation_map)?;

    Some(TranslationPayload {
        translated_text: nested.translated_text,
        source_language: nested.source_language.or(source_language),
        notes: if nested.notes.is_empty() { notes } else { nested.notes },
    })
}

fn decode_strict(body: &[u8]) -> Option<TranslationPayload> {
    let contract = serde_json::from_slice::<TranslationContract>(body).ok()?;
    let translated_text = contract
        .translation
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())?;

    Some(TranslationPayload {
        translated_text,
        source_language: contract
            .detected_source_language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        notes: contract.notes.unwrap_or_default().trim().to_string(),
    })
}

/// Strict contract first, then custom aliases, then the untyped tree walk
pub fn normalize_translation(shape: ResponseShape, body: &[u8]) -> Option<TranslationPayload> {
    if let Some(payload) = decode_strict(body) {
        return Some(payload);
    }

    let tree = serde_json::from_slice::<Value>(body).ok()?;

    if shape == ResponseShape::Custom {
        if let Some(payload) = tree.as_object().and_then(decode_translation_map) {
            return Some(payload);
        }
    }

    match try_extract(shape, &tree, search::TRANSLATION_KEYS, decode_translation_map)? {
        Payload::Decoded(payload) => Some(payload),
        Payload::Text(text) => (!text.is_empty()).then(|| TranslationPayload {
            translated_text: text,
            source_language: None,
            notes: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_gemini_fenced_translation() {
        let envelope = json!({"candidates":[{"content":{"parts":[
            {"text":"```json\n{\"translation\":\"你好\"}\n```"}
        ]}}]});
        let payload = normalize_translation(ResponseShape::Gemini, &body(envelope)).unwrap();
        assert_eq!(payload.translated_text, "你好");
        assert_eq!(payload.source_language, None);
    }

    #[test]
    fn test_strict_contract() {
        let payload = normalize_translation(
            ResponseShape::ChatCompletion,
            &body(json!({"translation":"Hola","detected_source_language":"en","notes":"informal"})),
        )
        .unwrap();
        assert_eq!(payload.translated_text, "Hola");
        assert_eq!(payload.source_language.as_deref(), Some("en"));
        assert_eq!(payload.notes, "informal");
    }

    #[test]
    fn test_custom_aliases() {
        let payload = normalize_translation(
            ResponseShape::Custom,
            &body(json!({"output":"Bonjour","from":"en"})),
        )
        .unwrap();
        assert_eq!(payload.translated_text, "Bonjour");
        assert_eq!(payload.source_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_custom_nested_result() {
        let raw = json!({
            "code": 0,
            "data": {"result": {"translatedText": "Hallo", "sourceLanguage": "en"}},
            "notes": "top"
        });
        let payload = normalize_translation(ResponseShape::Custom, &body(raw)).unwrap();
        assert_eq!(payload.translated_text, "Hallo");
        assert_eq!(payload.source_language.as_deref(), Some("en"));
        assert_eq!(payload.notes, "top");
    }

    #[test]
    fn test_glm_message_json() {
        let envelope = json!({"choices":[{"message":{"content":
            "{\"translation\":\"Ciao\",\"detected_source_language\":\"en\"}"}}]});
        let payload =
            normalize_translation(ResponseShape::ChatCompletion, &body(envelope)).unwrap();
        assert_eq!(payload.translated_text, "Ciao");
        assert_eq!(payload.source_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_empty_translation_rejected() {
        let blank = body(json!({"translation":"  "}));
        assert!(normalize_translation(ResponseShape::Custom, &blank).is_none());
        let no_candidates = body(json!({"candidates":[]}));
        assert!(normalize_translation(ResponseShape::Gemini, &no_candidates).is_none());
    }
}
