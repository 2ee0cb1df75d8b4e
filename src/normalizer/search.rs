// src/normalizer/search.rs
// Depth-first hunt for the object that carries the payload keys

use serde_json::{Map, Value};

/// Lower-cased keys that mark a grammar payload
pub const GRAMMAR_KEYS: &[&str] = &[
    "clean_up",
    "cleanup",
    "better_flow",
    "betterflow",
    "concise",
    "corrected",
    "rephrased",
];

/// Lower-cased keys that mark a translation payload
pub const TRANSLATION_KEYS: &[&str] = &[
    "translation",
    "translated_text",
    "translatedtext",
    "source_language",
    "sourcelanguage",
    "detected_source_language",
    "detectedsourcelanguage",
];

fn has_any_key(map: &Map<String, Value>, keys: &[&str]) -> bool {
    map.keys()
        .any(|k| keys.iter().any(|candidate| k.eq_ignore_ascii_case(candidate)))
}

/// First object (pre-order, children in document order) that has any of
/// `keys` (compared case-insensitively)
pub fn find_payload<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => {
            if has_any_key(map, keys) {
                return Some(map);
            }
            map.values().find_map(|child| find_payload(child, keys))
        }
        Value::Array(items) => items.iter().find_map(|item| find_payload(item, keys)),
        _ => None,
    }
}

/// Like [`find_payload`], but a keyed object only ends the search when
/// `decode` accepts it; otherwise its children are searched too
pub fn find_decoded<T, F>(value: &Value, keys: &[&str], decode: &F) -> Option<T>
where
    F: Fn(&Map<String, Value>) -> Option<T>,
{
    match value {
        Value::Object(map) => {
            if has_any_key(map, keys) {
                if let Some(found) = decode(map) {
                    return Some(found);
                }
            }
            map.values().find_map(|child| find_decoded(child, keys, decode))
        }
        Value::Array(items) => items.iter().find_map(|item| find_decoded(item, keys, decode)),
        _ => None,
    }
}

pub fn find_grammar_payload(value: &Value) -> Option<&Map<String, Value>> {
    find_payload(value, GRAMMAR_KEYS)
}

pub fn find_translation_payload(value: &Value) -> Option<&Map<String, Value>> {
    find_payload(value, TRANSLATION_KEYS)
}

/// Case-insensitive field lookup, exact match preferred
pub fn get_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// First of `keys` holding a non-empty string, trimmed
pub fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        get_ci(map, key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// `notes` as a string, or an array of strings joined by newlines
pub fn notes_of(map: &Map<String, Value>) -> String {
    match get_ci(map, "notes").or_else(|| get_ci(map, "note")) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
