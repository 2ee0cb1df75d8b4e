// src/transport/headers.rs
// Header assembly: provider headers > user headers > synthesized bearer

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Ordered header list with case-insensitive names. Later inserts replace
/// earlier ones with the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a provider workflow asks the transport to put on the wire
#[derive(Debug, Clone, Default)]
pub struct HeaderPlan<'a> {
    /// Vendor headers such as `x-goog-api-key`; these always win
    pub provider: Vec<(String, String)>,
    /// Raw JSON object typed by the user in settings
    pub custom_json: &'a str,
    /// Stored credential used for bearer synthesis
    pub credential: &'a str,
    pub bearer: bool,
}

impl HeaderPlan<'_> {
    pub fn build(&self) -> HeaderSet {
        let mut headers = HeaderSet::new();
        headers.insert(CONTENT_TYPE, JSON_CONTENT_TYPE);

        for (name, value) in parse_custom_headers(self.custom_json) {
            headers.insert(name, value);
        }
        for (name, value) in &self.provider {
            headers.insert(name.clone(), value.clone());
        }

        if self.bearer && !headers.contains(AUTHORIZATION) {
            if let Some(value) = authorization_value(self.credential) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }
}

/// Parses a user-authored JSON header map. Anything other than a JSON object
/// yields no headers; scalar values are stringified, nested values skipped.
pub fn parse_custom_headers(raw: &str) -> Vec<(String, String)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let map = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("Custom headers are not a JSON object, ignoring");
            return Vec::new();
        }
    };

    map.into_iter()
        .filter_map(|(name, value)| {
            let name = name.trim().to_string();
            if name.is_empty() {
                return None;
            }
            let value = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((name, value))
        })
        .collect()
}

/// Normalizes a stored credential into an `Authorization` value.
///
/// `Authorization: "Bearer abc"`, `"abc"` and `Bearer abc` all become
/// `Bearer abc`. A credential carrying another scheme (`Basic xyz`) is kept
/// as typed.
pub fn authorization_value(credential: &str) -> Option<String> {
    static LABEL_RE: OnceLock<Regex> = OnceLock::new();
    static BEARER_RE: OnceLock<Regex> = OnceLock::new();
    static SCHEME_RE: OnceLock<Regex> = OnceLock::new();

    let label = LABEL_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*authorization\s*:\s*").expect("valid authorization label regex")
    });
    let bearer = BEARER_RE
        .get_or_init(|| Regex::new(r"(?i)^bearer\s+").expect("valid bearer prefix regex"));
    let scheme = SCHEME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*\s+\S+$").expect("valid auth scheme regex")
    });

    let without_label = label.replace(credential.trim(), "");
    let unquoted = strip_quotes(without_label.trim());

    if bearer.is_match(unquoted) {
        let token = strip_quotes(bearer.replace(unquoted, "").trim()).to_string();
        return (!token.is_empty()).then(|| format!("Bearer {}", token));
    }

    if unquoted.is_empty() || unquoted.eq_ignore_ascii_case("bearer") {
        return None;
    }
    if scheme.is_match(unquoted) {
        return Some(unquoted.to_string());
    }

    Some(format!("Bearer {}", unquoted))
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].trim();
        }
    }
    value
}
