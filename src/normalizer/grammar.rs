// src/normalizer/grammar.rs
// Grammar payload decoding with rewrite backfill

use super::search::{self, first_string, notes_of};
use super::{try_extract, Payload, ResponseShape};
use serde::Deserialize;
use serde_json::{Map, Value};

const CLEAN_UP_KEYS: &[&str] = &["clean_up", "cleanUp", "cleanup", "corrected"];
const BETTER_FLOW_KEYS: &[&str] = &["better_flow", "betterFlow", "rephrased"];
const CONCISE_KEYS: &[&str] = &["concise"];

/// Preferred contract `{clean_up, better_flow, concise, notes}`, legacy
/// `{corrected, rephrased, notes}` accepted too
#[derive(Debug, Deserialize)]
struct GrammarContract {
    #[serde(default, alias = "cleanUp")]
    clean_up: Option<String>,
    #[serde(default, alias = "betterFlow")]
    better_flow: Option<String>,
    #[serde(default)]
    concise: Option<String>,
    #[serde(default)]
    corrected: Option<String>,
    #[serde(default)]
    rephrased: Option<String>,
    #[serde(default)]
    notes: Option<Notes>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Notes {
    Text(String),
    Lines(Vec<String>),
}

/// Normalized rewrites; all three fields are non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarRewrite {
    pub clean_up: String,
    pub better_flow: String,
    pub concise: String,
    pub notes: String,
}

impl GrammarRewrite {
    /// Fills empty rewrites from the first available one, in the order
    /// clean_up, better_flow, concise. `None` when all three are empty.
    pub fn backfilled(
        clean_up: Option<String>,
        better_flow: Option<String>,
        concise: Option<String>,
        notes: String,
    ) -> Option<Self> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (clean_up, better_flow, concise) =
            (clean(clean_up), clean(better_flow), clean(concise));

        let fallback = clean_up
            .clone()
            .or_else(|| better_flow.clone())
            .or_else(|| concise.clone())?;

        Some(Self {
            clean_up: clean_up.unwrap_or_else(|| fallback.clone()),
            better_flow: better_flow.unwrap_or_else(|| fallback.clone()),
            concise: concise.unwrap_or(fallback),
            notes,
        })
    }
}

pub fn decode_grammar_map(map: &Map<String, Value>) -> Option<GrammarRewrite> {
    GrammarRewrite::backfilled(
        first_string(map, CLEAN_UP_KEYS),
        first_string(map, BETTER_FLOW_KEYS),
        first_string(map, CONCISE_KEYS),
        notes_of(map),
    )
}

fn decode_strict(body: &[u8]) -> Option<GrammarRewrite> {
    let contract = serde_json::from_slice::<GrammarContract>(body).ok()?;
    let notes = match contract.notes {
        Some(Notes::Text(text)) => text.trim().to_string(),
        Some(Notes::Lines(lines)) => lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        None => String::new(),
    };

    GrammarRewrite::backfilled(
        contract.clean_up.or(contract.corrected),
        contract.better_flow.or(contract.rephrased),
        contract.concise,
        notes,
    )
}

/// Strict contract first, then the untyped tree walk
pub fn normalize_grammar(shape: ResponseShape, body: &[u8]) -> Option<GrammarRewrite> {
    if let Some(rewrite) = decode_strict(body) {
        return Some(rewrite);
    }

    let tree = serde_json::from_slice::<Value>(body).ok()?;
    match try_extract(shape, &tree, search::GRAMMAR_KEYS, decode_grammar_map)? {
        Payload::Decoded(rewrite) => Some(rewrite),
        Payload::Text(text) => GrammarRewrite::backfilled(Some(text), None, None, String::new()),
    }
}
