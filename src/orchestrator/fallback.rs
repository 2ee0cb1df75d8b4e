// orchestrator/fallback.rs — model chains and the legacy-contract retry

use crate::types::AssistError;
use std::future::Future;

/// A 400/404 message naming one of these is about the model id. Bare
/// "not found" is not enough: proxies send it for unknown routes.
const MODEL_TERMS: &[&str] = &["model", "模型"];

const LEGACY_TRIGGER_STATUSES: [u16; 3] = [400, 404, 422];

/// Configured model first, then the vendor fallbacks, without duplicates
pub fn candidate_models(configured: &str, fallbacks: &[&str]) -> Result<Vec<String>, AssistError> {
    let configured = configured.trim();
    if configured.is_empty() {
        return Err(AssistError::InvalidConfig("Model is not configured".to_string()));
    }

    let mut models = vec![configured.to_string()];
    for fallback in fallbacks {
        if !models.iter().any(|m| m == fallback) {
            models.push(fallback.to_string());
        }
    }
    Ok(models)
}

pub fn should_fallback_model(error: &AssistError) -> bool {
    match error {
        AssistError::HttpError {
            code: 400 | 404,
            message,
        } => match message.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(message) => {
                let lowered = message.to_lowercase();
                MODEL_TERMS.iter().any(|term| lowered.contains(term))
            }
        },
        _ => false,
    }
}

pub fn should_use_legacy(error: &AssistError) -> bool {
    matches!(error, AssistError::HttpError { code, .. } if LEGACY_TRIGGER_STATUSES.contains(code))
}

/// Tries each model in order. Advances only on a model rejection; any
/// other error ends the chain. Exhaustion surfaces the last rejection.
pub async fn run_model_chain<T, F, Fut>(models: &[String], mut attempt: F) -> Result<T, AssistError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, AssistError>>,
{
    let mut last_error: Option<AssistError> = None;

    for (index, model) in models.iter().enumerate() {
        tracing::info!("Trying model '{}' ({}/{})", model, index + 1, models.len());

        match attempt(model.clone()).await {
            Ok(value) => {
                if index > 0 {
                    tracing::info!("Model '{}' succeeded after fallback", model);
                }
                return Ok(value);
            }
            Err(e) if should_fallback_model(&e) => {
                tracing::warn!("Model '{}' rejected: {}", model, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::error!("All {} candidate models were rejected", models.len());
    Err(last_error.unwrap_or(AssistError::InvalidResponse))
}

/// Runs `primary`; on HTTP 400/404/422 runs `legacy` exactly once. The flag
/// in the result tells whether the legacy contract answered.
pub async fn with_legacy_fallback<T, P, PFut, L, LFut>(
    primary: P,
    legacy: L,
) -> Result<(T, bool), AssistError>
where
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<T, AssistError>>,
    L: FnOnce() -> LFut,
    LFut: Future<Output = Result<T, AssistError>>,
{
    match primary().await {
        Ok(value) => Ok((value, false)),
        Err(e) if should_use_legacy(&e) => {
            tracing::warn!("Primary contract failed ({}), retrying with legacy contract", e);
            legacy().await.map(|value| (value, true))
        }
        Err(e) => Err(e),
    }
}
