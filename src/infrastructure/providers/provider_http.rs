use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::application::ports::ProviderError;
use crate::domain::{Parameters, SchemaViolation};
use crate::infrastructure::observability::sanitize_for_log;

/// A send error is retryable only when the connection was never made, so
/// the provider cannot have created a job.
pub(super) fn submission_send_error(provider: &str, e: reqwest::Error) -> ProviderError {
    ProviderError::Submission {
        message: format!("{provider} request failed: {e}"),
        retryable: e.is_connect(),
    }
}

pub(super) async fn submission_status_error(provider: &str, response: Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        provider,
        status = %status,
        body = %sanitize_for_log(&body),
        "Provider rejected submission"
    );
    ProviderError::Submission {
        message: format!("{provider} API returned HTTP {status}: {}", sanitize_for_log(&body)),
        retryable: matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
        ),
    }
}

/// Reads a JSON body from a status or cancel call. Every failure here is
/// transient from the poller's point of view.
pub(super) async fn read_json(provider: &str, response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Transport(format!(
            "{provider} API returned HTTP {status}: {}",
            sanitize_for_log(&body)
        )));
    }
    response
        .json()
        .await
        .map_err(|e| ProviderError::Transport(format!("{provider} response unreadable: {e}")))
}

pub(super) fn require_api_key(provider: &str, api_key: &str) -> Result<(), ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::Configuration(format!(
            "{provider} API key is not set"
        )));
    }
    Ok(())
}

pub(super) fn schema_error(violation: SchemaViolation) -> ProviderError {
    ProviderError::Validation {
        fields: violation.fields,
        message: violation.message,
    }
}

/// Moves `alias` to `canonical` when only the alias was given.
pub(super) fn rename_alias(parameters: &mut Parameters, alias: &str, canonical: &str) {
    if parameters.contains_key(canonical) {
        return;
    }
    if let Some(value) = parameters.remove(alias) {
        parameters.insert(canonical.to_string(), value);
    }
}

/// Copies the listed keys that are present from `source` into `target`.
pub(super) fn copy_present(target: &mut Parameters, source: &Parameters, keys: &[&str]) {
    for key in keys {
        if let Some(value) = source.get(*key).filter(|v| !v.is_null()) {
            target.insert((*key).to_string(), value.clone());
        }
    }
}

pub(super) fn number_param(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(super) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
