use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;

use super::api_response::{ApiError, success};
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ModelEntry {
    pub provider: String,
    pub model: String,
}

/// Models grouped by provider.
pub async fn models_handler(State(state): State<AppState>) -> Response {
    success(state.orchestrator.catalog(), "Supported models by provider")
}

pub async fn all_models_handler(State(state): State<AppState>) -> Response {
    let entries: Vec<ModelEntry> = state
        .orchestrator
        .catalog()
        .into_iter()
        .flat_map(|(provider, models)| {
            models.into_iter().map(move |model| ModelEntry {
                provider: provider.clone(),
                model,
            })
        })
        .collect();
    success(entries, "All supported models")
}

pub async fn provider_models_handler(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
) -> Result<Response, ApiError> {
    let mut catalog = state.orchestrator.catalog();
    match catalog.remove(&provider_name) {
        Some(models) => Ok(success(
            BTreeMap::from([(provider_name, models)]),
            "Supported models for provider",
        )),
        None => {
            let available: Vec<String> = catalog.into_keys().collect();
            Err(ApiError::not_found(format!(
                "Provider '{provider_name}' not found. Available providers: {}",
                available.join(", ")
            )))
        }
    }
}
