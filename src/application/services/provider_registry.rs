use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::application::ports::ProviderAdapter;

/// Maps provider names and model identifiers to the adapter serving them.
///
/// Built once at startup from a fixed list of adapters and shared by `Arc`;
/// never mutated afterwards.
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    /// Later adapters with the same provider name replace earlier ones.
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.descriptor().provider_name().to_string(), adapter))
            .collect();
        Self { adapters }
    }

    /// Finds the adapter for `model`. With a provider name the lookup is
    /// scoped to that provider; without one every adapter is searched.
    pub fn resolve(
        &self,
        provider: Option<&str>,
        model: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, RegistryError> {
        match provider {
            Some(name) => {
                let adapter = self
                    .adapters
                    .get(name)
                    .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))?;
                if adapter.descriptor().supports(model) {
                    Ok(Arc::clone(adapter))
                } else {
                    Err(RegistryError::UnknownModel {
                        model: model.to_string(),
                        provider: Some(name.to_string()),
                    })
                }
            }
            None => {
                let mut matches = self
                    .adapters
                    .values()
                    .filter(|adapter| adapter.descriptor().supports(model));
                let first = matches.next().ok_or_else(|| RegistryError::UnknownModel {
                    model: model.to_string(),
                    provider: None,
                })?;
                if matches.next().is_some() {
                    return Err(RegistryError::AmbiguousModel(model.to_string()));
                }
                Ok(Arc::clone(first))
            }
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Supported models grouped by provider, both sorted.
    pub fn catalog(&self) -> BTreeMap<String, Vec<String>> {
        self.adapters
            .iter()
            .map(|(name, adapter)| {
                let models = adapter
                    .descriptor()
                    .supported_models()
                    .map(str::to_string)
                    .collect();
                (name.clone(), models)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("provider '{0}' is not registered")]
    UnknownProvider(String),
    #[error("model '{model}' is not supported{}", .provider.as_ref().map(|p| format!(" by provider '{}'", p)).unwrap_or_default())]
    UnknownModel {
        model: String,
        provider: Option<String>,
    },
    #[error("model '{0}' is served by several providers; name one explicitly")]
    AmbiguousModel(String),
}
