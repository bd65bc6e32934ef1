use std::collections::BTreeMap;

use super::ParameterSchema;

/// What a provider adapter serves: its name, the models it supports, and the
/// parameter schema of each model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    provider_name: String,
    models: BTreeMap<String, ParameterSchema>,
}

impl ProviderDescriptor {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            models: BTreeMap::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, schema: ParameterSchema) -> Self {
        self.models.insert(model.into(), schema);
        self
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn supported_models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn supports(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    pub fn schema(&self, model: &str) -> Option<&ParameterSchema> {
        self.models.get(model)
    }
}
