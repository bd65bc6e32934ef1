use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::application::ports::ProviderAdapter;
use crate::presentation::config::{ProviderSettings, ProvidersSettings};

use super::{
    ALIYUN_DEFAULT_BASE_URL, ALIYUN_DEFAULT_MODELS, AliyunAdapter, ZHIPUAI_DEFAULT_BASE_URL,
    ZHIPUAI_DEFAULT_MODELS, ZhipuAiAdapter,
};

pub struct ProviderFactory;

#[derive(Debug, thiserror::Error)]
pub enum ProviderFactoryError {
    #[error("http client initialization failed: {0}")]
    HttpClient(String),
}

impl ProviderFactory {
    /// Builds every shipped adapter. Adapters without an API key are still
    /// registered; their submissions fail with a configuration error.
    pub fn create_all(
        settings: &ProvidersSettings,
    ) -> Result<Vec<Arc<dyn ProviderAdapter>>, ProviderFactoryError> {
        let aliyun = &settings.aliyun;
        let zhipuai = &settings.zhipuai;

        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(AliyunAdapter::new(
                http_client(aliyun)?,
                aliyun.base_url.as_deref().unwrap_or(ALIYUN_DEFAULT_BASE_URL),
                &aliyun.api_key,
                models_or_default(aliyun, &ALIYUN_DEFAULT_MODELS),
            )),
            Arc::new(ZhipuAiAdapter::new(
                http_client(zhipuai)?,
                zhipuai.base_url.as_deref().unwrap_or(ZHIPUAI_DEFAULT_BASE_URL),
                &zhipuai.api_key,
                models_or_default(zhipuai, &ZHIPUAI_DEFAULT_MODELS),
            )),
        ];

        for adapter in &adapters {
            let descriptor = adapter.descriptor();
            tracing::info!(
                provider = descriptor.provider_name(),
                models = descriptor.supported_models().count(),
                "Provider adapter registered"
            );
        }
        for (name, provider) in [("aliyun", aliyun), ("zhipuai", zhipuai)] {
            if provider.api_key.trim().is_empty() {
                tracing::warn!(provider = name, "No API key configured; submissions will fail");
            }
        }

        Ok(adapters)
    }
}

fn http_client(settings: &ProviderSettings) -> Result<Client, ProviderFactoryError> {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| ProviderFactoryError::HttpClient(e.to_string()))
}

fn models_or_default(settings: &ProviderSettings, defaults: &[&str]) -> Vec<String> {
    match &settings.supported_models {
        Some(models) if !models.is_empty() => models.clone(),
        _ => defaults.iter().map(|m| (*m).to_string()).collect(),
    }
}
