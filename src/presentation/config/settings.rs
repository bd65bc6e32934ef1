use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::{
    Backoff, DispatchPolicy, DownloadPolicy, OrchestratorConfig, PollingPolicy,
};

use super::Environment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub polling: PollingSettings,
    pub dispatch: DispatchSettings,
    pub download: DownloadSettings,
    pub providers: ProvidersSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Loads `appsettings.toml`, then `appsettings.{environment}.toml` from
    /// the working directory, then `APP_*` variables (`__` between levels,
    /// e.g. `APP_POLLING__WORKERS=8`).
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), environment)
    }

    pub fn load_from(dir: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let base = dir.join("appsettings.toml");
        let specific = dir.join(format!("appsettings.{}.toml", environment.file_suffix()));

        Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(specific).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            dispatch: DispatchPolicy {
                submit_retries: self.dispatch.submit_retries,
                submit_backoff: Backoff::exponential(
                    Duration::from_millis(self.dispatch.submit_backoff_ms),
                    Duration::from_millis(self.dispatch.submit_backoff_ms.saturating_mul(8)),
                    2.0,
                ),
                max_sync_wait: Duration::from_secs(self.dispatch.max_sync_wait_secs),
            },
            polling: PollingPolicy {
                interval: Backoff::exponential(
                    Duration::from_millis(self.polling.initial_interval_ms),
                    Duration::from_millis(self.polling.max_interval_ms),
                    self.polling.multiplier,
                ),
                max_duration: Duration::from_secs(self.polling.max_duration_secs),
                max_transport_retries: self.polling.max_transport_retries,
                workers: self.polling.workers,
                queue_capacity: self.polling.queue_capacity,
            },
        }
    }

    pub fn download_policy(&self) -> DownloadPolicy {
        DownloadPolicy {
            max_retries: self.download.max_retries,
            backoff: Backoff::exponential(
                Duration::from_millis(self.download.initial_backoff_ms),
                Duration::from_millis(self.download.max_backoff_ms),
                2.0,
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Without a URL jobs are kept in memory and lost on restart.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub media_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            media_dir: "data/videos".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    pub max_duration_secs: u64,
    pub max_transport_retries: u32,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: 5_000,
            max_interval_ms: 30_000,
            multiplier: 1.5,
            max_duration_secs: 30 * 60,
            max_transport_retries: 5,
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub submit_retries: u32,
    pub submit_backoff_ms: u64,
    pub max_sync_wait_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            submit_retries: 1,
            submit_backoff_ms: 2_000,
            max_sync_wait_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersSettings {
    pub default_provider: String,
    pub default_model: String,
    pub aliyun: ProviderSettings,
    pub zhipuai: ProviderSettings,
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            default_provider: "aliyun".to_string(),
            default_model: "wanx2.1-t2v-turbo".to_string(),
            aliyun: ProviderSettings::default(),
            zhipuai: ProviderSettings::default(),
        }
    }
}

/// Unset `base_url` and `supported_models` fall back to the adapter's own.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub supported_models: Option<Vec<String>>,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            supported_models: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub level: Option<String>,
    pub json: bool,
}
