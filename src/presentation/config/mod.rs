mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    DatabaseSettings, DispatchSettings, DownloadSettings, LoggingSettings, PollingSettings,
    ProviderSettings, ProvidersSettings, ServerSettings, Settings, StorageSettings,
};
