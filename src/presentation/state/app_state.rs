use std::sync::Arc;

use crate::application::ports::MediaStore;
use crate::application::services::TaskOrchestrator;
use crate::presentation::config::ProvidersSettings;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TaskOrchestrator>,
    pub media_store: Arc<dyn MediaStore>,
    /// Defaults applied when a request omits model or provider.
    pub providers: ProvidersSettings,
}
