mod api_response;
mod download;
mod health;
mod models;
mod tasks;

pub use api_response::{ApiError, ApiResponse};
pub use download::download_handler;
pub use health::health_handler;
pub use models::{all_models_handler, models_handler, provider_models_handler};
pub use tasks::{
    CreateTaskRequest, cancel_task_handler, create_task_handler, list_tasks_handler,
    task_result_handler, task_status_handler,
};
