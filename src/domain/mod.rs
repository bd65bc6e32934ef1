mod job;
mod job_error;
mod job_id;
mod job_status;
mod job_update;
mod media_file_name;
mod media_item;
mod parameters;
mod provider_descriptor;
mod provider_status;

pub use job::Job;
pub use job_error::{JobError, JobErrorKind};
pub use job_id::JobId;
pub use job_status::JobStatus;
pub use job_update::JobUpdate;
pub use media_file_name::{MediaFileName, MediaFileNameParts, extension_from_url};
pub use media_item::{JobResult, MediaItem};
pub use parameters::{FieldRule, ParameterSchema, Parameters, SchemaViolation};
pub use provider_descriptor::ProviderDescriptor;
pub use provider_status::{ProviderPhase, ProviderStatus};
