use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::application::ports::{ProviderAdapter, ProviderError};
use crate::domain::{
    JobResult, MediaItem, ParameterSchema, Parameters, ProviderDescriptor, ProviderPhase,
    ProviderStatus,
};
use crate::infrastructure::observability::sanitize_for_log;

use super::provider_http::{
    copy_present, read_json, rename_alias, require_api_key, schema_error, str_at,
    submission_send_error, submission_status_error,
};

pub const ZHIPUAI_PROVIDER: &str = "zhipuai";
pub const ZHIPUAI_DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn";
pub const ZHIPUAI_DEFAULT_MODELS: [&str; 8] = [
    "cogvideox-2",
    "cogvideox-flash",
    "viduq1-text",
    "viduq1-image",
    "viduq1-start-end",
    "vidu2-image",
    "vidu2-start-end",
    "vidu2-reference",
];

const PASSTHROUGH_IDS: [&str; 2] = ["request_id", "user_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    CogVideoX,
    ViduText,
    ViduImage,
    ViduStartEnd,
    ViduReference,
}

impl ModelFamily {
    fn of(model: &str) -> Self {
        match model {
            m if m.starts_with("cogvideox") => ModelFamily::CogVideoX,
            "viduq1-text" => ModelFamily::ViduText,
            m if m.ends_with("-start-end") => ModelFamily::ViduStartEnd,
            m if m.ends_with("-reference") => ModelFamily::ViduReference,
            m if m.ends_with("-image") => ModelFamily::ViduImage,
            _ => ModelFamily::ViduText,
        }
    }

    fn schema(&self) -> ParameterSchema {
        match self {
            ModelFamily::CogVideoX | ModelFamily::ViduText => {
                ParameterSchema::new().require("prompt")
            }
            ModelFamily::ViduImage => {
                ParameterSchema::new().require_one_of(&["image_url", "source_image"])
            }
            ModelFamily::ViduStartEnd => ParameterSchema::new().list_length("image_url", 2, 2),
            ModelFamily::ViduReference => ParameterSchema::new().list_length("image_url", 1, 3),
        }
    }

    /// Request fields forwarded verbatim for this family.
    fn request_fields(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::CogVideoX => &[
                "prompt",
                "quality",
                "with_audio",
                "image_url",
                "size",
                "fps",
            ],
            ModelFamily::ViduText => &[
                "prompt",
                "style",
                "duration",
                "aspect_ratio",
                "size",
                "movement_amplitude",
            ],
            ModelFamily::ViduImage | ModelFamily::ViduStartEnd => &[
                "image_url",
                "prompt",
                "duration",
                "size",
                "movement_amplitude",
                "with_audio",
            ],
            ModelFamily::ViduReference => &[
                "image_url",
                "prompt",
                "duration",
                "aspect_ratio",
                "size",
                "movement_amplitude",
                "with_audio",
            ],
        }
    }
}

/// BigModel open platform: CogVideoX and Vidu video generation.
pub struct ZhipuAiAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    descriptor: ProviderDescriptor,
}

impl ZhipuAiAdapter {
    pub fn new<I, S>(client: Client, base_url: &str, api_key: &str, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptor = models
            .into_iter()
            .map(Into::into)
            .fold(ProviderDescriptor::new(ZHIPUAI_PROVIDER), |d, model| {
                let schema = ModelFamily::of(&model).schema();
                d.with_model(model, schema)
            });
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            descriptor,
        }
    }

    pub fn with_defaults(client: Client, api_key: &str) -> Self {
        Self::new(client, ZHIPUAI_DEFAULT_BASE_URL, api_key, ZHIPUAI_DEFAULT_MODELS)
    }

    fn request_body(model: &str, parameters: &Parameters) -> Value {
        let family = ModelFamily::of(model);
        let mut body = Map::new();
        body.insert("model".to_string(), json!(model));
        copy_present(&mut body, parameters, family.request_fields());
        copy_present(&mut body, parameters, &PASSTHROUGH_IDS);
        Value::Object(body)
    }
}

#[async_trait]
impl ProviderAdapter for ZhipuAiAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn validate_parameters(
        &self,
        model: &str,
        parameters: &Parameters,
    ) -> Result<Parameters, ProviderError> {
        let schema = self
            .descriptor
            .schema(model)
            .ok_or_else(|| ProviderError::UnsupportedModel(model.to_string()))?;
        schema.check(parameters).map_err(schema_error)?;

        let mut validated = parameters.clone();
        if ModelFamily::of(model) == ModelFamily::ViduImage {
            rename_alias(&mut validated, "source_image", "image_url");
        }
        Ok(validated)
    }

    #[tracing::instrument(skip(self, parameters), fields(provider = ZHIPUAI_PROVIDER))]
    async fn submit(&self, model: &str, parameters: &Parameters) -> Result<String, ProviderError> {
        require_api_key(ZHIPUAI_PROVIDER, &self.api_key)?;

        let body = Self::request_body(model, parameters);
        tracing::info!(
            prompt = %parameters
                .get("prompt")
                .and_then(serde_json::Value::as_str)
                .map(sanitize_for_log)
                .unwrap_or_default(),
            "Submitting ZhipuAI video generation"
        );

        let response = self
            .client
            .post(format!("{}/api/paas/v4/videos/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| submission_send_error(ZHIPUAI_PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(submission_status_error(ZHIPUAI_PROVIDER, response).await);
        }

        let payload: Value = response.json().await.map_err(|e| ProviderError::Submission {
            message: format!("zhipuai response unreadable: {e}"),
            retryable: false,
        })?;

        str_at(&payload, "/id")
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Submission {
                message: format!(
                    "zhipuai response carried no id: {}",
                    sanitize_for_log(&payload.to_string())
                ),
                retryable: false,
            })
    }

    #[tracing::instrument(skip(self), fields(provider = ZHIPUAI_PROVIDER))]
    async fn fetch_status(&self, external_job_id: &str) -> Result<ProviderStatus, ProviderError> {
        let response = self
            .client
            .get(format!(
                "{}/api/paas/v4/async-result/{}",
                self.base_url, external_job_id
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let payload = read_json(ZHIPUAI_PROVIDER, response).await?;

        let phase = match str_at(&payload, "/task_status").unwrap_or_default() {
            "PROCESSING" => ProviderPhase::Running,
            "SUCCESS" => ProviderPhase::Succeeded,
            "FAIL" => {
                let detail = str_at(&payload, "/error/message")
                    .unwrap_or("Unknown error")
                    .to_string();
                return Ok(ProviderStatus::failed(payload, detail));
            }
            other => {
                tracing::warn!(task_status = other, "Unrecognized ZhipuAI task status");
                ProviderPhase::Queued
            }
        };
        Ok(ProviderStatus::new(phase, payload))
    }

    fn normalize_result(&self, raw_payload: &Value) -> Result<JobResult, ProviderError> {
        let entries = raw_payload
            .get("video_result")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("payload has no video_result list".to_string())
            })?;

        let videos = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let Some(url) = str_at(entry, "/url") else {
                    tracing::warn!(index, "Skipping video entry without URL");
                    return None;
                };
                let mut item = MediaItem::new(index as u32, url);
                if let Some(cover) = str_at(entry, "/cover_image_url") {
                    item = item.with_metadata("cover_image_url", json!(cover));
                }
                Some(item)
            })
            .collect();

        let mut result = JobResult::new(videos);
        result.usage = raw_payload.get("usage").cloned();
        if let Some(raw) = raw_payload.as_object() {
            copy_present(&mut result.metadata, raw, &["request_id", "model"]);
        }
        Ok(result)
    }
}
