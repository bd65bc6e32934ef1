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
    copy_present, number_param, read_json, rename_alias, require_api_key, schema_error,
    str_at, submission_send_error, submission_status_error,
};

pub const ALIYUN_PROVIDER: &str = "aliyun";
pub const ALIYUN_DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const ALIYUN_DEFAULT_MODELS: [&str; 5] = [
    "wanx2.1-t2v-turbo",
    "wanx2.1-t2v-plus",
    "wanx2.1-i2v-turbo",
    "wanx2.1-i2v-plus",
    "wanx2.1-kf2v-plus",
];

const DEFAULT_DURATION: i64 = 5;
const DEFAULT_RESOLUTION: &str = "720P";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelKind {
    TextToVideo,
    ImageToVideo,
    KeyframeToVideo,
}

impl ModelKind {
    fn of(model: &str) -> Self {
        let model = model.to_lowercase();
        if model.contains("t2v") {
            ModelKind::TextToVideo
        } else if model.contains("i2v") {
            ModelKind::ImageToVideo
        } else if model.contains("kf2v") || model.contains("keyframe") {
            ModelKind::KeyframeToVideo
        } else {
            ModelKind::TextToVideo
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ModelKind::TextToVideo => "text_to_video",
            ModelKind::ImageToVideo => "image_to_video",
            ModelKind::KeyframeToVideo => "keyframe_to_video",
        }
    }

    fn schema(&self) -> ParameterSchema {
        match self {
            ModelKind::TextToVideo => ParameterSchema::new().require("prompt"),
            ModelKind::ImageToVideo => ParameterSchema::new()
                .require("prompt")
                .require_one_of(&["img_url", "source_image"]),
            ModelKind::KeyframeToVideo => ParameterSchema::new()
                .require("first_frame_url")
                .require("last_frame_url"),
        }
    }

    fn synthesis_path(&self) -> &'static str {
        match self {
            ModelKind::KeyframeToVideo => "/api/v1/services/aigc/image2video/video-synthesis",
            _ => "/api/v1/services/aigc/video-generation/video-synthesis",
        }
    }
}

/// DashScope (Tongyi Wanxiang) video synthesis.
pub struct AliyunAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    descriptor: ProviderDescriptor,
}

impl AliyunAdapter {
    pub fn new<I, S>(client: Client, base_url: &str, api_key: &str, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptor = models
            .into_iter()
            .map(Into::into)
            .fold(ProviderDescriptor::new(ALIYUN_PROVIDER), |d, model| {
                let schema = ModelKind::of(&model).schema();
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
        Self::new(client, ALIYUN_DEFAULT_BASE_URL, api_key, ALIYUN_DEFAULT_MODELS)
    }

    fn request_body(model: &str, parameters: &Parameters) -> Value {
        let kind = ModelKind::of(model);
        let mut input = Map::new();
        match kind {
            ModelKind::TextToVideo => {
                copy_present(&mut input, parameters, &["prompt", "negative_prompt"]);
            }
            ModelKind::ImageToVideo => {
                let prompt = parameters.get("prompt").cloned().unwrap_or_else(|| json!(""));
                input.insert("prompt".to_string(), prompt);
                copy_present(&mut input, parameters, &["img_url"]);
            }
            ModelKind::KeyframeToVideo => {
                copy_present(
                    &mut input,
                    parameters,
                    &["prompt", "first_frame_url", "last_frame_url"],
                );
                input.insert("function".to_string(), json!("image_reference"));
            }
        }

        let mut options = Map::new();
        copy_present(
            &mut options,
            parameters,
            &["resolution", "duration", "prompt_extend"],
        );
        if let Some(seed) = parameters.get("seed").filter(|s| s.as_i64().is_some_and(|n| n > 0)) {
            options.insert("seed".to_string(), seed.clone());
        }
        if kind == ModelKind::KeyframeToVideo {
            copy_present(&mut options, parameters, &["obj_or_bg"]);
        }

        json!({ "model": model, "input": input, "parameters": options })
    }

    fn references_oss(parameters: &Parameters) -> bool {
        ["img_url", "first_frame_url", "last_frame_url"]
            .iter()
            .filter_map(|key| parameters.get(*key).and_then(Value::as_str))
            .any(|url| url.starts_with("oss://"))
    }
}

fn resolution_for_size(size: &str) -> &'static str {
    match size {
        "832*480" | "480*832" | "624*624" => "480P",
        _ => DEFAULT_RESOLUTION,
    }
}

#[async_trait]
impl ProviderAdapter for AliyunAdapter {
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

        let kind = ModelKind::of(model);
        let mut validated = parameters.clone();
        validated.insert("model_type".to_string(), json!(kind.as_str()));

        if kind == ModelKind::ImageToVideo {
            rename_alias(&mut validated, "source_image", "img_url");
        }

        let duration = match validated.get("duration") {
            None | Some(Value::Null) => DEFAULT_DURATION,
            Some(_) if kind == ModelKind::KeyframeToVideo => DEFAULT_DURATION,
            Some(value) => {
                let seconds = number_param(value).ok_or_else(|| {
                    ProviderError::validation("duration", "'duration' must be a number of seconds")
                })?;
                (seconds as i64).clamp(3, 5)
            }
        };
        validated.insert("duration".to_string(), json!(duration));

        if !validated.contains_key("resolution") {
            let resolution = match validated.remove("size") {
                Some(Value::String(size)) => resolution_for_size(&size),
                _ => DEFAULT_RESOLUTION,
            };
            validated.insert("resolution".to_string(), json!(resolution));
        }

        validated
            .entry("prompt_extend")
            .or_insert_with(|| json!(true));
        validated.entry("seed").or_insert_with(|| json!(-1));

        Ok(validated)
    }

    #[tracing::instrument(skip(self, parameters), fields(provider = ALIYUN_PROVIDER))]
    async fn submit(&self, model: &str, parameters: &Parameters) -> Result<String, ProviderError> {
        require_api_key(ALIYUN_PROVIDER, &self.api_key)?;

        let kind = ModelKind::of(model);
        let endpoint = format!("{}{}", self.base_url, kind.synthesis_path());
        let body = Self::request_body(model, parameters);

        tracing::info!(
            model_type = kind.as_str(),
            prompt = %parameters
                .get("prompt")
                .and_then(serde_json::Value::as_str)
                .map(sanitize_for_log)
                .unwrap_or_default(),
            "Submitting DashScope video synthesis"
        );

        let mut request = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&body);
        if Self::references_oss(parameters) {
            request = request.header("X-DashScope-OssResourceResolve", "enable");
        }

        let response = request
            .send()
            .await
            .map_err(|e| submission_send_error(ALIYUN_PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(submission_status_error(ALIYUN_PROVIDER, response).await);
        }

        let payload: Value = response.json().await.map_err(|e| ProviderError::Submission {
            message: format!("aliyun response unreadable: {e}"),
            retryable: false,
        })?;

        str_at(&payload, "/output/task_id")
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Submission {
                message: format!(
                    "aliyun response carried no task_id: {}",
                    sanitize_for_log(&payload.to_string())
                ),
                retryable: false,
            })
    }

    #[tracing::instrument(skip(self), fields(provider = ALIYUN_PROVIDER))]
    async fn fetch_status(&self, external_job_id: &str) -> Result<ProviderStatus, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/v1/tasks/{}", self.base_url, external_job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let payload = read_json(ALIYUN_PROVIDER, response).await?;

        let task_status = str_at(&payload, "/output/task_status").unwrap_or_default();
        let phase = match task_status {
            "PENDING" => ProviderPhase::Queued,
            "RUNNING" => ProviderPhase::Running,
            "SUCCEEDED" | "COMPLETE" | "SUCCESS" => ProviderPhase::Succeeded,
            "FAILED" | "CANCELED" | "CANCELLED" | "ERROR" | "UNKNOWN" => {
                let code = str_at(&payload, "/output/code").unwrap_or("Unknown error code");
                let message = str_at(&payload, "/output/message").unwrap_or("Unknown error");
                let detail = format!("{code} - {message}");
                return Ok(ProviderStatus::failed(payload, detail));
            }
            other => {
                tracing::warn!(task_status = other, "Unrecognized DashScope task status");
                ProviderPhase::Running
            }
        };
        Ok(ProviderStatus::new(phase, payload))
    }

    fn normalize_result(&self, raw_payload: &Value) -> Result<JobResult, ProviderError> {
        let output = raw_payload
            .get("output")
            .ok_or_else(|| ProviderError::InvalidResponse("payload has no output".to_string()))?;

        let videos = str_at(output, "/video_url")
            .map(|url| {
                let duration = raw_payload
                    .pointer("/usage/video_duration")
                    .and_then(number_param);
                vec![MediaItem::new(0, url).with_duration(duration)]
            })
            .unwrap_or_default();

        let mut result = JobResult::new(videos);
        result.usage = raw_payload.get("usage").cloned();
        if let Some(request_id) = raw_payload.get("request_id") {
            result
                .metadata
                .insert("request_id".to_string(), request_id.clone());
        }
        if let Some(output) = output.as_object() {
            copy_present(&mut result.metadata, output, &["orig_prompt", "actual_prompt"]);
        }
        Ok(result)
    }

    async fn cancel(&self, external_job_id: &str) -> Result<bool, ProviderError> {
        let response = self
            .client
            .post(format!(
                "{}/api/v1/tasks/{}/cancel",
                self.base_url, external_job_id
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

