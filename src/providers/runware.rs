//! Immediate-result provider client (Runware REST API).
//!
//! The remote call blocks until a final result or failure is known; tasks
//! from this adapter are always terminal and are never polled. Task ids are
//! synthesized locally so uniqueness does not depend on the remote service.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ProviderError;
use super::{effective_duration, parse_ratio, ImageToVideoRequest, TextToVideoRequest};
use crate::pricing::{attach_final_cost, price_per_second};
use crate::task::{ProviderKind, Task, TaskStatus};

pub const DEFAULT_BASE_URL: &str = "https://api.runware.ai";

/// Prompt sent when an image submission carries no prompt text; the remote
/// protocol requires a non-empty positive prompt.
const DEFAULT_IMAGE_PROMPT: &str = "Image to video generation";

/// Client for the immediate-result generation service.
pub struct RunwareClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl RunwareClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a text-to-video request and wait for the final result.
    pub async fn submit_text(&self, req: &TextToVideoRequest) -> Result<Task, ProviderError> {
        let (width, height) = parse_ratio(&req.ratio);
        let body = json!([{
            "taskType": "videoInference",
            "taskUUID": Uuid::new_v4(),
            "positivePrompt": req.prompt_text,
            "model": req.model_id,
            "width": width,
            "height": height,
            "duration": req.duration_seconds,
        }]);

        tracing::debug!(model = %req.model_id, "running text-to-video inference");
        let payload = self.call(&body).await?;
        Ok(self.build_task(&payload, &req.model_id, req.duration_seconds))
    }

    /// Submit an image-to-video request and wait for the final result.
    pub async fn submit_image(&self, req: &ImageToVideoRequest) -> Result<Task, ProviderError> {
        let (width, height) = parse_ratio(&req.ratio);
        let duration =
            effective_duration(ProviderKind::Runware, &req.model_id, req.duration_seconds);
        let prompt = req
            .prompt_text
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_IMAGE_PROMPT);

        let body = json!([{
            "taskType": "videoInference",
            "taskUUID": Uuid::new_v4(),
            "inputImage": req.image_data,
            "positivePrompt": prompt,
            "model": req.model_id,
            "width": width,
            "height": height,
            "duration": duration,
        }]);

        tracing::debug!(model = %req.model_id, "running image-to-video inference");
        let payload = self.call(&body).await?;
        Ok(self.build_task(&payload, &req.model_id, duration))
    }

    /// Normalize the one-shot result into a terminal task.
    fn build_task(&self, payload: &Value, model_id: &str, duration_seconds: u32) -> Task {
        let output = collect_video_urls(payload);
        let status = if output.is_empty() {
            TaskStatus::Failed
        } else {
            TaskStatus::Succeeded
        };
        // The remote does not supply a structured failure reason here.
        let error_message = (status == TaskStatus::Failed)
            .then(|| "video generation failed".to_string());

        let mut task = Task {
            id: local_task_id(),
            provider: ProviderKind::Runware,
            status,
            model: model_id.to_string(),
            duration_seconds,
            progress: None,
            output,
            error_message,
            estimated_cost: price_per_second(ProviderKind::Runware, model_id)
                .map(|price| price * duration_seconds as f64),
            cost: None,
            cost_breakdown: None,
            created_at: Utc::now(),
        };
        attach_final_cost(&mut task);
        task
    }

    async fn call(&self, body: &Value) -> Result<Value, ProviderError> {
        let response = match self
            .client
            .post(format!("{}/v1", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return Err(if e.is_timeout() {
                    ProviderError::network(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {e}"))
                } else {
                    ProviderError::network(format!("request failed: {e}"))
                });
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), text, None));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::parse(format!("invalid response body: {e}")))
    }
}

/// Synthesize a process-unique task id: `runware-<millis>-<random suffix>`.
fn local_task_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("runware-{millis}-{suffix}")
}

/// Collect `videoURL` fields from the result payload. The payload has
/// appeared as `{data: [...]}`, as a bare array, and as a single object.
fn collect_video_urls(payload: &Value) -> Vec<String> {
    let items: Vec<&Value> = if let Some(data) = payload.get("data").and_then(Value::as_array) {
        data.iter().collect()
    } else if let Some(array) = payload.as_array() {
        array.iter().collect()
    } else {
        vec![payload]
    };

    items
        .into_iter()
        .filter_map(|item| item.get("videoURL").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> RunwareClient {
        RunwareClient::new("test-key".to_string())
    }

    #[test]
    fn test_collect_video_urls_data_envelope() {
        let payload = json!({
            "data": [
                { "taskUUID": "u1", "videoURL": "https://cdn.example.com/a.mp4" },
                { "taskUUID": "u2" },
                { "taskUUID": "u3", "videoURL": "https://cdn.example.com/b.mp4" }
            ]
        });
        assert_eq!(
            collect_video_urls(&payload),
            vec!["https://cdn.example.com/a.mp4", "https://cdn.example.com/b.mp4"]
        );
    }

    #[test]
    fn test_collect_video_urls_bare_shapes() {
        let array = json!([{ "videoURL": "https://cdn.example.com/a.mp4" }]);
        assert_eq!(collect_video_urls(&array).len(), 1);

        let single = json!({ "videoURL": "https://cdn.example.com/a.mp4" });
        assert_eq!(collect_video_urls(&single).len(), 1);

        assert!(collect_video_urls(&json!({ "errors": [] })).is_empty());
    }

    #[test]
    fn test_build_task_with_result_succeeds() {
        // Model priced at 0.045/s, duration 10 -> cost 0.45.
        let payload = json!({
            "data": [{ "videoURL": "https://cdn.example.com/a.mp4" }]
        });
        let task = client().build_task(&payload, "klingai:3@1", 10);

        assert_eq!(task.provider, ProviderKind::Runware);
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.output.len(), 1);
        assert_eq!(task.cost, Some(0.45));
        assert_eq!(task.cost_breakdown.as_ref().unwrap().price_per_second, 0.045);
        assert!(task.error_message.is_none());
        // Immediate-result tasks report no intermediate progress.
        assert!(task.progress.is_none());
    }

    #[test]
    fn test_build_task_without_result_fails() {
        let payload = json!({ "data": [] });
        let task = client().build_task(&payload, "klingai:3@1", 10);

        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.output.is_empty());
        assert!(task.error_message.is_some());
        assert!(task.cost.is_none());
        assert!(task.cost_breakdown.is_none());
        // The estimate from submission time is still reported.
        assert_eq!(task.estimated_cost, Some(0.45));
    }

    #[test]
    fn test_local_task_id_shape() {
        let id = local_task_id();
        assert!(id.starts_with("runware-"));
        assert_eq!(id.split('-').count(), 3);

        let other = local_task_id();
        assert_ne!(id, other);
    }
}
