//! Job-based provider client (RunwayML REST API) with automatic retry for
//! transient errors.
//!
//! The remote protocol is consumed as: create-job -> `{id, status, progress,
//! output}`; retrieve-job by id -> same shape. The shape is treated as
//! evolving: missing fields default safely, and an unrecognized status maps
//! to PENDING.

use std::time::Instant;

use chrono::Utc;
use reqwest::{Client, Method};
use serde_json::{json, Value};

use super::error::{ProviderError, RetryConfig};
use super::{
    effective_duration, parse_ratio, ImageToVideoRequest, StatusSource, TextToVideoRequest,
};
use crate::pricing::{attach_final_cost, price_per_second};
use crate::task::{ProviderKind, Task, TaskStatus};

pub const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com";

/// Protocol version header required by the remote service.
const API_VERSION: &str = "2024-11-06";

/// Client for the job-based generation service.
pub struct RunwayClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry_config: RetryConfig,
}

impl RunwayClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    /// Submit a text-to-video job and normalize the create response.
    pub async fn submit_text(&self, req: &TextToVideoRequest) -> Result<Task, ProviderError> {
        let (width, height) = parse_ratio(&req.ratio);
        let body = json!({
            "promptText": req.prompt_text,
            "model": req.model_id,
            "ratio": format!("{width}:{height}"),
            "duration": req.duration_seconds,
        });

        tracing::debug!(model = %req.model_id, "creating text-to-video job");
        let payload = self
            .execute_with_retry(Method::POST, "/v1/text_to_video", Some(&body))
            .await?;

        self.build_task(&payload, &req.model_id, req.duration_seconds)
    }

    /// Submit an image-to-video job and normalize the create response.
    pub async fn submit_image(&self, req: &ImageToVideoRequest) -> Result<Task, ProviderError> {
        let (width, height) = parse_ratio(&req.ratio);
        let duration =
            effective_duration(ProviderKind::Runway, &req.model_id, req.duration_seconds);

        let mut body = json!({
            "promptImage": req.image_data,
            "model": req.model_id,
            "ratio": format!("{width}:{height}"),
        });
        if let Some(prompt) = req.prompt_text.as_deref().filter(|p| !p.is_empty()) {
            body["promptText"] = Value::String(prompt.to_string());
        }

        tracing::debug!(model = %req.model_id, "creating image-to-video job");
        let payload = self
            .execute_with_retry(Method::POST, "/v1/image_to_video", Some(&body))
            .await?;

        self.build_task(&payload, &req.model_id, duration)
    }

    /// Fetch the latest remote state and re-map it onto a copy of the task.
    ///
    /// Terminal tasks are returned unchanged without a remote call. When the
    /// remote call fails the caller keeps the task's last known good state.
    pub async fn refresh(&self, task: &Task) -> Result<Task, ProviderError> {
        if task.status.is_terminal() {
            return Ok(task.clone());
        }

        let payload = self
            .execute_with_retry(Method::GET, &format!("/v1/tasks/{}", task.id), None)
            .await?;

        let mut updated = task.clone();
        let mapped = map_status(payload.get("status").and_then(Value::as_str));
        updated.status = task.status.advance(mapped);

        if let Some(progress) = payload.get("progress").and_then(Value::as_f64) {
            updated.progress = Some(progress);
        }

        if updated.status == TaskStatus::Succeeded {
            let output = extract_output_urls(payload.get("output").unwrap_or(&Value::Null));
            if !output.is_empty() {
                updated.output = output;
            }
        }

        if updated.status == TaskStatus::Failed {
            if let Some(message) = extract_failure_message(&payload) {
                updated.error_message = Some(message);
            } else if updated.error_message.is_none() {
                updated.error_message = Some("video generation failed".to_string());
            }
        }

        attach_final_cost(&mut updated);
        Ok(updated)
    }

    /// Normalize a create/retrieve payload into a fresh task.
    fn build_task(
        &self,
        payload: &Value,
        model_id: &str,
        duration_seconds: u32,
    ) -> Result<Task, ProviderError> {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::parse("job response is missing an id"))?;

        let status = map_status(payload.get("status").and_then(Value::as_str));
        let output = if status == TaskStatus::Succeeded {
            extract_output_urls(payload.get("output").unwrap_or(&Value::Null))
        } else {
            Vec::new()
        };
        let error_message = if status == TaskStatus::Failed {
            extract_failure_message(payload)
                .or_else(|| Some("video generation failed".to_string()))
        } else {
            None
        };

        let mut task = Task {
            id: id.to_string(),
            provider: ProviderKind::Runway,
            status,
            model: model_id.to_string(),
            duration_seconds,
            progress: payload.get("progress").and_then(Value::as_f64),
            output,
            error_message,
            estimated_cost: price_per_second(ProviderKind::Runway, model_id)
                .map(|price| price * duration_seconds as f64),
            cost: None,
            cost_breakdown: None,
            created_at: Utc::now(),
        };
        attach_final_cost(&mut task);
        Ok(task)
    }

    /// Execute a request, retrying transient failures with backoff.
    async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.execute_once(method.clone(), path, body).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            "request succeeded after {} retries (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let should_retry = self.retry_config.should_retry(&error)
                        && attempt < self.retry_config.max_retries
                        && start.elapsed() < self.retry_config.max_retry_duration;

                    if !should_retry {
                        tracing::error!("request to {} failed: {}", path, error);
                        return Err(error);
                    }

                    let remaining = self
                        .retry_config
                        .max_retry_duration
                        .saturating_sub(start.elapsed());
                    let delay = error.suggested_delay(attempt).min(remaining);
                    tracing::warn!(
                        "retry attempt {} failed with {}, retrying in {:?}",
                        attempt + 1,
                        error.kind,
                        delay
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Execute a single request without retry.
    async fn execute_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Runway-Version", API_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
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
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), text, retry_after));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::parse(format!("invalid response body: {e}")))
    }
}

#[async_trait::async_trait]
impl StatusSource for RunwayClient {
    async fn refresh(&self, task: &Task) -> Result<Task, ProviderError> {
        RunwayClient::refresh(self, task).await
    }
}

/// Map the remote status vocabulary onto the task lifecycle.
/// Unrecognized or missing statuses default to PENDING.
fn map_status(raw: Option<&str>) -> TaskStatus {
    match raw.unwrap_or("PENDING").to_ascii_uppercase().as_str() {
        "RUNNING" => TaskStatus::Running,
        "SUCCEEDED" => TaskStatus::Succeeded,
        "FAILED" => TaskStatus::Failed,
        _ => TaskStatus::Pending,
    }
}

/// Extract result URLs from the heterogeneous output shape: string entries
/// are taken directly; object entries are probed for a URL-bearing field,
/// then one level into a nested `asset` field.
fn extract_output_urls(output: &Value) -> Vec<String> {
    let Some(items) = output.as_array() else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for item in items {
        match item {
            Value::String(url) => urls.push(url.clone()),
            Value::Object(record) => {
                let direct = ["url", "uri", "href"]
                    .iter()
                    .find_map(|key| record.get(*key).and_then(Value::as_str));
                let nested = record
                    .get("asset")
                    .and_then(|asset| asset.get("url"))
                    .and_then(Value::as_str);
                if let Some(url) = direct.or(nested) {
                    urls.push(url.to_string());
                }
            }
            _ => {}
        }
    }
    urls
}

/// The failure field has appeared both as a bare string and as an object
/// with a `message`; accept either.
fn extract_failure_message(payload: &Value) -> Option<String> {
    match payload.get("failure") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Object(record)) => record
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<std::time::Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok().map(std::time::Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> RunwayClient {
        RunwayClient::new("test-key".to_string())
    }

    #[test]
    fn test_map_status() {
        assert_eq!(map_status(Some("SUCCEEDED")), TaskStatus::Succeeded);
        assert_eq!(map_status(Some("running")), TaskStatus::Running);
        assert_eq!(map_status(Some("FAILED")), TaskStatus::Failed);
        // Unrecognized and missing statuses default to PENDING.
        assert_eq!(map_status(Some("THROTTLED")), TaskStatus::Pending);
        assert_eq!(map_status(None), TaskStatus::Pending);
    }

    #[test]
    fn test_extract_output_urls_mixed_shapes() {
        let output = json!([
            "https://cdn.example.com/a.mp4",
            { "url": "https://cdn.example.com/b.mp4" },
            { "uri": "https://cdn.example.com/c.mp4" },
            { "href": "https://cdn.example.com/d.mp4" },
            { "asset": { "url": "https://cdn.example.com/e.mp4" } },
            { "thumbnail": "ignored" },
            42,
            null
        ]);

        let urls = extract_output_urls(&output);
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/a.mp4",
                "https://cdn.example.com/b.mp4",
                "https://cdn.example.com/c.mp4",
                "https://cdn.example.com/d.mp4",
                "https://cdn.example.com/e.mp4",
            ]
        );
    }

    #[test]
    fn test_extract_output_urls_non_array() {
        assert!(extract_output_urls(&Value::Null).is_empty());
        assert!(extract_output_urls(&json!("not-an-array")).is_empty());
        assert!(extract_output_urls(&json!({"url": "x"})).is_empty());
    }

    #[test]
    fn test_extract_failure_message() {
        assert_eq!(
            extract_failure_message(&json!({"failure": "content policy"})),
            Some("content policy".to_string())
        );
        assert_eq!(
            extract_failure_message(&json!({"failure": {"message": "timed out"}})),
            Some("timed out".to_string())
        );
        assert_eq!(extract_failure_message(&json!({})), None);
        assert_eq!(extract_failure_message(&json!({"failure": 7})), None);
    }

    #[test]
    fn test_build_task_pending_job() {
        let payload = json!({
            "id": "job-123",
            "status": "PENDING",
        });
        let task = client().build_task(&payload, "veo3.1", 4).unwrap();

        assert_eq!(task.id, "job-123");
        assert_eq!(task.provider, ProviderKind::Runway);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.estimated_cost, Some(0.5));
        assert!(task.output.is_empty());
        assert!(task.cost.is_none());
        assert!(task.error_message.is_none());
    }

    #[test]
    fn test_build_task_unrecognized_status_defaults_to_pending() {
        let payload = json!({ "id": "job-123", "status": "THROTTLED" });
        let task = client().build_task(&payload, "veo3.1", 4).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_build_task_already_succeeded_attaches_cost() {
        let payload = json!({
            "id": "job-123",
            "status": "SUCCEEDED",
            "output": ["https://cdn.example.com/a.mp4"],
        });
        let task = client().build_task(&payload, "veo3.1", 4).unwrap();

        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.output.len(), 1);
        assert_eq!(task.cost, Some(0.5));
        assert_eq!(task.cost_breakdown.as_ref().unwrap().total, 0.5);
    }

    #[test]
    fn test_build_task_failed_gets_failure_message() {
        let payload = json!({
            "id": "job-123",
            "status": "FAILED",
            "failure": { "message": "content policy" },
        });
        let task = client().build_task(&payload, "veo3.1", 4).unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("content policy"));
        assert!(task.cost.is_none());
        assert!(task.output.is_empty());
    }

    #[test]
    fn test_build_task_missing_id_is_an_error() {
        let payload = json!({ "status": "PENDING" });
        assert!(client().build_task(&payload, "veo3.1", 4).is_err());
    }

    #[tokio::test]
    async fn test_refresh_terminal_task_is_identity() {
        let payload = json!({
            "id": "job-123",
            "status": "SUCCEEDED",
            "output": ["https://cdn.example.com/a.mp4"],
        });
        let task = client().build_task(&payload, "veo3.1", 4).unwrap();

        // No remote call is made for a terminal task, so a client pointed at
        // an unreachable endpoint still returns the task unchanged.
        let c = RunwayClient::with_base_url(
            "test-key".to_string(),
            "http://127.0.0.1:1".to_string(),
        );
        let refreshed = c.refresh(&task).await.unwrap();
        assert_eq!(refreshed.status, task.status);
        assert_eq!(refreshed.output, task.output);
        assert_eq!(refreshed.cost, task.cost);
    }
}
