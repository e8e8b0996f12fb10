//! Video task endpoints: submission, status, refresh, and poll cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::orchestrator::{ImageSubmission, TextSubmission};
use crate::poll::{PollEvent, PollSink, PollingController};
use crate::task::Task;

use super::routes::{http_error, AppState};

/// Upload cap for image files, matching the original ingestion limit.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Create video task routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks))
        .route("/text", post(submit_text))
        .route("/image", post(submit_image))
        .route("/image/upload", post(submit_image_upload))
        .route("/:id", get(get_task))
        .route("/:id/refresh", post(refresh_task))
        .route("/:id/cancel", post(cancel_task))
        // Encoded image payloads outgrow the default body limit.
        .layer(DefaultBodyLimit::max(2 * MAX_IMAGE_BYTES))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequestBody {
    pub provider: Option<String>,
    pub prompt_text: Option<String>,
    pub model_id: Option<String>,
    pub ratio: Option<String>,
    pub duration_seconds: Option<u32>,
}

impl From<TextRequestBody> for TextSubmission {
    fn from(body: TextRequestBody) -> Self {
        Self {
            provider: body.provider,
            prompt_text: body.prompt_text,
            model_id: body.model_id,
            ratio: body.ratio,
            duration_seconds: body.duration_seconds,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequestBody {
    pub provider: Option<String>,
    pub image_data: Option<String>,
    pub model_id: Option<String>,
    pub ratio: Option<String>,
    pub duration_seconds: Option<u32>,
    pub prompt_text: Option<String>,
}

impl From<ImageRequestBody> for ImageSubmission {
    fn from(body: ImageRequestBody) -> Self {
        Self {
            provider: body.provider,
            image_data: body.image_data,
            model_id: body.model_id,
            ratio: body.ratio,
            duration_seconds: body.duration_seconds,
            prompt_text: body.prompt_text,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/videos/text - submit a text-to-video request.
async fn submit_text(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TextRequestBody>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .orchestrator
        .submit_text(body.into())
        .await
        .map_err(http_error)?;
    register(&state, task.clone()).await;
    Ok(Json(task))
}

/// POST /api/videos/image - submit an image-to-video request with an
/// already-encoded image payload.
async fn submit_image(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImageRequestBody>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .orchestrator
        .submit_image(body.into())
        .await
        .map_err(http_error)?;
    register(&state, task.clone()).await;
    Ok(Json(task))
}

/// POST /api/videos/image/upload - multipart variant of the image path.
///
/// The uploaded file is encoded into a `data:` URI for the adapter; the
/// payload is not retained after the call.
async fn submit_image_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Task>, (StatusCode, String)> {
    let mut submission = ImageSubmission::default();
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid multipart payload: {e}"),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !mime.starts_with("image/") {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        "only image files are allowed".to_string(),
                    ));
                }
                let data = field.bytes().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("failed to read image: {e}"))
                })?;
                if data.len() > MAX_IMAGE_BYTES {
                    return Err((
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "image exceeds the 10MB upload limit".to_string(),
                    ));
                }
                image = Some((mime, data.to_vec()));
            }
            "provider" => submission.provider = Some(read_text_field(field).await?),
            "modelId" => submission.model_id = Some(read_text_field(field).await?),
            "ratio" => submission.ratio = Some(read_text_field(field).await?),
            "promptText" => submission.prompt_text = Some(read_text_field(field).await?),
            "durationSeconds" => {
                let raw = read_text_field(field).await?;
                let parsed = raw.trim().parse::<u32>().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("invalid durationSeconds: {raw}"),
                    )
                })?;
                submission.duration_seconds = Some(parsed);
            }
            _ => {}
        }
    }

    if let Some((mime, data)) = image {
        submission.image_data = Some(format!("data:{mime};base64,{}", STANDARD.encode(&data)));
    }

    let task = state
        .orchestrator
        .submit_image(submission)
        .await
        .map_err(http_error)?;
    register(&state, task.clone()).await;
    Ok(Json(task))
}

/// GET /api/videos - list all tasks this process has seen, newest first.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    let mut tasks: Vec<Task> = state.tasks.read().await.values().cloned().collect();
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(tasks)
}

/// GET /api/videos/:id - current task state from the store.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .tasks
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("task {id} not found")))
}

/// POST /api/videos/:id/refresh - fetch the latest status on demand.
///
/// Immediate-result tasks are terminal from creation and are returned as
/// stored; only the job-based family has a status to refresh.
async fn refresh_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .tasks
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("task {id} not found")))?;

    if !task.provider.is_job_based() || task.status.is_terminal() {
        return Ok(Json(task));
    }

    let source = state
        .orchestrator
        .status_source(task.provider)
        .ok_or_else(|| {
            http_error(crate::error::GatewayError::NotConfigured(task.provider))
        })?;

    // On failure the stored task keeps its last known good state.
    let updated = source.refresh(&task).await.map_err(|e| {
        tracing::warn!(id = %task.id, error = %e, "on-demand refresh failed");
        http_error(e.into())
    })?;

    state
        .tasks
        .write()
        .await
        .insert(updated.id.clone(), updated.clone());
    Ok(Json(updated))
}

/// POST /api/videos/:id/cancel - stop the task's polling schedule.
async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, String), (StatusCode, String)> {
    if !state.tasks.read().await.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, format!("task {id} not found")));
    }

    if let Some(controller) = state.pollers.write().await.remove(&id) {
        controller.cancel().await;
        tracing::info!(id = %id, "polling cancelled");
    }
    Ok((StatusCode::OK, format!("polling stopped for task {id}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Store integration
// ─────────────────────────────────────────────────────────────────────────────

/// Insert a new task into the store and, for a non-terminal job-based task,
/// start a polling controller that keeps the stored state fresh.
async fn register(state: &Arc<AppState>, task: Task) {
    state
        .tasks
        .write()
        .await
        .insert(task.id.clone(), task.clone());

    if !task.provider.is_job_based() || task.status.is_terminal() {
        return;
    }
    let Some(source) = state.orchestrator.status_source(task.provider) else {
        return;
    };

    let controller = Arc::new(PollingController::new(state.config.poll_interval));
    let sink = Arc::new(StoreSink {
        tasks: Arc::clone(&state.tasks),
    });
    let id = task.id.clone();
    controller.start(task, source, sink).await;
    state.pollers.write().await.insert(id, controller);
}

/// Applies poll events to the shared task store.
struct StoreSink {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

#[async_trait]
impl PollSink for StoreSink {
    async fn on_event(&self, event: PollEvent) {
        match event {
            PollEvent::Refreshed(task) => {
                tracing::debug!(id = %task.id, status = %task.status, "task refreshed");
                self.tasks.write().await.insert(task.id.clone(), task);
            }
            PollEvent::CheckFailed(message) => {
                // The last successfully fetched state stays in the store.
                tracing::warn!("{message}");
            }
        }
    }
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, (StatusCode, String)> {
    field.text().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid multipart field: {e}"),
        )
    })
}
