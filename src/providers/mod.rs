//! Provider adapters for remote video generation services.
//!
//! Two structurally different remote protocols are normalized into the single
//! [`Task`](crate::task::Task) shape:
//!
//! - [`RunwayClient`]: job-based. Create returns an id plus an in-progress
//!   status; the latest status is fetched by id until a terminal state.
//! - [`RunwareClient`]: immediate-result. The call blocks until a final
//!   result or failure is known; there is no status-polling step.
//!
//! A [`Provider`] is selected once at the orchestrator boundary and carries
//! its adapter for the task's entire lifetime.

mod error;
pub mod runware;
pub mod runway;

pub use error::{classify_http_status, ProviderError, ProviderErrorKind, RetryConfig};
pub use runware::RunwareClient;
pub use runway::RunwayClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::pricing::catalog;
use crate::task::{ProviderKind, Task};

/// Default dimensions used when a ratio string is malformed.
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

/// Default clip length for image submissions when neither the request nor
/// the catalog constrains it.
const FALLBACK_IMAGE_DURATION: u32 = 5;

/// Validated parameters for a text-to-video submission.
#[derive(Debug, Clone)]
pub struct TextToVideoRequest {
    pub prompt_text: String,
    pub model_id: String,
    pub ratio: String,
    pub duration_seconds: u32,
}

/// Validated parameters for an image-to-video submission.
#[derive(Debug, Clone)]
pub struct ImageToVideoRequest {
    /// Encoded image payload (a `data:` URI); not retained after the call.
    pub image_data: String,
    pub model_id: String,
    pub ratio: String,
    pub duration_seconds: Option<u32>,
    pub prompt_text: Option<String>,
}

/// Capability to fetch the latest status of a job-based task.
///
/// Only the job-based adapter implements this; the polling controller takes
/// it as its seam so the loop can be exercised against a scripted source.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn refresh(&self, task: &Task) -> Result<Task, ProviderError>;
}

/// A configured provider adapter.
pub enum Provider {
    Runway(Arc<RunwayClient>),
    Runware(Arc<RunwareClient>),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Runway(_) => ProviderKind::Runway,
            Provider::Runware(_) => ProviderKind::Runware,
        }
    }

    pub async fn submit_text(&self, req: &TextToVideoRequest) -> Result<Task, ProviderError> {
        match self {
            Provider::Runway(client) => client.submit_text(req).await,
            Provider::Runware(client) => client.submit_text(req).await,
        }
    }

    pub async fn submit_image(&self, req: &ImageToVideoRequest) -> Result<Task, ProviderError> {
        match self {
            Provider::Runway(client) => client.submit_image(req).await,
            Provider::Runware(client) => client.submit_image(req).await,
        }
    }

    /// Status-polling capability; `None` for the immediate-result family,
    /// whose tasks are terminal from the moment they are created.
    pub fn status_source(&self) -> Option<Arc<dyn StatusSource>> {
        match self {
            Provider::Runway(client) => Some(Arc::clone(client) as Arc<dyn StatusSource>),
            Provider::Runware(_) => None,
        }
    }
}

/// Parse a "W:H" ratio string, falling back to 1280x720 when malformed.
pub(crate) fn parse_ratio(ratio: &str) -> (u32, u32) {
    let mut parts = ratio.splitn(2, ':');
    let width = parts.next().and_then(|s| s.trim().parse::<u32>().ok());
    let height = parts.next().and_then(|s| s.trim().parse::<u32>().ok());
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
    }
}

/// Effective clip length for an image submission: the requested value, else
/// the model's first supported duration, else a fixed fallback.
pub(crate) fn effective_duration(
    provider: ProviderKind,
    model_id: &str,
    requested: Option<u32>,
) -> u32 {
    requested
        .or_else(|| {
            catalog::find_model(provider, model_id).and_then(|m| m.durations.first().copied())
        })
        .unwrap_or(FALLBACK_IMAGE_DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("1280:720"), (1280, 720));
        assert_eq!(parse_ratio("720:1280"), (720, 1280));
    }

    #[test]
    fn test_parse_ratio_malformed_falls_back() {
        assert_eq!(parse_ratio(""), (1280, 720));
        assert_eq!(parse_ratio("widescreen"), (1280, 720));
        assert_eq!(parse_ratio("1280"), (1280, 720));
        assert_eq!(parse_ratio("0:720"), (1280, 720));
        assert_eq!(parse_ratio("-1:720"), (1280, 720));
        assert_eq!(parse_ratio("1280:720:1"), (1280, 720));
    }

    #[test]
    fn test_effective_duration() {
        // Explicit request wins.
        assert_eq!(
            effective_duration(ProviderKind::Runway, "gen4_turbo", Some(10)),
            10
        );
        // First supported duration from the catalog.
        assert_eq!(
            effective_duration(ProviderKind::Runway, "gen4_turbo", None),
            5
        );
        assert_eq!(
            effective_duration(ProviderKind::Runware, "minimax:1@1", None),
            6
        );
        // Unknown model: fixed fallback.
        assert_eq!(
            effective_duration(ProviderKind::Runway, "nonexistent", None),
            5
        );
    }
}
