//! Submission entry point.
//!
//! Validates required fields before any remote call is made, dispatches to
//! the adapter selected by the request's provider tag, and returns the
//! resulting task unmodified. Adapters are explicit dependencies injected at
//! construction time; a provider without a configured API key is simply
//! absent and its submissions are rejected.

use std::sync::Arc;

use crate::config::Config;
use crate::error::GatewayError;
use crate::providers::{
    ImageToVideoRequest, Provider, RunwareClient, RunwayClient, StatusSource, TextToVideoRequest,
};
use crate::task::{ProviderKind, Task};

const DEFAULT_RATIO: &str = "1280:720";
const DEFAULT_TEXT_DURATION: u32 = 4;

/// Raw text-to-video submission as received from the consumer.
#[derive(Debug, Clone, Default)]
pub struct TextSubmission {
    pub provider: Option<String>,
    pub prompt_text: Option<String>,
    pub model_id: Option<String>,
    pub ratio: Option<String>,
    pub duration_seconds: Option<u32>,
}

/// Raw image-to-video submission as received from the consumer.
///
/// The encoded image payload is handed to the adapter and not retained
/// beyond the call.
#[derive(Debug, Clone, Default)]
pub struct ImageSubmission {
    pub provider: Option<String>,
    pub image_data: Option<String>,
    pub model_id: Option<String>,
    pub ratio: Option<String>,
    pub duration_seconds: Option<u32>,
    pub prompt_text: Option<String>,
}

/// Dispatches submissions to the configured provider adapters.
pub struct Orchestrator {
    runway: Option<Provider>,
    runware: Option<Provider>,
}

impl Orchestrator {
    /// Build adapters for every provider with a configured API key.
    pub fn from_config(config: &Config) -> Self {
        let runway = config.runway_api_key.clone().map(|key| {
            Provider::Runway(Arc::new(RunwayClient::with_base_url(
                key,
                config.runway_base_url.clone(),
            )))
        });
        let runware = config.runware_api_key.clone().map(|key| {
            Provider::Runware(Arc::new(RunwareClient::with_base_url(
                key,
                config.runware_base_url.clone(),
            )))
        });
        Self::new(runway, runware)
    }

    pub fn new(runway: Option<Provider>, runware: Option<Provider>) -> Self {
        Self { runway, runware }
    }

    /// Validate and dispatch a text-to-video submission.
    pub async fn submit_text(&self, submission: TextSubmission) -> Result<Task, GatewayError> {
        let provider = self.provider_for(submission.provider.as_deref())?;
        let prompt_text = require(submission.prompt_text, "promptText")?;
        let model_id = require(submission.model_id, "modelId")?;

        let request = TextToVideoRequest {
            prompt_text,
            model_id,
            ratio: submission
                .ratio
                .unwrap_or_else(|| DEFAULT_RATIO.to_string()),
            duration_seconds: submission.duration_seconds.unwrap_or(DEFAULT_TEXT_DURATION),
        };

        let task = provider.submit_text(&request).await?;
        tracing::info!(
            id = %task.id,
            provider = %task.provider,
            status = %task.status,
            "created text-to-video task"
        );
        Ok(task)
    }

    /// Validate and dispatch an image-to-video submission.
    pub async fn submit_image(&self, submission: ImageSubmission) -> Result<Task, GatewayError> {
        let provider = self.provider_for(submission.provider.as_deref())?;
        let image_data = require(submission.image_data, "imageData")?;
        let model_id = require(submission.model_id, "modelId")?;

        let request = ImageToVideoRequest {
            image_data,
            model_id,
            ratio: submission
                .ratio
                .unwrap_or_else(|| DEFAULT_RATIO.to_string()),
            duration_seconds: submission.duration_seconds,
            prompt_text: submission.prompt_text,
        };

        let task = provider.submit_image(&request).await?;
        tracing::info!(
            id = %task.id,
            provider = %task.provider,
            status = %task.status,
            "created image-to-video task"
        );
        Ok(task)
    }

    /// Status-polling source for a provider's tasks, when it has one.
    pub fn status_source(&self, kind: ProviderKind) -> Option<Arc<dyn StatusSource>> {
        self.adapter(kind).and_then(Provider::status_source)
    }

    fn adapter(&self, kind: ProviderKind) -> Option<&Provider> {
        match kind {
            ProviderKind::Runway => self.runway.as_ref(),
            ProviderKind::Runware => self.runware.as_ref(),
        }
    }

    /// Resolve a submission's provider tag to a configured adapter.
    fn provider_for(&self, tag: Option<&str>) -> Result<&Provider, GatewayError> {
        let tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingField("provider"))?;
        let kind = ProviderKind::parse(tag)
            .ok_or_else(|| GatewayError::UnsupportedProvider(tag.to_string()))?;
        self.adapter(kind).ok_or(GatewayError::NotConfigured(kind))
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String, GatewayError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingField(field))
}
