//! Gateway-level error taxonomy.

use axum::http::StatusCode;

use crate::providers::ProviderError;
use crate::task::ProviderKind;

/// Errors surfaced to API consumers.
///
/// Validation errors are rejected before any remote call is made; remote
/// failures during submission abort the whole operation. Nothing here is
/// fatal to the process; every failure is scoped to a single task.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("provider {0} is not configured (missing API key)")]
    NotConfigured(ProviderKind),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingField(_) | GatewayError::UnsupportedProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
