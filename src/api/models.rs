//! Catalog query endpoints.
//!
//! Read-only views over the static pricing catalog: list providers with
//! their models, or list one provider's models filtered by generation kind.

use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::pricing::{catalog, ModelKind, PricingEntry};
use crate::task::ProviderKind;

/// Create catalog routes.
pub fn routes() -> Router<Arc<super::routes::AppState>> {
    Router::new().route("/", get(list_models))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub provider: ProviderKind,
    /// Optional generation-kind filter; models tagged "both" match either.
    pub kind: Option<ModelKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub id: String,
    pub name: String,
    pub provider: ProviderKind,
    pub kind: ModelKind,
    pub supported_ratios: Vec<String>,
    pub supported_durations: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_second: Option<f64>,
}

impl From<&'static PricingEntry> for ModelResponse {
    fn from(entry: &'static PricingEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            name: entry.display_name.to_string(),
            provider: entry.provider,
            kind: entry.kind,
            supported_ratios: entry.ratios.iter().map(|r| r.to_string()).collect(),
            supported_durations: entry.durations.to_vec(),
            price_per_second: entry.price_per_second,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderResponse {
    pub id: ProviderKind,
    pub name: String,
    pub models: Vec<ModelResponse>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/models?provider=&kind= - list a provider's models.
async fn list_models(
    Query(query): Query<ModelsQuery>,
) -> Result<Json<Vec<ModelResponse>>, (StatusCode, String)> {
    let entries = catalog::models_for(query.provider, query.kind);
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// GET /api/providers - list all providers with their full catalogs.
pub async fn list_providers() -> Json<Vec<ProviderResponse>> {
    let providers = ProviderKind::ALL
        .into_iter()
        .map(|provider| ProviderResponse {
            id: provider,
            name: provider.display_name().to_string(),
            models: catalog::models_for(provider, None)
                .into_iter()
                .map(Into::into)
                .collect(),
        })
        .collect();
    Json(providers)
}
