//! Cost computation.
//!
//! All functions here are deterministic and total: unknown models yield
//! zero/absent rather than errors. Totals are exact products; rounding is a
//! presentation concern and does not happen at this layer.

use serde::{Deserialize, Serialize};

use super::catalog;
use crate::task::{ProviderKind, Task, TaskStatus};

/// Structured record of the inputs used to compute a task's final cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub model: String,
    pub duration: u32,
    pub price_per_second: f64,
    pub total: f64,
}

/// Price per second for a model, if the catalog knows one.
pub fn price_per_second(provider: ProviderKind, model_id: &str) -> Option<f64> {
    catalog::find_model(provider, model_id).and_then(|m| m.price_per_second)
}

/// Estimated cost for a clip; 0.0 when the model has no known price.
pub fn estimate_cost(provider: ProviderKind, model_id: &str, duration_seconds: u32) -> f64 {
    price_per_second(provider, model_id)
        .map(|price| price * duration_seconds as f64)
        .unwrap_or(0.0)
}

/// Breakdown for a computed total; `None` when the model has no known price.
pub fn build_breakdown(
    provider: ProviderKind,
    model_id: &str,
    duration_seconds: u32,
    total: f64,
) -> Option<CostBreakdown> {
    let price = price_per_second(provider, model_id)?;
    Some(CostBreakdown {
        model: model_id.to_string(),
        duration: duration_seconds,
        price_per_second: price,
        total,
    })
}

/// Attach final cost data to a task that has reached SUCCEEDED.
///
/// No-op for non-terminal or FAILED tasks, for tasks whose cost is already
/// attached, and for models without a known price. Idempotent.
pub fn attach_final_cost(task: &mut Task) {
    if task.status != TaskStatus::Succeeded || task.cost.is_some() {
        return;
    }
    let Some(total) = task.estimated_cost else {
        return;
    };
    task.cost = Some(total);
    task.cost_breakdown = build_breakdown(task.provider, &task.model, task.duration_seconds, total);
}
