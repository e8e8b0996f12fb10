//! Task model - the normalized, in-memory record of one generation request.
//!
//! A `Task` is created by the orchestrator in response to a submission and is
//! updated only by the adapter that created it, the polling controller, and
//! the cost-attachment step once the task succeeds.
//!
//! # Invariants
//! - `status` only moves forward: PENDING -> RUNNING -> {SUCCEEDED, FAILED},
//!   or PENDING -> terminal directly. Terminal states never revert.
//! - `output` is non-empty only when SUCCEEDED; `error_message` only when FAILED.
//! - `cost`/`cost_breakdown` are set only alongside (or after) SUCCEEDED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::CostBreakdown;

/// Which remote generation service handles a task.
///
/// Exactly one provider handles a given task for its entire lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Job-based provider: create returns an id that must be polled.
    Runway,
    /// Immediate-result provider: the call blocks until a final result.
    Runware,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Runway, ProviderKind::Runware];

    /// Whether tasks from this provider carry a remote job id and are polled.
    pub fn is_job_based(&self) -> bool {
        matches!(self, ProviderKind::Runway)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Runway => "runway",
            ProviderKind::Runware => "runware",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Runway => "RunwayML",
            ProviderKind::Runware => "Runware",
        }
    }

    /// Parse a provider tag as it appears in submission requests.
    pub fn parse(tag: &str) -> Option<ProviderKind> {
        match tag {
            "runway" => Some(ProviderKind::Runway),
            "runware" => Some(ProviderKind::Runware),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// SUCCEEDED and FAILED are terminal; no further transitions permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Running => 1,
            TaskStatus::Succeeded | TaskStatus::Failed => 2,
        }
    }

    /// Apply a freshly-mapped remote status on top of the current one,
    /// never moving backwards and never leaving a terminal state.
    pub fn advance(self, next: TaskStatus) -> TaskStatus {
        if self.is_terminal() || next.rank() < self.rank() {
            self
        } else {
            next
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// The central entity: one generation request's lifecycle.
///
/// Serialized camelCase to match the consumer wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Provider-assigned for job-based tasks, locally generated otherwise.
    pub id: String,
    pub provider: ProviderKind,
    pub status: TaskStatus,
    /// Identifier into the pricing catalog.
    pub model: String,
    /// Requested/assumed clip length, required for cost computation.
    pub duration_seconds: u32,
    /// Fraction in [0,1]; only ever populated for job-based tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Result URLs; present only once SUCCEEDED.
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Computed at submission time; present iff the catalog knows a price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_breakdown: Option<CostBreakdown>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(ProviderKind::parse("runway"), Some(ProviderKind::Runway));
        assert_eq!(ProviderKind::parse("runware"), Some(ProviderKind::Runware));
        assert_eq!(ProviderKind::parse("replicate"), None);
        assert_eq!(ProviderKind::parse(""), None);
    }

    #[test]
    fn test_status_advance_forward_only() {
        use TaskStatus::*;

        assert_eq!(Pending.advance(Running), Running);
        assert_eq!(Pending.advance(Succeeded), Succeeded);
        assert_eq!(Running.advance(Failed), Failed);
        // An unrecognized remote status maps to PENDING; that must not
        // pull a RUNNING task backwards.
        assert_eq!(Running.advance(Pending), Running);
    }

    #[test]
    fn test_status_advance_terminal_is_sticky() {
        use TaskStatus::*;

        assert_eq!(Succeeded.advance(Running), Succeeded);
        assert_eq!(Succeeded.advance(Failed), Succeeded);
        assert_eq!(Failed.advance(Succeeded), Failed);
        assert_eq!(Failed.advance(Pending), Failed);
    }

    #[test]
    fn test_status_serde_wire_format() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Succeeded).unwrap(),
            "\"SUCCEEDED\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"PENDING\"").unwrap(),
            TaskStatus::Pending
        );
        assert_eq!(
            serde_json::to_string(&ProviderKind::Runway).unwrap(),
            "\"runway\""
        );
    }
}
