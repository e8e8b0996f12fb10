//! # vidgate
//!
//! A backend gateway for AI video generation providers.
//!
//! This library provides:
//! - An HTTP API for submitting generation requests and tracking tasks
//! - Adapters normalizing two provider protocols into one task model
//! - Cost estimation from a static model/pricing catalog
//!
//! ## Architecture
//!
//! ```text
//!   consumer ──▶ Orchestrator ──▶ RunwayClient (job-based)
//!                      │               │ create/retrieve by id
//!                      │               ▼
//!                      │        PollingController ── repeated refresh
//!                      │
//!                      └───────▶ RunwareClient (immediate-result)
//!                                      │ blocks until final result
//!                                      ▼
//!                               normalized Task
//! ```
//!
//! ## Task Flow
//! 1. Receive submission via API, validate, dispatch by provider tag
//! 2. Job-based tasks are polled until terminal; immediate-result tasks
//!    come back terminal
//! 3. Cost is estimated at submission and finalized on success
//!
//! ## Modules
//! - `orchestrator`: submission validation and provider dispatch
//! - `providers`: the two remote service adapters
//! - `poll`: the polling state machine
//! - `pricing`: model catalog and cost computation

pub mod api;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poll;
pub mod pricing;
pub mod providers;
pub mod task;

pub use config::Config;
pub use error::GatewayError;
pub use task::{ProviderKind, Task, TaskStatus};
