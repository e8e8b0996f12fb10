//! Pricing module - model catalog and cost computation.
//!
//! # Key Concepts
//! - Catalog: static table of providers -> models -> pricing/capability metadata
//! - Cost: pure functions turning (provider, model, duration) into an
//!   estimated cost and a structured breakdown

pub mod catalog;
pub mod cost;

pub use catalog::{find_model, models_for, ModelKind, PricingEntry};
pub use cost::{attach_final_cost, build_breakdown, estimate_cost, price_per_second, CostBreakdown};
