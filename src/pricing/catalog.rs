//! Static model catalog.
//!
//! Read-only table keyed by (provider, model id). Lookups never fail beyond
//! "not found"; an absent entry means cost functions return zero/absent.

use serde::{Deserialize, Serialize};

use crate::task::ProviderKind;

/// Which generation paths a model supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    TextToVideo,
    ImageToVideo,
    Both,
}

impl ModelKind {
    /// A model tagged `Both` matches either concrete filter.
    pub fn matches(&self, filter: ModelKind) -> bool {
        *self == filter || *self == ModelKind::Both
    }
}

/// Immutable pricing/capability metadata for one model.
#[derive(Debug, Clone, Copy)]
pub struct PricingEntry {
    pub provider: ProviderKind,
    pub id: &'static str,
    pub display_name: &'static str,
    pub kind: ModelKind,
    /// Supported "W:H" resolution strings.
    pub ratios: &'static [&'static str],
    /// Allowed clip lengths in seconds; empty means the provider does not
    /// constrain duration.
    pub durations: &'static [u32],
    pub price_per_second: Option<f64>,
}

const RUNWAY_RATIOS: &[&str] = &[
    "1280:720",
    "720:1280",
    "1104:832",
    "832:1104",
    "960:960",
    "1584:672",
];

const RUNWAY_MODELS: &[PricingEntry] = &[
    PricingEntry {
        provider: ProviderKind::Runway,
        id: "veo3.1",
        display_name: "Veo 3.1 (Text to Video)",
        kind: ModelKind::TextToVideo,
        ratios: RUNWAY_RATIOS,
        durations: &[4, 8],
        price_per_second: Some(0.125),
    },
    PricingEntry {
        provider: ProviderKind::Runway,
        id: "gen4_turbo",
        display_name: "Gen-4 Turbo (Image to Video)",
        kind: ModelKind::ImageToVideo,
        ratios: RUNWAY_RATIOS,
        durations: &[5, 10],
        price_per_second: Some(0.1),
    },
];

const KLING_RATIOS: &[&str] = &["1280:720", "720:720", "720:1280"];
const MINIMAX_RATIOS: &[&str] = &["1366:768"];

const RUNWARE_MODELS: &[PricingEntry] = &[
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "klingai:3@1",
        display_name: "KlingAI 1.6 Standard",
        kind: ModelKind::Both,
        ratios: KLING_RATIOS,
        durations: &[5, 10],
        price_per_second: Some(0.045),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "klingai:4@3",
        display_name: "KlingAI 2.0 Master",
        kind: ModelKind::Both,
        ratios: KLING_RATIOS,
        durations: &[5, 10],
        price_per_second: Some(0.06),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "klingai:5@3",
        display_name: "KlingAI 2.1 Master (Best Quality)",
        kind: ModelKind::Both,
        ratios: &["1920:1080", "1080:1080", "1080:1920"],
        durations: &[5, 10],
        price_per_second: Some(0.08),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "klingai:6@1",
        display_name: "KlingAI 2.5 Turbo Pro",
        kind: ModelKind::Both,
        ratios: KLING_RATIOS,
        durations: &[5, 10],
        price_per_second: Some(0.055),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "minimax:1@1",
        display_name: "MiniMax Video-01 Base",
        kind: ModelKind::Both,
        ratios: MINIMAX_RATIOS,
        durations: &[6],
        price_per_second: Some(0.03),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "minimax:2@1",
        display_name: "MiniMax Video-01 Director",
        kind: ModelKind::Both,
        ratios: MINIMAX_RATIOS,
        durations: &[6],
        price_per_second: Some(0.04),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "minimax:2@3",
        display_name: "MiniMax Video-01 Live (Image Only)",
        kind: ModelKind::ImageToVideo,
        ratios: MINIMAX_RATIOS,
        durations: &[6],
        price_per_second: Some(0.035),
    },
    PricingEntry {
        provider: ProviderKind::Runware,
        id: "openai:3@1",
        display_name: "SORA 2",
        kind: ModelKind::TextToVideo,
        ratios: &["1280:720", "720:1280"],
        durations: &[4, 8, 12],
        price_per_second: Some(0.1),
    },
];

/// All models for one provider.
pub fn models(provider: ProviderKind) -> &'static [PricingEntry] {
    match provider {
        ProviderKind::Runway => RUNWAY_MODELS,
        ProviderKind::Runware => RUNWARE_MODELS,
    }
}

/// Look up a model by (provider, id).
pub fn find_model(provider: ProviderKind, model_id: &str) -> Option<&'static PricingEntry> {
    models(provider).iter().find(|m| m.id == model_id)
}

/// Models for a provider, optionally filtered by generation kind.
pub fn models_for(
    provider: ProviderKind,
    filter: Option<ModelKind>,
) -> Vec<&'static PricingEntry> {
    models(provider)
        .iter()
        .filter(|m| filter.map_or(true, |f| m.kind.matches(f)))
        .collect()
}
