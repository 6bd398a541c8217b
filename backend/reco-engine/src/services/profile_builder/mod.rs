// ============================================
// Profile Inference (用戶畫像推斷)
// ============================================
//
// Builds a preference profile from the signals of one anonymous session.
// Stateless: the profile is recomputed on demand, and callers that want
// to carry one forward do so through `update_profile`.
//
// ┌──────────────────────────────────────────────────────────┐
// │                    ProfileInference                      │
// ├──────────────────────────────────────────────────────────┤
// │  < threshold signals         ≥ threshold signals         │
// │  ┌─────────────────┐        ┌──────────────────────┐     │
// │  │   cold_start    │        │ preference_builder   │     │
// │  │ (time heuristic)│        │ (per-field stats)    │     │
// │  └─────────────────┘        └──────────────────────┘     │
// │                                                          │
// │  update_profile ──► profile_updater (α-blend one signal) │
// └──────────────────────────────────────────────────────────┘

pub mod cold_start;
pub mod preference_builder;
pub mod profile_updater;

use crate::config::InferenceConfig;
use crate::models::{CostPreference, Mode, RecoContext, WeatherKind};
use crate::services::telemetry::SessionSignal;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Floor for every profile's confidence
pub const MIN_CONFIDENCE: f64 = 0.1;

const CATEGORY_PRIOR: &[(&str, f64)] = &[
    ("park", 0.25),
    ("museum", 0.20),
    ("library", 0.20),
    ("playground", 0.15),
    ("event", 0.10),
    ("bookstore", 0.10),
];

const INTEREST_PRIOR: &[(&str, f64)] = &[
    ("outdoor", 0.30),
    ("science", 0.25),
    ("art", 0.25),
    ("reading", 0.20),
];

pub fn category_prior() -> HashMap<String, f64> {
    CATEGORY_PRIOR
        .iter()
        .map(|(k, w)| (k.to_string(), *w))
        .collect()
}

pub fn interest_prior() -> HashMap<String, f64> {
    INTEREST_PRIOR
        .iter()
        .map(|(k, w)| (k.to_string(), *w))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredProfile {
    /// Tag weights, summing to 1 (or empty)
    pub interest_weights: HashMap<String, f64>,
    /// Category weights, summing to 1
    pub category_weights: HashMap<String, f64>,
    pub cost_preference: CostPreference,
    pub indoor_preference: bool,
    pub quiet_needed: bool,
    pub distance_km_tolerance: f64,
    pub time_window: String,
    pub mode: Mode,
    /// In [MIN_CONFIDENCE, 1]
    pub confidence: f64,
}

impl InferredProfile {
    /// Generic profile used when the caller has none; depends only on the
    /// request context.
    pub fn default_for(context: &RecoContext) -> Self {
        Self {
            interest_weights: HashMap::new(),
            category_weights: category_prior(),
            cost_preference: CostPreference::Any,
            indoor_preference: WeatherKind::parse(context.weather.as_deref()) == WeatherKind::Rain,
            quiet_needed: false,
            distance_km_tolerance: preference_builder::DEFAULT_DISTANCE_KM,
            time_window: time_window(context.hour),
            mode: context.mode,
            confidence: MIN_CONFIDENCE,
        }
    }

    pub fn interest(&self, tag: &str) -> f64 {
        self.interest_weights.get(tag).copied().unwrap_or(0.0)
    }

    pub fn category(&self, category: &str) -> f64 {
        self.category_weights.get(category).copied().unwrap_or(0.0)
    }
}

/// "today H:00–H′:00", ending three hours later but no later than 18:00
/// (20:00 from 16h on)
pub fn time_window(hour: u32) -> String {
    let hour = hour.min(23);
    let cap = if hour < 16 { 18 } else { 20 };
    let mut end = (hour + 3).min(cap);
    if end <= hour {
        end = (hour + 1).min(24);
    }
    format!("today {}:00–{}:00", hour, end)
}

pub struct ProfileInference {
    config: InferenceConfig,
}

impl Default for ProfileInference {
    fn default() -> Self {
        Self::new(InferenceConfig::default())
    }
}

impl ProfileInference {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn infer_profile(&self, signals: &[SessionSignal]) -> InferredProfile {
        self.infer_profile_at(signals, Local::now())
    }

    /// Same as `infer_profile` with an explicit clock
    pub fn infer_profile_at(&self, signals: &[SessionSignal], now: DateTime<Local>) -> InferredProfile {
        if signals.len() < self.config.cold_start_threshold {
            let profile = cold_start::cold_start_profile(signals, now);
            debug!(
                signal_count = signals.len(),
                mode = profile.mode.as_str(),
                "Cold-start profile"
            );
            return profile;
        }

        let profile = preference_builder::build_profile(signals, now, self.config.half_life_days);
        debug!(
            signal_count = signals.len(),
            confidence = profile.confidence,
            mode = profile.mode.as_str(),
            tolerance_km = profile.distance_km_tolerance,
            "Inferred profile"
        );
        profile
    }

    pub fn update_profile(&self, profile: &InferredProfile, new_signal: &SessionSignal) -> InferredProfile {
        self.update_profile_at(profile, new_signal, Local::now())
    }

    pub fn update_profile_at(
        &self,
        profile: &InferredProfile,
        new_signal: &SessionSignal,
        now: DateTime<Local>,
    ) -> InferredProfile {
        let signals = std::slice::from_ref(new_signal);
        let mut fresh = preference_builder::build_profile(signals, now, self.config.half_life_days);
        // No category evidence means nothing to blend, not a pull toward the prior
        fresh.category_weights = preference_builder::observed_category_weights(signals);
        profile_updater::merge(profile, &fresh, self.config.mixing_alpha)
    }
}
