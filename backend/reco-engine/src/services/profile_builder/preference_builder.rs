// ============================================
// Preference Builder (偏好統計)
// ============================================
//
// Warm-path statistics. Each profile field is computed independently
// from the session signals:
//
// interest   = Σ decay(7d) × min(1, dwell/30s) × min(1, scroll/0.8) per tag
// category   = Σ dwell seconds (view_item) + 1 (content_theme), normalized
// cost       = free / (free + paid + 1)
// indoor     = rainy-or-night share > 0.3 AND indoor view share > 0.6
// quiet      = library view share > 0.3 AND library dwell > 1.5 × other dwell
// distance   = p80 of observed distances
// confidence = mean(volume/20, distinct events/5, hour span/2)

use super::{category_prior, time_window, InferredProfile, MIN_CONFIDENCE};
use crate::models::{CostPreference, Mode, WeatherKind};
use crate::services::telemetry::{EventPayload, SessionSignal, ViewItem};
use crate::utils::{exponential_decay, normalize_weights, percentile};
use chrono::{DateTime, Local, Timelike, Utc};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_DISTANCE_KM: f64 = 5.0;
/// Keeps the tolerance strictly positive when every observation is 0 km
const MIN_DISTANCE_KM: f64 = 0.1;
const FULL_DWELL_MS: f64 = 30_000.0;
const FULL_SCROLL_DEPTH: f64 = 0.8;
const LIBRARY_CATEGORY: &str = "library";

pub fn build_profile(signals: &[SessionSignal], now: DateTime<Local>, half_life_days: f64) -> InferredProfile {
    let now_utc = now.with_timezone(&Utc);

    InferredProfile {
        interest_weights: interest_weights(signals, now_utc, half_life_days),
        category_weights: category_weights(signals),
        cost_preference: cost_preference(signals),
        indoor_preference: indoor_preference(signals),
        quiet_needed: quiet_needed(signals),
        distance_km_tolerance: distance_tolerance(signals),
        time_window: time_window(now.hour()),
        mode: infer_mode(signals),
        confidence: confidence(signals),
    }
}

fn views(signals: &[SessionSignal]) -> impl Iterator<Item = (&SessionSignal, &ViewItem)> {
    signals.iter().filter_map(|s| match &s.event.payload {
        EventPayload::ViewItem(view) => Some((s, view)),
        _ => None,
    })
}

pub fn interest_weights(
    signals: &[SessionSignal],
    now: DateTime<Utc>,
    half_life_days: f64,
) -> HashMap<String, f64> {
    let mut weights: HashMap<String, f64> = HashMap::new();

    for (signal, view) in views(signals) {
        let age_days = (now - signal.ts()).num_milliseconds() as f64 / 86_400_000.0;
        let decay = exponential_decay(age_days, half_life_days);
        let dwell = (view.dwell_ms.unwrap_or(0) as f64 / FULL_DWELL_MS).min(1.0);
        let scroll = (view.scroll_depth.unwrap_or(0.0) / FULL_SCROLL_DEPTH).clamp(0.0, 1.0);

        let weight = decay * dwell * scroll;
        if weight <= 0.0 {
            continue;
        }
        for tag in &view.tags {
            *weights.entry(tag.clone()).or_insert(0.0) += weight;
        }
    }

    normalize_weights(weights)
}

/// Category weights, falling back to the prior when nothing was observed
pub fn category_weights(signals: &[SessionSignal]) -> HashMap<String, f64> {
    let observed = observed_category_weights(signals);
    if observed.is_empty() {
        category_prior()
    } else {
        observed
    }
}

/// Category weights from category-bearing events only; empty without evidence
pub fn observed_category_weights(signals: &[SessionSignal]) -> HashMap<String, f64> {
    let mut weights: HashMap<String, f64> = HashMap::new();

    for signal in signals {
        match &signal.event.payload {
            EventPayload::ViewItem(view) => {
                if let Some(category) = &view.category {
                    let seconds = view.dwell_ms.unwrap_or(0) as f64 / 1000.0;
                    *weights.entry(category.clone()).or_insert(0.0) += seconds;
                }
            }
            EventPayload::ContentTheme(theme) => {
                *weights.entry(theme.category.clone()).or_insert(0.0) += 1.0;
            }
            _ => {}
        }
    }

    normalize_weights(weights)
}

pub fn cost_preference(signals: &[SessionSignal]) -> CostPreference {
    let mut free = 0usize;
    let mut paid = 0usize;

    for signal in signals {
        match &signal.event.payload {
            EventPayload::FilterApply(filter) if filter.free_only == Some(true) => free += 1,
            EventPayload::ViewItem(view) => match view.price {
                Some(price) if price <= 0.0 => free += 1,
                Some(_) => paid += 1,
                None => {}
            },
            _ => {}
        }
    }

    let free_ratio = free as f64 / (free + paid + 1) as f64;
    CostPreference::from_free_ratio(free_ratio)
}

fn is_night(hour: u32) -> bool {
    hour >= 19 || hour < 6
}

pub fn indoor_preference(signals: &[SessionSignal]) -> bool {
    if signals.is_empty() {
        return false;
    }

    let rainy_or_night = signals
        .iter()
        .filter(|s| {
            WeatherKind::parse(s.context.weather.as_deref()) == WeatherKind::Rain
                || is_night(s.context.hour)
        })
        .count();
    let rainy_or_night_ratio = rainy_or_night as f64 / signals.len() as f64;

    let (view_count, indoor_views) = views(signals).fold((0usize, 0usize), |(n, indoor), (_, v)| {
        (n + 1, indoor + usize::from(v.indoor == Some(true)))
    });
    if view_count == 0 {
        return false;
    }
    let indoor_ratio = indoor_views as f64 / view_count as f64;

    rainy_or_night_ratio > 0.3 && indoor_ratio > 0.6
}

pub fn quiet_needed(signals: &[SessionSignal]) -> bool {
    let mut library_dwell = Vec::new();
    let mut other_dwell = Vec::new();

    for (_, view) in views(signals) {
        let dwell = view.dwell_ms.unwrap_or(0) as f64;
        if view.category.as_deref() == Some(LIBRARY_CATEGORY) {
            library_dwell.push(dwell);
        } else {
            other_dwell.push(dwell);
        }
    }

    let total = library_dwell.len() + other_dwell.len();
    if library_dwell.is_empty() {
        return false;
    }
    let library_share = library_dwell.len() as f64 / total as f64;

    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };

    library_share > 0.3 && mean(&library_dwell) > 1.5 * mean(&other_dwell)
}

pub fn distance_tolerance(signals: &[SessionSignal]) -> f64 {
    let observed: Vec<f64> = signals
        .iter()
        .filter_map(|s| match &s.event.payload {
            EventPayload::ViewItem(view) => view.distance_km,
            EventPayload::FilterApply(filter) => filter.distance_km,
            _ => None,
        })
        .filter(|d| d.is_finite() && *d >= 0.0)
        .collect();

    percentile(&observed, 0.8)
        .map(|p80| p80.max(MIN_DISTANCE_KM))
        .unwrap_or(DEFAULT_DISTANCE_KM)
}

pub fn infer_mode(signals: &[SessionSignal]) -> Mode {
    let kid_safe = signals.iter().filter(|s| s.event.payload.is_kid_safe()).count();
    if kid_safe > 2 {
        return Mode::Learner;
    }

    let parent_hints = signals
        .iter()
        .filter(|s| s.event.payload.is_parent_hint())
        .count();
    if parent_hints > 1 {
        return Mode::Family;
    }

    Mode::Learner
}

pub fn confidence(signals: &[SessionSignal]) -> f64 {
    if signals.is_empty() {
        return MIN_CONFIDENCE;
    }

    let volume = (signals.len() as f64 / 20.0).min(1.0);

    let distinct: HashSet<&str> = signals.iter().map(|s| s.event.name()).collect();
    let diversity = (distinct.len() as f64 / 5.0).min(1.0);

    let (min_hour, max_hour) = signals.iter().fold((u32::MAX, 0u32), |(lo, hi), s| {
        (lo.min(s.context.hour), hi.max(s.context.hour))
    });
    let time_span = ((max_hour - min_hour) as f64 / 2.0).min(1.0);

    ((volume + diversity + time_span) / 3.0).max(MIN_CONFIDENCE)
}
