// ============================================
// Profile Updater (增量更新)
// ============================================
//
// Folds a one-signal profile into a carried-forward profile:
// - weight maps: per-key linear blend with α, renormalized
// - cost preference, mode: replaced by the fresh value
// - indoor preference, quiet needed: held
// - distance tolerance: old × (1 − α) + new × α
// - confidence: +0.1 per update, capped at 1.0

use super::InferredProfile;
use crate::utils::normalize_weights;
use std::collections::HashMap;

const CONFIDENCE_STEP: f64 = 0.1;

pub fn merge(old: &InferredProfile, fresh: &InferredProfile, alpha: f64) -> InferredProfile {
    InferredProfile {
        interest_weights: blend_weights(&old.interest_weights, &fresh.interest_weights, alpha),
        category_weights: blend_weights(&old.category_weights, &fresh.category_weights, alpha),
        cost_preference: fresh.cost_preference,
        // Held per event to avoid oscillation
        indoor_preference: old.indoor_preference,
        quiet_needed: old.quiet_needed,
        distance_km_tolerance: old.distance_km_tolerance * (1.0 - alpha)
            + fresh.distance_km_tolerance * alpha,
        time_window: fresh.time_window.clone(),
        mode: fresh.mode,
        confidence: (old.confidence + CONFIDENCE_STEP).min(1.0).max(old.confidence),
    }
}

/// An empty fresh map carries no evidence and leaves `old` untouched
fn blend_weights(
    old: &HashMap<String, f64>,
    fresh: &HashMap<String, f64>,
    alpha: f64,
) -> HashMap<String, f64> {
    if fresh.is_empty() {
        return old.clone();
    }

    let mut blended: HashMap<String, f64> = old
        .iter()
        .map(|(k, w)| (k.clone(), w * (1.0 - alpha)))
        .collect();
    for (k, w) in fresh {
        *blended.entry(k.clone()).or_insert(0.0) += w * alpha;
    }

    normalize_weights(blended)
}
