// Human-readable "why" lines and badges for a scored candidate

use crate::models::{RankedRecommendation, RecoContext, ScoredCandidate};
use crate::services::profile_builder::InferredProfile;

const MAX_REASONS: usize = 3;

/// Reasons in fixed priority order: distance, cost, weather, interest,
/// time of day. Only the first three that trigger are kept.
pub fn why(
    scored: &ScoredCandidate,
    context: &RecoContext,
    profile: &InferredProfile,
) -> Vec<String> {
    let c = &scored.candidate;
    let s = &scored.scores;
    let mut reasons = Vec::with_capacity(MAX_REASONS);

    if s.travel > 0.8 {
        match c.distance_km {
            Some(d) if d <= 1.0 => reasons.push("walking distance".to_string()),
            Some(d) if d <= 3.0 => reasons.push(format!("{:.1}km", d)),
            _ => {}
        }
    }

    if s.cost > 0.8 {
        if c.is_free() {
            reasons.push("free".to_string());
        } else {
            reasons.push("affordable".to_string());
        }
    }

    if s.weather_fit > 0.8 {
        if c.indoor {
            reasons.push("rain-friendly indoor".to_string());
        } else {
            reasons.push("great outdoors".to_string());
        }
    }

    if s.relevance > 0.7 {
        if let Some(tag) = c.tags.iter().find(|t| profile.interest(t) > 0.3) {
            reasons.push(format!("because you like {}", tag));
        }
    }

    match context.hour {
        9..=11 => reasons.push("great for morning".to_string()),
        14..=16 => reasons.push("good afternoon pick".to_string()),
        _ => {}
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

pub fn badges(scored: &ScoredCandidate) -> Vec<String> {
    let s = &scored.scores;
    let mut badges = Vec::new();

    if s.relevance > 0.8 {
        badges.push("recommended".to_string());
    }
    if s.travel > 0.9 {
        badges.push("nearby".to_string());
    }
    if s.cost > 0.9 {
        badges.push("great value".to_string());
    }
    if s.weather_fit > 0.9 {
        badges.push("good weather match".to_string());
    }
    if !scored.candidate.accessibility.is_empty() {
        badges.push("accessible".to_string());
    }

    badges
}

pub fn annotate(
    scored: ScoredCandidate,
    context: &RecoContext,
    profile: &InferredProfile,
) -> RankedRecommendation {
    let why = why(&scored, context, profile);
    let badges = badges(&scored);
    RankedRecommendation {
        score: scored.scores.total,
        candidate: scored.candidate,
        why,
        badges,
    }
}
