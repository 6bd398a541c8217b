//! Candidate Scoring
//!
//! Multi-factor linear score, every factor in [0, 1]:
//!
//! total = 0.45·relevance + 0.20·travel + 0.15·cost + 0.10·weather_fit + 0.10·quiet_safety
//!
//! A novelty factor is drawn from the injected RNG and kept on the
//! breakdown, outside the weighted total.

use crate::models::{
    Candidate, CostPreference, Mode, RecoContext, ScoreBreakdown, ScoredCandidate, WeatherKind,
};
use crate::services::profile_builder::InferredProfile;
use rand::Rng;

const RELEVANCE_WEIGHT: f64 = 0.45;
const TRAVEL_WEIGHT: f64 = 0.20;
const COST_WEIGHT: f64 = 0.15;
const WEATHER_WEIGHT: f64 = 0.10;
const QUIET_SAFETY_WEIGHT: f64 = 0.10;

const UNKNOWN_DISTANCE_SCORE: f64 = 0.7;
const UNKNOWN_PRICE_SCORE: f64 = 0.8;
const UNKNOWN_WEATHER_SCORE: f64 = 0.8;

#[derive(Debug, Default, Clone, Copy)]
pub struct CandidateScorer;

impl CandidateScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score<R: Rng + ?Sized>(
        &self,
        candidate: Candidate,
        context: &RecoContext,
        profile: &InferredProfile,
        rng: &mut R,
    ) -> ScoredCandidate {
        let relevance = relevance(&candidate, profile);
        let travel = travel(candidate.distance_km, profile.distance_km_tolerance);
        let cost = cost(&candidate, profile.cost_preference);
        let weather_fit = weather_fit(&candidate, context.weather.as_deref());
        let quiet_safety = quiet_safety(&candidate, profile);

        let total = RELEVANCE_WEIGHT * relevance
            + TRAVEL_WEIGHT * travel
            + COST_WEIGHT * cost
            + WEATHER_WEIGHT * weather_fit
            + QUIET_SAFETY_WEIGHT * quiet_safety;

        let novelty = 0.5 + rng.gen::<f64>() * 0.3;

        ScoredCandidate {
            candidate,
            scores: ScoreBreakdown {
                relevance,
                travel,
                cost,
                weather_fit,
                quiet_safety,
                novelty,
                total,
            },
        }
    }
}

pub fn relevance(candidate: &Candidate, profile: &InferredProfile) -> f64 {
    let tag_match: f64 = candidate.tags.iter().map(|t| profile.interest(t)).sum();
    (profile.category(&candidate.category) + 0.5 * tag_match).min(1.0)
}

pub fn travel(distance_km: Option<f64>, tolerance_km: f64) -> f64 {
    let Some(distance) = distance_km else {
        return UNKNOWN_DISTANCE_SCORE;
    };
    let ratio = distance.max(0.0) / tolerance_km.max(f64::EPSILON);
    if ratio <= 1.0 {
        1.0 - 0.3 * ratio
    } else {
        (0.7 - 0.5 * (ratio - 1.0)).max(0.1)
    }
}

pub fn cost(candidate: &Candidate, preference: CostPreference) -> f64 {
    if candidate.price.is_none() {
        return UNKNOWN_PRICE_SCORE;
    }
    let free = candidate.is_free();
    match preference {
        CostPreference::Free => {
            if free {
                1.0
            } else {
                0.2
            }
        }
        CostPreference::Low => {
            if free {
                1.0
            } else if candidate.discounted {
                0.8
            } else {
                0.5
            }
        }
        CostPreference::Any => {
            if free {
                1.0
            } else {
                0.7
            }
        }
    }
}

pub fn weather_fit(candidate: &Candidate, weather: Option<&str>) -> f64 {
    match (WeatherKind::parse(weather), candidate.indoor) {
        (WeatherKind::Rain, true) => 1.0,
        (WeatherKind::Rain, false) => 0.3,
        (WeatherKind::Clear, false) => 1.0,
        (WeatherKind::Clear, true) => 0.7,
        (WeatherKind::Unknown, _) => UNKNOWN_WEATHER_SCORE,
    }
}

pub fn quiet_safety(candidate: &Candidate, profile: &InferredProfile) -> f64 {
    let mut score: f64 = 0.5;
    if profile.quiet_needed && candidate.quiet {
        score += 0.3;
    } else if !profile.quiet_needed && !candidate.quiet {
        score += 0.1;
    }
    if profile.mode == Mode::Learner && !candidate.accessibility.is_empty() {
        score += 0.2;
    }
    score.min(1.0)
}
