use serde::{Deserialize, Serialize};

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Snap both axes to the nearest multiple of `grid_deg`
    pub fn snapped(&self, grid_deg: f64) -> Self {
        if grid_deg <= 0.0 {
            return *self;
        }
        Self {
            lat: snap(self.lat, grid_deg),
            lng: snap(self.lng, grid_deg),
        }
    }
}

fn snap(value: f64, grid: f64) -> f64 {
    let snapped = (value / grid).round() * grid;
    // Trim float noise such as 40.005000000000003
    (snapped * 1e6).round() / 1e6
}

/// Who the recommendations are for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Learner,
    Family,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Learner => "learner",
            Mode::Family => "family",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CostPreference {
    Free,
    Low,
    #[default]
    Any,
}

impl CostPreference {
    /// Classify from the share of free-leaning observations
    pub fn from_free_ratio(free_ratio: f64) -> Self {
        if free_ratio > 0.8 {
            CostPreference::Free
        } else if free_ratio > 0.5 {
            CostPreference::Low
        } else {
            CostPreference::Any
        }
    }
}

/// Coarse weather bucket used by scoring and inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Rain,
    Clear,
    Unknown,
}

impl WeatherKind {
    pub fn parse(weather: Option<&str>) -> Self {
        let Some(raw) = weather else {
            return WeatherKind::Unknown;
        };
        let lowered = raw.to_ascii_lowercase();
        if ["rain", "drizzle", "storm", "shower"]
            .iter()
            .any(|w| lowered.contains(w))
        {
            WeatherKind::Rain
        } else if ["clear", "sun", "fair"].iter().any(|w| lowered.contains(w)) {
            WeatherKind::Clear
        } else {
            WeatherKind::Unknown
        }
    }
}

/// Catalog item supplied by the upstream catalog adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "distanceKm")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Marked as discounted by the catalog
    #[serde(default)]
    pub discounted: bool,
    #[serde(default)]
    pub indoor: bool,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub accessibility: Vec<String>,
}

impl Candidate {
    pub fn is_free(&self) -> bool {
        matches!(self.price, Some(p) if p <= 0.0)
    }
}

/// Request-time context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoContext {
    #[serde(default)]
    pub mode: Mode,
    pub hour: u32,
    #[serde(default)]
    pub weather: Option<String>,
}

impl RecoContext {
    pub fn new(mode: Mode, hour: u32) -> Self {
        Self {
            mode,
            hour,
            weather: None,
        }
    }

    pub fn with_weather(mut self, weather: impl Into<String>) -> Self {
        self.weather = Some(weather.into());
        self
    }
}

/// Per-factor scores of one candidate, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub relevance: f64,
    pub travel: f64,
    pub cost: f64,
    pub weather_fit: f64,
    pub quiet_safety: f64,
    /// Computed for future blending; not part of `total`
    pub novelty: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub scores: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn total(&self) -> f64 {
        self.scores.total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    /// At most three short justifications
    pub why: Vec<String>,
    pub badges: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_snap_to_grid() {
        let p = GeoPoint::new(40.7128, -74.0061).snapped(0.005);
        assert!((p.lat - 40.715).abs() < 1e-9);
        assert!((p.lng - (-74.005)).abs() < 1e-9);
    }

    #[test]
    fn test_cost_preference_thresholds() {
        assert_eq!(CostPreference::from_free_ratio(0.9), CostPreference::Free);
        assert_eq!(CostPreference::from_free_ratio(0.6), CostPreference::Low);
        assert_eq!(CostPreference::from_free_ratio(0.3), CostPreference::Any);
        assert_eq!(CostPreference::from_free_ratio(0.8), CostPreference::Low);
    }

    #[test]
    fn test_weather_parse() {
        assert_eq!(WeatherKind::parse(Some("Light Rain")), WeatherKind::Rain);
        assert_eq!(WeatherKind::parse(Some("sunny")), WeatherKind::Clear);
        assert_eq!(WeatherKind::parse(Some("cloudy")), WeatherKind::Unknown);
        assert_eq!(WeatherKind::parse(None), WeatherKind::Unknown);
    }

    #[test]
    fn test_candidate_accepts_camel_case_distance() {
        let c: Candidate = serde_json::from_str(
            r#"{"id":"p1","category":"park","distanceKm":1.5,"price":0}"#,
        )
        .unwrap();
        assert_eq!(c.distance_km, Some(1.5));
        assert!(c.is_free());
        assert!(c.tags.is_empty());
    }
}
