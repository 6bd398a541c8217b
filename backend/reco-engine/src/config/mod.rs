use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub inference: InferenceConfig,
    pub ranking: RankingConfig,
    pub log_level: String,
    /// Fixed seed for exploration and jitter; entropy-seeded when absent
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Maximum signals per session before eviction kicks in
    pub max_records: usize,
    /// Share of the oldest records dropped once the cap is exceeded
    pub eviction_ratio: f64,
    pub session_timeout_secs: i64,
    /// Privacy grid for captured locations (~500 m at 0.005)
    pub location_grid_deg: f64,
    pub store: StoreBackend,
    pub redis_url: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            eviction_ratio: 0.05,
            session_timeout_secs: 30 * 60,
            location_grid_deg: 0.005,
            store: StoreBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Below this many signals the heuristic cold-start profile is used
    pub cold_start_threshold: usize,
    pub half_life_days: f64,
    /// Blend factor for incremental updates
    pub mixing_alpha: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            cold_start_threshold: 5,
            half_life_days: 7.0,
            mixing_alpha: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    pub mmr_lambda: f64,
    pub max_results: usize,
    pub max_same_category: usize,
    pub low_confidence_epsilon: f64,
    pub default_epsilon: f64,
    pub low_confidence_threshold: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            mmr_lambda: 0.7,
            max_results: 10,
            max_same_category: 2,
            low_confidence_epsilon: 0.25,
            default_epsilon: 0.10,
            low_confidence_threshold: 0.3,
        }
    }
}

impl Config {
    /// Load from `.env` and `RECO__SECTION__KEY` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let telemetry = TelemetryConfig::default();
        let inference = InferenceConfig::default();
        let ranking = RankingConfig::default();

        let config = config::Config::builder()
            .set_default("telemetry.max_records", telemetry.max_records as i64)?
            .set_default("telemetry.eviction_ratio", telemetry.eviction_ratio)?
            .set_default("telemetry.session_timeout_secs", telemetry.session_timeout_secs)?
            .set_default("telemetry.location_grid_deg", telemetry.location_grid_deg)?
            .set_default("telemetry.store", "memory")?
            .set_default("telemetry.redis_url", telemetry.redis_url)?
            .set_default(
                "inference.cold_start_threshold",
                inference.cold_start_threshold as i64,
            )?
            .set_default("inference.half_life_days", inference.half_life_days)?
            .set_default("inference.mixing_alpha", inference.mixing_alpha)?
            .set_default("ranking.mmr_lambda", ranking.mmr_lambda)?
            .set_default("ranking.max_results", ranking.max_results as i64)?
            .set_default("ranking.max_same_category", ranking.max_same_category as i64)?
            .set_default("ranking.low_confidence_epsilon", ranking.low_confidence_epsilon)?
            .set_default("ranking.default_epsilon", ranking.default_epsilon)?
            .set_default(
                "ranking.low_confidence_threshold",
                ranking.low_confidence_threshold,
            )?
            .set_default("log_level", "info")?
            .add_source(
                config::Environment::with_prefix("RECO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.telemetry;
        if t.max_records == 0 {
            return Err(anyhow!("telemetry.max_records must be greater than 0"));
        }
        if !(t.eviction_ratio > 0.0 && t.eviction_ratio <= 1.0) {
            return Err(anyhow!("telemetry.eviction_ratio must be in (0, 1]"));
        }
        if t.session_timeout_secs <= 0 {
            return Err(anyhow!("telemetry.session_timeout_secs must be positive"));
        }
        if t.location_grid_deg <= 0.0 {
            return Err(anyhow!("telemetry.location_grid_deg must be positive"));
        }

        let i = &self.inference;
        if i.half_life_days <= 0.0 {
            return Err(anyhow!("inference.half_life_days must be positive"));
        }
        if !(0.0..=1.0).contains(&i.mixing_alpha) {
            return Err(anyhow!("inference.mixing_alpha must be in [0, 1]"));
        }

        let r = &self.ranking;
        if r.max_results == 0 || r.max_same_category == 0 {
            return Err(anyhow!("ranking caps must be greater than 0"));
        }
        for (name, value) in [
            ("ranking.mmr_lambda", r.mmr_lambda),
            ("ranking.low_confidence_epsilon", r.low_confidence_epsilon),
            ("ranking.default_epsilon", r.default_epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be in [0, 1]", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config {
            log_level: "info".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.telemetry.max_records, 1000);
        assert_eq!(config.inference.cold_start_threshold, 5);
        assert_eq!(config.ranking.max_same_category, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.telemetry.eviction_ratio = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ranking.mmr_lambda = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ranking.max_results = 0;
        assert!(config.validate().is_err());
    }
}
