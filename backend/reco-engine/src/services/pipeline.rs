// Telemetry → profile → ranking, for the current session

use crate::config::Config;
use crate::models::{Candidate, RankedRecommendation, RecoContext};
use crate::services::profile_builder::{InferredProfile, ProfileInference};
use crate::services::ranking::RankingEngine;
use crate::services::telemetry::TelemetryStore;
use rand::Rng;
use tracing::debug;

pub struct RecommendationPipeline {
    telemetry: TelemetryStore,
    inference: ProfileInference,
    ranking: RankingEngine,
}

impl RecommendationPipeline {
    pub fn new(telemetry: TelemetryStore, inference: ProfileInference, ranking: RankingEngine) -> Self {
        Self {
            telemetry,
            inference,
            ranking,
        }
    }

    pub fn from_config(telemetry: TelemetryStore, config: &Config) -> Self {
        Self::new(
            telemetry,
            ProfileInference::new(config.inference.clone()),
            RankingEngine::new(config.ranking.clone()),
        )
    }

    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    /// Profile inferred from the current session's signals
    pub async fn current_profile(&self) -> InferredProfile {
        let signals = self.telemetry.session_signals().await;
        debug!(signal_count = signals.len(), "Loaded session signals");
        self.inference.infer_profile(&signals)
    }

    pub async fn recommend<R: Rng + ?Sized>(
        &self,
        candidates: Vec<Candidate>,
        context: &RecoContext,
        rng: &mut R,
    ) -> Vec<RankedRecommendation> {
        let profile = self.current_profile().await;
        self.ranking.rank(candidates, context, Some(&profile), rng)
    }
}
