// ============================================
// Ranking Engine (排序引擎)
// ============================================
//
// Candidates → Score → Explore/Exploit order → MMR → Category cap → Explain
//
// Without a profile, the context-derived default profile is used. Ranking
// is a pure function of its inputs plus the injected RNG.

pub mod explain;
pub mod scorer;

pub use scorer::CandidateScorer;

use crate::config::RankingConfig;
use crate::models::{Candidate, RankedRecommendation, RecoContext, ScoredCandidate};
use crate::services::diversity::{cap_categories, DiversityLayer};
use crate::services::exploration::EpsilonGreedy;
use crate::services::profile_builder::InferredProfile;
use rand::Rng;
use tracing::{debug, info};

pub struct RankingEngine {
    config: RankingConfig,
    scorer: CandidateScorer,
    explorer: EpsilonGreedy,
    diversity: DiversityLayer,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self {
            scorer: CandidateScorer::new(),
            explorer: EpsilonGreedy::from_config(&config),
            diversity: DiversityLayer::new(config.mmr_lambda),
            config,
        }
    }

    pub fn rank<R: Rng + ?Sized>(
        &self,
        candidates: Vec<Candidate>,
        context: &RecoContext,
        profile: Option<&InferredProfile>,
        rng: &mut R,
    ) -> Vec<RankedRecommendation> {
        if candidates.is_empty() {
            debug!("No candidates to rank");
            return Vec::new();
        }

        let fallback;
        let profile = match profile {
            Some(p) => p,
            None => {
                fallback = InferredProfile::default_for(context);
                &fallback
            }
        };

        let pool_size = candidates.len();
        let scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|c| self.scorer.score(c, context, profile, rng))
            .collect();

        let strategy = self.explorer.choose(profile.confidence, rng);
        let ordered = self.explorer.order(scored, strategy, rng);
        let diversified = self.diversity.rerank(ordered, self.config.max_results);
        let capped = cap_categories(diversified, self.config.max_same_category);

        let results: Vec<RankedRecommendation> = capped
            .into_iter()
            .map(|s| explain::annotate(s, context, profile))
            .collect();

        info!(
            pool_size = pool_size,
            returned = results.len(),
            strategy = strategy.as_str(),
            confidence = profile.confidence,
            mode = context.mode.as_str(),
            "Ranked candidates"
        );

        results
    }
}
