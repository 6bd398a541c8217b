// ============================================
// Exploration Module (探索模块)
// ============================================
//
// Epsilon-greedy explore-exploit switch for the ranked list:
// - explore: uniform shuffle of the scored pool
// - exploit: sort by total score, highest first
//
// Epsilon widens while the profile is still uncertain:
//   ε = 0.25 when confidence < 0.3, else 0.10

use crate::config::RankingConfig;
use crate::models::ScoredCandidate;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Explore,
    Exploit,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Explore => "explore",
            Strategy::Exploit => "exploit",
        }
    }
}

/// Epsilon-greedy explorer
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    /// Epsilon used while confidence is below `low_confidence_threshold`
    low_confidence_epsilon: f64,
    default_epsilon: f64,
    low_confidence_threshold: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}

impl EpsilonGreedy {
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            low_confidence_epsilon: config.low_confidence_epsilon,
            default_epsilon: config.default_epsilon,
            low_confidence_threshold: config.low_confidence_threshold,
        }
    }

    pub fn epsilon(&self, confidence: f64) -> f64 {
        if confidence < self.low_confidence_threshold {
            self.low_confidence_epsilon
        } else {
            self.default_epsilon
        }
    }

    pub fn choose<R: Rng + ?Sized>(&self, confidence: f64, rng: &mut R) -> Strategy {
        let epsilon = self.epsilon(confidence);
        let roll: f64 = rng.gen();
        let strategy = if roll < epsilon {
            Strategy::Explore
        } else {
            Strategy::Exploit
        };

        debug!(
            confidence = confidence,
            epsilon = epsilon,
            strategy = strategy.as_str(),
            "Exploration strategy chosen"
        );
        strategy
    }

    /// Order the scored pool according to `strategy`
    pub fn order<R: Rng + ?Sized>(
        &self,
        mut items: Vec<ScoredCandidate>,
        strategy: Strategy,
        rng: &mut R,
    ) -> Vec<ScoredCandidate> {
        match strategy {
            Strategy::Explore => items.shuffle(rng),
            // Stable sort keeps input order among equal totals
            Strategy::Exploit => items.sort_by(|a, b| b.total().total_cmp(&a.total())),
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, ScoreBreakdown};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scored(id: &str, total: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id: id.to_string(),
                category: "park".to_string(),
                tags: vec![],
                distance_km: None,
                price: None,
                discounted: false,
                indoor: false,
                quiet: false,
                accessibility: vec![],
            },
            scores: ScoreBreakdown {
                total,
                ..Default::default()
            },
        }
    }

    fn ids(items: &[ScoredCandidate]) -> Vec<&str> {
        items.iter().map(|s| s.candidate.id.as_str()).collect()
    }

    #[test]
    fn test_epsilon_by_confidence() {
        let explorer = EpsilonGreedy::default();
        assert_eq!(explorer.epsilon(0.1), 0.25);
        assert_eq!(explorer.epsilon(0.29), 0.25);
        assert_eq!(explorer.epsilon(0.3), 0.10);
        assert_eq!(explorer.epsilon(0.9), 0.10);
    }

    #[test]
    fn test_zero_epsilon_always_exploits() {
        let config = RankingConfig {
            low_confidence_epsilon: 0.0,
            default_epsilon: 0.0,
            ..Default::default()
        };
        let explorer = EpsilonGreedy::from_config(&config);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(explorer.choose(0.05, &mut rng), Strategy::Exploit);
        }
    }

    #[test]
    fn test_full_epsilon_always_explores() {
        let config = RankingConfig {
            low_confidence_epsilon: 1.0,
            default_epsilon: 1.0,
            ..Default::default()
        };
        let explorer = EpsilonGreedy::from_config(&config);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            assert_eq!(explorer.choose(0.8, &mut rng), Strategy::Explore);
        }
    }

    #[test]
    fn test_explore_rate_tracks_epsilon() {
        let explorer = EpsilonGreedy::default();
        let mut rng = StdRng::seed_from_u64(42);
        let explored = (0..10_000)
            .filter(|_| explorer.choose(0.1, &mut rng) == Strategy::Explore)
            .count();
        // ε = 0.25
        assert!((2_000..3_000).contains(&explored), "explored {}", explored);
    }

    #[test]
    fn test_exploit_sorts_descending_and_stable() {
        let explorer = EpsilonGreedy::default();
        let mut rng = StdRng::seed_from_u64(3);
        let items = vec![
            scored("a", 0.2),
            scored("b", 0.9),
            scored("c", 0.5),
            scored("d", 0.9),
        ];
        let ordered = explorer.order(items, Strategy::Exploit, &mut rng);
        assert_eq!(ids(&ordered), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_explore_keeps_same_items() {
        let explorer = EpsilonGreedy::default();
        let mut rng = StdRng::seed_from_u64(4);
        let items: Vec<_> = (0..8).map(|i| scored(&format!("s{}", i), i as f64 / 10.0)).collect();
        let ordered = explorer.order(items, Strategy::Explore, &mut rng);

        let mut got = ids(&ordered);
        got.sort();
        assert_eq!(got, vec!["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7"]);
    }
}
