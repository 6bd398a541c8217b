use crate::models::ScoredCandidate;
use std::collections::{HashMap, HashSet};

const SAME_CATEGORY_PENALTY: f64 = 0.3;
const SHARED_TAG_PENALTY: f64 = 0.2;

/// Diversity Layer - 多樣性重排
/// 使用 MMR (Maximal Marginal Relevance) 算法
pub struct DiversityLayer {
    lambda: f64, // 平衡 relevance 和 diversity 的參數（0~1）
}

impl Default for DiversityLayer {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl DiversityLayer {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// 重排候選集以提高多樣性
    /// The head of `items` seeds the output; every following pick maximizes
    /// λ·total + (1 − λ)·diversity against what is already selected.
    pub fn rerank(&self, items: Vec<ScoredCandidate>, top_k: usize) -> Vec<ScoredCandidate> {
        if items.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut remaining = items;
        let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(top_k.min(remaining.len()));
        let mut category_counts: HashMap<String, usize> = HashMap::new();
        let mut selected_tags: HashSet<String> = HashSet::new();

        let seed = remaining.remove(0);
        Self::track(&seed, &mut category_counts, &mut selected_tags);
        selected.push(seed);

        // MMR 貪心選擇
        while selected.len() < top_k && !remaining.is_empty() {
            let mut best_idx = 0;
            let mut best_mmr_score = f64::MIN;

            for (i, item) in remaining.iter().enumerate() {
                let diversity = compute_diversity(item, &category_counts, &selected_tags);
                let mmr_score = self.lambda * item.total() + (1.0 - self.lambda) * diversity;

                // Strict comparison keeps the earliest item on ties
                if mmr_score > best_mmr_score {
                    best_mmr_score = mmr_score;
                    best_idx = i;
                }
            }

            let picked = remaining.remove(best_idx);
            Self::track(&picked, &mut category_counts, &mut selected_tags);
            selected.push(picked);
        }

        selected
    }

    fn track(
        item: &ScoredCandidate,
        category_counts: &mut HashMap<String, usize>,
        selected_tags: &mut HashSet<String>,
    ) {
        *category_counts
            .entry(item.candidate.category.clone())
            .or_insert(0) += 1;
        selected_tags.extend(item.candidate.tags.iter().cloned());
    }
}

/// 計算多樣性分數（與已選擇的候選相比）
fn compute_diversity(
    item: &ScoredCandidate,
    category_counts: &HashMap<String, usize>,
    selected_tags: &HashSet<String>,
) -> f64 {
    let same_category = category_counts
        .get(&item.candidate.category)
        .copied()
        .unwrap_or(0) as f64;
    let category_diversity = (1.0 - SAME_CATEGORY_PENALTY * same_category).max(0.0);

    let shared_tags = item
        .candidate
        .tags
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|t| selected_tags.contains(*t))
        .count() as f64;
    let tag_diversity = (1.0 - SHARED_TAG_PENALTY * shared_tags).max(0.0);

    (category_diversity + tag_diversity) / 2.0
}

/// Drop anything past `max_per_category` occurrences of a category.
/// Order is preserved and nothing is backfilled.
pub fn cap_categories(items: Vec<ScoredCandidate>, max_per_category: usize) -> Vec<ScoredCandidate> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    items
        .into_iter()
        .filter(|item| {
            let count = counts.entry(item.candidate.category.clone()).or_insert(0);
            *count += 1;
            *count <= max_per_category
        })
        .collect()
}
