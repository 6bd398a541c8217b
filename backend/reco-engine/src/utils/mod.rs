// Numeric helpers shared by inference and ranking

use std::collections::HashMap;

/// Exponential decay with the given half-life; both arguments in the same unit
pub fn exponential_decay(age: f64, half_life: f64) -> f64 {
    if half_life <= 0.0 {
        return 1.0;
    }
    0.5_f64.powf(age.max(0.0) / half_life)
}

/// Nearest-rank percentile (`p` in [0, 1]) of an unsorted sample
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[idx])
}

/// Scale weights so they sum to 1; drops non-positive entries
pub fn normalize_weights(weights: HashMap<String, f64>) -> HashMap<String, f64> {
    let total: f64 = weights.values().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return HashMap::new();
    }
    weights
        .into_iter()
        .filter(|(_, w)| *w > 0.0)
        .map(|(k, w)| (k, w / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_decay() {
        let score = exponential_decay(7.0, 7.0);
        assert!((score - 0.5).abs() < 1e-9);

        let score_fresh = exponential_decay(0.0, 7.0);
        assert!((score_fresh - 1.0).abs() < 1e-9);

        // Future timestamps do not amplify
        assert!((exponential_decay(-3.0, 7.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let sample = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(percentile(&sample, 0.8), Some(4.0));

        let ten: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert_eq!(percentile(&ten, 0.8), Some(8.0));
        assert_eq!(percentile(&[], 0.8), None);
        assert_eq!(percentile(&[2.5], 0.8), Some(2.5));
    }

    #[test]
    fn test_normalize_weights() {
        let mut raw = HashMap::new();
        raw.insert("a".to_string(), 3.0);
        raw.insert("b".to_string(), 1.0);
        raw.insert("c".to_string(), 0.0);

        let normalized = normalize_weights(raw);
        assert_eq!(normalized.len(), 2);
        assert!((normalized["a"] - 0.75).abs() < 1e-9);
        assert!((normalized.values().sum::<f64>() - 1.0).abs() < 1e-9);

        assert!(normalize_weights(HashMap::new()).is_empty());
    }
}
