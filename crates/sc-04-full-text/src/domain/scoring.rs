//! # Scoring Helpers

use std::collections::HashMap;
use std::hash::Hash;

/// Inverse-frequency weight of a token with `postings` live postings.
pub fn token_weight(entries: usize, postings: usize) -> f64 {
    if postings == 0 || entries == 0 {
        return 0.0;
    }
    (entries as f64 / postings as f64).log10().max(0.0)
}

/// Keep the hits scoring above `max * ratio`.
pub fn apply_noise_floor<K: Eq + Hash>(scores: HashMap<K, f64>, ratio: f64) -> HashMap<K, f64> {
    let max = scores.values().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return HashMap::new();
    }
    let floor = max * ratio;
    scores.into_iter().filter(|(_, score)| *score > floor).collect()
}

/// Union of both maps, keeping the higher score for shared keys.
pub fn merge_max<K: Eq + Hash>(mut left: HashMap<K, f64>, right: HashMap<K, f64>) -> HashMap<K, f64> {
    for (key, score) in right {
        left.entry(key)
            .and_modify(|existing| *existing = existing.max(score))
            .or_insert(score);
    }
    left
}

/// Multiplier rewarding lines that keep the query's token order and spacing.
///
/// Each query token is aligned to its first occurrence in the query and in
/// the line. For consecutive aligned tokens, the line gap is compared with
/// the query gap: equal x10, one wider x5, two wider x3, any other forward
/// gap x2. Pairs out of order contribute nothing.
pub fn order_bonus(query: &[String], line: &[String]) -> f64 {
    let mut seen = Vec::new();
    let mut aligned: Vec<(i64, i64)> = Vec::new();
    for (query_pos, token) in query.iter().enumerate() {
        if seen.contains(&token) {
            continue;
        }
        seen.push(token);
        if let Some(line_pos) = line.iter().position(|t| t == token) {
            aligned.push((query_pos as i64, line_pos as i64));
        }
    }

    aligned.windows(2).fold(1.0, |bonus, pair| {
        let query_gap = pair[1].0 - pair[0].0;
        let line_gap = pair[1].1 - pair[0].1;
        if line_gap <= 0 {
            return bonus;
        }
        bonus
            * match line_gap - query_gap {
                0 => 10.0,
                1 => 5.0,
                2 => 3.0,
                _ => 2.0,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_token_weight() {
        assert_eq!(token_weight(100, 10), 1.0);
        assert_eq!(token_weight(10, 10), 0.0);
        assert_eq!(token_weight(10, 0), 0.0);
    }

    #[test]
    fn test_noise_floor_drops_small_scores() {
        let scores: HashMap<&str, f64> = [("a", 1000.0), ("b", 10.0), ("c", 11.0)].into();
        let kept = apply_noise_floor(scores, 0.01);
        assert!(kept.contains_key("a"));
        assert!(kept.contains_key("c"));
        assert!(!kept.contains_key("b"));
    }

    #[test]
    fn test_merge_keeps_best_score() {
        let left: HashMap<u32, f64> = [(1, 5.0), (2, 1.0)].into();
        let right: HashMap<u32, f64> = [(2, 3.0), (3, 7.0)].into();
        let merged = merge_max(left, right);
        assert_eq!(merged[&1], 5.0);
        assert_eq!(merged[&2], 3.0);
        assert_eq!(merged[&3], 7.0);
    }

    #[test]
    fn test_order_bonus() {
        let query = words("quick fox");
        assert_eq!(order_bonus(&query, &words("quick fox jumps")), 10.0);
        assert_eq!(order_bonus(&query, &words("quick brown fox")), 5.0);
        assert_eq!(order_bonus(&query, &words("quick big brown fox")), 3.0);
        assert_eq!(order_bonus(&query, &words("quick a b c d fox")), 2.0);
        assert_eq!(order_bonus(&query, &words("fox quick")), 1.0);
        assert_eq!(order_bonus(&query, &words("fox")), 1.0);
    }

    #[test]
    fn test_order_bonus_is_multiplicative() {
        let query = words("a b c");
        assert_eq!(order_bonus(&query, &words("a b c")), 100.0);
        assert_eq!(order_bonus(&query, &words("a b x c")), 50.0);
    }
}
