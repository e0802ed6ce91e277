//! Confidence normalization and result ranking
//!
//! Converts raw classifier scores into integer percentages that sum to
//! exactly 100, then orders them for display.

use serde::Serialize;

/// A single (label, confidence) pair emitted by the classifier
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Label identifier
    pub label: String,
    /// Raw confidence score (0.0 - 1.0)
    pub confidence: f32,
}

impl Candidate {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A normalized, display-ready (label, percentage) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedLabel {
    /// Label identifier, carried over from the candidate
    pub label: String,
    /// Integer percentage (0 - 100)
    pub percentage: u8,
}

/// Normalize raw confidences into integer percentages summing to exactly 100.
///
/// Each percentage is `round(confidence * 100)` with ties rounding away from
/// zero. Any rounding residue is added to the entry with the largest rounded
/// percentage (first in input order on ties), so the batch always sums to
/// 100. Output preserves input order and has one entry per candidate.
///
/// An empty input yields an empty output. If every confidence rounds to 0,
/// the first entry absorbs the full 100-point correction; a nominally
/// low-confidence label then displays as 100%. That is a property of the
/// algorithm, kept as-is.
pub fn normalize(candidates: &[Candidate]) -> Vec<RankedLabel> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut percentages: Vec<i64> = candidates
        .iter()
        .map(|c| (c.confidence * 100.0).round() as i64)
        .collect();

    let sum: i64 = percentages.iter().sum();
    let diff = 100 - sum;

    if diff != 0 {
        // First index holding the largest rounded percentage.
        let mut top = 0;
        for (i, &p) in percentages.iter().enumerate() {
            if p > percentages[top] {
                top = i;
            }
        }
        percentages[top] += diff;
    }

    candidates
        .iter()
        .zip(percentages)
        .map(|(c, p)| RankedLabel {
            label: c.label.clone(),
            // Confidences from a softmax sum to ~1, which keeps every
            // corrected value inside 0-100.
            percentage: p.clamp(0, 100) as u8,
        })
        .collect()
}

/// Order normalized results for presentation: descending percentage (stable),
/// zero-percentage entries dropped, truncated to `top_n`.
pub fn rank_for_display(mut results: Vec<RankedLabel>, top_n: usize) -> Vec<RankedLabel> {
    results.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    results.retain(|r| r.percentage > 0);
    results.truncate(top_n);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(pairs: &[(&str, f32)]) -> Vec<Candidate> {
        pairs
            .iter()
            .map(|(label, confidence)| Candidate::new(*label, *confidence))
            .collect()
    }

    fn percentages(results: &[RankedLabel]) -> Vec<u8> {
        results.iter().map(|r| r.percentage).collect()
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let inputs = vec![
            candidates(&[("cat", 0.42), ("dog", 0.31), ("fox", 0.20)]),
            candidates(&[("a", 0.333), ("b", 0.333), ("b2", 0.334)]),
            candidates(&[("only", 0.17)]),
            candidates(&[("x", 0.249), ("y", 0.251), ("z", 0.5)]),
        ];

        for input in inputs {
            let sum: u32 = normalize(&input)
                .iter()
                .map(|r| r.percentage as u32)
                .sum();
            assert_eq!(sum, 100, "input: {:?}", input);
        }
    }

    #[test]
    fn test_residue_goes_to_largest() {
        // Rounded [42, 31, 20] sums to 93; the 7-point residue lands on "cat".
        let results = normalize(&candidates(&[("cat", 0.42), ("dog", 0.31), ("fox", 0.20)]));
        assert_eq!(percentages(&results), vec![49, 31, 20]);
        assert_eq!(results[0].label, "cat");
    }

    #[test]
    fn test_tie_for_largest_resolved_by_input_order() {
        // Rounded [33, 33, 33] sums to 99; the first of the tied maxima wins.
        let results = normalize(&candidates(&[("a", 0.333), ("b", 0.333), ("b2", 0.334)]));
        assert_eq!(percentages(&results), vec![34, 33, 33]);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // 0.125 * 100 = 12.5 exactly; rounds up, not to even.
        let results = normalize(&candidates(&[("a", 0.125), ("b", 0.875)]));
        assert_eq!(percentages(&results), vec![13, 87]);
    }

    #[test]
    fn test_labels_correspond_one_to_one() {
        let input = candidates(&[("cat", 0.6), ("dog", 0.3), ("fox", 0.1)]);
        let results = normalize(&input);

        assert_eq!(results.len(), input.len());
        for (candidate, result) in input.iter().zip(&results) {
            assert_eq!(candidate.label, result.label);
        }
    }

    #[test]
    fn test_all_round_to_zero_inflates_first() {
        let results = normalize(&candidates(&[("a", 0.001), ("b", 0.001), ("c", 0.001)]));
        assert_eq!(percentages(&results), vec![100, 0, 0]);
    }

    #[test]
    fn test_single_candidate_takes_full_batch() {
        let results = normalize(&candidates(&[("cat", 0.2)]));
        assert_eq!(percentages(&results), vec![100]);
    }

    #[test]
    fn test_idempotent_on_normalized_input() {
        let first = normalize(&candidates(&[("cat", 0.42), ("dog", 0.31), ("fox", 0.20)]));

        let reinput: Vec<Candidate> = first
            .iter()
            .map(|r| Candidate::new(r.label.clone(), r.percentage as f32 / 100.0))
            .collect();
        let second = normalize(&reinput);

        assert_eq!(first, second);
    }

    #[test]
    fn test_display_ranking_sorts_filters_truncates() {
        let results = vec![
            RankedLabel { label: "fox".into(), percentage: 20 },
            RankedLabel { label: "cat".into(), percentage: 49 },
            RankedLabel { label: "emu".into(), percentage: 0 },
            RankedLabel { label: "dog".into(), percentage: 31 },
        ];

        let ranked = rank_for_display(results, 3);
        let labels: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["cat", "dog", "fox"]);
    }

    #[test]
    fn test_display_ranking_is_stable_on_equal_percentages() {
        let results = vec![
            RankedLabel { label: "first".into(), percentage: 50 },
            RankedLabel { label: "second".into(), percentage: 50 },
        ];

        let ranked = rank_for_display(results, 3);
        assert_eq!(ranked[0].label, "first");
        assert_eq!(ranked[1].label, "second");
    }

    #[test]
    fn test_display_ranking_truncates_to_top_n() {
        let results = normalize(&candidates(&[
            ("a", 0.4),
            ("b", 0.3),
            ("c", 0.2),
            ("d", 0.1),
        ]));
        assert_eq!(rank_for_display(results, 2).len(), 2);
    }
}
