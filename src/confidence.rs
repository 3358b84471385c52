//! Multi-factor confidence scoring over retrieved evidence.
//!
//! Raw cosine similarity is poorly calibrated, so the score is an additive
//! model: a similarity-derived base, bonuses for corroborating and
//! consistent evidence, penalties for short questions and dominant-outlier
//! matches, then a band cap keeping the result honest at the top end.

use serde::Serialize;

use crate::models::SearchResult;

/// Confidence band for a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceBand {
    pub fn from_value(value: f64) -> Self {
        if value >= 85.0 {
            ConfidenceBand::VeryHigh
        } else if value >= 70.0 {
            ConfidenceBand::High
        } else if value >= 50.0 {
            ConfidenceBand::Medium
        } else if value >= 30.0 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::VeryHigh => "Very High",
            ConfidenceBand::High => "High",
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::Low => "Low",
            ConfidenceBand::VeryLow => "Very Low",
        }
    }
}

/// The individual terms that built a confidence value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfidenceFactors {
    pub base: f64,
    pub source_count_bonus: f64,
    pub consistency_bonus: f64,
    pub question_penalty: f64,
    pub score_gap_penalty: f64,
    pub low_score_penalty: f64,
}

/// A confidence value in [0, 100] plus its contributing factors.
#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceScore {
    pub value: f64,
    pub band: ConfidenceBand,
    pub factors: ConfidenceFactors,
}

/// Score retrieved results against the question that produced them.
/// `results` must be ordered by descending score. Total: no results yields
/// 0.0 / Very Low.
pub fn score(results: &[SearchResult], question: &str) -> ConfidenceScore {
    if results.is_empty() {
        return ConfidenceScore {
            value: 0.0,
            band: ConfidenceBand::VeryLow,
            factors: ConfidenceFactors::default(),
        };
    }

    let scores: Vec<f64> = results.iter().map(|r| r.score as f64).collect();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;

    let factors = ConfidenceFactors {
        base: (mean * 100.0).min(90.0),
        source_count_bonus: source_count_bonus(results.len()),
        consistency_bonus: consistency_bonus(&scores, mean),
        question_penalty: question_penalty(question),
        score_gap_penalty: score_gap_penalty(&scores),
        low_score_penalty: low_score_penalty(scores[0]),
    };

    let total = factors.base
        + factors.source_count_bonus
        + factors.consistency_bonus
        + factors.question_penalty
        + factors.score_gap_penalty
        + factors.low_score_penalty;

    let capped = band_cap(total);
    let value = ((capped * 10.0).round() / 10.0).max(0.0);

    ConfidenceScore {
        value,
        band: ConfidenceBand::from_value(value),
        factors,
    }
}

fn source_count_bonus(count: usize) -> f64 {
    match count {
        0 | 1 => 0.0,
        2 => 3.0,
        3 => 5.0,
        _ => 7.0,
    }
}

fn consistency_bonus(scores: &[f64], mean: f64) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    let stddev = variance.sqrt();

    if stddev < 0.10 && mean > 0.70 {
        3.0
    } else if stddev < 0.15 && mean > 0.60 {
        2.0
    } else if stddev < 0.20 && mean > 0.50 {
        1.0
    } else {
        0.0
    }
}

fn question_penalty(question: &str) -> f64 {
    let words = question.split_whitespace().count();
    if words < 3 {
        -5.0
    } else if words < 5 {
        -2.0
    } else {
        0.0
    }
}

fn score_gap_penalty(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let gap = scores[0] - scores[1];
    if gap > 0.30 {
        -3.0
    } else if gap > 0.20 {
        -1.0
    } else {
        0.0
    }
}

fn low_score_penalty(top: f64) -> f64 {
    if top < 0.40 {
        -10.0
    } else if top < 0.60 {
        -5.0
    } else {
        0.0
    }
}

/// Cap each tier of the raw total so a single strong factor cannot push the
/// score into a band the evidence does not support.
fn band_cap(total: f64) -> f64 {
    if total >= 85.0 {
        total.min(95.0)
    } else if total >= 70.0 {
        total.min(85.0)
    } else if total >= 50.0 {
        total.min(70.0)
    } else if total >= 30.0 {
        total.min(50.0)
    } else {
        total.max(5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(scores: &[f32]) -> Vec<SearchResult> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| SearchResult {
                text: format!("evidence {i}"),
                score: *s,
                rank: Some(i),
            })
            .collect()
    }

    #[test]
    fn test_worked_example_single_strong_result() {
        // base 90, no bonuses or penalties, band cap min(90, 95)
        let c = score(&results(&[0.9]), "what is the capital of France");
        assert_eq!(c.value, 90.0);
        assert_eq!(c.band, ConfidenceBand::VeryHigh);
    }

    #[test]
    fn test_empty_results() {
        let c = score(&[], "what is the capital of France");
        assert_eq!(c.value, 0.0);
        assert_eq!(c.band, ConfidenceBand::VeryLow);
    }

    #[test]
    fn test_base_capped_at_90() {
        let c = score(&results(&[1.0]), "a perfectly matching long question here");
        assert_eq!(c.factors.base, 90.0);
    }

    #[test]
    fn test_source_count_bonus_tiers() {
        assert_eq!(source_count_bonus(1), 0.0);
        assert_eq!(source_count_bonus(2), 3.0);
        assert_eq!(source_count_bonus(3), 5.0);
        assert_eq!(source_count_bonus(4), 7.0);
        assert_eq!(source_count_bonus(9), 7.0);
    }

    #[test]
    fn test_consistency_bonus_tight_high_scores() {
        // mean 0.8, stddev well under 0.10
        assert_eq!(consistency_bonus(&[0.82, 0.80, 0.78], 0.80), 3.0);
    }

    #[test]
    fn test_consistency_bonus_requires_two_results() {
        assert_eq!(consistency_bonus(&[0.9], 0.9), 0.0);
    }

    #[test]
    fn test_consistency_bonus_spread_scores() {
        // stddev 0.25: no bonus regardless of mean
        assert_eq!(consistency_bonus(&[0.95, 0.45], 0.70), 0.0);
    }

    #[test]
    fn test_question_penalty_tiers() {
        assert_eq!(question_penalty("why"), -5.0);
        assert_eq!(question_penalty("why is it"), -2.0);
        assert_eq!(question_penalty("why is the sky blue"), 0.0);
    }

    #[test]
    fn test_score_gap_penalty_tiers() {
        assert_eq!(score_gap_penalty(&[0.9, 0.5]), -3.0);
        assert_eq!(score_gap_penalty(&[0.9, 0.65]), -1.0);
        assert_eq!(score_gap_penalty(&[0.9, 0.8]), 0.0);
        assert_eq!(score_gap_penalty(&[0.9]), 0.0);
    }

    #[test]
    fn test_low_score_penalty_tiers() {
        assert_eq!(low_score_penalty(0.3), -10.0);
        assert_eq!(low_score_penalty(0.5), -5.0);
        assert_eq!(low_score_penalty(0.7), 0.0);
    }

    #[test]
    fn test_band_cap_tiers() {
        assert_eq!(band_cap(97.0), 95.0);
        assert_eq!(band_cap(80.0), 80.0);
        assert_eq!(band_cap(72.0), 72.0);
        assert_eq!(band_cap(69.0), 69.0);
        assert_eq!(band_cap(55.0), 55.0);
        assert_eq!(band_cap(2.0), 5.0);
        assert_eq!(band_cap(-4.0), 5.0);
    }

    #[test]
    fn test_value_always_in_range() {
        let questions = ["a", "a b c", "a fairly long question about things"];
        let score_sets: Vec<Vec<f32>> = vec![
            vec![],
            vec![0.0],
            vec![1.0],
            vec![0.05, 0.04],
            vec![0.99, 0.98, 0.97, 0.96],
            vec![0.9, 0.3],
        ];
        for q in questions {
            for s in &score_sets {
                let c = score(&results(s), q);
                assert!((0.0..=100.0).contains(&c.value), "out of range: {}", c.value);
            }
        }
    }

    #[test]
    fn test_weak_evidence_lands_in_low_band() {
        let c = score(&results(&[0.35, 0.32]), "how does the billing system work");
        // base 33.5, +3 sources, -10 low score => 26.5 -> floor band
        assert!(c.value < 30.0);
        assert_eq!(c.band, ConfidenceBand::VeryLow);
    }

    #[test]
    fn test_corroborating_evidence_beats_single_source() {
        let single = score(&results(&[0.75]), "how is authentication configured here");
        let multi = score(
            &results(&[0.75, 0.74, 0.73, 0.72]),
            "how is authentication configured here",
        );
        assert!(multi.value > single.value);
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(ConfidenceBand::from_value(90.0).label(), "Very High");
        assert_eq!(ConfidenceBand::from_value(75.0).label(), "High");
        assert_eq!(ConfidenceBand::from_value(60.0).label(), "Medium");
        assert_eq!(ConfidenceBand::from_value(40.0).label(), "Low");
        assert_eq!(ConfidenceBand::from_value(10.0).label(), "Very Low");
    }
}
