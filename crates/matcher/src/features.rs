//! Match features and confidence scoring
//!
//! Scoring is a pure function over a typed feature struct. Each feature
//! is normalized to [0, 1] before weighting, so the combined score is
//! monotone in every feature: a smaller amount or date mismatch never
//! lowers confidence.

use crate::config::MatchConfig;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Normalized inputs to the confidence score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchFeatures {
    /// 1 - |amount - daily_payment| / daily_payment, clamped to [0, 1]
    pub amount_closeness: f64,
    /// Linear decay over business days to the expected payment date
    pub date_proximity: f64,
    /// Token overlap between descriptor and merchant/account names
    pub descriptor_similarity: f64,
}

impl MatchFeatures {
    /// Weighted confidence in [0, 1]. Weights are normalized by their
    /// sum so custom configurations cannot push the score past 1.
    pub fn score(&self, config: &MatchConfig) -> f64 {
        let weight_sum = config.amount_weight + config.date_weight + config.descriptor_weight;
        if weight_sum <= 0.0 {
            return 0.0;
        }
        let weighted = config.amount_weight * self.amount_closeness
            + config.date_weight * self.date_proximity
            + config.descriptor_weight * self.descriptor_similarity;
        (weighted / weight_sum).clamp(0.0, 1.0)
    }
}

/// How close the transaction amount is to the expected daily payment
pub fn amount_closeness(actual: Decimal, daily_payment: Decimal) -> f64 {
    if daily_payment <= Decimal::ZERO {
        return 0.0;
    }
    let ratio = ((actual - daily_payment).abs() / daily_payment)
        .to_f64()
        .unwrap_or(f64::MAX);
    (1.0 - ratio).clamp(0.0, 1.0)
}

/// Linear decay: 1.0 on the expected day, zero at the grace window
pub fn date_proximity(business_days_off: u32, grace_business_days: u32) -> f64 {
    if grace_business_days == 0 || business_days_off >= grace_business_days {
        return 0.0;
    }
    1.0 - business_days_off as f64 / grace_business_days as f64
}

/// Fraction of the reference name tokens present in the descriptor.
///
/// Bank descriptors bury the merchant name in processor noise
/// ("ACH DEBIT BLUE BOTTLE DELI 0923"), so overlap is measured against
/// the name tokens rather than the full descriptor.
pub fn descriptor_similarity(descriptor: &str, names: &[&str]) -> f64 {
    let descriptor_tokens = tokenize(descriptor);
    let name_tokens: HashSet<String> = names.iter().flat_map(|n| tokenize(n)).collect();
    if name_tokens.is_empty() {
        return 0.0;
    }
    let overlap = name_tokens
        .iter()
        .filter(|t| descriptor_tokens.contains(*t))
        .count();
    overlap as f64 / name_tokens.len() as f64
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_closeness_exact() {
        assert_eq!(amount_closeness(dec!(500), dec!(500)), 1.0);
    }

    #[test]
    fn test_amount_closeness_partial() {
        // |300 - 500| / 500 = 0.4
        let c = amount_closeness(dec!(300), dec!(500));
        assert!((c - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_amount_closeness_clamped() {
        // More than double the expected payment clamps to zero
        assert_eq!(amount_closeness(dec!(1500), dec!(500)), 0.0);
        assert_eq!(amount_closeness(dec!(100), Decimal::ZERO), 0.0);
    }

    #[test]
    fn test_date_proximity_decay() {
        assert_eq!(date_proximity(0, 5), 1.0);
        assert!((date_proximity(2, 5) - 0.6).abs() < 1e-9);
        assert_eq!(date_proximity(5, 5), 0.0);
        assert_eq!(date_proximity(9, 5), 0.0);
    }

    #[test]
    fn test_descriptor_similarity_full_overlap() {
        let sim = descriptor_similarity(
            "ACH DEBIT BLUE BOTTLE DELI 0923",
            &["Blue Bottle Deli"],
        );
        assert_eq!(sim, 1.0);
    }

    #[test]
    fn test_descriptor_similarity_partial() {
        let sim = descriptor_similarity("ACH DEBIT BLUE 0923", &["Blue Bottle Deli"]);
        assert!((sim - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_descriptor_similarity_no_names() {
        assert_eq!(descriptor_similarity("ACH DEBIT", &[]), 0.0);
    }

    #[test]
    fn test_score_weighted() {
        let config = MatchConfig::default();
        let features = MatchFeatures {
            amount_closeness: 1.0,
            date_proximity: 1.0,
            descriptor_similarity: 1.0,
        };
        assert!((features.score(&config) - 1.0).abs() < 1e-9);

        let partial = MatchFeatures {
            amount_closeness: 1.0,
            date_proximity: 1.0,
            descriptor_similarity: 0.0,
        };
        assert!((partial.score(&config) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_score_monotone_in_each_feature() {
        let config = MatchConfig::default();
        let base = MatchFeatures {
            amount_closeness: 0.4,
            date_proximity: 0.5,
            descriptor_similarity: 0.6,
        };

        for step in 0..=10 {
            let amount = step as f64 / 10.0;
            let better = MatchFeatures {
                amount_closeness: amount.max(base.amount_closeness),
                ..base
            };
            assert!(better.score(&config) >= base.score(&config));

            let closer_date = MatchFeatures {
                date_proximity: amount.max(base.date_proximity),
                ..base
            };
            assert!(closer_date.score(&config) >= base.score(&config));
        }
    }

    #[test]
    fn test_zero_weights_score_zero() {
        let config = MatchConfig {
            amount_weight: 0.0,
            date_weight: 0.0,
            descriptor_weight: 0.0,
            ..MatchConfig::default()
        };
        let features = MatchFeatures {
            amount_closeness: 1.0,
            date_proximity: 1.0,
            descriptor_similarity: 1.0,
        };
        assert_eq!(features.score(&config), 0.0);
    }
}
