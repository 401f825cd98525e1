//! Matcher configuration
//!
//! All scoring weights and thresholds are named and tunable here rather
//! than hard-coded in the scoring path, so the algorithm can be tested
//! and re-tuned in isolation.

use serde::{Deserialize, Serialize};

/// Tunable weights and thresholds for confidence scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Confidence at or above which a candidate auto-applies
    pub auto_threshold: f64,
    /// Confidence at or above which a candidate is suggested for review
    pub suggest_threshold: f64,
    /// Weight of amount closeness in the confidence score
    pub amount_weight: f64,
    /// Weight of date proximity in the confidence score
    pub date_weight: f64,
    /// Weight of descriptor similarity in the confidence score
    pub descriptor_weight: f64,
    /// Date proximity decays to zero this many business days out
    pub grace_business_days: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            auto_threshold: 0.92,
            suggest_threshold: 0.55,
            amount_weight: 0.5,
            date_weight: 0.3,
            descriptor_weight: 0.2,
            grace_business_days: 5,
        }
    }
}
