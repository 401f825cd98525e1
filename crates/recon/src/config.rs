//! Reconciler configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerances and policies for payment application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Fraction below the daily payment that flags `underpaid`
    pub underpay_tolerance: Decimal,
    /// Fraction above the daily payment that flags `overpaid`
    pub overpay_tolerance: Decimal,
    /// Payoff fraction that triggers the approaching-payoff signal once
    pub payoff_warning_fraction: Decimal,
    /// Consecutive underpayments before an active deal turns late
    pub late_after_underpayments: u32,
    /// Bound on waiting for a deal's lock; timeouts are retryable
    pub lock_timeout_ms: u64,
}

impl ReconConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            underpay_tolerance: dec!(0.10),
            overpay_tolerance: dec!(0.10),
            payoff_warning_fraction: dec!(0.90),
            late_after_underpayments: 3,
            lock_timeout_ms: 5_000,
        }
    }
}
