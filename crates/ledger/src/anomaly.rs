//! Payment anomalies
//!
//! Anomalies are data, not errors: an underpaid or bounced payment is
//! still recorded and processing continues. They live on the payment
//! audit row and on outbound events.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An irregularity detected while applying a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anomaly {
    /// Amount below the expected daily payment, past tolerance
    Underpaid { expected: Decimal, actual: Decimal },
    /// Amount above the expected daily payment, past tolerance
    Overpaid { expected: Decimal, actual: Decimal },
    /// A bounced payment reversed a previously applied one
    NsfReturn { reversed_payment_id: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Underpaid { expected, actual } => {
                write!(f, "underpaid (expected {}, got {})", expected, actual)
            }
            Anomaly::Overpaid { expected, actual } => {
                write!(f, "overpaid (expected {}, got {})", expected, actual)
            }
            Anomaly::NsfReturn {
                reversed_payment_id,
            } => write!(f, "nsf return reversing payment {}", reversed_payment_id),
        }
    }
}
