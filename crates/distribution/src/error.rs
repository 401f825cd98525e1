//! Distribution errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Internal inconsistencies that fail the whole reconciliation unit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("Active ownership for deal {deal_id} sums to {total}, over 100%")]
    OwnershipExceeded { deal_id: String, total: Decimal },
}
