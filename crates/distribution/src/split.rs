//! Proceeds split with exact conservation
//!
//! Each active participant receives `principal * ownership`, rounded
//! half-up to the currency minor unit. The rounding remainder goes to
//! the largest-share participant (ties broken on lowest syndicator id)
//! so the entries always sum to the principal exactly.

use crate::error::DistributionError;
use fundbook_core::Currency;
use fundbook_ledger::{EntryParty, LedgerEntry, Participant};
use rust_decimal::Decimal;

/// Split a payment's signed principal across the deal's active
/// participants.
///
/// Returns an empty vec for un-syndicated deals (the funder's retained
/// share is implicit) and for zero principal. Reversals pass negative
/// principal and produce entries that exactly negate the original
/// split.
pub fn distribute(
    payment_id: &str,
    deal_id: &str,
    participants: &[Participant],
    principal: Decimal,
    currency: &Currency,
) -> Result<Vec<LedgerEntry>, DistributionError> {
    let active: Vec<&Participant> = participants.iter().filter(|p| p.is_active()).collect();

    let total: Decimal = active.iter().map(|p| p.ownership_percentage).sum();
    if total > Decimal::ONE {
        return Err(DistributionError::OwnershipExceeded {
            deal_id: deal_id.to_string(),
            total,
        });
    }

    if active.is_empty() || principal.is_zero() {
        return Ok(Vec::new());
    }

    let sign = if principal < Decimal::ZERO {
        -Decimal::ONE
    } else {
        Decimal::ONE
    };
    let magnitude = principal.abs();

    let mut proceeds: Vec<Decimal> = active
        .iter()
        .map(|p| currency.round_minor(magnitude * p.ownership_percentage))
        .collect();

    // Assign the remainder so the split conserves the principal exactly
    let allocated: Decimal = proceeds.iter().sum();
    let remainder = magnitude - allocated;
    if !remainder.is_zero() {
        let largest = active.iter().enumerate().max_by(|(_, a), (_, b)| {
            a.ownership_percentage
                .cmp(&b.ownership_percentage)
                .then_with(|| b.syndicator_id.cmp(&a.syndicator_id))
        });
        if let Some((index, _)) = largest {
            proceeds[index] += remainder;
        }
    }

    Ok(active
        .iter()
        .zip(proceeds)
        .map(|(p, amount)| {
            LedgerEntry::new(
                payment_id,
                deal_id,
                EntryParty::Syndicator {
                    syndicator_id: p.syndicator_id.clone(),
                },
                amount * sign,
            )
        })
        .collect())
}

/// Broker commission on signed principal, rounded to the minor unit
pub fn commission_for(principal: Decimal, percentage: Decimal, currency: &Currency) -> Decimal {
    let sign = if principal < Decimal::ZERO {
        -Decimal::ONE
    } else {
        Decimal::ONE
    };
    currency.round_minor(principal.abs() * percentage) * sign
}
