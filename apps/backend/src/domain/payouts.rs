//! Splitting a tournament pot by standings and payout ratios.

use crate::domain::engine::UserId;
use crate::domain::standings::Standing;
use crate::errors::domain::{DomainError, ValidationKind};

/// Ratios are basis points; a full table sums to this.
pub const BASIS_POINTS: u32 = 10_000;

pub fn validate_ratios(ratios: &[u32]) -> Result<(), DomainError> {
    let sum: u64 = ratios.iter().map(|r| *r as u64).sum();
    if ratios.is_empty() || sum != BASIS_POINTS as u64 {
        return Err(DomainError::validation(
            ValidationKind::InvalidSettings,
            format!("Payout ratios must sum to {BASIS_POINTS} basis points, got {sum}"),
        ));
    }
    Ok(())
}

/// Pay `pot` out over `standings` (best first).
///
/// Players sharing a rank pool the ratios of every position they occupy and
/// split that pool evenly. Whatever integer division leaves over goes to the
/// first listed player of rank 1. The sum of payouts equals `pot` when the
/// ratios cover it and never exceeds it.
pub fn split_pot(pot: i64, standings: &[Standing], ratios: &[u32]) -> Vec<(UserId, i64)> {
    if pot <= 0 || standings.is_empty() {
        return Vec::new();
    }
    let ratio_at = |pos: usize| ratios.get(pos).copied().unwrap_or(0) as i128;
    let cap: i128 = (0..standings.len()).map(ratio_at).sum::<i128>().min(BASIS_POINTS as i128);
    let payable = (pot as i128 * cap / BASIS_POINTS as i128) as i64;

    let mut payouts: Vec<(UserId, i64)> = Vec::with_capacity(standings.len());
    let mut pos = 0usize;
    while pos < standings.len() {
        let rank = standings[pos].rank;
        let group: Vec<UserId> = standings[pos..]
            .iter()
            .take_while(|s| s.rank == rank)
            .map(|s| s.user_id)
            .collect();
        let pooled: i128 = (pos..pos + group.len()).map(ratio_at).sum();
        let group_share = (pot as i128 * pooled / BASIS_POINTS as i128) as i64;
        let each = group_share / group.len() as i64;
        payouts.extend(group.iter().map(|u| (*u, each)));
        pos += group.len();
    }

    let paid: i64 = payouts.iter().map(|(_, a)| a).sum();
    let remainder = payable - paid;
    if remainder > 0 {
        if let Some(first) = payouts.first_mut() {
            first.1 += remainder;
        }
    }
    payouts.retain(|(_, amount)| *amount > 0);
    payouts
}
