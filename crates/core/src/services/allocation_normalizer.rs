use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::models::allocation::{
    clamp_percentage, AllocationEntry, NormalizedTargets, TargetAllocation,
};

/// How far a target sum may drift from 100 and still count as normalized.
pub const ALLOCATION_TOLERANCE: f64 = 0.05;

/// Rescales target percentages so they sum to exactly 100 while keeping their ratios.
///
/// Algorithm:
/// 1. Clamp each input to `[0, 100]` (NaN → 0). Duplicate ids keep their first
///    position and their last value.
/// 2. If every input is 0, split 100 equally.
/// 3. Otherwise scale each value by `100 / total` and round to one decimal.
/// 4. Add the rounding remainder to the last id so the sum is exactly 100.
///
/// Pure business logic, no state.
#[derive(Debug, Clone, Default)]
pub struct AllocationNormalizer;

impl AllocationNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, allocations: &[TargetAllocation]) -> NormalizedTargets {
        let mut entries = Self::collect_entries(allocations);
        if entries.is_empty() {
            return NormalizedTargets::new();
        }

        let total: Decimal = entries.iter().map(|e| e.percentage).sum();

        if total.is_zero() {
            let share = dec!(100) / Decimal::from(entries.len());
            log::debug!("All targets are zero, splitting equally at {share}% each");
            for entry in &mut entries {
                entry.percentage = share;
            }
            return NormalizedTargets::from_entries(entries);
        }

        for entry in &mut entries {
            entry.percentage = (entry.percentage * dec!(100) / total)
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        }

        let scaled_sum: Decimal = entries.iter().map(|e| e.percentage).sum();
        let remainder = dec!(100) - scaled_sum;
        if let Some(last) = entries.last_mut() {
            last.percentage += remainder;
        }

        NormalizedTargets::from_entries(entries)
    }

    /// Raw (clamped) sum of the entered targets.
    pub fn total(&self, allocations: &[TargetAllocation]) -> f64 {
        Self::collect_entries(allocations)
            .iter()
            .map(|e| e.percentage)
            .sum::<Decimal>()
            .to_f64()
            .unwrap_or(0.0)
    }

    /// Whether the entered targets already sum to 100 within [`ALLOCATION_TOLERANCE`].
    pub fn is_normalized(&self, allocations: &[TargetAllocation]) -> bool {
        (self.total(allocations) - 100.0).abs() <= ALLOCATION_TOLERANCE
    }

    fn collect_entries(allocations: &[TargetAllocation]) -> Vec<AllocationEntry> {
        let mut entries: Vec<AllocationEntry> = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let percentage = Decimal::from_f64(clamp_percentage(allocation.target_percentage))
                .unwrap_or(Decimal::ZERO);
            match entries.iter_mut().find(|e| e.id == allocation.id) {
                Some(existing) => existing.percentage = percentage,
                None => entries.push(AllocationEntry {
                    id: allocation.id.clone(),
                    percentage,
                }),
            }
        }
        entries
    }
}
