use crate::models::allocation::NormalizedTargets;
use crate::models::asset::Asset;
use crate::models::exchange_rate::ExchangeRate;
use crate::models::simulation::AllocationDiff;

use super::valuation_service::ValuationService;

/// Computes current vs target allocation percentages per asset.
///
/// Pure business logic: reads its inputs, never mutates them.
#[derive(Debug, Clone, Default)]
pub struct DiffCalculator {
    valuation_service: ValuationService,
}

impl DiffCalculator {
    pub fn new(valuation_service: ValuationService) -> Self {
        Self { valuation_service }
    }

    /// Diff for a single asset against a precomputed total (base currency).
    pub fn diff(
        &self,
        asset: &Asset,
        total_assets_value: f64,
        targets: &NormalizedTargets,
        base_currency: &str,
        exchange_rate: Option<&ExchangeRate>,
    ) -> AllocationDiff {
        let current_value = self.valuation_service.value(asset, base_currency, exchange_rate);
        Self::diff_for_value(&asset.id, current_value, total_assets_value, targets)
    }

    /// Diffs for every asset, in input order.
    pub fn diff_all(
        &self,
        assets: &[Asset],
        targets: &NormalizedTargets,
        base_currency: &str,
        rate: f64,
    ) -> Vec<AllocationDiff> {
        let values: Vec<f64> = assets
            .iter()
            .map(|a| self.valuation_service.value_with_rate(a, base_currency, rate))
            .collect();
        let total: f64 = values.iter().sum();

        if total <= 0.0 && !assets.is_empty() {
            log::debug!("Total asset value is zero, current percentages default to 0");
        }

        assets
            .iter()
            .zip(values)
            .map(|(asset, value)| Self::diff_for_value(&asset.id, value, total, targets))
            .collect()
    }

    pub(crate) fn diff_for_value(
        asset_id: &str,
        current_value: f64,
        total_assets_value: f64,
        targets: &NormalizedTargets,
    ) -> AllocationDiff {
        let current_percentage = if total_assets_value > 0.0 {
            ((current_value / total_assets_value) * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let target_percentage = targets.percentage_of(asset_id);

        AllocationDiff {
            asset_id: asset_id.to_string(),
            current_value,
            current_percentage,
            target_percentage,
            diff_percentage: target_percentage - current_percentage,
        }
    }
}
