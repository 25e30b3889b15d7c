use crate::models::asset::Asset;
use crate::models::budget::Budget;
use crate::models::exchange_rate::ExchangeRate;
use crate::models::simulation::{AllocationDiff, SimulationRow};

use super::valuation_service::ValuationService;

/// Turns allocation diffs and a budget into per-asset purchase quantities.
///
/// The budget is split across underweight assets in proportion to how far each
/// one is below target. Each share is converted into the asset's currency,
/// divided by its price, and rounded DOWN to the instrument's increment. The
/// total spent never exceeds the budget.
///
/// Assets with a non-positive price get no demand and buy nothing, but still
/// appear in the output.
#[derive(Debug, Clone, Default)]
pub struct PurchasePlanner {
    valuation_service: ValuationService,
}

impl PurchasePlanner {
    pub fn new(valuation_service: ValuationService) -> Self {
        Self { valuation_service }
    }

    /// Plan purchases. `diffs[i]` must describe `assets[i]`.
    /// Rows come back in input order; `purchase_amount` is in the budget's currency.
    pub fn plan(
        &self,
        assets: &[Asset],
        diffs: &[AllocationDiff],
        budget: &Budget,
        exchange_rate: Option<&ExchangeRate>,
    ) -> Vec<SimulationRow> {
        let needs_rate = assets
            .iter()
            .any(|a| !a.currency.eq_ignore_ascii_case(&budget.currency));
        let rate = if needs_rate {
            self.valuation_service.effective_rate(exchange_rate)
        } else {
            1.0
        };
        self.plan_with_rate(assets, diffs, budget, rate)
    }

    pub(crate) fn plan_with_rate(
        &self,
        assets: &[Asset],
        diffs: &[AllocationDiff],
        budget: &Budget,
        rate: f64,
    ) -> Vec<SimulationRow> {
        debug_assert_eq!(assets.len(), diffs.len());

        let mut rows: Vec<SimulationRow> = diffs.iter().map(SimulationRow::from_diff).collect();

        // 1. Demand: how far below target each purchasable asset is
        let demand: Vec<f64> = assets
            .iter()
            .zip(diffs)
            .map(|(asset, diff)| {
                if asset.safe_price() <= 0.0 {
                    0.0
                } else if diff.diff_percentage.is_finite() {
                    diff.diff_percentage.max(0.0)
                } else {
                    0.0
                }
            })
            .collect();
        let total_demand: f64 = demand.iter().sum();
        let budget_amount = budget.safe_amount();

        if total_demand <= 0.0 || budget_amount <= 0.0 {
            log::debug!(
                "Nothing to buy (total demand {total_demand}, budget {budget_amount} {})",
                budget.currency
            );
            return rows;
        }

        // 2. Proportional split, floored to each instrument's increment
        let mut spent = 0.0;
        for ((asset, row), asset_demand) in assets.iter().zip(rows.iter_mut()).zip(&demand) {
            if *asset_demand <= 0.0 {
                continue;
            }

            let share = budget_amount * (asset_demand / total_demand);
            let share_native = self.valuation_service.convert_with_rate(
                share,
                &budget.currency,
                &asset.currency,
                rate,
            );
            let price = asset.safe_price();
            let kind = asset.instrument_kind;

            let mut units = kind.floor_units(share_native / price);
            let mut amount = self.cost_in_budget_currency(asset, units, budget, rate);

            // 3. Cap check: float error must never push the total past the budget
            while units > 0.0 && spent + amount > budget_amount {
                units = kind.step_down(units);
                amount = self.cost_in_budget_currency(asset, units, budget, rate);
            }

            if units > 0.0 {
                spent += amount;
                row.purchase_units = units;
                row.purchase_amount = amount;
            }
        }

        log::debug!(
            "Planned purchases for {} of {} {} across {} assets",
            spent,
            budget_amount,
            budget.currency,
            rows.iter().filter(|r| r.purchase_units > 0.0).count()
        );

        rows
    }

    fn cost_in_budget_currency(
        &self,
        asset: &Asset,
        units: f64,
        budget: &Budget,
        rate: f64,
    ) -> f64 {
        self.valuation_service.convert_with_rate(
            units * asset.safe_price(),
            &asset.currency,
            &budget.currency,
            rate,
        )
    }
}
