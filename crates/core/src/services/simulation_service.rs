use crate::models::allocation::{NormalizedTargets, TargetAllocation};
use crate::models::asset::Asset;
use crate::models::budget::Budget;
use crate::models::exchange_rate::ExchangeRate;
use crate::models::simulation::{
    AllocationDiff, ProjectedAllocation, SimulationInput, SimulationResult, SimulationRow,
    SimulationSummary,
};

use super::allocation_normalizer::AllocationNormalizer;
use super::diff_calculator::DiffCalculator;
use super::purchase_planner::PurchasePlanner;
use super::valuation_service::ValuationService;

/// Runs the full rebalancing pipeline:
/// normalize targets → value assets → diff → plan purchases → assemble result.
///
/// Every call is a pure function of its arguments. Identical inputs always
/// produce identical results.
#[derive(Debug, Clone, Default)]
pub struct SimulationService {
    valuation_service: ValuationService,
    normalizer: AllocationNormalizer,
    diff_calculator: DiffCalculator,
    planner: PurchasePlanner,
}

impl SimulationService {
    pub fn new(valuation_service: ValuationService) -> Self {
        Self {
            normalizer: AllocationNormalizer::new(),
            diff_calculator: DiffCalculator::new(valuation_service.clone()),
            planner: PurchasePlanner::new(valuation_service.clone()),
            valuation_service,
        }
    }

    pub fn run(&self, input: &SimulationInput) -> SimulationResult {
        self.simulate(
            &input.assets,
            &input.target_allocations,
            input.exchange_rate.as_ref(),
            &input.budget,
            &input.base_currency,
        )
    }

    pub fn simulate(
        &self,
        assets: &[Asset],
        target_allocations: &[TargetAllocation],
        exchange_rate: Option<&ExchangeRate>,
        budget: &Budget,
        base_currency: &str,
    ) -> SimulationResult {
        let needs_rate = assets
            .iter()
            .map(|a| a.currency.as_str())
            .chain(std::iter::once(budget.currency.as_str()))
            .any(|c| !c.eq_ignore_ascii_case(base_currency));
        let rate = if needs_rate {
            self.valuation_service.effective_rate(exchange_rate)
        } else {
            1.0
        };

        let targets = self.normalizer.normalize(target_allocations);
        let diffs = self
            .diff_calculator
            .diff_all(assets, &targets, base_currency, rate);
        let mut rows = self.planner.plan_with_rate(assets, &diffs, budget, rate);

        let summary = self.summarize(&diffs, &rows, budget, base_currency, rate);
        let projected_allocations = self.project_allocations(
            assets,
            &rows,
            &targets,
            summary.projected_total_assets,
            base_currency,
            rate,
        );

        // Largest holdings first; sort_by is stable so ties keep input order
        rows.sort_by(|a, b| {
            b.current_value
                .partial_cmp(&a.current_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        SimulationResult {
            rows,
            normalized_targets: targets,
            projected_allocations,
            summary,
        }
    }

    /// Apply planned purchases to a snapshot of assets.
    /// Returns new assets with holdings increased; the input is left untouched.
    pub fn execute_purchases(&self, rows: &[SimulationRow], assets: &[Asset]) -> Vec<Asset> {
        assets
            .iter()
            .map(|asset| {
                let mut updated = asset.clone();
                if let Some(row) = rows
                    .iter()
                    .find(|r| r.asset_id == asset.id && r.purchase_units > 0.0)
                {
                    updated.holdings = asset.safe_holdings() + row.purchase_units;
                }
                updated
            })
            .collect()
    }

    fn summarize(
        &self,
        diffs: &[AllocationDiff],
        rows: &[SimulationRow],
        budget: &Budget,
        base_currency: &str,
        rate: f64,
    ) -> SimulationSummary {
        let total_assets: f64 = diffs.iter().map(|d| d.current_value).sum();
        let budget_amount = budget.safe_amount();
        let budget_in_base_currency = self.valuation_service.convert_with_rate(
            budget_amount,
            &budget.currency,
            base_currency,
            rate,
        );
        let total_purchase_amount: f64 = rows.iter().map(|r| r.purchase_amount).sum();
        let utilization_rate = if budget_amount > 0.0 {
            (total_purchase_amount / budget_amount) * 100.0
        } else {
            0.0
        };

        SimulationSummary {
            base_currency: base_currency.to_uppercase(),
            budget_currency: budget.currency.to_uppercase(),
            total_assets,
            budget_in_base_currency,
            projected_total_assets: total_assets + budget_in_base_currency,
            total_purchase_amount,
            remaining_budget: (budget_amount - total_purchase_amount).max(0.0),
            utilization_rate,
            purchase_count: rows.iter().filter(|r| r.purchase_units > 0.0).count(),
        }
    }

    fn project_allocations(
        &self,
        assets: &[Asset],
        rows: &[SimulationRow],
        targets: &NormalizedTargets,
        projected_total_assets: f64,
        base_currency: &str,
        rate: f64,
    ) -> Vec<ProjectedAllocation> {
        assets
            .iter()
            .zip(rows)
            .map(|(asset, row)| {
                let new_holdings = asset.safe_holdings() + row.purchase_units;
                let new_value = self.valuation_service.convert_with_rate(
                    asset.safe_price() * new_holdings,
                    &asset.currency,
                    base_currency,
                    rate,
                );
                let new_percentage = if projected_total_assets > 0.0 {
                    (new_value / projected_total_assets) * 100.0
                } else {
                    0.0
                };
                let target_percentage = targets.percentage_of(&asset.id);

                ProjectedAllocation {
                    asset_id: asset.id.clone(),
                    new_holdings,
                    new_value,
                    new_percentage,
                    target_percentage,
                    difference: new_percentage - target_percentage,
                }
            })
            .collect()
    }
}
