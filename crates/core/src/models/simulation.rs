use serde::{Deserialize, Serialize};

use super::allocation::{NormalizedTargets, TargetAllocation};
use super::asset::Asset;
use super::budget::Budget;
use super::exchange_rate::ExchangeRate;

/// Everything one simulation pass needs, supplied fresh by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub target_allocations: Vec<TargetAllocation>,
    #[serde(default)]
    pub exchange_rate: Option<ExchangeRate>,
    pub budget: Budget,
    pub base_currency: String,
}

/// Current vs target allocation for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDiff {
    pub asset_id: String,

    /// Value in the base currency
    pub current_value: f64,

    /// Share of total assets, in `[0, 100]`
    pub current_percentage: f64,

    /// Normalized target, 0 when the asset has no target
    pub target_percentage: f64,

    /// `target - current`: positive means underweight
    pub diff_percentage: f64,
}

/// One row of the rebalancing plan, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRow {
    pub asset_id: String,
    pub current_value: f64,
    pub current_percentage: f64,
    pub target_percentage: f64,
    pub diff_percentage: f64,

    /// Units to buy, a non-negative multiple of the instrument's increment
    pub purchase_units: f64,

    /// Cost of `purchase_units`, in the budget's currency
    pub purchase_amount: f64,
}

impl SimulationRow {
    pub(crate) fn from_diff(diff: &AllocationDiff) -> Self {
        Self {
            asset_id: diff.asset_id.clone(),
            current_value: diff.current_value,
            current_percentage: diff.current_percentage,
            target_percentage: diff.target_percentage,
            diff_percentage: diff.diff_percentage,
            purchase_units: 0.0,
            purchase_amount: 0.0,
        }
    }
}

/// Allocation of one asset after the planned purchases are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedAllocation {
    pub asset_id: String,
    pub new_holdings: f64,

    /// Post-purchase value in the base currency
    pub new_value: f64,

    /// Share of the projected total assets
    pub new_percentage: f64,
    pub target_percentage: f64,

    /// `new - target`: positive means still overweight
    pub difference: f64,
}

/// Budget usage totals for a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub base_currency: String,
    pub budget_currency: String,

    /// Current total assets in the base currency
    pub total_assets: f64,

    /// The budget converted into the base currency
    pub budget_in_base_currency: f64,

    /// `total_assets + budget_in_base_currency`
    pub projected_total_assets: f64,

    /// Sum of purchase amounts, in the budget's currency
    pub total_purchase_amount: f64,

    /// Unspent budget, in the budget's currency
    pub remaining_budget: f64,

    /// Spent share of the budget, 0..=100
    pub utilization_rate: f64,

    /// Rows with a non-zero purchase
    pub purchase_count: usize,
}

/// The complete output of one simulation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Ordered by descending current value (stable; ties keep input order)
    pub rows: Vec<SimulationRow>,
    pub normalized_targets: NormalizedTargets,
    pub projected_allocations: Vec<ProjectedAllocation>,
    pub summary: SimulationSummary,
}

impl SimulationResult {
    pub fn row(&self, asset_id: &str) -> Option<&SimulationRow> {
        self.rows.iter().find(|r| r.asset_id == asset_id)
    }

    /// Rows that actually buy something.
    pub fn purchases(&self) -> impl Iterator<Item = &SimulationRow> {
        self.rows.iter().filter(|r| r.purchase_units > 0.0)
    }
}
