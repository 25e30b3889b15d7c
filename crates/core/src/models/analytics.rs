use serde::{Deserialize, Serialize};

/// Summary of the whole portfolio for the current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Currency used for all monetary values
    pub currency: String,

    /// Number of assets in the snapshot
    pub total_assets_count: usize,

    /// Total portfolio value in the base currency
    pub total_value: f64,

    /// Yearly fees across all holdings (value × annual_fee / 100)
    pub annual_fees: f64,

    /// Yearly dividends across dividend-paying holdings (value × yield / 100)
    pub annual_dividends: f64,

    /// Per-asset breakdown, largest allocation first
    pub holdings: Vec<HoldingSummary>,
}

/// Summary of a single held asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub asset_id: String,
    pub ticker: String,

    /// Units held
    pub amount: f64,

    /// Current value in the base currency
    pub current_value: f64,

    pub annual_fee: f64,
    pub annual_dividend: f64,

    /// Allocation percentage (this asset's value / total portfolio value × 100)
    pub allocation_pct: f64,
}
