use crate::models::analytics::{HoldingSummary, PortfolioSummary};
use crate::models::asset::{sanitize_amount, Asset};
use crate::models::exchange_rate::ExchangeRate;

use super::valuation_service::ValuationService;

/// Computes portfolio analytics: total value, yearly fees and dividends,
/// allocation breakdown.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsService {
    valuation_service: ValuationService,
}

impl AnalyticsService {
    pub fn new(valuation_service: ValuationService) -> Self {
        Self { valuation_service }
    }

    /// Generate a portfolio summary in the base currency.
    ///
    /// Computes:
    /// - Total current value
    /// - Annual fees (value × fee% / 100)
    /// - Annual dividends for dividend-paying assets (value × yield% / 100)
    /// - Allocation percentages
    pub fn get_portfolio_summary(
        &self,
        assets: &[Asset],
        base_currency: &str,
        exchange_rate: Option<&ExchangeRate>,
    ) -> PortfolioSummary {
        let rate = self.valuation_service.effective_rate(exchange_rate);

        // 1. Calculate current value, fees and dividends per asset
        let mut holding_summaries: Vec<HoldingSummary> = assets
            .iter()
            .map(|asset| {
                let current_value = self
                    .valuation_service
                    .value_with_rate(asset, base_currency, rate);
                let annual_fee = current_value * sanitize_amount(asset.annual_fee) / 100.0;
                let annual_dividend = if asset.has_dividend {
                    current_value * sanitize_amount(asset.dividend_yield) / 100.0
                } else {
                    0.0
                };
                HoldingSummary {
                    asset_id: asset.id.clone(),
                    ticker: asset.ticker.clone(),
                    amount: asset.safe_holdings(),
                    current_value,
                    annual_fee,
                    annual_dividend,
                    allocation_pct: 0.0, // filled below
                }
            })
            .collect();

        let total_value: f64 = holding_summaries.iter().map(|h| h.current_value).sum();

        // 2. Allocation percentages
        for holding in &mut holding_summaries {
            holding.allocation_pct = if total_value > 0.0 {
                (holding.current_value / total_value) * 100.0
            } else {
                0.0
            };
        }

        // Sort by allocation (largest first)
        holding_summaries.sort_by(|a, b| {
            b.allocation_pct
                .partial_cmp(&a.allocation_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        PortfolioSummary {
            currency: base_currency.to_uppercase(),
            total_assets_count: assets.len(),
            total_value,
            annual_fees: holding_summaries.iter().map(|h| h.annual_fee).sum(),
            annual_dividends: holding_summaries.iter().map(|h| h.annual_dividend).sum(),
            holdings: holding_summaries,
        }
    }
}
