pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use chrono::{DateTime, Utc};
use models::{
    allocation::{NormalizedTargets, TargetAllocation},
    analytics::PortfolioSummary,
    asset::Asset,
    budget::Budget,
    exchange_rate::ExchangeRate,
    settings::{validate_currency_code, Settings},
    simulation::{AllocationDiff, SimulationInput, SimulationResult, SimulationRow},
};
use services::{
    allocation_normalizer::AllocationNormalizer,
    analytics_service::AnalyticsService,
    diff_calculator::DiffCalculator,
    purchase_planner::PurchasePlanner,
    purchase_session::PurchaseSession,
    simulation_service::SimulationService,
    valuation_service::ValuationService,
};
use storage::{
    adapter::StorageAdapter,
    format::{decode_snapshot, decode_state, PortfolioSnapshot},
    repair::{repair_exchange_rate, RepairOutcome},
};

use errors::CoreError;

/// Main entry point for the rebalancer-core library.
///
/// Holds configuration and the computation services. It owns no portfolio
/// state: every call takes an explicit snapshot and returns a fresh result, so
/// one engine can be shared freely across call sites.
#[must_use]
#[derive(Debug, Clone)]
pub struct RebalanceEngine {
    settings: Settings,
    valuation_service: ValuationService,
    normalizer: AllocationNormalizer,
    diff_calculator: DiffCalculator,
    planner: PurchasePlanner,
    simulation_service: SimulationService,
    analytics_service: AnalyticsService,
}

impl RebalanceEngine {
    /// Create an engine with default settings (JPY base, fallback rate 1.0).
    pub fn with_defaults() -> Self {
        Self::build(Settings::default())
    }

    /// Create an engine from validated settings.
    pub fn new(mut settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    /// Create an engine from a JSON settings document.
    pub fn from_settings_json(json: &str) -> Result<Self, CoreError> {
        Ok(Self::build(Settings::from_json(json)?))
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set the base currency (e.g., "JPY", "USD").
    /// Currency code must be a 3-letter alphabetic string.
    pub fn set_base_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        self.settings.base_currency = validate_currency_code(currency)?;
        Ok(())
    }

    #[must_use]
    pub fn base_currency(&self) -> &str {
        &self.settings.base_currency
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Value of one asset in the base currency.
    #[must_use]
    pub fn value(&self, asset: &Asset, exchange_rate: Option<&ExchangeRate>) -> f64 {
        self.valuation_service
            .value(asset, &self.settings.base_currency, exchange_rate)
    }

    /// Total value of all assets in the base currency.
    #[must_use]
    pub fn total_value(&self, assets: &[Asset], exchange_rate: Option<&ExchangeRate>) -> f64 {
        self.valuation_service
            .total_value(assets, &self.settings.base_currency, exchange_rate)
    }

    // ── Targets & Diffs ─────────────────────────────────────────────

    /// Rescale targets so they sum to exactly 100.
    #[must_use]
    pub fn normalize_targets(&self, allocations: &[TargetAllocation]) -> NormalizedTargets {
        self.normalizer.normalize(allocations)
    }

    /// Current vs target percentages for one asset.
    #[must_use]
    pub fn diff(
        &self,
        asset: &Asset,
        total_assets_value: f64,
        targets: &NormalizedTargets,
        exchange_rate: Option<&ExchangeRate>,
    ) -> AllocationDiff {
        self.diff_calculator.diff(
            asset,
            total_assets_value,
            targets,
            &self.settings.base_currency,
            exchange_rate,
        )
    }

    /// Plan purchases from precomputed diffs. Rows keep input order.
    #[must_use]
    pub fn plan(
        &self,
        assets: &[Asset],
        diffs: &[AllocationDiff],
        budget: &Budget,
        exchange_rate: Option<&ExchangeRate>,
    ) -> Vec<SimulationRow> {
        self.planner.plan(assets, diffs, budget, exchange_rate)
    }

    // ── Simulation ──────────────────────────────────────────────────

    /// Run the full rebalancing pipeline in the configured base currency.
    #[must_use]
    pub fn simulate(
        &self,
        assets: &[Asset],
        target_allocations: &[TargetAllocation],
        exchange_rate: Option<&ExchangeRate>,
        budget: &Budget,
    ) -> SimulationResult {
        self.simulation_service.simulate(
            assets,
            target_allocations,
            exchange_rate,
            budget,
            &self.settings.base_currency,
        )
    }

    /// Run the pipeline on a self-contained input (its own base currency).
    #[must_use]
    pub fn run(&self, input: &SimulationInput) -> SimulationResult {
        self.simulation_service.run(input)
    }

    /// Parse a JSON `SimulationInput` and run it.
    pub fn run_json(&self, json: &str) -> Result<SimulationResult, CoreError> {
        let input: SimulationInput = serde_json::from_str(json)?;
        Ok(self.run(&input))
    }

    /// Apply planned purchases to a snapshot; returns updated copies.
    #[must_use]
    pub fn execute_purchases(&self, rows: &[SimulationRow], assets: &[Asset]) -> Vec<Asset> {
        self.simulation_service.execute_purchases(rows, assets)
    }

    /// Start the review flow for one planned purchase.
    #[must_use]
    pub fn purchase_session(&self, asset: &Asset, row: &SimulationRow) -> PurchaseSession {
        PurchaseSession::new(asset, row)
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Total value, yearly fees/dividends and allocation breakdown.
    #[must_use]
    pub fn portfolio_summary(
        &self,
        assets: &[Asset],
        exchange_rate: Option<&ExchangeRate>,
    ) -> PortfolioSummary {
        self.analytics_service
            .get_portfolio_summary(assets, &self.settings.base_currency, exchange_rate)
    }

    // ── Persisted State ─────────────────────────────────────────────

    /// Read the persisted portfolio blob through a storage adapter.
    /// Returns `None` when nothing is stored.
    pub fn load_snapshot(
        &self,
        storage: &dyn StorageAdapter,
    ) -> Result<Option<PortfolioSnapshot>, CoreError> {
        match storage.get_item(&self.settings.storage_key)? {
            Some(blob) => Ok(Some(decode_snapshot(&decode_state(&blob)?)?)),
            None => Ok(None),
        }
    }

    /// Replace a missing or broken persisted exchange rate with the configured default.
    pub fn repair_exchange_rate(
        &self,
        storage: &mut dyn StorageAdapter,
        now: DateTime<Utc>,
    ) -> Result<RepairOutcome, CoreError> {
        repair_exchange_rate(storage, &self.settings, now)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(settings: Settings) -> Self {
        let valuation_service =
            ValuationService::with_fallback_rate(settings.fallback_exchange_rate);

        Self {
            normalizer: AllocationNormalizer::new(),
            diff_calculator: DiffCalculator::new(valuation_service.clone()),
            planner: PurchasePlanner::new(valuation_service.clone()),
            simulation_service: SimulationService::new(valuation_service.clone()),
            analytics_service: AnalyticsService::new(valuation_service.clone()),
            valuation_service,
            settings,
        }
    }
}

impl Default for RebalanceEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
