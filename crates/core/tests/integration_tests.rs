// ═══════════════════════════════════════════════════════════════════
// Integration Tests — RebalanceEngine end to end
// ═══════════════════════════════════════════════════════════════════

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::json;

use rebalancer_core::errors::CoreError;
use rebalancer_core::models::allocation::TargetAllocation;
use rebalancer_core::models::asset::{Asset, InstrumentKind};
use rebalancer_core::models::budget::Budget;
use rebalancer_core::models::exchange_rate::ExchangeRate;
use rebalancer_core::models::settings::Settings;
use rebalancer_core::services::purchase_session::PurchaseState;
use rebalancer_core::storage::adapter::{MemoryStorage, StorageAdapter};
use rebalancer_core::storage::format::encode_state;
use rebalancer_core::storage::repair::RepairOutcome;
use rebalancer_core::RebalanceEngine;

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn rate(r: f64) -> ExchangeRate {
    ExchangeRate::new(r, "test", Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap())
}

fn portfolio() -> Vec<Asset> {
    vec![
        Asset::etf("VTI", 100.0, "USD", 15.0).with_annual_fee(0.03),
        Asset::stock("1306", 2000.0, "JPY", 5.0),
    ]
}

fn fifty_fifty() -> Vec<TargetAllocation> {
    vec![
        TargetAllocation::new("VTI", 50.0),
        TargetAllocation::new("1306", 50.0),
    ]
}

// ═══════════════════════════════════════════════════════════════════
// Construction & settings
// ═══════════════════════════════════════════════════════════════════

mod construction {
    use super::*;

    #[test]
    fn defaults() {
        let engine = RebalanceEngine::with_defaults();
        assert_eq!(engine.base_currency(), "JPY");
        assert_eq!(engine.settings(), &Settings::default());
    }

    #[test]
    fn from_settings_json() {
        let settings = r#"{"base_currency":"usd","fallback_exchange_rate":145}"#;
        let engine = RebalanceEngine::from_settings_json(settings).unwrap();
        assert_eq!(engine.base_currency(), "USD");
        assert_eq!(engine.settings().fallback_exchange_rate, 145.0);
        assert_eq!(engine.settings().storage_key, "portfolioData");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = Settings {
            base_currency: "YEN!".into(),
            ..Settings::default()
        };
        assert!(matches!(
            RebalanceEngine::new(settings),
            Err(CoreError::ValidationError(_))
        ));
        assert!(RebalanceEngine::from_settings_json("not json").is_err());
    }

    #[test]
    fn set_base_currency() {
        let mut engine = RebalanceEngine::default();
        engine.set_base_currency("usd").unwrap();
        assert_eq!(engine.base_currency(), "USD");
        assert!(engine.set_base_currency("US").is_err());
        assert_eq!(engine.base_currency(), "USD");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Full workflow
// ═══════════════════════════════════════════════════════════════════

mod workflow {
    use super::*;

    #[test]
    fn simulate_then_apply_purchases() {
        let engine = RebalanceEngine::with_defaults();
        let mut assets = portfolio();
        let fx = rate(150.0);

        assert_eq!(engine.total_value(&assets, Some(&fx)), 235000.0);

        let budget = Budget::new(100000.0, "JPY");
        let result = engine.simulate(&assets, &fifty_fifty(), Some(&fx), &budget);
        assert_eq!(result.rows[0].asset_id, "VTI");
        assert_eq!(result.normalized_targets.sum(), dec!(100));
        assert_eq!(result.summary.purchase_count, 1);

        // Review the planned purchase and accept it unchanged
        let row = result.row("1306").unwrap().clone();
        let asset = assets[1].clone();
        let mut session = engine.purchase_session(&asset, &row);
        assert_eq!(session.amount(), 100000.0);
        session.begin_edit().unwrap();
        session.confirm().unwrap();
        session.apply(&mut assets).unwrap();
        assert_eq!(session.state(), &PurchaseState::Applied { units: 50.0 });
        assert_eq!(assets[1].holdings, 55.0);

        // The portfolio moved toward target
        let after = engine.simulate(&assets, &fifty_fifty(), Some(&fx), &Budget::new(0.0, "JPY"));
        let topix = after.row("1306").unwrap();
        assert!(topix.current_percentage > row.current_percentage);
        assert!(topix.diff_percentage.abs() < row.diff_percentage.abs());
    }

    #[test]
    fn execute_purchases_matches_session_flow() {
        let engine = RebalanceEngine::with_defaults();
        let assets = portfolio();
        let budget = Budget::new(100000.0, "JPY");
        let result = engine.simulate(&assets, &fifty_fifty(), Some(&rate(150.0)), &budget);
        let updated = engine.execute_purchases(&result.rows, &assets);
        assert_eq!(updated[1].holdings, 55.0);
        assert_eq!(engine.total_value(&updated, Some(&rate(150.0))), 335000.0);
    }

    #[test]
    fn step_by_step_matches_simulate() {
        let engine = RebalanceEngine::with_defaults();
        let assets = portfolio();
        let fx = rate(150.0);
        let budget = Budget::new(100000.0, "JPY");

        let targets = engine.normalize_targets(&fifty_fifty());
        let total = engine.total_value(&assets, Some(&fx));
        let diffs: Vec<_> = assets
            .iter()
            .map(|a| engine.diff(a, total, &targets, Some(&fx)))
            .collect();
        let rows = engine.plan(&assets, &diffs, &budget, Some(&fx));

        let result = engine.simulate(&assets, &fifty_fifty(), Some(&fx), &budget);
        for row in &rows {
            assert_eq!(Some(row), result.row(&row.asset_id));
        }
    }

    #[test]
    fn portfolio_summary() {
        let engine = RebalanceEngine::with_defaults();
        let summary = engine.portfolio_summary(&portfolio(), Some(&rate(150.0)));
        assert_eq!(summary.total_value, 235000.0);
        assert!((summary.annual_fees - 67.5).abs() < 1e-9);
        assert_eq!(summary.holdings[0].ticker, "VTI");
    }

    #[test]
    fn usd_base_currency() {
        let mut engine = RebalanceEngine::with_defaults();
        engine.set_base_currency("USD").unwrap();
        let fx = rate(150.0);
        // 1500 + 10000/150
        let total = engine.total_value(&portfolio(), Some(&fx));
        assert!((total - 1566.6666666).abs() < 1e-6);

        let budget = Budget::new(1000.0, "USD");
        let result = engine.simulate(&portfolio(), &fifty_fifty(), Some(&fx), &budget);
        assert_eq!(result.summary.base_currency, "USD");
        assert_eq!(result.summary.budget_in_base_currency, 1000.0);
        assert_eq!(result.row("1306").unwrap().purchase_units, 75.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Exchange-rate fallback
// ═══════════════════════════════════════════════════════════════════

mod fallback {
    use super::*;

    #[test]
    fn missing_rate_uses_one_by_default() {
        let engine = RebalanceEngine::with_defaults();
        assert_eq!(engine.value(&portfolio()[0], None), 1500.0);
    }

    #[test]
    fn missing_rate_uses_configured_fallback() {
        let engine =
            RebalanceEngine::from_settings_json(r#"{"fallback_exchange_rate":140}"#).unwrap();
        assert_eq!(engine.value(&portfolio()[0], None), 210000.0);
        assert_eq!(engine.value(&portfolio()[0], Some(&rate(-1.0))), 210000.0);
        assert_eq!(engine.value(&portfolio()[0], Some(&rate(150.0))), 225000.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// JSON input
// ═══════════════════════════════════════════════════════════════════

mod json_input {
    use super::*;

    #[test]
    fn run_json() {
        let input = json!({
            "assets": [
                { "id": "VTI", "ticker": "VTI", "price": 100, "currency": "USD", "holdings": 15 },
                { "id": "1306", "ticker": "1306", "price": "2000", "currency": "JPY", "holdings": "5" }
            ],
            "targetAllocations": [
                { "id": "VTI", "targetPercentage": 50 },
                { "id": "1306", "targetPercentage": 50 }
            ],
            "exchangeRate": { "rate": 150, "source": "api" },
            "budget": { "amount": 100000, "currency": "JPY" },
            "baseCurrency": "JPY"
        });
        let engine = RebalanceEngine::with_defaults();
        let result = engine.run_json(&input.to_string()).unwrap();

        assert_eq!(result.summary.total_assets, 235000.0);
        assert_eq!(result.row("1306").unwrap().purchase_units, 50.0);

        let out = serde_json::to_value(&result).unwrap();
        assert_eq!(out["summary"]["purchaseCount"], json!(1));
        assert_eq!(out["rows"][0]["assetId"], json!("VTI"));
    }

    #[test]
    fn run_json_without_rate_or_targets() {
        let input = json!({
            "assets": [
                { "id": "A", "ticker": "A", "price": 1000, "currency": "JPY", "holdings": 1 }
            ],
            "budget": { "amount": 5000, "currency": "JPY" },
            "baseCurrency": "JPY"
        });
        let result = RebalanceEngine::with_defaults()
            .run_json(&input.to_string())
            .unwrap();
        assert_eq!(result.rows[0].target_percentage, 0.0);
        assert_eq!(result.summary.total_purchase_amount, 0.0);
        assert_eq!(result.summary.remaining_budget, 5000.0);
    }

    #[test]
    fn run_json_rejects_malformed_input() {
        let engine = RebalanceEngine::with_defaults();
        assert!(matches!(
            engine.run_json("{\"assets\": 3}"),
            Err(CoreError::Deserialization(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Persisted state
// ═══════════════════════════════════════════════════════════════════

mod persisted_state {
    use super::*;

    fn stored_portfolio(rate: serde_json::Value) -> MemoryStorage {
        let state = json!({
            "holdings": [
                { "id": "VTI", "ticker": "VTI", "price": 100, "currency": "USD", "holdings": 15 },
                { "id": "1306", "ticker": "1306", "price": 2000, "currency": "JPY", "holdings": 5 }
            ],
            "targetPortfolio": [
                { "id": "VTI", "targetPercentage": 50 },
                { "id": "1306", "targetPercentage": 50 }
            ],
            "exchangeRate": rate
        });
        let serde_json::Value::Object(map) = state else {
            unreachable!()
        };
        let mut storage = MemoryStorage::new();
        storage
            .set_item("portfolioData", &encode_state(&map).unwrap())
            .unwrap();
        storage
    }

    #[test]
    fn load_snapshot_when_empty() {
        let engine = RebalanceEngine::with_defaults();
        assert_eq!(engine.load_snapshot(&MemoryStorage::new()).unwrap(), None);
    }

    #[test]
    fn load_snapshot_rejects_garbage() {
        let engine = RebalanceEngine::with_defaults();
        let mut storage = MemoryStorage::new();
        storage.set_item("portfolioData", "???").unwrap();
        assert!(engine.load_snapshot(&storage).is_err());
    }

    #[test]
    fn repair_then_simulate() {
        let engine = RebalanceEngine::with_defaults();
        let mut storage = stored_portfolio(json!({ "rate": 0 }));

        let before = engine.load_snapshot(&storage).unwrap().unwrap();
        assert_eq!(before.exchange_rate, None);

        let now = Utc.with_ymd_and_hms(2025, 5, 8, 0, 0, 0).unwrap();
        assert_eq!(
            engine.repair_exchange_rate(&mut storage, now).unwrap(),
            RepairOutcome::Repaired
        );

        let snapshot = engine.load_snapshot(&storage).unwrap().unwrap();
        let fx = snapshot.exchange_rate.clone().unwrap();
        assert_eq!(fx.rate, 150.0);
        assert!(fx.is_default);

        let result = engine.simulate(
            &snapshot.holdings,
            &snapshot.target_portfolio,
            snapshot.exchange_rate.as_ref(),
            &Budget::new(100000.0, "JPY"),
        );
        assert_eq!(result.summary.total_assets, 235000.0);
        assert_eq!(result.row("1306").unwrap().purchase_amount, 100000.0);
    }

    #[test]
    fn simulate_from_web_app_blob() {
        let state = json!({
            "baseCurrency": "JPY",
            "exchangeRate": { "rate": 151.2, "source": "exchangerate-api", "isDefault": false },
            "currentAssets": [
                {
                    "id": "0331418A", "ticker": "0331418A", "name": "eMAXIS Slim 全世界株式",
                    "price": 24000, "currency": "JPY", "holdings": 1.234,
                    "fundType": "投資信託", "isStock": false, "isMutualFund": true
                },
                {
                    "id": "VTI", "ticker": "VTI", "price": 250, "currency": "USD",
                    "holdings": 10, "fundType": "ETF（米国）", "isStock": true, "isMutualFund": false
                },
                {
                    "id": "7203", "ticker": "7203", "price": 2800, "currency": "JPY",
                    "holdings": 100, "fundType": "個別株", "isStock": true, "isMutualFund": false
                }
            ],
            "targetPortfolio": [
                { "id": "0331418A", "ticker": "0331418A", "targetPercentage": 60 },
                { "id": "VTI", "ticker": "VTI", "targetPercentage": 30 },
                { "id": "7203", "ticker": "7203", "targetPercentage": 10 }
            ],
            "additionalBudget": { "amount": 300000, "currency": "JPY" },
            "version": "1.0.0"
        });
        let blob = STANDARD.encode(urlencoding::encode(&state.to_string()).as_bytes());
        let mut storage = MemoryStorage::new();
        storage.set_item("portfolioData", &blob).unwrap();

        let engine = RebalanceEngine::with_defaults();
        let snapshot = engine.load_snapshot(&storage).unwrap().unwrap();
        assert_eq!(snapshot.holdings[0].instrument_kind, InstrumentKind::MutualFund);
        assert_eq!(snapshot.holdings[1].instrument_kind, InstrumentKind::Etf);
        assert_eq!(snapshot.holdings[2].instrument_kind, InstrumentKind::Stock);

        let budget = snapshot.additional_budget.clone().unwrap();
        let result = engine.simulate(
            &snapshot.holdings,
            &snapshot.target_portfolio,
            snapshot.exchange_rate.as_ref(),
            &budget,
        );
        assert!((result.summary.total_assets - 687_616.0).abs() < 1e-6);

        // Only the fund is underweight, and fund units are bought in 0.001 steps
        let fund = result.row("0331418A").unwrap();
        assert!((fund.purchase_units - 12.5).abs() < 1e-9);
        assert_eq!(result.row("VTI").unwrap().purchase_units, 0.0);
        assert_eq!(result.row("7203").unwrap().purchase_units, 0.0);
        assert!(result.summary.total_purchase_amount <= budget.amount);
    }

    #[test]
    fn repair_uses_settings() {
        let engine = RebalanceEngine::from_settings_json(
            r#"{"repair_exchange_rate":155.5,"storage_key":"savedState"}"#,
        )
        .unwrap();
        let mut storage = MemoryStorage::new();
        let now = Utc.with_ymd_and_hms(2025, 5, 8, 0, 0, 0).unwrap();
        assert_eq!(
            engine.repair_exchange_rate(&mut storage, now).unwrap(),
            RepairOutcome::NoData
        );

        let blob = stored_portfolio(serde_json::Value::Null)
            .get_item("portfolioData")
            .unwrap()
            .unwrap();
        storage.set_item("savedState", &blob).unwrap();
        assert_eq!(
            engine.repair_exchange_rate(&mut storage, now).unwrap(),
            RepairOutcome::Inserted
        );
        let snapshot = engine.load_snapshot(&storage).unwrap().unwrap();
        assert_eq!(snapshot.exchange_rate.unwrap().rate, 155.5);
    }
}
