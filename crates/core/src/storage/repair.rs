use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::CoreError;
use crate::models::exchange_rate::ExchangeRate;
use crate::models::settings::Settings;

use super::adapter::StorageAdapter;
use super::format::{decode_state, encode_state, EXCHANGE_RATE_FIELD};

/// Source tag written on repaired exchange rates.
pub const REPAIR_SOURCE: &str = "fix-utility";

/// What the exchange-rate repair found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Nothing stored under the key
    NoData,
    /// The stored rate is a positive number; nothing written
    Healthy,
    /// The stored rate was broken and has been replaced
    Repaired,
    /// No rate was stored; a default one was added
    Inserted,
    /// The blob could not be decoded; left untouched
    Unreadable,
}

/// Check the persisted exchange rate and replace it when it is missing or broken.
///
/// A rate counts as broken unless it is a JSON number greater than 0. The
/// replacement is `settings.repair_exchange_rate`, flagged as a default. All
/// other fields of the persisted state are preserved.
pub fn repair_exchange_rate(
    storage: &mut dyn StorageAdapter,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<RepairOutcome, CoreError> {
    let key = settings.storage_key.as_str();
    let Some(blob) = storage.get_item(key)? else {
        return Ok(RepairOutcome::NoData);
    };

    let mut state = match decode_state(&blob) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Failed to decode persisted state under '{key}': {e}");
            return Ok(RepairOutcome::Unreadable);
        }
    };

    let outcome = match state.get(EXCHANGE_RATE_FIELD) {
        None | Some(Value::Null) => RepairOutcome::Inserted,
        Some(raw) if has_valid_rate(raw) => return Ok(RepairOutcome::Healthy),
        Some(_) => RepairOutcome::Repaired,
    };

    let placeholder = ExchangeRate::placeholder(settings.repair_exchange_rate, REPAIR_SOURCE, now);
    let value = serde_json::to_value(&placeholder)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize exchange rate: {e}")))?;
    state.insert(EXCHANGE_RATE_FIELD.to_string(), value);
    storage.set_item(key, &encode_state(&state)?)?;

    log::warn!(
        "Exchange rate under '{key}' {}, set to {}",
        if outcome == RepairOutcome::Inserted { "was missing" } else { "was invalid" },
        settings.repair_exchange_rate
    );
    Ok(outcome)
}

fn has_valid_rate(raw: &Value) -> bool {
    raw.get("rate")
        .and_then(Value::as_f64)
        .is_some_and(|rate| rate.is_finite() && rate > 0.0)
}
