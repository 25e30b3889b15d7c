use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::CoreError;
use crate::models::allocation::TargetAllocation;
use crate::models::asset::Asset;
use crate::models::budget::Budget;
use crate::models::exchange_rate::ExchangeRate;

/// Field holding the exchange rate in the persisted state.
pub const EXCHANGE_RATE_FIELD: &str = "exchangeRate";

/// Field holding the additional budget in the persisted state.
pub const ADDITIONAL_BUDGET_FIELD: &str = "additionalBudget";

/// Currency assumed for a legacy numeric budget when the state has no base currency.
const LEGACY_BUDGET_CURRENCY: &str = "JPY";

/// The typed view of a persisted portfolio blob that the engine consumes.
/// Fields the engine does not use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub base_currency: Option<String>,
    #[serde(default, alias = "currentAssets")]
    pub holdings: Vec<Asset>,
    #[serde(default)]
    pub target_portfolio: Vec<TargetAllocation>,
    #[serde(default)]
    pub exchange_rate: Option<ExchangeRate>,
    #[serde(default)]
    pub additional_budget: Option<Budget>,
}

/// Encode a persisted state object.
///
/// Layout: `base64(STANDARD, percent_encode(json(state)))`, the form the web app
/// writes under `portfolioData`.
pub fn encode_state(state: &Map<String, Value>) -> Result<String, CoreError> {
    let json = serde_json::to_string(state)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize state: {e}")))?;
    Ok(STANDARD.encode(urlencoding::encode(&json).as_bytes()))
}

/// Decode a persisted blob into its JSON object. The top level must be an object.
///
/// Accepts both the percent-encoded layout written by [`encode_state`] and plain
/// base64 JSON.
pub fn decode_state(blob: &str) -> Result<Map<String, Value>, CoreError> {
    let bytes = STANDARD.decode(blob.trim())?;
    let text = String::from_utf8(bytes).map_err(|e| {
        CoreError::InvalidFileFormat(format!("Persisted state is not valid UTF-8: {e}"))
    })?;
    let text = text.trim();

    let json = if text.starts_with('{') {
        Cow::Borrowed(text)
    } else {
        urlencoding::decode(text).map_err(|e| {
            CoreError::InvalidFileFormat(format!("Persisted state is not percent-encoded: {e}"))
        })?
    };

    match serde_json::from_str::<Value>(&json)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::InvalidFileFormat(format!(
            "Persisted state must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Extract the exchange rate from a decoded state.
/// Returns `None` when it is missing or malformed; callers fall back to a default rate.
pub fn decode_exchange_rate(state: &Map<String, Value>) -> Option<ExchangeRate> {
    let raw = state.get(EXCHANGE_RATE_FIELD)?;
    serde_json::from_value::<ExchangeRate>(raw.clone())
        .ok()
        .filter(ExchangeRate::is_usable)
}

/// Extract the additional budget from a decoded state.
///
/// A bare number is the older layout; its currency is the state's base currency.
pub fn decode_additional_budget(state: &Map<String, Value>) -> Option<Budget> {
    match state.get(ADDITIONAL_BUDGET_FIELD)? {
        Value::Number(n) => {
            let currency = state
                .get("baseCurrency")
                .and_then(Value::as_str)
                .unwrap_or(LEGACY_BUDGET_CURRENCY);
            Some(Budget::new(n.as_f64()?, currency))
        }
        raw @ Value::Object(_) => serde_json::from_value::<Budget>(raw.clone()).ok(),
        _ => None,
    }
}

/// Build the typed snapshot from a decoded state.
///
/// A malformed `exchangeRate` or `additionalBudget` does not fail the snapshot;
/// it decodes as `None`.
pub fn decode_snapshot(state: &Map<String, Value>) -> Result<PortfolioSnapshot, CoreError> {
    let mut lenient_fields_removed = state.clone();
    lenient_fields_removed.remove(EXCHANGE_RATE_FIELD);
    lenient_fields_removed.remove(ADDITIONAL_BUDGET_FIELD);

    let mut snapshot: PortfolioSnapshot =
        serde_json::from_value(Value::Object(lenient_fields_removed)).map_err(|e| {
            CoreError::Deserialization(format!("Failed to deserialize portfolio snapshot: {e}"))
        })?;
    snapshot.exchange_rate = decode_exchange_rate(state);
    snapshot.additional_budget = decode_additional_budget(state);
    Ok(snapshot)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
