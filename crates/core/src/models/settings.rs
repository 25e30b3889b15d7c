use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Engine configuration. Every field has a default, so a partial JSON document
/// (or `{}`) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The currency in which values and percentages are computed (e.g., "JPY", "USD").
    pub base_currency: String,

    /// Rate used when the exchange rate is missing or not positive.
    pub fallback_exchange_rate: f64,

    /// Rate written by the exchange-rate repair when the stored one is broken.
    pub repair_exchange_rate: f64,

    /// Storage key holding the persisted portfolio blob.
    pub storage_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: "JPY".to_string(),
            fallback_exchange_rate: 1.0,
            repair_exchange_rate: 150.0,
            storage_key: "portfolioData".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from JSON, filling missing fields with defaults, and validate them.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Normalize the currency code to uppercase and check every field.
    pub fn validate(&mut self) -> Result<(), CoreError> {
        self.base_currency = validate_currency_code(&self.base_currency)?;
        for (name, rate) in [
            ("fallback_exchange_rate", self.fallback_exchange_rate),
            ("repair_exchange_rate", self.repair_exchange_rate),
        ] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "{name} must be a positive number, got {rate}"
                )));
            }
        }
        if self.storage_key.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "storage_key must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Currency code must be a 3-letter alphabetic string. Returns it uppercased.
pub fn validate_currency_code(currency: &str) -> Result<String, CoreError> {
    let trimmed = currency.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid currency code '{currency}': must be exactly 3 ASCII letters (e.g., JPY, USD)"
        )));
    }
    Ok(trimmed)
}
