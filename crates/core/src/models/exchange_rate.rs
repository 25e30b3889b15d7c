use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The foreign currency of the supported pair. Rates are quoted as
/// units of [`DOMESTIC_CURRENCY`] per one unit of this currency.
pub const FOREIGN_CURRENCY: &str = "USD";

/// The domestic currency of the supported pair.
pub const DOMESTIC_CURRENCY: &str = "JPY";

/// A single USD→JPY rate used for every cross-currency conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    /// JPY per 1 USD (e.g., 150.0)
    pub rate: f64,

    /// Where the rate came from (e.g., "exchangerate-api", "fix-utility")
    #[serde(default)]
    pub source: String,

    /// Defaults to the Unix epoch when missing, so old blobs still decode
    #[serde(default)]
    pub last_updated: DateTime<Utc>,

    /// True when the rate is a placeholder rather than a fetched quote
    #[serde(default)]
    pub is_default: bool,
}

impl ExchangeRate {
    pub fn new(rate: f64, source: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            rate,
            source: source.into(),
            last_updated,
            is_default: false,
        }
    }

    /// A placeholder rate written when the stored one is missing or broken.
    pub fn placeholder(rate: f64, source: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            is_default: true,
            ..Self::new(rate, source, last_updated)
        }
    }

    /// Whether the rate can be used for conversion (finite and positive).
    pub fn is_usable(&self) -> bool {
        self.rate.is_finite() && self.rate > 0.0
    }
}
