use serde::{Deserialize, Serialize};

use super::asset::{lenient_amount, sanitize_amount};

/// Additional money available to invest this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    pub currency: String,
}

impl Budget {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    /// Amount with NaN/negative values replaced by 0.
    pub fn safe_amount(&self) -> f64 {
        sanitize_amount(self.amount)
    }
}
