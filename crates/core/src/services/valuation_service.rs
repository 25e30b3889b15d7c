use crate::models::asset::Asset;
use crate::models::exchange_rate::{ExchangeRate, DOMESTIC_CURRENCY, FOREIGN_CURRENCY};

/// Converts asset values between the two supported currencies.
///
/// A single USD→JPY rate drives every conversion:
/// - USD → JPY multiplies by the rate
/// - JPY → USD divides by the rate
///
/// A missing or non-positive rate is replaced by the fallback rate (1.0 unless
/// configured otherwise). Conversions never fail.
#[derive(Debug, Clone)]
pub struct ValuationService {
    fallback_rate: f64,
}

impl ValuationService {
    pub fn new() -> Self {
        Self { fallback_rate: 1.0 }
    }

    /// Use a different rate when the exchange rate is missing or unusable.
    /// Non-positive fallbacks are ignored.
    pub fn with_fallback_rate(fallback_rate: f64) -> Self {
        if fallback_rate.is_finite() && fallback_rate > 0.0 {
            Self { fallback_rate }
        } else {
            Self::new()
        }
    }

    /// Resolve the rate to use for conversions.
    pub fn effective_rate(&self, exchange_rate: Option<&ExchangeRate>) -> f64 {
        match exchange_rate {
            Some(er) if er.is_usable() => er.rate,
            Some(er) => {
                log::warn!(
                    "Exchange rate {} from '{}' is not usable, falling back to {}",
                    er.rate,
                    er.source,
                    self.fallback_rate
                );
                self.fallback_rate
            }
            None => {
                log::warn!(
                    "No exchange rate available, falling back to {}",
                    self.fallback_rate
                );
                self.fallback_rate
            }
        }
    }

    /// Convert an amount between currencies.
    /// E.g., convert(100.0, "USD", "JPY", rate 150) → 15000.0
    pub fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        exchange_rate: Option<&ExchangeRate>,
    ) -> f64 {
        if from_currency.eq_ignore_ascii_case(to_currency) {
            return amount;
        }
        let rate = self.effective_rate(exchange_rate);
        self.convert_with_rate(amount, from_currency, to_currency, rate)
    }

    /// Same as [`convert`](Self::convert) with an already-resolved rate.
    /// `rate` must be finite and positive.
    pub fn convert_with_rate(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        rate: f64,
    ) -> f64 {
        if from_currency.eq_ignore_ascii_case(to_currency) {
            return amount;
        }

        if from_currency.eq_ignore_ascii_case(FOREIGN_CURRENCY)
            && to_currency.eq_ignore_ascii_case(DOMESTIC_CURRENCY)
        {
            amount * rate
        } else if from_currency.eq_ignore_ascii_case(DOMESTIC_CURRENCY)
            && to_currency.eq_ignore_ascii_case(FOREIGN_CURRENCY)
        {
            amount / rate
        } else {
            log::warn!(
                "Unsupported currency pair {from_currency}/{to_currency}, amount left unconverted"
            );
            amount
        }
    }

    /// Value of an asset (`price × holdings`) in the base currency.
    /// Invalid price or holdings contribute 0.
    pub fn value(
        &self,
        asset: &Asset,
        base_currency: &str,
        exchange_rate: Option<&ExchangeRate>,
    ) -> f64 {
        if asset.currency.eq_ignore_ascii_case(base_currency) {
            return asset.native_value();
        }
        let rate = self.effective_rate(exchange_rate);
        self.value_with_rate(asset, base_currency, rate)
    }

    pub fn value_with_rate(&self, asset: &Asset, base_currency: &str, rate: f64) -> f64 {
        self.convert_with_rate(asset.native_value(), &asset.currency, base_currency, rate)
    }

    /// Sum of all asset values in the base currency.
    pub fn total_value(
        &self,
        assets: &[Asset],
        base_currency: &str,
        exchange_rate: Option<&ExchangeRate>,
    ) -> f64 {
        let needs_rate = assets
            .iter()
            .any(|a| !a.currency.eq_ignore_ascii_case(base_currency));
        let rate = if needs_rate {
            self.effective_rate(exchange_rate)
        } else {
            self.fallback_rate
        };
        assets
            .iter()
            .map(|a| self.value_with_rate(a, base_currency, rate))
            .sum()
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
