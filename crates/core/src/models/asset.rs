use serde::{Deserialize, Deserializer, Serialize};

/// The kind of tradable instrument.
/// Determines the minimum purchase increment used by the purchase planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Listed shares, bought in whole units
    #[default]
    Stock,
    /// Mutual funds, bought in units of 0.001
    MutualFund,
    /// Exchange-traded funds, bought in units of 0.01
    #[serde(rename = "ETF", alias = "Etf")]
    Etf,
}

impl InstrumentKind {
    /// Number of decimal places a purchase quantity may carry.
    pub fn decimal_places(&self) -> u32 {
        match self {
            InstrumentKind::Stock => 0,
            InstrumentKind::MutualFund => 3,
            InstrumentKind::Etf => 2,
        }
    }

    /// Smallest quantity that can be bought.
    pub fn min_increment(&self) -> f64 {
        1.0 / self.scale()
    }

    /// Round a raw quantity DOWN to a multiple of the minimum increment.
    /// Non-finite or non-positive input yields 0.
    pub fn floor_units(&self, raw_units: f64) -> f64 {
        if !raw_units.is_finite() || raw_units <= 0.0 {
            return 0.0;
        }
        let scale = self.scale();
        (raw_units * scale).floor() / scale
    }

    /// The next valid quantity below `units`, never below 0.
    pub fn step_down(&self, units: f64) -> f64 {
        let scale = self.scale();
        ((units * scale).round() - 1.0).max(0.0) / scale
    }

    /// Whether `units` is a non-negative multiple of the minimum increment.
    pub fn is_valid_quantity(&self, units: f64) -> bool {
        if !units.is_finite() || units < 0.0 {
            return false;
        }
        let scaled = units * self.scale();
        (scaled - scaled.round()).abs() < 1e-6
    }

    fn scale(&self) -> f64 {
        10f64.powi(self.decimal_places() as i32)
    }
}

/// `fundType` label the web app uses for mutual funds.
pub const FUND_TYPE_MUTUAL_FUND: &str = "投資信託";

/// Prefix shared by the web app's ETF labels ("ETF（日本）", "ETF（米国）").
pub const FUND_TYPE_ETF_PREFIX: &str = "ETF";

impl InstrumentKind {
    /// Map the web app's `fundType` label and `isMutualFund` flag to a kind.
    ///
    /// Mutual funds win over ETFs; every other label (個別株, index and
    /// active funds, REITs, unknown) is bought in whole units.
    pub fn from_fund_type(fund_type: Option<&str>, is_mutual_fund: Option<bool>) -> Self {
        let fund_type = fund_type.map(str::trim).unwrap_or_default();
        if is_mutual_fund == Some(true) || fund_type == FUND_TYPE_MUTUAL_FUND {
            InstrumentKind::MutualFund
        } else if fund_type.starts_with(FUND_TYPE_ETF_PREFIX) {
            InstrumentKind::Etf
        } else {
            InstrumentKind::Stock
        }
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentKind::Stock => write!(f, "Stock"),
            InstrumentKind::MutualFund => write!(f, "MutualFund"),
            InstrumentKind::Etf => write!(f, "ETF"),
        }
    }
}

/// A holding in the user's portfolio, as supplied by the caller's state store.
///
/// The engine only ever reads assets. Numeric fields are deserialized leniently:
/// numbers, numeric strings, `null` and missing values are all accepted, and
/// anything that is not a finite, non-negative number becomes `0`.
///
/// Records written by the web app carry no `instrumentKind`; their kind is
/// derived from `fundType` and the `isMutualFund` flag instead (see
/// [`InstrumentKind::from_fund_type`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AssetRecord")]
pub struct Asset {
    /// Stable identifier, matched against target allocations
    pub id: String,

    /// Ticker symbol, uppercased (e.g., "VTI", "1306")
    pub ticker: String,

    /// Human-readable name
    pub name: String,

    /// Price per unit in `currency`
    pub price: f64,

    /// Currency the price is quoted in (e.g., "JPY", "USD")
    pub currency: String,

    /// Units currently held
    pub holdings: f64,

    /// Stock, mutual fund or ETF
    pub instrument_kind: InstrumentKind,

    /// Annual fee as a percentage of value (e.g., 0.03 for 0.03%)
    pub annual_fee: f64,

    pub has_dividend: bool,

    /// Dividend yield as a percentage of value
    pub dividend_yield: f64,
}

/// Wire shape of an asset. Accepts both the engine's own fields and the
/// web app's `fundType` / `isStock` / `isMutualFund` fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    #[serde(default)]
    id: String,
    ticker: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    price: f64,
    currency: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    holdings: f64,
    #[serde(default)]
    instrument_kind: Option<InstrumentKind>,
    #[serde(default)]
    fund_type: Option<String>,
    #[serde(default)]
    is_mutual_fund: Option<bool>,
    #[serde(default, deserialize_with = "lenient_amount")]
    annual_fee: f64,
    #[serde(default)]
    has_dividend: bool,
    #[serde(default, deserialize_with = "lenient_amount")]
    dividend_yield: f64,
}

impl From<AssetRecord> for Asset {
    fn from(record: AssetRecord) -> Self {
        let instrument_kind = record.instrument_kind.unwrap_or_else(|| {
            InstrumentKind::from_fund_type(record.fund_type.as_deref(), record.is_mutual_fund)
        });
        let id = if record.id.is_empty() {
            record.ticker.clone()
        } else {
            record.id
        };
        Self {
            id,
            ticker: record.ticker,
            name: record.name,
            price: record.price,
            currency: record.currency,
            holdings: record.holdings,
            instrument_kind,
            annual_fee: record.annual_fee,
            has_dividend: record.has_dividend,
            dividend_yield: record.dividend_yield,
        }
    }
}

impl Asset {
    pub fn new(
        ticker: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        holdings: f64,
        instrument_kind: InstrumentKind,
    ) -> Self {
        let ticker = ticker.into().to_uppercase();
        Self {
            id: ticker.clone(),
            name: ticker.clone(),
            ticker,
            price,
            currency: currency.into().to_uppercase(),
            holdings,
            instrument_kind,
            annual_fee: 0.0,
            has_dividend: false,
            dividend_yield: 0.0,
        }
    }

    /// Convenience constructors for each instrument kind
    pub fn stock(
        ticker: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        holdings: f64,
    ) -> Self {
        Self::new(ticker, price, currency, holdings, InstrumentKind::Stock)
    }

    pub fn mutual_fund(
        ticker: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        holdings: f64,
    ) -> Self {
        Self::new(ticker, price, currency, holdings, InstrumentKind::MutualFund)
    }

    pub fn etf(
        ticker: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        holdings: f64,
    ) -> Self {
        Self::new(ticker, price, currency, holdings, InstrumentKind::Etf)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_annual_fee(mut self, annual_fee: f64) -> Self {
        self.annual_fee = annual_fee;
        self
    }

    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.has_dividend = true;
        self.dividend_yield = dividend_yield;
        self
    }

    /// Price with invalid values (NaN, infinite, negative) replaced by 0.
    pub fn safe_price(&self) -> f64 {
        sanitize_amount(self.price)
    }

    /// Holdings with invalid values replaced by 0.
    pub fn safe_holdings(&self) -> f64 {
        sanitize_amount(self.holdings)
    }

    /// Value in the asset's own currency.
    pub fn native_value(&self) -> f64 {
        self.safe_price() * self.safe_holdings()
    }
}

/// Clamp a monetary or quantity input to a finite, non-negative number.
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Deserialize a number that may arrive as a JSON number, a numeric string,
/// `null`, or garbage. Invalid input becomes 0.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let value = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(sanitize_amount(value))
}
