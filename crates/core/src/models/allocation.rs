use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A user-entered target percentage for one asset (by asset id).
/// Assets without an entry have an implicit target of 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAllocation {
    pub id: String,

    #[serde(default, deserialize_with = "lenient_percentage")]
    pub target_percentage: f64,
}

impl TargetAllocation {
    pub fn new(id: impl Into<String>, target_percentage: f64) -> Self {
        Self {
            id: id.into(),
            target_percentage,
        }
    }
}

/// One entry of a normalized allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub id: String,
    pub percentage: Decimal,
}

/// Target percentages rescaled to sum to exactly 100, in input order.
///
/// Backed by a `Vec` so iteration order is the caller's order; lookups are linear,
/// which is fine for portfolio-sized inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTargets {
    entries: Vec<AllocationEntry>,
}

impl NormalizedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<AllocationEntry>) -> Self {
        Self { entries }
    }

    /// Exact normalized percentage for an id, if present.
    pub fn get(&self, id: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.percentage)
    }

    /// Normalized percentage as `f64`, or 0 for ids without a target.
    pub fn percentage_of(&self, id: &str) -> f64 {
        self.get(id)
            .and_then(|p| p.to_f64())
            .unwrap_or(0.0)
    }

    /// Exact sum of all percentages.
    pub fn sum(&self) -> Decimal {
        self.entries.iter().map(|e| e.percentage).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AllocationEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }
}

/// Clamp a percentage to `[0, 100]`; NaN and infinities become 0.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Parse a percentage typed by the user. Empty or non-numeric text is 0.
pub fn parse_percentage(input: &str) -> f64 {
    clamp_percentage(input.trim().parse::<f64>().unwrap_or(0.0))
}

fn lenient_percentage<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => clamp_percentage(n.as_f64().unwrap_or(0.0)),
        Some(serde_json::Value::String(s)) => parse_percentage(&s),
        _ => 0.0,
    })
}
