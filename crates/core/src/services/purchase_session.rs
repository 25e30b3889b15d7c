use crate::errors::CoreError;
use crate::models::asset::{sanitize_amount, Asset};
use crate::models::simulation::SimulationRow;

/// The external store that owns holdings. Applying a purchase increments the
/// holdings of one asset.
pub trait HoldingsStore {
    fn apply_purchase(&mut self, asset_id: &str, units: f64) -> Result<(), CoreError>;
}

impl HoldingsStore for Vec<Asset> {
    fn apply_purchase(&mut self, asset_id: &str, units: f64) -> Result<(), CoreError> {
        let asset = self
            .iter_mut()
            .find(|a| a.id == asset_id)
            .ok_or_else(|| CoreError::AssetNotFound(asset_id.to_string()))?;
        asset.holdings = asset.safe_holdings() + units;
        Ok(())
    }
}

/// Where a single planned purchase is in its review flow.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseState {
    /// Showing the planned quantity
    Viewing,
    /// The user is overriding the quantity
    Editing { units: f64 },
    /// The user accepted `units`; waiting to apply
    Confirmed { units: f64 },
    /// `units` were applied to the holdings store (terminal)
    Applied { units: f64 },
}

impl std::fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseState::Viewing => write!(f, "Viewing"),
            PurchaseState::Editing { .. } => write!(f, "Editing"),
            PurchaseState::Confirmed { .. } => write!(f, "Confirmed"),
            PurchaseState::Applied { .. } => write!(f, "Applied"),
        }
    }
}

/// Review flow for one planned purchase:
///
/// ```text
/// Viewing → Editing(units) → Confirmed → Applied
///              │               │
///              └──── cancel ───┴──→ Viewing (planned values restored)
/// ```
///
/// Amounts are `units × price` in the asset's own currency. Budget checks are
/// the caller's job before `apply`.
#[derive(Debug, Clone)]
pub struct PurchaseSession {
    asset_id: String,
    price: f64,
    planned_units: f64,
    state: PurchaseState,
}

impl PurchaseSession {
    pub fn new(asset: &Asset, row: &SimulationRow) -> Self {
        Self {
            asset_id: asset.id.clone(),
            price: asset.safe_price(),
            planned_units: sanitize_amount(row.purchase_units),
            state: PurchaseState::Viewing,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn state(&self) -> &PurchaseState {
        &self.state
    }

    pub fn planned_units(&self) -> f64 {
        self.planned_units
    }

    /// Units currently shown: the planned quantity while viewing, the edited one otherwise.
    pub fn units(&self) -> f64 {
        match self.state {
            PurchaseState::Viewing => self.planned_units,
            PurchaseState::Editing { units }
            | PurchaseState::Confirmed { units }
            | PurchaseState::Applied { units } => units,
        }
    }

    /// Live amount for the shown quantity.
    pub fn amount(&self) -> f64 {
        self.units() * self.price
    }

    pub fn begin_edit(&mut self) -> Result<(), CoreError> {
        match self.state {
            PurchaseState::Viewing => {
                self.state = PurchaseState::Editing {
                    units: self.planned_units,
                };
                Ok(())
            }
            _ => Err(self.invalid("begin editing")),
        }
    }

    /// Override the quantity. Non-finite input is treated as 0.
    pub fn set_units(&mut self, units: f64) -> Result<(), CoreError> {
        match self.state {
            PurchaseState::Editing { .. } => {
                let units = if units.is_finite() { units } else { 0.0 };
                self.state = PurchaseState::Editing { units };
                Ok(())
            }
            _ => Err(self.invalid("set units")),
        }
    }

    pub fn confirm(&mut self) -> Result<(), CoreError> {
        match self.state {
            PurchaseState::Editing { units } => {
                self.state = PurchaseState::Confirmed { units };
                Ok(())
            }
            _ => Err(self.invalid("confirm")),
        }
    }

    /// Apply the confirmed quantity to the holdings store.
    ///
    /// A quantity of 0 or less is rejected with `ValidationError` and the
    /// session stays confirmed so the user can cancel and retry.
    pub fn apply(&mut self, store: &mut dyn HoldingsStore) -> Result<(), CoreError> {
        let units = match self.state {
            PurchaseState::Confirmed { units } => units,
            _ => return Err(self.invalid("apply")),
        };
        if units <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Purchase units for {} must be greater than 0, got {units}",
                self.asset_id
            )));
        }
        store.apply_purchase(&self.asset_id, units)?;
        log::debug!("Applied purchase of {units} units of {}", self.asset_id);
        self.state = PurchaseState::Applied { units };
        Ok(())
    }

    /// Discard edits and return to the planned values.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        match self.state {
            PurchaseState::Applied { .. } => Err(self.invalid("cancel")),
            _ => {
                self.state = PurchaseState::Viewing;
                Ok(())
            }
        }
    }

    fn invalid(&self, action: &str) -> CoreError {
        CoreError::InvalidTransition {
            from: self.state.to_string(),
            action: action.to_string(),
        }
    }
}
