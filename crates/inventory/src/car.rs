use serde::{Deserialize, Serialize};

use dealership_core::{CarId, DealerId, DomainError, DomainResult, Entity};

use crate::text::check_lengths;

/// A car on a dealer's lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub firm: String,
    pub model: String,
    pub year: i32,
    pub power: i32,
    pub color: Option<String>,
    pub price: i32,
    pub dealer_id: DealerId,
}

impl Entity for Car {
    type Id = CarId;

    fn id(&self) -> CarId {
        self.id
    }
}

/// Write payload for create / full-row replace.
///
/// `dealer_id` is not checked here: the store's foreign key is the only judge of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarInput {
    pub firm: String,
    pub model: String,
    pub year: i32,
    pub power: i32,
    pub color: Option<String>,
    pub price: i32,
    pub dealer_id: DealerId,
}

impl Default for CarInput {
    fn default() -> Self {
        Self {
            firm: String::new(),
            model: String::new(),
            year: 0,
            power: 0,
            color: None,
            price: 0,
            dealer_id: DealerId::new(0),
        }
    }
}

impl CarInput {
    /// Check required fields (non-empty firm/model, non-zero year/power/price) and text widths.
    pub fn validate(&self) -> DomainResult<()> {
        let mut missing = Vec::new();
        if self.firm.trim().is_empty() {
            missing.push("firm");
        }
        if self.model.trim().is_empty() {
            missing.push("model");
        }
        if self.year == 0 {
            missing.push("year");
        }
        if self.power == 0 {
            missing.push("power");
        }
        if self.price == 0 {
            missing.push("price");
        }
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        check_lengths(&[
            ("firm", self.firm.as_str()),
            ("model", self.model.as_str()),
            ("color", self.color.as_deref().unwrap_or_default()),
        ])
    }

    /// Blank colors are stored as absent.
    pub fn normalized(mut self) -> Self {
        if self.color.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.color = None;
        }
        self
    }

    /// Validate and attach a store-assigned identity.
    pub fn into_car(self, id: CarId) -> DomainResult<Car> {
        self.validate()?;
        let input = self.normalized();
        Ok(Car {
            id,
            firm: input.firm,
            model: input.model,
            year: input.year,
            power: input.power,
            color: input.color,
            price: input.price,
            dealer_id: input.dealer_id,
        })
    }
}

impl From<Car> for CarInput {
    fn from(c: Car) -> Self {
        Self {
            firm: c.firm,
            model: c.model,
            year: c.year,
            power: c.power,
            color: c.color,
            price: c.price,
            dealer_id: c.dealer_id,
        }
    }
}
