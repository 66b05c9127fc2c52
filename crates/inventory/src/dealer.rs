use serde::{Deserialize, Serialize};

use dealership_core::{DealerId, DomainError, DomainResult, Entity};

use crate::text::check_lengths;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// A dealership. Owns zero or more cars (`Car::dealer_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dealer {
    pub id: DealerId,
    pub name: String,
    pub city: String,
    pub address: String,
    pub area: String,
    pub rating: f64,
}

impl Entity for Dealer {
    type Id = DealerId;

    fn id(&self) -> DealerId {
        self.id
    }
}

/// Write payload for create / full-row replace.
///
/// Missing fields deserialize to empty values so that they surface as
/// validation errors instead of decode errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DealerInput {
    pub name: String,
    pub city: String,
    pub address: String,
    pub area: String,
    pub rating: Option<f64>,
}

impl DealerInput {
    /// Check required fields and the rating range.
    pub fn validate(&self) -> DomainResult<()> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("name", self.name.as_str()),
            ("city", self.city.as_str()),
            ("address", self.address.as_str()),
            ("area", self.area.as_str()),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        if self.rating.is_none() {
            missing.push("rating");
        }
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        check_lengths(&[
            ("name", self.name.as_str()),
            ("city", self.city.as_str()),
            ("address", self.address.as_str()),
            ("area", self.area.as_str()),
        ])?;

        let rating = self.rating.unwrap_or_default();
        if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DomainError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            )));
        }
        Ok(())
    }

    /// Validate and attach a store-assigned identity.
    pub fn into_dealer(self, id: DealerId) -> DomainResult<Dealer> {
        self.validate()?;
        Ok(Dealer {
            id,
            name: self.name,
            city: self.city,
            address: self.address,
            area: self.area,
            rating: self.rating.unwrap_or_default(),
        })
    }
}

impl From<Dealer> for DealerInput {
    fn from(d: Dealer) -> Self {
        Self {
            name: d.name,
            city: d.city,
            address: d.address,
            area: d.area,
            rating: Some(d.rating),
        }
    }
}

/// Round a rating to the single decimal place the `NUMERIC(3,1)` column keeps.
pub fn round_rating(rating: f64) -> f64 {
    (rating * 10.0).round() / 10.0
}
