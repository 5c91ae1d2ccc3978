use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlatewiseError, PlatewiseResult};

/// Prefix of ids assigned to optimistic inserts before the store acknowledges them.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// A logged food item in an owner's ledger. Never mutated in place: a
/// correction is a delete followed by an add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    pub id: String,
    pub owner_id: String,
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub timestamp: DateTime<Utc>,
}

impl FoodEntry {
    pub fn from_new(id: String, owner_id: &str, new: &NewFoodEntry) -> Self {
        Self {
            id,
            owner_id: owner_id.to_string(),
            food_name: new.food_name.clone(),
            calories: new.calories,
            protein: new.protein,
            carbs: new.carbs,
            fat: new.fat,
            timestamp: new.timestamp,
        }
    }

    /// True while the entry still carries the local id of an optimistic insert.
    pub fn is_pending(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

/// An entry as submitted by the user, before any id exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFoodEntry {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub timestamp: DateTime<Utc>,
}

impl NewFoodEntry {
    pub fn validate(&self) -> PlatewiseResult<()> {
        if self.food_name.trim().is_empty() {
            return Err(PlatewiseError::validation("food name must not be empty"));
        }
        check_macro("calories", self.calories)?;
        check_macro("protein", self.protein)?;
        check_macro("carbs", self.carbs)?;
        check_macro("fat", self.fat)
    }
}

pub(crate) fn check_macro(field: &str, value: f64) -> PlatewiseResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PlatewiseError::validation(format!(
            "{field} must be a finite non-negative number, got {value}"
        )))
    }
}
