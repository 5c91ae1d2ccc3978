//! Remote record shapes and their mapping onto the internal model.
//!
//! The store speaks snake_case (`food_name`, `user_id`) and has been seen to
//! send numbers as strings and timestamps without an offset, so decoding is
//! lenient about representation but strict about values.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{PlatewiseError, PlatewiseResult};
use crate::models::entry::check_macro;
use crate::models::{DetectionCandidate, FoodEntry, NewFoodEntry};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFoodRecord {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(alias = "name", alias = "foodName")]
    pub food_name: String,
    #[serde(default, deserialize_with = "number_from_any")]
    pub calories: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub protein: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub fat: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RemoteFoodRecord {
    /// Map into a ledger entry owned by `owner_id`. `fallback` supplies the
    /// timestamp when the store omits it (create replies echo the request
    /// body and add only the id).
    pub fn into_entry(
        self,
        owner_id: &str,
        fallback: Option<DateTime<Utc>>,
    ) -> PlatewiseResult<FoodEntry> {
        for (field, value) in [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ] {
            check_macro(field, value)?;
        }

        let timestamp = match self.timestamp.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => fallback.ok_or_else(|| {
                PlatewiseError::validation(format!("record {} has no timestamp", self.id))
            })?,
        };

        Ok(FoodEntry {
            id: self.id,
            owner_id: owner_id.to_string(),
            food_name: self.food_name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            timestamp,
        })
    }
}

/// Decode a listing one record at a time so a single malformed record
/// costs only itself.
pub fn decode_records(values: Vec<Value>) -> Vec<RemoteFoodRecord> {
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RemoteFoodRecord>(value) {
            Ok(record) => records.push(record),
            Err(err) => warn!("skipping undecodable record at index {index}: {err}"),
        }
    }
    records
}

/// Body of `POST /nutrition/food/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateFoodRequest<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    pub food_name: &'a str,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub timestamp: String,
}

impl<'a> CreateFoodRequest<'a> {
    pub fn new(user_id: &'a str, entry: &'a NewFoodEntry) -> Self {
        Self {
            user_id,
            food_name: &entry.food_name,
            calories: entry.calories,
            protein: entry.protein,
            carbs: entry.carbs,
            fat: entry.fat,
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}

/// An item of the food catalog served by `GET /foods/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFood {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "number_from_any")]
    pub calories: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub protein: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub fat: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub food_class: Option<String>,
}

impl CatalogFood {
    /// A browsed catalog item is a certain match.
    pub fn into_candidate(self) -> DetectionCandidate {
        DetectionCandidate {
            name: self.name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            confidence: 1.0,
            image_url: self.image_url.filter(|url| !url.is_empty()),
        }
    }
}

/// Filters for the catalog lookup. A category of `all` means no category filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoodQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl FoodQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        {
            pairs.push(("category", category.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

pub fn parse_timestamp(raw: &str) -> PlatewiseResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| PlatewiseError::validation(format!("invalid timestamp '{raw}'")))
}

fn number_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|err| serde::de::Error::custom(format!("'{text}' is not a number: {err}"))),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) if !text.is_empty() => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id {other}"))),
    }
}
