//! Validation and ranking of raw `/detect` payloads.
//!
//! Expected shape: `{ "detected_foods": [ { name|food_name, calories, protein,
//! carbs, fat, confidence, image_url }, ... ] }`. Macro fields other than the
//! name may be omitted and default to zero; a present field must be a finite,
//! non-negative number. `confidence` must lie in `[0, 1]`.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PlatewiseError, PlatewiseResult};
use crate::models::entry::check_macro;
use crate::models::DetectionCandidate;

/// Most candidates a single detection response contributes.
pub const MAX_CANDIDATES: usize = 5;

#[derive(Debug, Deserialize)]
struct RawDetectionResponse {
    detected_foods: Option<Vec<Value>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(alias = "food_name")]
    name: Option<String>,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
    confidence: Option<f64>,
    #[serde(alias = "imageUrl")]
    image_url: Option<String>,
}

pub fn normalize(raw: Value) -> PlatewiseResult<Vec<DetectionCandidate>> {
    normalize_with_limit(raw, MAX_CANDIDATES)
}

/// Validate `raw` and return its candidates ranked by confidence, highest
/// first, keeping arrival order among equal confidences, truncated to `limit`.
pub fn normalize_with_limit(raw: Value, limit: usize) -> PlatewiseResult<Vec<DetectionCandidate>> {
    if !raw.is_object() {
        return Err(PlatewiseError::validation("payload is not a JSON object"));
    }

    let response: RawDetectionResponse = serde_json::from_value(raw)
        .map_err(|err| PlatewiseError::validation(format!("malformed payload: {err}")))?;

    let items = match (response.detected_foods, response.error) {
        (Some(items), _) => items,
        (None, Some(message)) => return Err(PlatewiseError::validation(message)),
        (None, None) => return Err(PlatewiseError::validation("missing detected_foods")),
    };

    let mut candidates = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_candidate(index, item))
        .collect::<PlatewiseResult<Vec<_>>>()?;

    // `sort_by` is stable, so equal confidences keep arrival order.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(limit);

    Ok(candidates)
}

fn parse_candidate(index: usize, item: Value) -> PlatewiseResult<DetectionCandidate> {
    if !item.is_object() {
        return Err(PlatewiseError::validation(format!(
            "candidate {index} is not an object"
        )));
    }

    let raw: RawCandidate = serde_json::from_value(item)
        .map_err(|err| PlatewiseError::validation(format!("candidate {index}: {err}")))?;

    let name = raw
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PlatewiseError::validation(format!("candidate {index} has no name")))?;

    let calories = raw.calories.unwrap_or(0.0);
    let protein = raw.protein.unwrap_or(0.0);
    let carbs = raw.carbs.unwrap_or(0.0);
    let fat = raw.fat.unwrap_or(0.0);
    for (field, value) in [
        ("calories", calories),
        ("protein", protein),
        ("carbs", carbs),
        ("fat", fat),
    ] {
        check_macro(field, value).map_err(|err| {
            PlatewiseError::validation(format!("candidate {index} ({name}): {err}"))
        })?;
    }

    let confidence = raw.confidence.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(PlatewiseError::validation(format!(
            "candidate {index} ({name}) has confidence {confidence} outside [0, 1]"
        )));
    }

    Ok(DetectionCandidate {
        name,
        calories,
        protein,
        carbs,
        fat,
        confidence,
        image_url: raw.image_url.filter(|url| !url.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(candidates: &[DetectionCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn ranks_by_confidence_descending() {
        let raw = json!({
            "detected_foods": [
                {"food_name": "Banana", "calories": 105, "confidence": 0.75},
                {"food_name": "Apple", "calories": 95, "confidence": 0.85},
                {"name": "Rice", "calories": 206, "protein": 4.3, "carbs": 45, "fat": 0.4, "confidence": 0.9}
            ]
        });

        let ranked = normalize(raw).unwrap();

        assert_eq!(names(&ranked), vec!["Rice", "Apple", "Banana"]);
        assert_eq!(ranked[0].carbs, 45.0);
        assert_eq!(ranked[1].protein, 0.0);
    }

    #[test]
    fn ties_keep_arrival_order() {
        let raw = json!({
            "detected_foods": [
                {"name": "first", "confidence": 0.5},
                {"name": "high", "confidence": 0.8},
                {"name": "second", "confidence": 0.5},
                {"name": "third", "confidence": 0.5}
            ]
        });

        let ranked = normalize(raw).unwrap();
        assert_eq!(names(&ranked), vec!["high", "first", "second", "third"]);
    }

    #[test]
    fn truncates_to_five() {
        let foods: Vec<Value> = (0..8)
            .map(|i| json!({"name": format!("food-{i}"), "confidence": i as f64 / 10.0}))
            .collect();

        let ranked = normalize(json!({ "detected_foods": foods })).unwrap();

        assert_eq!(ranked.len(), MAX_CANDIDATES);
        assert_eq!(ranked[0].name, "food-7");
        assert_eq!(ranked[4].name, "food-3");
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(normalize(json!({"detected_foods": []})).unwrap().is_empty());
    }

    #[test]
    fn missing_list_is_a_validation_error() {
        let err = normalize(json!({"results": []})).unwrap_err();
        assert!(matches!(err, PlatewiseError::Validation { .. }));

        let err = normalize(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, PlatewiseError::Validation { .. }));

        let err = normalize(json!({"detected_foods": "apple"})).unwrap_err();
        assert!(matches!(err, PlatewiseError::Validation { .. }));
    }

    #[test]
    fn error_body_becomes_validation_reason() {
        let err = normalize(json!({"error": "No image provided"})).unwrap_err();
        assert_eq!(
            err,
            PlatewiseError::validation("No image provided")
        );
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let bad_confidence = json!({"detected_foods": [{"name": "x", "confidence": 1.5}]});
        assert!(normalize(bad_confidence).is_err());

        let negative = json!({"detected_foods": [{"name": "x", "calories": -3, "confidence": 0.2}]});
        assert!(normalize(negative).is_err());

        let nameless = json!({"detected_foods": [{"calories": 10, "confidence": 0.2}]});
        assert!(normalize(nameless).is_err());

        let not_object = json!({"detected_foods": [42]});
        assert!(normalize(not_object).is_err());
    }

    #[test]
    fn keeps_image_url() {
        let raw = json!({"detected_foods": [
            {"name": "Broccoli", "confidence": 0.6, "image_url": "https://cdn.example/broccoli.jpg"}
        ]});
        let ranked = normalize(raw).unwrap();
        assert_eq!(
            ranked[0].image_url.as_deref(),
            Some("https://cdn.example/broccoli.jpg")
        );
    }
}
