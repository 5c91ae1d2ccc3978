//! Detection-side models: the image sent to the recognizer and the ranked
//! candidates it returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::NewFoodEntry;

const FALLBACK_MIME: &str = "application/octet-stream";

/// One recognized food with its nutritional estimate.
///
/// Lives only for the duration of a detection response; converting it into a
/// [`NewFoodEntry`] is the only way it outlives the next capture cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionCandidate {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DetectionCandidate {
    /// Build the ledger entry the user accepts from this candidate.
    pub fn to_new_entry(&self, at: DateTime<Utc>) -> NewFoodEntry {
        NewFoodEntry {
            food_name: self.name.clone(),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            timestamp: at,
        }
    }
}

/// A captured frame, uploaded as the `image` field of a multipart form.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }

    /// MIME type sniffed from the image header, `application/octet-stream` if unknown.
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn candidate_converts_to_entry_with_given_timestamp() {
        let candidate = DetectionCandidate {
            name: "Chicken Breast".into(),
            calories: 165.0,
            protein: 31.0,
            carbs: 0.0,
            fat: 3.6,
            confidence: 0.92,
            image_url: None,
        };
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();

        let entry = candidate.to_new_entry(at);

        assert_eq!(entry.food_name, "Chicken Breast");
        assert_eq!(entry.calories, 165.0);
        assert_eq!(entry.fat, 3.6);
        assert_eq!(entry.timestamp, at);
    }

    #[test]
    fn sniffs_png_and_jpeg_headers() {
        let png = ImagePayload::new(
            vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0],
            "frame.png",
        );
        let jpeg = ImagePayload::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0], "capture.jpg");
        let junk = ImagePayload::new(vec![1, 2, 3], "blob");

        assert_eq!(png.mime_type(), "image/png");
        assert_eq!(jpeg.mime_type(), "image/jpeg");
        assert_eq!(junk.mime_type(), FALLBACK_MIME);
    }
}
