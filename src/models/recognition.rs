//! # Recognition Result Model
//!
//! Per-image output of the external recognition provider.
//!
//! The provider payload is kept verbatim in `RecognitionResult::raw_response`
//! so it can be replayed or re-parsed later; `detections` is the parsed view
//! the aggregator works from.
//!
//! ## Provider Payload
//!
//! ```json
//! {
//!   "data": [
//!     {
//!       "bbox": { "x": 10, "y": 20, "width": 64, "height": 80 },
//!       "demographics": { "age": { "mean": 30.2, "variance": 2.1 }, "gender": "male" }
//!     }
//!   ],
//!   "rotation": 0,
//!   "status_code": 200
//! }
//! ```

use crate::constants::provider::{GENDER_FEMALE, GENDER_MALE};
use serde::{Deserialize, Serialize};

/// Face bounding box in image pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Categorical gender reported by the provider
///
/// Anything other than `male`/`female` is preserved as `Other` and ignored
/// by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        match value.as_str() {
            GENDER_MALE => Self::Male,
            GENDER_FEMALE => Self::Female,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Gender {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        match value {
            Gender::Male => GENDER_MALE.to_string(),
            Gender::Female => GENDER_FEMALE.to_string(),
            Gender::Other(other) => other,
        }
    }
}

/// One face found in an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bounding_box: BoundingBox,
    pub gender: Gender,
    /// Mean age estimate reported by the provider
    pub age_estimate: f64,
}

/// Parsed recognition output for a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Provider payload exactly as received
    pub raw_response: String,
    pub detections: Vec<DetectedFace>,
}

impl RecognitionResult {
    /// Parse a provider payload, keeping the raw text alongside the detections
    pub fn from_raw(raw_response: impl Into<String>) -> Result<Self, serde_json::Error> {
        let raw_response = raw_response.into();
        let parsed: ProviderResponse = serde_json::from_str(&raw_response)?;
        Ok(Self::from_provider(raw_response, parsed))
    }

    pub fn from_provider(raw_response: String, response: ProviderResponse) -> Self {
        let detections = response
            .data
            .into_iter()
            .map(DetectedFace::from)
            .collect();

        Self {
            raw_response,
            detections,
        }
    }

    pub fn face_count(&self) -> usize {
        self.detections.len()
    }
}

/// Top-level provider response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub data: Vec<ProviderFace>,
    #[serde(default)]
    pub rotation: i32,
    #[serde(default)]
    pub status_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderFace {
    #[serde(default)]
    pub attributes: Option<ProviderAttributes>,
    pub bbox: ProviderBoundingBox,
    #[serde(default)]
    pub demographics: ProviderDemographics,
    #[serde(default)]
    pub landmarks: Vec<ProviderLandmark>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub masks: Option<serde_json::Value>,
    #[serde(default)]
    pub quality: Option<serde_json::Value>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttributes {
    pub facial_hair: Option<String>,
    pub glasses: Option<String>,
    pub hair_color: Option<String>,
    pub hair_type: Option<String>,
    pub headwear: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBoundingBox {
    pub height: i32,
    pub width: i32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDemographics {
    #[serde(default)]
    pub age: ProviderAge,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub gender: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderAge {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLandmark {
    pub x: i32,
    pub y: i32,
}

impl From<ProviderFace> for DetectedFace {
    fn from(face: ProviderFace) -> Self {
        Self {
            bounding_box: BoundingBox {
                x: face.bbox.x,
                y: face.bbox.y,
                width: face.bbox.width,
                height: face.bbox.height,
            },
            gender: Gender::from(face.demographics.gender),
            age_estimate: face.demographics.age.mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": [
            {
                "attributes": {"facial_hair": "none", "glasses": "none", "hair_color": "brown", "hair_type": "short", "headwear": "none"},
                "bbox": {"height": 80, "width": 64, "x": 10, "y": 20},
                "demographics": {"age": {"mean": 30.5, "variance": 2.0}, "ethnicity": "white", "gender": "male"},
                "landmarks": [{"x": 1, "y": 2}],
                "liveness": 1,
                "masks": {"full_face_mask": 0, "lower_face_mask": 0, "no_mask": 1, "other_mask": 0},
                "quality": {"blurriness": 0, "overexposure": 0, "underexposure": 0},
                "score": 0.98
            },
            {
                "bbox": {"height": 40, "width": 30, "x": 100, "y": 120},
                "demographics": {"age": {"mean": 25.0, "variance": 1.0}, "gender": "female"}
            }
        ],
        "rotation": 0,
        "status_code": 200
    }"#;

    #[test]
    fn test_parse_full_provider_payload() {
        let result = RecognitionResult::from_raw(SAMPLE).unwrap();
        assert_eq!(result.face_count(), 2);
        assert_eq!(result.raw_response, SAMPLE);

        let first = &result.detections[0];
        assert_eq!(first.gender, Gender::Male);
        assert_eq!(first.age_estimate, 30.5);
        assert_eq!(
            first.bounding_box,
            BoundingBox {
                x: 10,
                y: 20,
                width: 64,
                height: 80
            }
        );
        assert_eq!(result.detections[1].gender, Gender::Female);
    }

    #[test]
    fn test_parse_empty_payload() {
        let result = RecognitionResult::from_raw(r#"{"data": [], "status_code": 200}"#).unwrap();
        assert!(result.detections.is_empty());
    }

    #[test]
    fn test_unknown_gender_is_preserved() {
        let raw = r#"{"data": [{"bbox": {"height": 1, "width": 1, "x": 0, "y": 0},
                     "demographics": {"age": {"mean": 40.0}, "gender": "unknown"}}]}"#;
        let result = RecognitionResult::from_raw(raw).unwrap();
        assert_eq!(
            result.detections[0].gender,
            Gender::Other("unknown".to_string())
        );
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        assert!(RecognitionResult::from_raw("not json").is_err());
        assert!(RecognitionResult::from_raw(r#"{"data": [{"demographics": {}}]}"#).is_err());
    }

    #[test]
    fn test_gender_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        let parsed: Gender = serde_json::from_str("\"male\"").unwrap();
        assert_eq!(parsed, Gender::Male);
    }
}
