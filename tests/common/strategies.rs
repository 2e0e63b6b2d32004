use face_scan_core::models::{BoundingBox, DetectedFace, Gender, RecognitionResult};
use proptest::prelude::*;

/// Strategy for provider genders, including ones the aggregator ignores
pub fn gender_strategy() -> impl Strategy<Value = Gender> {
    prop_oneof![
        4 => Just(Gender::Male),
        4 => Just(Gender::Female),
        1 => "[a-z]{3,8}".prop_map(Gender::from),
    ]
}

pub fn detected_face_strategy() -> impl Strategy<Value = DetectedFace> {
    (gender_strategy(), 0.0f64..100.0, 0i32..4000, 0i32..4000).prop_map(
        |(gender, age_estimate, x, y)| DetectedFace {
            bounding_box: BoundingBox {
                x,
                y,
                width: 64,
                height: 64,
            },
            gender,
            age_estimate,
        },
    )
}

/// Strategy for one image's recognition result (possibly no faces)
pub fn recognition_result_strategy() -> impl Strategy<Value = RecognitionResult> {
    prop::collection::vec(detected_face_strategy(), 0..6).prop_map(|detections| {
        RecognitionResult {
            raw_response: "{}".to_string(),
            detections,
        }
    })
}

/// Strategy for per-image call outcomes of a task (`true` = success)
pub fn call_outcomes_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..10)
}
