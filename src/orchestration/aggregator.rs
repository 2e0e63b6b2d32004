//! # Task Statistics Aggregator
//!
//! Derives task-level statistics from whatever per-image recognition results
//! are currently stored. Statistics are recomputed on every read and never
//! persisted.

use crate::models::{Gender, RecognitionResult};
use serde::{Deserialize, Serialize};

/// Face statistics across all successfully recognized images of a task
///
/// Averages are `None` when there are no faces of that gender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Male plus female faces; other genders are not counted
    pub faces_count: usize,
    pub male_count: usize,
    pub female_count: usize,
    pub male_female_count: usize,
    pub average_male_age: Option<f64>,
    pub average_female_age: Option<f64>,
}

/// Compute statistics over a set of recognition results
pub fn aggregate<'a, I>(results: I) -> TaskStats
where
    I: IntoIterator<Item = &'a RecognitionResult>,
{
    let mut male_ages = Vec::new();
    let mut female_ages = Vec::new();

    for face in results.into_iter().flat_map(|result| &result.detections) {
        match face.gender {
            Gender::Male => male_ages.push(face.age_estimate),
            Gender::Female => female_ages.push(face.age_estimate),
            Gender::Other(_) => {}
        }
    }

    let male_count = male_ages.len();
    let female_count = female_ages.len();

    TaskStats {
        faces_count: male_count + female_count,
        male_count,
        female_count,
        male_female_count: male_count + female_count,
        average_male_age: average(male_ages),
        average_female_age: average(female_ages),
    }
}

/// Mean of the values, summed in sorted order so the result is independent
/// of the order images finished in
fn average(mut ages: Vec<f64>) -> Option<f64> {
    if ages.is_empty() {
        return None;
    }
    ages.sort_by(f64::total_cmp);
    let count = ages.len() as f64;
    Some(ages.into_iter().sum::<f64>() / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, DetectedFace};

    fn face(gender: Gender, age: f64) -> DetectedFace {
        DetectedFace {
            bounding_box: BoundingBox::default(),
            gender,
            age_estimate: age,
        }
    }

    fn result(faces: Vec<DetectedFace>) -> RecognitionResult {
        RecognitionResult {
            raw_response: "{}".to_string(),
            detections: faces,
        }
    }

    #[test]
    fn test_empty_results() {
        let stats = aggregate(std::iter::empty());
        assert_eq!(stats, TaskStats::default());
        assert!(stats.average_male_age.is_none());
        assert!(stats.average_female_age.is_none());
    }

    #[test]
    fn test_no_faces_found() {
        let results = [result(vec![]), result(vec![])];
        let stats = aggregate(&results);
        assert_eq!(stats.faces_count, 0);
        assert!(stats.average_male_age.is_none());
    }

    #[test]
    fn test_gender_split_and_averages() {
        let results = [
            result(vec![face(Gender::Male, 30.0), face(Gender::Female, 20.0)]),
            result(vec![face(Gender::Male, 40.0)]),
            result(vec![face(Gender::Female, 24.0)]),
        ];
        let stats = aggregate(&results);

        assert_eq!(stats.male_count, 2);
        assert_eq!(stats.female_count, 2);
        assert_eq!(stats.faces_count, 4);
        assert_eq!(stats.male_female_count, 4);
        assert_eq!(stats.average_male_age, Some(35.0));
        assert_eq!(stats.average_female_age, Some(22.0));
    }

    #[test]
    fn test_other_genders_ignored() {
        let results = [result(vec![
            face(Gender::Other("unknown".to_string()), 50.0),
            face(Gender::Female, 33.0),
        ])];
        let stats = aggregate(&results);

        assert_eq!(stats.faces_count, 1);
        assert_eq!(stats.male_count, 0);
        assert!(stats.average_male_age.is_none());
        assert_eq!(stats.average_female_age, Some(33.0));
    }

    #[test]
    fn test_order_independent() {
        let a = result(vec![face(Gender::Male, 0.1), face(Gender::Male, 0.7)]);
        let b = result(vec![face(Gender::Male, 0.2)]);
        let c = result(vec![face(Gender::Male, 1e16), face(Gender::Female, 3.0)]);

        let forward = aggregate([&a, &b, &c]);
        let reversed = aggregate([&c, &b, &a]);
        assert_eq!(forward, reversed);
    }
}
