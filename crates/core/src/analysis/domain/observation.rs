use std::collections::HashMap;

use crate::shared::region::FaceRegion;

/// One detected face with its estimated attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    /// Bounding box in pixel coordinates of the analyzed frame.
    pub region: FaceRegion,
    /// Gender label → confidence. Scores are not required to sum to 1.
    pub gender_scores: HashMap<String, f32>,
    /// Estimated age in whole years.
    pub age: u32,
}

impl FaceObservation {
    /// The highest-scoring gender label, or `None` for an empty score map.
    ///
    /// Labels are scanned in sorted order and replaced only on a strictly
    /// greater score, so exact ties resolve deterministically to the
    /// alphabetically first label.
    pub fn dominant_gender(&self) -> Option<&str> {
        let mut labels: Vec<&String> = self.gender_scores.keys().collect();
        labels.sort();

        let mut best: Option<(&str, f32)> = None;
        for label in labels {
            let score = self.gender_scores[label];
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((label, score));
            }
        }
        best.map(|(label, _)| label)
    }
}

/// All faces found by one analyzer invocation on one frame.
///
/// Produced atomically: a result always reflects exactly one frame.
pub type AnalysisResult = Vec<FaceObservation>;
