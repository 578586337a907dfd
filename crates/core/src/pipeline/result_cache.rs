use crate::analysis::domain::observation::{AnalysisResult, FaceObservation};

/// Single-slot store for the most recent successful analysis.
///
/// Replaced wholesale on success and deliberately left untouched on a
/// no-face cycle, so intermediate frames keep showing the last known
/// annotation instead of flickering empty.
#[derive(Debug, Default)]
pub struct ResultCache {
    observations: AnalysisResult,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot with a new result. Never merges.
    pub fn replace(&mut self, result: AnalysisResult) {
        self.observations = result;
    }

    pub fn observations(&self) -> &[FaceObservation] {
        &self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
