use thiserror::Error;

use crate::shared::frame::Frame;

use super::observation::AnalysisResult;

/// Outcome kinds for one analyzer invocation.
///
/// `NoFaceDetected` is the expected, recoverable case under enforced
/// detection; callers branch on it explicitly instead of treating every
/// failure alike.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("no face detected")]
    NoFaceDetected,
    #[error("analysis backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AnalyzeError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend(err.into())
    }
}

/// Domain interface for facial-attribute analysis (age and gender).
///
/// Implementations may be stateful (e.g., lazily loaded sessions), hence
/// `&mut self`. Face enforcement is always on: an invocation that finds no
/// face fails with [`AnalyzeError::NoFaceDetected`] rather than returning
/// an empty result.
pub trait FaceAnalyzer: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, AnalyzeError>;
}
