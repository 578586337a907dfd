use crate::analysis::domain::observation::FaceObservation;
use crate::shared::frame::Frame;

/// Domain interface for drawing observations onto a frame in place.
///
/// Rendering must be a pure function of the frame and the observations:
/// identical inputs produce pixel-identical output. The observations may
/// be stale relative to the frame; the annotator draws them regardless.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        observations: &[FaceObservation],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
