use crate::shared::frame::Frame;

/// Presents annotated frames and reports key presses.
pub trait DisplaySink: Send {
    /// Shows one frame on the display surface.
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Polls for a pressed key with a short (~1 ms) timeout.
    ///
    /// `Ok(None)` when no key was pressed within the timeout.
    fn poll_key(&mut self) -> Result<Option<char>, Box<dyn std::error::Error>>;

    /// Closes the display surface.
    fn close(&mut self);
}
