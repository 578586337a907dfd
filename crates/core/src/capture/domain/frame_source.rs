use crate::shared::frame::Frame;

/// Supplies frames from a camera device or recorded source.
///
/// Implementations handle device details (backend API, pixel format)
/// while the loop works with the abstract `Frame` type.
pub trait FrameSource: Send {
    /// Acquires the next frame, stamped with a 1-based acquisition index.
    ///
    /// `Ok(None)` means the source ended cleanly; `Err` means a read
    /// failure. The live loop treats both as fatal and stops.
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device.
    fn close(&mut self);
}
