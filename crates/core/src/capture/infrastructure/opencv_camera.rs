use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio;
use thiserror::Error;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

use super::mat_convert::mat_to_frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot open camera device {0}")]
    DeviceOpen(i32),
    #[error("capture backend error: {0}")]
    Backend(#[from] opencv::Error),
}

/// Live camera frame source over OpenCV `videoio`.
///
/// Owns the device exclusively for the lifetime of the loop and stamps
/// each frame with a 1-based acquisition index.
pub struct OpenCvCamera {
    capture: videoio::VideoCapture,
    frames_grabbed: u64,
}

impl OpenCvCamera {
    /// Opens the camera at `index`, failing fast when the device is
    /// missing or busy.
    pub fn open(index: i32) -> Result<Self, CaptureError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CaptureError::DeviceOpen(index));
        }
        Ok(Self {
            capture,
            frames_grabbed: 0,
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        self.frames_grabbed += 1;
        Ok(Some(mat_to_frame(&mat, self.frames_grabbed)?))
    }

    fn close(&mut self) {
        let _ = self.capture.release();
    }
}
