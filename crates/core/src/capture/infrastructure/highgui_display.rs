use opencv::highgui;

use crate::capture::domain::display_sink::DisplaySink;
use crate::shared::frame::Frame;

use super::mat_convert::frame_to_mat;
use super::opencv_camera::CaptureError;

/// Key-poll timeout in milliseconds. Doubles as the display pump: OpenCV
/// windows only repaint while `wait_key` is running.
const KEY_POLL_MS: i32 = 1;

/// Named OpenCV window presenting annotated frames.
pub struct HighguiDisplay {
    window: String,
}

impl HighguiDisplay {
    pub fn open(title: &str) -> Result<Self, CaptureError> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            window: title.to_string(),
        })
    }
}

impl DisplaySink for HighguiDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let mat = frame_to_mat(frame)?;
        highgui::imshow(&self.window, &mat)?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>, Box<dyn std::error::Error>> {
        let code = highgui::wait_key(KEY_POLL_MS)?;
        if code < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((code & 0xff) as u32))
    }

    fn close(&mut self) {
        let _ = highgui::destroy_window(&self.window);
    }
}
