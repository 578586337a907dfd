use opencv::core::{Point, Rect, Scalar};
use opencv::imgproc;

use crate::analysis::domain::observation::FaceObservation;
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::annotation::domain::label::label_text;
use crate::capture::infrastructure::mat_convert::{copy_mat_into_frame, frame_to_mat};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Box and label-background color (BGR green).
const BOX_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const TEXT_COLOR: (f64, f64, f64) = (0.0, 0.0, 0.0);
const BOX_THICKNESS: i32 = 2;
const FONT_FACE: i32 = imgproc::FONT_HERSHEY_SIMPLEX;
const FONT_SCALE: f64 = 0.7;
const FONT_THICKNESS: i32 = 2;

/// Draws a rectangle outline plus a filled, text-fitted label banner above
/// each observed face. Out-of-frame banner coordinates (faces near the top
/// edge) are left to OpenCV's own clipping.
#[derive(Default)]
pub struct OpenCvBoxAnnotator;

impl OpenCvBoxAnnotator {
    pub fn new() -> Self {
        Self
    }
}

impl FrameAnnotator for OpenCvBoxAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        observations: &[FaceObservation],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if observations.is_empty() {
            return Ok(());
        }

        let mut mat = frame_to_mat(frame)?;
        let box_color = scalar(BOX_COLOR);

        for obs in observations {
            let region = obs.region;
            imgproc::rectangle(
                &mut mat,
                Rect::new(region.x, region.y, region.width, region.height),
                box_color,
                BOX_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;

            let text = label_text(obs);
            let mut baseline = 0;
            let size =
                imgproc::get_text_size(&text, FONT_FACE, FONT_SCALE, FONT_THICKNESS, &mut baseline)?;

            let banner = label_background(&region, size.width, size.height);
            imgproc::rectangle(
                &mut mat,
                Rect::new(banner.x, banner.y, banner.width, banner.height),
                box_color,
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;

            let (ox, oy) = label_origin(&region);
            imgproc::put_text(
                &mut mat,
                &text,
                Point::new(ox, oy),
                FONT_FACE,
                FONT_SCALE,
                scalar(TEXT_COLOR),
                FONT_THICKNESS,
                imgproc::LINE_8,
                false,
            )?;
        }

        copy_mat_into_frame(&mat, frame)
    }
}

/// Filled banner directly above the face box, sized to the label text:
/// top edge at `y - text_h - 10`, bottom edge at `y - 5`.
pub fn label_background(region: &FaceRegion, text_w: i32, text_h: i32) -> FaceRegion {
    FaceRegion::new(region.x, region.y - text_h - 10, text_w, text_h + 5)
}

/// Text baseline origin inside the banner, just above the face box.
pub fn label_origin(region: &FaceRegion) -> (i32, i32) {
    (region.x, region.y - 10)
}

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}
