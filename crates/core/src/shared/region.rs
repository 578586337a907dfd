/// An axis-aligned face bounding box in pixel coordinates of the source
/// frame.
///
/// Coordinates refer to the frame that produced the detection; the live
/// loop neither resizes nor letterboxes between analysis and display, so a
/// cached region stays valid for every frame of the same resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge (`x + width`).
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge (`y + height`).
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection with the frame rectangle `(0, 0, frame_w, frame_h)`.
    ///
    /// Returns `None` when the region lies entirely outside the frame.
    pub fn clamped(&self, frame_w: u32, frame_h: u32) -> Option<FaceRegion> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(frame_w as i32);
        let y2 = self.bottom().min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceRegion::new(x1, y1, x2 - x1, y2 - y1))
    }
}
