/// Face bounding box in pixel coordinates of the frame it was detected in.
///
/// Stored as `(top, right, bottom, left)`; `right` and `bottom` are
/// exclusive. The coordinates mean nothing outside that frame's resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceBox {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Builds a box from `(x1, y1, x2, y2)` corner coordinates, rounding
    /// outward so the box never loses face pixels.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            top: y1.floor() as i32,
            right: x2.ceil() as i32,
            bottom: y2.ceil() as i32,
            left: x1.floor() as i32,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    /// Clips the box to a `frame_width` x `frame_height` frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as i32;
        let fh = frame_height as i32;
        Self {
            top: self.top.clamp(0, fh),
            right: self.right.clamp(0, fw),
            bottom: self.bottom.clamp(0, fh),
            left: self.left.clamp(0, fw),
        }
    }
}

impl std::fmt::Display for FaceBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(top={}, right={}, bottom={}, left={})",
            self.top, self.right, self.bottom, self.left
        )
    }
}
