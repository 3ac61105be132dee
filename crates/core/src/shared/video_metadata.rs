/// Properties of an opened frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// 0.0 for still images and sources that don't report a rate.
    pub fps: f64,
    pub codec: String,
    pub locator: String,
}

impl std::fmt::Display for VideoMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}x{}", self.locator, self.width, self.height)?;
        if self.fps > 0.0 {
            write!(f, " @ {:.1} fps", self.fps)?;
        }
        if !self.codec.is_empty() {
            write!(f, ", {}", self.codec)?;
        }
        write!(f, ")")
    }
}
