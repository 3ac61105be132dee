use crate::shared::frame::Frame;

/// Pull-based source of RGB frames (camera, video file, stream, image).
pub trait FrameSource: Send {
    /// Returns the next frame.
    ///
    /// `Ok(None)` means the source is exhausted (end of a file). `Err` is a
    /// read failure for this tick only; the caller may try again.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases any resources held by the source.
    fn close(&mut self) {}
}
