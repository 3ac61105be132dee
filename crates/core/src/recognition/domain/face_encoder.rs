use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face encoding.
///
/// Must return exactly one embedding per box, in the order of `boxes`.
/// Callers validate the count before pairing.
pub trait FaceEncoder: Send {
    fn encode(
        &mut self,
        frame: &Frame,
        boxes: &[FaceBox],
    ) -> Result<Vec<FaceEmbedding>, Box<dyn std::error::Error>>;
}
