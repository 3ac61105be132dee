/// ArcFace face encoder using ONNX Runtime.
///
/// Crops a square around each detected box, resizes it to the model's
/// 112x112 input and returns L2-normalized 512-d embeddings. Distances
/// between normalized embeddings fall in `[0, 2]`.
use std::path::Path;

use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::execution_provider::preferred_execution_providers;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

/// Match tolerance calibrated for this encoder's L2-normalized embeddings.
///
/// For unit vectors the Euclidean distance is `sqrt(2 - 2 * cos)`, so 1.0
/// accepts pairs with cosine similarity >= 0.5. Same-person ArcFace pairs
/// typically land between 0.5 and 0.8.
pub const ARCFACE_MATCH_TOLERANCE: f64 = 1.0;

pub struct OnnxArcFaceEncoder {
    session: ort::session::Session,
}

impl OnnxArcFaceEncoder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        Ok(Self { session })
    }

    fn embed(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<FaceEmbedding, Box<dyn std::error::Error>> {
        let crop = square_crop(face, frame.width(), frame.height());
        if crop.is_empty() {
            return Err(format!("Face box {face} lies outside the frame").into());
        }
        let tensor = preprocess(frame, &crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut values = embedding_slice.to_vec();
        l2_normalize(&mut values);
        FaceEmbedding::new(values).ok_or_else(|| "Model produced an empty embedding".into())
    }
}

impl FaceEncoder for OnnxArcFaceEncoder {
    fn encode(
        &mut self,
        frame: &Frame,
        boxes: &[FaceBox],
    ) -> Result<Vec<FaceEmbedding>, Box<dyn std::error::Error>> {
        boxes.iter().map(|b| self.embed(frame, b)).collect()
    }
}

/// Square region centered on the box, sized by its larger side and
/// clamped to the frame.
fn square_crop(face: &FaceBox, frame_width: u32, frame_height: u32) -> FaceBox {
    let (cx, cy) = face.center();
    let half = face.width().max(face.height()) / 2;
    FaceBox::new(cy - half, cx + half, cy + half, cx - half).clamp_to(frame_width, frame_height)
}

/// Nearest-neighbor resize of the crop to 112x112, normalized, NCHW layout.
fn preprocess(frame: &Frame, crop: &FaceBox) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let crop_w = crop.width() as usize;
    let crop_h = crop.height() as usize;
    let left = crop.left as usize;
    let top = crop.top as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y =
            top + (((y as f64 + 0.5) * crop_h as f64 / INPUT_SIZE as f64) as usize).min(crop_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x = left
                + (((x as f64 + 0.5) * crop_w as f64 / INPUT_SIZE as f64) as usize)
                    .min(crop_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
