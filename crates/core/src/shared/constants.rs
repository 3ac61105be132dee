use crate::shared::model_resolver::ModelAsset;

pub const FACE_DETECTION_MODEL: ModelAsset = ModelAsset {
    name: "yolo11n-pose_widerface.onnx",
    url: "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx",
};

pub const FACE_EMBEDDING_MODEL: ModelAsset = ModelAsset {
    name: "w600k_r50.onnx",
    url: "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx",
};

/// Run detection on every 10th frame, replaying the cached result in between.
pub const DEFAULT_SAMPLING_INTERVAL: usize = 10;

/// Maximum Euclidean embedding distance still treated as the same person.
///
/// Calibrated for unnormalized 128-d embeddings. Encoders that emit unit
/// vectors need their own value (see `ARCFACE_MATCH_TOLERANCE`).
pub const DEFAULT_MATCH_TOLERANCE: f64 = 0.4;

/// Consecutive unreadable frames before the source is reported unavailable
/// (~1 second at 30 fps).
pub const DEFAULT_MAX_CONSECUTIVE_READ_FAILURES: usize = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
