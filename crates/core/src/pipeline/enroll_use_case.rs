use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::recognition::domain::face_embedding::{AuthorizedIdentity, FaceEmbedding};
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnrollmentError {
    #[error("reference image is empty")]
    EmptyImage,
    #[error("no face found in the reference image")]
    NoFaceFound,
    #[error("reference image contains {faces} faces; exactly one is required")]
    AmbiguousReference { faces: usize },
    #[error("face detection failed on the reference image: {0}")]
    Detection(String),
    #[error("face encoding failed on the reference image: {0}")]
    Encoding(String),
    #[error("encoder returned {embeddings} embeddings for {boxes} faces in the reference image")]
    EncodingCountMismatch { boxes: usize, embeddings: usize },
}

/// Non-fatal findings recorded while enrolling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrollmentWarning {
    /// The reference had several faces; the first in detector order won.
    MultipleFaces { faces: usize },
}

impl std::fmt::Display for EnrollmentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleFaces { faces } => write!(
                f,
                "reference image contains {faces} faces; using the first one"
            ),
        }
    }
}

/// Picks the authorized embedding out of everything found in the reference.
pub trait EnrollmentStrategy: Send {
    /// `embeddings` is in detector order and never empty.
    fn select(
        &self,
        embeddings: Vec<FaceEmbedding>,
    ) -> Result<(FaceEmbedding, Vec<EnrollmentWarning>), EnrollmentError>;
}

pub struct FirstFaceStrategy;

impl EnrollmentStrategy for FirstFaceStrategy {
    fn select(
        &self,
        embeddings: Vec<FaceEmbedding>,
    ) -> Result<(FaceEmbedding, Vec<EnrollmentWarning>), EnrollmentError> {
        let faces = embeddings.len();
        let first = embeddings
            .into_iter()
            .next()
            .ok_or(EnrollmentError::NoFaceFound)?;
        let mut warnings = Vec::new();
        if faces > 1 {
            let warning = EnrollmentWarning::MultipleFaces { faces };
            log::warn!("{warning}");
            warnings.push(warning);
        }
        Ok((first, warnings))
    }
}

pub struct RejectAmbiguousStrategy;

impl EnrollmentStrategy for RejectAmbiguousStrategy {
    fn select(
        &self,
        embeddings: Vec<FaceEmbedding>,
    ) -> Result<(FaceEmbedding, Vec<EnrollmentWarning>), EnrollmentError> {
        if embeddings.len() > 1 {
            return Err(EnrollmentError::AmbiguousReference {
                faces: embeddings.len(),
            });
        }
        let only = embeddings
            .into_iter()
            .next()
            .ok_or(EnrollmentError::NoFaceFound)?;
        Ok((only, Vec::new()))
    }
}

/// Outcome of a successful enrollment.
#[derive(Clone, Debug)]
pub struct Enrollment {
    pub identity: AuthorizedIdentity,
    /// Every face found in the reference, in detector order.
    pub faces: Vec<FaceBox>,
    pub warnings: Vec<EnrollmentWarning>,
}

/// Turns a reference image into the session's [`AuthorizedIdentity`].
///
/// Runs exactly once per session; detector or encoder failure is final.
pub struct EnrollFaceUseCase {
    strategy: Box<dyn EnrollmentStrategy>,
}

impl EnrollFaceUseCase {
    pub fn new(strategy: Box<dyn EnrollmentStrategy>) -> Self {
        Self { strategy }
    }

    pub fn execute(
        &self,
        detector: &mut dyn FaceDetector,
        encoder: &mut dyn FaceEncoder,
        image: &Frame,
    ) -> Result<Enrollment, EnrollmentError> {
        if image.is_empty() {
            return Err(EnrollmentError::EmptyImage);
        }

        let faces = detector
            .detect(image)
            .map_err(|e| EnrollmentError::Detection(e.to_string()))?;
        if faces.is_empty() {
            return Err(EnrollmentError::NoFaceFound);
        }

        let embeddings = encoder
            .encode(image, &faces)
            .map_err(|e| EnrollmentError::Encoding(e.to_string()))?;
        if embeddings.len() != faces.len() {
            return Err(EnrollmentError::EncodingCountMismatch {
                boxes: faces.len(),
                embeddings: embeddings.len(),
            });
        }

        let (embedding, warnings) = self.strategy.select(embeddings)?;
        log::info!(
            "Enrolled reference face {} ({}-dimensional embedding)",
            faces[0],
            embedding.len()
        );

        Ok(Enrollment {
            identity: AuthorizedIdentity::new(embedding),
            faces,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Stubs ---

    struct StubDetector {
        result: Result<Vec<FaceBox>, String>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            self.result.clone().map_err(|e| e.into())
        }
    }

    /// Emits one embedding per box, `[index, 0, 0]`, unless told otherwise.
    struct StubEncoder {
        failure: Option<String>,
        drop_last: bool,
        calls: usize,
    }

    impl StubEncoder {
        fn new() -> Self {
            Self {
                failure: None,
                drop_last: false,
                calls: 0,
            }
        }
    }

    impl FaceEncoder for StubEncoder {
        fn encode(
            &mut self,
            _frame: &Frame,
            boxes: &[FaceBox],
        ) -> Result<Vec<FaceEmbedding>, Box<dyn std::error::Error>> {
            self.calls += 1;
            if let Some(msg) = &self.failure {
                return Err(msg.clone().into());
            }
            let mut out: Vec<FaceEmbedding> = (0..boxes.len())
                .map(|i| FaceEmbedding::new(vec![i as f32, 0.0, 0.0]).unwrap())
                .collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    fn image() -> Frame {
        Frame::new(vec![128; 8 * 8 * 3], 8, 8, 3, 0)
    }

    fn boxes(n: i32) -> Vec<FaceBox> {
        (0..n)
            .map(|i| FaceBox::new(0, i * 10 + 8, 8, i * 10))
            .collect()
    }

    fn first_face() -> EnrollFaceUseCase {
        EnrollFaceUseCase::new(Box::new(FirstFaceStrategy))
    }

    #[test]
    fn test_single_face_enrolls_without_warnings() {
        let mut detector = StubDetector { result: Ok(boxes(1)) };
        let mut encoder = StubEncoder::new();
        let enrollment = first_face()
            .execute(&mut detector, &mut encoder, &image())
            .unwrap();
        assert_eq!(enrollment.identity.dimension(), 3);
        assert_eq!(enrollment.faces.len(), 1);
        assert!(enrollment.warnings.is_empty());
    }

    #[test]
    fn test_no_face_is_fatal_and_skips_encoder() {
        let mut detector = StubDetector { result: Ok(vec![]) };
        let mut encoder = StubEncoder::new();
        let err = first_face()
            .execute(&mut detector, &mut encoder, &image())
            .unwrap_err();
        assert_eq!(err, EnrollmentError::NoFaceFound);
        assert_eq!(encoder.calls, 0);
    }

    #[test]
    fn test_two_faces_takes_first_with_warning() {
        let mut detector = StubDetector { result: Ok(boxes(2)) };
        let mut encoder = StubEncoder::new();
        let enrollment = first_face()
            .execute(&mut detector, &mut encoder, &image())
            .unwrap();
        assert_eq!(
            enrollment.identity.embedding().as_slice(),
            &[0.0, 0.0, 0.0]
        );
        assert_eq!(
            enrollment.warnings,
            vec![EnrollmentWarning::MultipleFaces { faces: 2 }]
        );
    }

    #[test]
    fn test_strict_strategy_rejects_two_faces() {
        let mut detector = StubDetector { result: Ok(boxes(2)) };
        let mut encoder = StubEncoder::new();
        let err = EnrollFaceUseCase::new(Box::new(RejectAmbiguousStrategy))
            .execute(&mut detector, &mut encoder, &image())
            .unwrap_err();
        assert_eq!(err, EnrollmentError::AmbiguousReference { faces: 2 });
    }

    #[test]
    fn test_strict_strategy_accepts_one_face() {
        let mut detector = StubDetector { result: Ok(boxes(1)) };
        let mut encoder = StubEncoder::new();
        let enrollment = EnrollFaceUseCase::new(Box::new(RejectAmbiguousStrategy))
            .execute(&mut detector, &mut encoder, &image())
            .unwrap();
        assert!(enrollment.warnings.is_empty());
    }

    #[test]
    fn test_detector_failure_surfaces() {
        let mut detector = StubDetector {
            result: Err("model missing".to_string()),
        };
        let mut encoder = StubEncoder::new();
        let err = first_face()
            .execute(&mut detector, &mut encoder, &image())
            .unwrap_err();
        assert_eq!(err, EnrollmentError::Detection("model missing".to_string()));
    }

    #[test]
    fn test_encoder_failure_surfaces() {
        let mut detector = StubDetector { result: Ok(boxes(1)) };
        let mut encoder = StubEncoder::new();
        encoder.failure = Some("out of memory".to_string());
        let err = first_face()
            .execute(&mut detector, &mut encoder, &image())
            .unwrap_err();
        assert_eq!(err, EnrollmentError::Encoding("out of memory".to_string()));
    }

    #[test]
    fn test_encoding_count_mismatch() {
        let mut detector = StubDetector { result: Ok(boxes(2)) };
        let mut encoder = StubEncoder::new();
        encoder.drop_last = true;
        let err = first_face()
            .execute(&mut detector, &mut encoder, &image())
            .unwrap_err();
        assert_eq!(
            err,
            EnrollmentError::EncodingCountMismatch {
                boxes: 2,
                embeddings: 1
            }
        );
    }

    #[test]
    fn test_empty_image_rejected() {
        let mut detector = StubDetector { result: Ok(boxes(1)) };
        let mut encoder = StubEncoder::new();
        let err = first_face()
            .execute(&mut detector, &mut encoder, &Frame::new(vec![], 0, 0, 3, 0))
            .unwrap_err();
        assert_eq!(err, EnrollmentError::EmptyImage);
    }

    #[test]
    fn test_warning_message_mentions_face_count() {
        let warning = EnrollmentWarning::MultipleFaces { faces: 3 };
        assert_eq!(
            warning.to_string(),
            "reference image contains 3 faces; using the first one"
        );
    }
}
