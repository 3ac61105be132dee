use std::time::Instant;

use thiserror::Error;

use crate::authorization::domain::frame_result::{FaceObservation, FrameResult};
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::recognition::domain::embedding_matcher::{EmbeddingMatcher, MatchError};
use crate::recognition::domain::face_embedding::AuthorizedIdentity;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::frame::Frame;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    /// Boxes and embeddings can't be paired; the frame is unusable.
    #[error("encoder returned {embeddings} embeddings for {boxes} faces")]
    EncodingCountMismatch { boxes: usize, embeddings: usize },
    #[error(transparent)]
    DimensionMismatch(#[from] MatchError),
}

/// Full per-frame pipeline: detect → encode → match → aggregate.
///
/// Collaborator failures degrade to a zero-face (locked) result so a
/// flaky model never unlocks anything. Only contract violations
/// between detector, encoder and matcher are returned as errors.
pub struct DetectAndMatchUseCase {
    detector: Box<dyn FaceDetector>,
    encoder: Box<dyn FaceEncoder>,
    matcher: EmbeddingMatcher,
}

impl DetectAndMatchUseCase {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        encoder: Box<dyn FaceEncoder>,
        matcher: EmbeddingMatcher,
    ) -> Self {
        Self {
            detector,
            encoder,
            matcher,
        }
    }

    pub fn execute(
        &mut self,
        frame: &Frame,
        authorized: &AuthorizedIdentity,
        logger: &mut dyn PipelineLogger,
    ) -> Result<FrameResult, DetectionError> {
        let t0 = Instant::now();
        let boxes = match self.detector.detect(frame) {
            Ok(boxes) => boxes,
            Err(e) => {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                return Ok(FrameResult::no_faces());
            }
        };
        logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

        if boxes.is_empty() {
            return Ok(FrameResult::no_faces());
        }

        let t0 = Instant::now();
        let embeddings = match self.encoder.encode(frame, &boxes) {
            Ok(embeddings) => embeddings,
            Err(e) => {
                log::warn!("Face encoding failed on frame {}: {e}", frame.index());
                return Ok(FrameResult::no_faces());
            }
        };
        logger.timing("encode", t0.elapsed().as_secs_f64() * 1000.0);

        if embeddings.len() != boxes.len() {
            return Err(DetectionError::EncodingCountMismatch {
                boxes: boxes.len(),
                embeddings: embeddings.len(),
            });
        }

        let observations = boxes
            .into_iter()
            .zip(embeddings)
            .map(|(face_box, embedding)| {
                let outcome = self.matcher.compare(&embedding, authorized)?;
                log::debug!(
                    "Face {face_box}: distance {:.3} ({})",
                    outcome.distance,
                    if outcome.is_match { "match" } else { "no match" }
                );
                Ok(FaceObservation {
                    face_box,
                    embedding,
                    distance: outcome.distance,
                    is_authorized: outcome.is_match,
                })
            })
            .collect::<Result<Vec<_>, MatchError>>()?;

        Ok(FrameResult::from_observations(observations))
    }
}
