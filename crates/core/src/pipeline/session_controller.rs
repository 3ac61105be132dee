use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::authorization::domain::authorization_state::AuthorizationState;
use crate::authorization::domain::sampling_scheduler::SamplingScheduler;
use crate::authorization::domain::session_snapshot::{SessionSnapshot, SnapshotOrigin};
use crate::authorization::domain::session_state::SessionState;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::detect_and_match_use_case::{DetectAndMatchUseCase, DetectionError};
use crate::pipeline::enroll_use_case::{EnrollFaceUseCase, EnrollmentError, EnrollmentWarning};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session_config::{ConfigError, SessionConfig};
use crate::recognition::domain::embedding_matcher::{EmbeddingMatcher, MatchError};
use crate::recognition::domain::face_embedding::AuthorizedIdentity;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error("frame {frame_counter}: {source}")]
    DimensionMismatch {
        frame_counter: u64,
        #[source]
        source: MatchError,
    },
    #[error("frame source unavailable after {consecutive_failures} consecutive read failures")]
    SourceUnavailable { consecutive_failures: usize },
}

/// What a single [`SessionController::tick`] did.
#[derive(Clone, Debug)]
pub enum TickOutcome {
    Processed(SessionSnapshot),
    /// The read failed; the frame counter did not move.
    Skipped { consecutive_failures: usize },
    /// Too many reads failed in a row. The failure count starts over.
    SourceUnavailable { consecutive_failures: usize },
    EndOfStream,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
    /// The snapshot callback returned `false`.
    StoppedByCallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub detection_frames: u64,
    pub read_failures: u64,
    pub stop_reason: StopReason,
    pub final_state: AuthorizationState,
}

/// Hooks for [`SessionController::run`].
#[derive(Default)]
pub struct RunControl {
    /// Checked before every tick.
    pub cancelled: Arc<AtomicBool>,
    /// Called with every processed frame; return `false` to stop.
    pub on_snapshot: Option<Box<dyn FnMut(&SessionSnapshot) -> bool + Send>>,
    /// Called on each escalation with the failure count; return `true` to
    /// keep waiting. Without it the run aborts with
    /// [`SessionError::SourceUnavailable`].
    pub on_unavailable: Option<Box<dyn FnMut(usize) -> bool + Send>>,
}

/// Owns the session: enrollment, per-frame sampling, the result cache and
/// read-failure accounting.
///
/// Sole writer of [`SessionState`]; callers only ever see snapshots.
pub struct SessionController {
    scheduler: SamplingScheduler,
    max_consecutive_read_failures: usize,
    state: SessionState,
    pipeline: DetectAndMatchUseCase,
    logger: Box<dyn PipelineLogger>,
    warnings: Vec<EnrollmentWarning>,
    consecutive_failures: usize,
    detection_frames: u64,
    read_failures: u64,
}

impl SessionController {
    /// Validates `config`, enrolls the face in `reference` and returns a
    /// session in the LOCKED state with no frame read yet.
    pub fn start(
        config: &SessionConfig,
        reference: &Frame,
        mut detector: Box<dyn FaceDetector>,
        mut encoder: Box<dyn FaceEncoder>,
        mut logger: Box<dyn PipelineLogger>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let scheduler = SamplingScheduler::new(config.sampling_interval)
            .map_err(|_| ConfigError::ZeroSamplingInterval)?;

        let enrollment = EnrollFaceUseCase::new(config.enrollment_strategy.build()).execute(
            detector.as_mut(),
            encoder.as_mut(),
            reference,
        )?;
        logger.info(&format!(
            "Session started: detection every {} frames, tolerance {}",
            scheduler.interval(),
            config.match_tolerance
        ));

        Ok(Self {
            scheduler,
            max_consecutive_read_failures: config.max_consecutive_read_failures,
            state: SessionState::new(enrollment.identity),
            pipeline: DetectAndMatchUseCase::new(
                detector,
                encoder,
                EmbeddingMatcher::new(config.match_tolerance),
            ),
            logger,
            warnings: enrollment.warnings,
            consecutive_failures: 0,
            detection_frames: 0,
            read_failures: 0,
        })
    }

    pub fn identity(&self) -> &AuthorizedIdentity {
        self.state.identity()
    }

    /// Warnings recorded while enrolling the reference image.
    pub fn enrollment_warnings(&self) -> &[EnrollmentWarning] {
        &self.warnings
    }

    pub fn state(&self) -> AuthorizationState {
        self.state.cache().current().state()
    }

    /// The cached result as of the last processed frame.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot(SnapshotOrigin::Replayed)
    }

    /// Runs one successfully read frame through the session.
    ///
    /// Detection frames commit a fresh result; all others replay the cache.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<SessionSnapshot, SessionError> {
        let counter = self.state.advance();
        self.consecutive_failures = 0;

        if !self.scheduler.is_detection_frame(counter) {
            self.logger.frame(counter, false);
            return Ok(self.state.snapshot(SnapshotOrigin::Replayed));
        }

        self.detection_frames += 1;
        self.logger.frame(counter, true);
        let previous = self.state();

        let t0 = Instant::now();
        let outcome = self
            .pipeline
            .execute(frame, self.state.identity(), self.logger.as_mut());
        self.logger
            .timing("frame", t0.elapsed().as_secs_f64() * 1000.0);

        let origin = match outcome {
            Ok(result) => {
                self.logger.metric("faces", result.face_count() as f64);
                if self.state.cache_mut().commit(counter, result) {
                    SnapshotOrigin::Fresh
                } else {
                    self.retain(counter)
                }
            }
            Err(DetectionError::EncodingCountMismatch { boxes, embeddings }) => {
                log::warn!(
                    "Discarding frame {counter}: encoder returned {embeddings} embeddings for {boxes} faces"
                );
                self.retain(counter)
            }
            Err(DetectionError::DimensionMismatch(source)) => {
                self.state.cache_mut().reset();
                self.note_transition(previous, counter);
                return Err(SessionError::DimensionMismatch {
                    frame_counter: counter,
                    source,
                });
            }
        };

        self.note_transition(previous, counter);
        Ok(self.state.snapshot(origin))
    }

    /// Reads one frame from `source` and processes it.
    pub fn tick(&mut self, source: &mut dyn FrameSource) -> Result<TickOutcome, SessionError> {
        let failure = match source.next_frame() {
            Ok(Some(frame)) if !frame.is_empty() => {
                return Ok(TickOutcome::Processed(self.process_frame(&frame)?));
            }
            Ok(Some(_)) => "empty frame".to_string(),
            Ok(None) => return Ok(TickOutcome::EndOfStream),
            Err(e) => e.to_string(),
        };

        self.consecutive_failures += 1;
        self.read_failures += 1;
        log::warn!(
            "Frame read failed ({}/{}): {failure}",
            self.consecutive_failures,
            self.max_consecutive_read_failures
        );

        let consecutive_failures = self.consecutive_failures;
        if consecutive_failures >= self.max_consecutive_read_failures {
            self.consecutive_failures = 0;
            return Ok(TickOutcome::SourceUnavailable {
                consecutive_failures,
            });
        }
        Ok(TickOutcome::Skipped {
            consecutive_failures,
        })
    }

    /// Drives the session until the stream ends, the run is cancelled or an
    /// error stops it. The source is closed on every exit path.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        mut control: RunControl,
    ) -> Result<RunSummary, SessionError> {
        let frames_before = self.state.frame_counter();
        let detections_before = self.detection_frames;
        let failures_before = self.read_failures;

        let result = self.run_loop(source, &mut control);
        source.close();
        self.logger.summary();

        let stop_reason = result?;
        log::info!(
            "Session stopped ({stop_reason:?}) in state {}",
            self.state()
        );
        Ok(RunSummary {
            frames_processed: self.state.frame_counter() - frames_before,
            detection_frames: self.detection_frames - detections_before,
            read_failures: self.read_failures - failures_before,
            stop_reason,
            final_state: self.state(),
        })
    }

    fn run_loop(
        &mut self,
        source: &mut dyn FrameSource,
        control: &mut RunControl,
    ) -> Result<StopReason, SessionError> {
        loop {
            if control.cancelled.load(Ordering::Relaxed) {
                return Ok(StopReason::Cancelled);
            }
            match self.tick(source)? {
                TickOutcome::Processed(snapshot) => {
                    if let Some(on_snapshot) = control.on_snapshot.as_mut() {
                        if !on_snapshot(&snapshot) {
                            return Ok(StopReason::StoppedByCallback);
                        }
                    }
                }
                TickOutcome::Skipped { .. } => {}
                TickOutcome::SourceUnavailable {
                    consecutive_failures,
                } => {
                    let keep_waiting = control
                        .on_unavailable
                        .as_mut()
                        .is_some_and(|on_unavailable| on_unavailable(consecutive_failures));
                    if !keep_waiting {
                        return Err(SessionError::SourceUnavailable {
                            consecutive_failures,
                        });
                    }
                    log::warn!(
                        "Frame source unavailable after {consecutive_failures} failed reads; still waiting"
                    );
                }
                TickOutcome::EndOfStream => return Ok(StopReason::EndOfStream),
            }
        }
    }

    /// Keeps the cached result for `counter` and reports which detection it
    /// came from.
    fn retain(&mut self, counter: u64) -> SnapshotOrigin {
        let committed_at = self.state.cache().committed_at();
        match committed_at {
            Some(source) => {
                self.logger.info(&format!(
                    "Frame {counter} keeps the result detected on frame {source}"
                ));
            }
            None => {
                self.logger
                    .info(&format!("Frame {counter} keeps the initial locked result"));
            }
        }
        SnapshotOrigin::Retained
    }

    fn note_transition(&mut self, previous: AuthorizationState, counter: u64) {
        let current = self.state();
        if current != previous {
            self.logger.state_changed(previous, current, counter);
        }
    }
}
