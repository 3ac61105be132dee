use std::collections::HashMap;
use std::time::Instant;

use crate::authorization::domain::authorization_state::AuthorizationState;

/// Cross-cutting logger for session orchestration events.
///
/// Decouples the session controller from specific output mechanisms
/// (stdout, log crate, test recorders) so each caller can observe the
/// session without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report that a frame was read; `detection` is false on replay frames.
    fn frame(&mut self, frame_counter: u64, detection: bool);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per detection frame).
    fn metric(&mut self, name: &str, value: f64);

    /// The exposed authorization state changed on `frame_counter`.
    fn state_changed(
        &mut self,
        from: AuthorizationState,
        to: AuthorizationState,
        frame_counter: u64,
    );

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
///
/// Used by tests and embedders that only care about snapshots.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame(&mut self, _frame_counter: u64, _detection: bool) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn state_changed(
        &mut self,
        _from: AuthorizationState,
        _to: AuthorizationState,
        _frame_counter: u64,
    ) {
    }
    fn info(&mut self, _message: &str) {}
}

/// Running count and sum of one timing or metric series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: u64,
    pub total: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// CLI-oriented logger that tracks per-stage timing, metrics and state
/// transitions, and provides a summary report when the session ends.
///
/// Only running totals are kept, so memory stays flat however long the
/// camera runs. Per-frame output is throttled to every `throttle_frames`
/// frames so a 30 fps camera doesn't flood the terminal.
pub struct StdoutPipelineLogger {
    throttle_frames: u64,
    timings: HashMap<String, SeriesStats>,
    metrics: HashMap<String, SeriesStats>,
    start_time: Instant,
    total_frames: u64,
    detection_frames: u64,
    state_changes: u64,
    last_transition: Option<(u64, AuthorizationState)>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
            detection_frames: 0,
            state_changes: 0,
            last_transition: None,
        }
    }

    /// Returns the formatted summary string, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.total_frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.total_frames;
        let mut lines = Vec::new();

        lines.push(format!(
            "Session summary ({frames} frames, {} detections, {:.1}s total):",
            self.detection_frames,
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = self.timings[stage];
            let total_ms = stats.total;
            let avg_ms = stats.average();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let avg = self.metrics[name].average();
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        lines.push(format!("  State changes: {}", self.state_changes));

        if elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }

    pub fn state_changes(&self) -> u64 {
        self.state_changes
    }

    /// Frame counter and target state of the most recent transition.
    pub fn last_transition(&self) -> Option<(u64, AuthorizationState)> {
        self.last_transition
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame(&mut self, frame_counter: u64, detection: bool) {
        self.total_frames += 1;
        if detection {
            self.detection_frames += 1;
        }
        if frame_counter % self.throttle_frames == 0 {
            log::debug!(
                "Frame {frame_counter} ({} detections so far)",
                self.detection_frames
            );
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn state_changed(
        &mut self,
        from: AuthorizationState,
        to: AuthorizationState,
        frame_counter: u64,
    ) {
        self.state_changes += 1;
        self.last_transition = Some((frame_counter, to));
        log::info!("{from} -> {to} (frame {frame_counter})");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
