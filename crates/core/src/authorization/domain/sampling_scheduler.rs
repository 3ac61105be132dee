/// True when frame `frame_counter` should run the full detection pipeline.
///
/// Depends only on `frame_counter % interval`. `interval` must be >= 1.
pub fn should_run_detection(frame_counter: u64, interval: u64) -> bool {
    frame_counter % interval == 0
}

/// Decides per frame whether to detect or replay the cached result.
///
/// The first detection happens on frame `interval` (counters start at 1),
/// so staleness is bounded by `interval - 1` frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingScheduler {
    interval: u64,
}

impl SamplingScheduler {
    pub fn new(interval: usize) -> Result<Self, &'static str> {
        if interval < 1 {
            return Err("sampling interval must be >= 1");
        }
        Ok(Self {
            interval: interval as u64,
        })
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn is_detection_frame(&self, frame_counter: u64) -> bool {
        should_run_detection(frame_counter, self.interval)
    }
}
