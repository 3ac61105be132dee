use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::pipeline::enroll_use_case::{
    EnrollmentStrategy, FirstFaceStrategy, RejectAmbiguousStrategy,
};
use crate::shared::constants::{
    DEFAULT_MATCH_TOLERANCE, DEFAULT_MAX_CONSECUTIVE_READ_FAILURES, DEFAULT_SAMPLING_INTERVAL,
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sampling interval must be >= 1")]
    ZeroSamplingInterval,
    #[error("match tolerance must be a number within [0, 1], got {0}")]
    ToleranceOutOfRange(f64),
    #[error("max consecutive read failures must be >= 1")]
    ZeroFailureLimit,
}

/// Which policy picks the authorized face from a multi-face reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnrollmentStrategyKind {
    /// First face in detector order, with a warning.
    #[default]
    FirstFace,
    /// Refuse references with more than one face.
    RejectAmbiguous,
}

impl EnrollmentStrategyKind {
    pub fn build(self) -> Box<dyn EnrollmentStrategy> {
        match self {
            Self::FirstFace => Box::new(FirstFaceStrategy),
            Self::RejectAmbiguous => Box::new(RejectAmbiguousStrategy),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstFace => "first",
            Self::RejectAmbiguous => "strict",
        }
    }
}

impl FromStr for EnrollmentStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::FirstFace),
            "strict" => Ok(Self::RejectAmbiguous),
            other => Err(format!(
                "unknown enrollment strategy '{other}' (expected 'first' or 'strict')"
            )),
        }
    }
}

/// Parameters fixed at session start.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Run detection on every `sampling_interval`-th frame.
    pub sampling_interval: usize,
    /// Maximum embedding distance still counted as the authorized user.
    pub match_tolerance: f64,
    pub reference_image_path: PathBuf,
    /// Consecutive failed reads before the source is reported unavailable.
    pub max_consecutive_read_failures: usize,
    pub enrollment_strategy: EnrollmentStrategyKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            reference_image_path: PathBuf::from("reference.jpg"),
            max_consecutive_read_failures: DEFAULT_MAX_CONSECUTIVE_READ_FAILURES,
            enrollment_strategy: EnrollmentStrategyKind::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_interval < 1 {
            return Err(ConfigError::ZeroSamplingInterval);
        }
        if !(0.0..=1.0).contains(&self.match_tolerance) {
            return Err(ConfigError::ToleranceOutOfRange(self.match_tolerance));
        }
        if self.max_consecutive_read_failures < 1 {
            return Err(ConfigError::ZeroFailureLimit);
        }
        Ok(())
    }
}
