use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facelock_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use facelock_core::recognition::infrastructure::onnx_arcface_encoder::ARCFACE_MATCH_TOLERANCE;
use facelock_core::shared::constants::{
    DEFAULT_MAX_CONSECUTIVE_READ_FAILURES, DEFAULT_SAMPLING_INTERVAL,
};

/// Persistent defaults for the CLI. Every field can be overridden by a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reference: Option<PathBuf>,
    pub source: Option<String>,
    pub input_format: Option<String>,
    pub video_size: Option<String>,
    pub framerate: Option<String>,
    pub interval: usize,
    /// Distance between unit-length ArcFace embeddings, not the generic
    /// library default.
    pub tolerance: f64,
    pub confidence: f64,
    pub max_read_failures: usize,
    /// `first` or `strict`.
    pub enrollment: String,
    pub prefetch: bool,
    pub keep_waiting: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference: None,
            source: None,
            input_format: None,
            video_size: None,
            framerate: None,
            interval: DEFAULT_SAMPLING_INTERVAL,
            tolerance: ARCFACE_MATCH_TOLERANCE,
            confidence: DEFAULT_CONFIDENCE,
            max_read_failures: DEFAULT_MAX_CONSECUTIVE_READ_FAILURES,
            enrollment: "first".to_string(),
            prefetch: false,
            keep_waiting: false,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceLock").join("settings.json"))
    }

    /// Loads `explicit` if given (it must exist), otherwise the default
    /// location if present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        let json = fs::read_to_string(&path)
            .map_err(|e| format!("Cannot read settings {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid settings {}: {e}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
