mod settings;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facelock_core::authorization::domain::session_snapshot::SessionSnapshot;
use facelock_core::detection::domain::face_detector::FaceDetector;
use facelock_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facelock_core::pipeline::enroll_use_case::EnrollFaceUseCase;
use facelock_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facelock_core::pipeline::session_config::{EnrollmentStrategyKind, SessionConfig};
use facelock_core::pipeline::session_controller::{RunControl, SessionController};
use facelock_core::recognition::domain::face_encoder::FaceEncoder;
use facelock_core::recognition::infrastructure::onnx_arcface_encoder::OnnxArcFaceEncoder;
use facelock_core::shared::constants::{
    FACE_DETECTION_MODEL, FACE_EMBEDDING_MODEL, IMAGE_EXTENSIONS,
};
use facelock_core::shared::frame::Frame;
use facelock_core::shared::model_resolver::{self, ModelAsset};
use facelock_core::video::domain::frame_source::FrameSource;
use facelock_core::video::infrastructure::ffmpeg_frame_source::{CaptureOptions, FfmpegFrameSource};
use facelock_core::video::infrastructure::image_file_reader::read_image;
use facelock_core::video::infrastructure::threaded_frame_source::ThreadedFrameSource;

use settings::Settings;

/// Locks unless exactly one face, the enrolled one, is in front of the camera.
#[derive(Parser)]
#[command(name = "facelock")]
struct Cli {
    /// Reference image of the authorized face.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Video file, stream URL or capture device (default: the platform camera).
    #[arg(long)]
    source: Option<String>,

    /// Capture input format: v4l2, avfoundation, dshow, ...
    #[arg(long)]
    input_format: Option<String>,

    /// Requested capture size, e.g. 640x480.
    #[arg(long)]
    video_size: Option<String>,

    /// Requested capture frame rate.
    #[arg(long)]
    framerate: Option<String>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long)]
    interval: Option<usize>,

    /// Maximum embedding distance accepted as the authorized face (0.0-1.0,
    /// default 1.0 for the bundled ArcFace model).
    #[arg(long)]
    tolerance: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Consecutive failed reads before the camera counts as unavailable.
    #[arg(long)]
    max_read_failures: Option<usize>,

    /// Refuse reference images containing more than one face.
    #[arg(long)]
    strict_enrollment: bool,

    /// Decode frames on a separate thread.
    #[arg(long)]
    prefetch: bool,

    /// Keep waiting instead of exiting when the camera stops delivering frames.
    #[arg(long)]
    keep_waiting: bool,

    /// Settings file (default: <config dir>/FaceLock/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Enroll the reference image, print what was found and exit.
    #[arg(long)]
    probe: bool,
}

/// Flags layered over the settings file.
struct Options {
    config: SessionConfig,
    source: String,
    capture: CaptureOptions,
    confidence: f64,
    prefetch: bool,
    keep_waiting: bool,
    probe: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref())?;
    let options = merge(cli, settings)?;
    validate(&options)?;

    let reference = read_image(&options.config.reference_image_path)?;
    let (detector, encoder) = build_models(options.confidence)?;

    if options.probe {
        return run_probe(&options.config, reference, detector, encoder);
    }

    let logger = Box::new(StdoutPipelineLogger::default());
    let mut controller =
        SessionController::start(&options.config, &reference, detector, encoder, logger)?;
    for warning in controller.enrollment_warnings() {
        eprintln!("Warning: {warning}");
    }

    let mut source = open_source(&options)?;
    let cancelled = Arc::new(AtomicBool::new(false));
    watch_stdin(cancelled.clone());
    eprintln!("Watching {} (type q + Enter to stop)", options.source);

    let mut last_state = None;
    let on_snapshot: Box<dyn FnMut(&SessionSnapshot) -> bool + Send> = Box::new(move |snapshot| {
        if last_state != Some(snapshot.state()) {
            last_state = Some(snapshot.state());
            eprintln!(
                "{} (faces: {}, authorized: {})",
                snapshot.state(),
                snapshot.face_count(),
                snapshot.authorized_count()
            );
        }
        true
    });
    let on_unavailable: Option<Box<dyn FnMut(usize) -> bool + Send>> = if options.keep_waiting {
        Some(Box::new(|failures| {
            eprintln!("Camera unavailable ({failures} failed reads), waiting...");
            std::thread::sleep(Duration::from_secs(1));
            true
        }))
    } else {
        None
    };

    let summary = controller.run(
        source.as_mut(),
        RunControl {
            cancelled,
            on_snapshot: Some(on_snapshot),
            on_unavailable,
        },
    )?;
    log::info!(
        "Stopped after {} frames ({:?}), final state {}",
        summary.frames_processed,
        summary.stop_reason,
        summary.final_state
    );
    Ok(())
}

fn merge(cli: Cli, settings: Settings) -> Result<Options, Box<dyn std::error::Error>> {
    let reference = cli
        .reference
        .or(settings.reference)
        .ok_or("A reference image is required (--reference or \"reference\" in settings)")?;

    let enrollment_strategy = if cli.strict_enrollment {
        EnrollmentStrategyKind::RejectAmbiguous
    } else {
        settings.enrollment.parse()?
    };

    let input_format = cli.input_format.or(settings.input_format);
    let (source, input_format) = match cli.source.or(settings.source) {
        Some(source) => (source, input_format),
        None => {
            let (device, format) = default_camera()
                .ok_or("No default camera on this platform; pass --source and --input-format")?;
            (device.to_string(), input_format.or(Some(format.to_string())))
        }
    };

    Ok(Options {
        config: SessionConfig {
            sampling_interval: cli.interval.unwrap_or(settings.interval),
            match_tolerance: cli.tolerance.unwrap_or(settings.tolerance),
            reference_image_path: reference,
            max_consecutive_read_failures: cli
                .max_read_failures
                .unwrap_or(settings.max_read_failures),
            enrollment_strategy,
        },
        source,
        capture: CaptureOptions {
            input_format,
            video_size: cli.video_size.or(settings.video_size),
            framerate: cli.framerate.or(settings.framerate),
        },
        confidence: cli.confidence.unwrap_or(settings.confidence),
        prefetch: cli.prefetch || settings.prefetch,
        keep_waiting: cli.keep_waiting || settings.keep_waiting,
        probe: cli.probe,
    })
}

fn validate(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let reference = &options.config.reference_image_path;
    if !reference.exists() {
        return Err(format!("Reference image not found: {}", reference.display()).into());
    }
    if !is_image(reference) {
        return Err(format!(
            "Reference must be an image ({}), got {}",
            IMAGE_EXTENSIONS.join(", "),
            reference.display()
        )
        .into());
    }
    if !(0.0..=1.0).contains(&options.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            options.confidence
        )
        .into());
    }
    options.config.validate()?;
    Ok(())
}

fn run_probe(
    config: &SessionConfig,
    reference: Frame,
    mut detector: Box<dyn FaceDetector>,
    mut encoder: Box<dyn FaceEncoder>,
) -> Result<(), Box<dyn std::error::Error>> {
    let enrollment = EnrollFaceUseCase::new(config.enrollment_strategy.build()).execute(
        detector.as_mut(),
        encoder.as_mut(),
        &reference,
    )?;
    println!(
        "{}: {}x{}, {} face(s)",
        config.reference_image_path.display(),
        reference.width(),
        reference.height(),
        enrollment.faces.len()
    );
    for (i, face) in enrollment.faces.iter().enumerate() {
        println!("  face {i}: {face}");
    }
    println!(
        "  embedding: {} dimensions",
        enrollment.identity.dimension()
    );
    for warning in &enrollment.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn build_models(
    confidence: f64,
) -> Result<(Box<dyn FaceDetector>, Box<dyn FaceEncoder>), Box<dyn std::error::Error>> {
    let detector_path = resolve_model(&FACE_DETECTION_MODEL)?;
    let encoder_path = resolve_model(&FACE_EMBEDDING_MODEL)?;
    let detector = OnnxYoloDetector::new(&detector_path, confidence)?;
    let encoder = OnnxArcFaceEncoder::new(&encoder_path)?;
    Ok((Box::new(detector), Box::new(encoder)))
}

fn resolve_model(asset: &ModelAsset) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", asset.name);
    let name = asset.name;
    let path = model_resolver::resolve(
        asset,
        None,
        Some(Box::new(move |downloaded, total| {
            download_progress(name, downloaded, total)
        })),
    )?;
    Ok(path)
}

fn open_source(options: &Options) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let source = FfmpegFrameSource::open(&options.source, &options.capture)?;
    log::info!("Frame source: {}", source.metadata());
    if options.prefetch {
        Ok(Box::new(ThreadedFrameSource::spawn(Box::new(source))))
    } else {
        Ok(Box::new(source))
    }
}

/// Sets `cancelled` once the user types `q`. A closed stdin is ignored.
fn watch_stdin(cancelled: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let quit = std::io::stdin()
            .lock()
            .lines()
            .map_while(Result::ok)
            .any(|line| line.trim().eq_ignore_ascii_case("q"));
        if quit {
            cancelled.store(true, Ordering::Relaxed);
        }
    });
}

/// Platform camera and the libavdevice format that opens it.
fn default_camera() -> Option<(&'static str, &'static str)> {
    if cfg!(target_os = "linux") {
        Some(("/dev/video0", "v4l2"))
    } else if cfg!(target_os = "macos") {
        Some(("0", "avfoundation"))
    } else {
        None
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("facelock").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            reference: Some(PathBuf::from("from_settings.jpg")),
            interval: 5,
            tolerance: 0.3,
            source: Some("/dev/video2".to_string()),
            ..Default::default()
        };
        let options = merge(
            cli(&["--reference", "me.jpg", "--interval", "3", "--source", "clip.mp4"]),
            settings,
        )
        .unwrap();
        assert_eq!(options.config.reference_image_path, PathBuf::from("me.jpg"));
        assert_eq!(options.config.sampling_interval, 3);
        assert!((options.config.match_tolerance - 0.3).abs() < f64::EPSILON);
        assert_eq!(options.source, "clip.mp4");
        assert_eq!(options.capture.input_format, None);
    }

    #[test]
    fn test_missing_reference_errors() {
        let err = merge(cli(&["--source", "clip.mp4"]), Settings::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("reference"));
    }

    #[test]
    fn test_strict_flag_wins() {
        let settings = Settings {
            enrollment: "first".to_string(),
            ..Default::default()
        };
        let options = merge(
            cli(&["--reference", "me.jpg", "--source", "x", "--strict-enrollment"]),
            settings,
        )
        .unwrap();
        assert_eq!(
            options.config.enrollment_strategy,
            EnrollmentStrategyKind::RejectAmbiguous
        );
    }

    #[test]
    fn test_bad_enrollment_setting_errors() {
        let settings = Settings {
            enrollment: "biggest".to_string(),
            ..Default::default()
        };
        assert!(merge(cli(&["--reference", "me.jpg", "--source", "x"]), settings).is_err());
    }

    #[test]
    fn test_validate_rejects_non_image_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hi").unwrap();
        let options = merge(
            cli(&["--reference", path.to_str().unwrap(), "--source", "x"]),
            Settings::default(),
        )
        .unwrap();
        assert!(validate(&options).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.png");
        std::fs::write(&path, "placeholder").unwrap();
        let options = merge(
            cli(&["--reference", path.to_str().unwrap(), "--source", "x", "--tolerance", "1.5"]),
            Settings::default(),
        )
        .unwrap();
        let err = validate(&options).unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("me.JPG")));
        assert!(is_image(Path::new("me.png")));
        assert!(!is_image(Path::new("clip.mp4")));
        assert!(!is_image(Path::new("noext")));
    }
}
