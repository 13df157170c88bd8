use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use facewatch_core::capture::domain::frame_source::FrameSource;
use facewatch_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use facewatch_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use facewatch_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facewatch_core::overlay::domain::overlay_scene::OverlayScene;
use facewatch_core::overlay::infrastructure::recording_surface::{DrawCommand, RecordingSurface};
use facewatch_core::recognition::domain::face_result::Mode;
use facewatch_core::recognition::domain::face_service::{EnrollmentRequest, FaceService};
use facewatch_core::recognition::infrastructure::http_face_service::HttpFaceService;
use facewatch_core::recognition::infrastructure::jpeg_encoder::encode_file;
use facewatch_core::session::controller::{Controller, Snapshot};
use facewatch_core::session::enrollment::validate_name;
use facewatch_core::session::session_logger::{CallOutcome, SessionLogger, StatsSessionLogger};
use facewatch_core::session::state::{Event, Phase};
use facewatch_core::shared::config::ClientConfig;

/// Runs when neither --ticks nor --duration is given.
const DEFAULT_WATCH_SECS: f64 = 10.0;

/// Webcam face detection and recognition client.
#[derive(Parser)]
#[command(name = "facewatch", version)]
struct Cli {
    /// Face service base URL (overrides the config file and FACEWATCH_SERVER).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Config file (default: <config dir>/FaceWatch/client.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Milliseconds between polling ticks.
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the camera and print every overlay redraw.
    Watch {
        /// Ask for names instead of bare boxes.
        #[arg(long)]
        recognize: bool,

        /// Capture device (e.g. /dev/video0, "0", "video=Integrated Camera").
        #[arg(long)]
        device: Option<String>,

        /// libavdevice input format (v4l2, avfoundation, dshow).
        #[arg(long)]
        backend: Option<String>,

        /// Replay the images in this directory instead of using a camera.
        #[arg(long, conflicts_with_all = ["device", "backend"])]
        images: Option<PathBuf>,

        /// Stop after this many polling ticks.
        #[arg(long)]
        ticks: Option<usize>,

        /// Stop after this many seconds.
        #[arg(long)]
        duration: Option<f64>,

        /// Maximum number of requests in flight at once.
        #[arg(long)]
        max_in_flight: Option<usize>,
    },
    /// Send one image to /detect and print the boxes.
    Detect { image: PathBuf },
    /// Send one image to /recognize and print names and boxes.
    Recognize { image: PathBuf },
    /// Register the face in an image under a name.
    Enroll {
        #[arg(long)]
        name: String,
        image: PathBuf,
    },
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
    let mut config = ClientConfig::resolve(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(interval) = cli.interval_ms {
        config.poll_interval_ms = interval;
    }

    match cli.command {
        Command::Watch {
            recognize,
            device,
            backend,
            images,
            ticks,
            duration,
            max_in_flight,
        } => {
            if device.is_some() {
                config.capture.device = device;
            }
            if backend.is_some() {
                config.capture.backend = backend;
            }
            if max_in_flight.is_some() {
                config.max_in_flight = max_in_flight;
            }
            config.validate()?;
            let mode = if recognize {
                Mode::Recognize
            } else {
                Mode::Detect
            };
            let limit = WatchLimit::from_args(ticks, duration)?;
            run_watch(&config, mode, images.as_deref(), limit)
        }
        Command::Detect { image } => {
            config.validate()?;
            run_query(&config, Mode::Detect, &image)
        }
        Command::Recognize { image } => {
            config.validate()?;
            run_query(&config, Mode::Recognize, &image)
        }
        Command::Enroll { name, image } => {
            config.validate()?;
            run_enroll(&config, &name, &image)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WatchLimit {
    Ticks(usize),
    Duration(Duration),
}

impl WatchLimit {
    fn from_args(
        ticks: Option<usize>,
        duration: Option<f64>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match (ticks, duration) {
            (Some(_), Some(_)) => Err("--ticks and --duration are mutually exclusive".into()),
            (Some(0), None) => Err("--ticks must be at least 1".into()),
            (Some(n), None) => Ok(WatchLimit::Ticks(n)),
            (None, Some(secs)) if !(secs > 0.0 && secs.is_finite()) => {
                Err(format!("Duration must be a positive number of seconds, got {secs}").into())
            }
            (None, Some(secs)) => Ok(WatchLimit::Duration(Duration::from_secs_f64(secs))),
            (None, None) => Ok(WatchLimit::Duration(Duration::from_secs_f64(
                DEFAULT_WATCH_SECS,
            ))),
        }
    }
}

/// Lets the CLI read the statistics after the controller thread has
/// taken ownership of its logger.
#[derive(Clone, Default)]
struct SharedStats(Arc<Mutex<StatsSessionLogger>>);

impl SharedStats {
    fn with<T>(&self, f: impl FnOnce(&mut StatsSessionLogger) -> T) -> T {
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl SessionLogger for SharedStats {
    fn tick(&mut self, dispatched: bool) {
        self.with(|s| s.tick(dispatched));
    }

    fn call(&mut self, endpoint: &str, duration_ms: f64, outcome: CallOutcome) {
        self.with(|s| s.call(endpoint, duration_ms, outcome));
    }

    fn info(&mut self, message: &str) {
        self.with(|s| s.info(message));
    }
}

fn run_watch(
    config: &ClientConfig,
    mode: Mode,
    images: Option<&Path>,
    limit: WatchLimit,
) -> Result<(), Box<dyn std::error::Error>> {
    let source: Box<dyn FrameSource> = match images {
        Some(dir) => {
            let replay = ImageSequenceSource::from_dir(dir)?;
            if replay.is_empty() {
                return Err(format!("No images found in {}", dir.display()).into());
            }
            log::info!("Replaying {} images from {}", replay.len(), dir.display());
            Box::new(replay)
        }
        None => Box::new(FfmpegCamera::new(config.capture.backend.clone())),
    };
    let service = Arc::new(HttpFaceService::new(config)?);
    let stats = SharedStats::default();

    let controller =
        Controller::new(config, source, service).with_logger(Box::new(stats.clone()));
    let (handle, thread) = controller.spawn();
    handle.send(Event::SetMode(mode));
    handle.send(Event::Start);
    println!("Watching {} in {mode} mode", config.server_url);

    let started = Instant::now();
    let renderer = OverlayRenderer::default();
    let mut shown: Option<OverlayScene> = None;
    let mut failure: Option<String> = None;

    loop {
        let done = match limit {
            WatchLimit::Ticks(n) => stats.with(|s| s.ticks()) >= n,
            WatchLimit::Duration(d) => started.elapsed() >= d,
        };
        if done {
            break;
        }
        let Ok(snapshot) = handle.snapshots().recv_timeout(Duration::from_millis(50)) else {
            continue;
        };
        if snapshot.phase == Phase::Stopped {
            if let Some(banner) = snapshot.banner {
                failure = Some(banner);
                break;
            }
            continue;
        }
        if shown.as_ref() != Some(&snapshot.scene) {
            print_overlay(&renderer, &snapshot);
            shown = Some(snapshot.scene);
        }
    }

    handle.send(Event::Stop);
    handle.shutdown();
    thread
        .join()
        .map_err(|_| "controller thread panicked".to_string())?;

    if let Some(message) = failure {
        return Err(message.into());
    }
    if let Some(summary) = stats.with(|s| s.summary_string()) {
        println!("{summary}");
    }
    Ok(())
}

fn print_overlay(renderer: &OverlayRenderer, snapshot: &Snapshot) {
    let mut surface = RecordingSurface::new();
    renderer.render(&snapshot.scene, &mut surface);
    let frame = snapshot.frame.as_ref().map(|f| f.index()).unwrap_or(0);

    let drawn: Vec<String> = surface
        .commands()
        .iter()
        .filter(|c| !matches!(c, DrawCommand::Clear { .. }))
        .map(ToString::to_string)
        .collect();
    if snapshot.scene.is_blank() {
        println!("[frame {frame}] no faces");
    } else {
        println!("[frame {frame}] {}", drawn.join(", "));
    }
}

fn run_query(
    config: &ClientConfig,
    mode: Mode,
    image: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if !image.exists() {
        return Err(format!("Input file not found: {}", image.display()).into());
    }
    let encoded = encode_file(image, config.jpeg_quality)?;
    let service = HttpFaceService::new(config)?;
    log::info!(
        "Sending {}x{} image ({} bytes) to {}",
        encoded.width(),
        encoded.height(),
        encoded.byte_len(),
        config.endpoint(mode.endpoint())
    );

    let result = service.query(mode, &encoded)?;
    if result.is_empty() {
        println!("No faces found");
    }
    for (face, label) in result.labeled_boxes() {
        match label {
            Some(name) => println!("{name}: {face}"),
            None => println!("{face}"),
        }
    }
    Ok(())
}

fn run_enroll(
    config: &ClientConfig,
    name: &str,
    image: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = validate_name(name)?;
    if !image.exists() {
        return Err(format!("Input file not found: {}", image.display()).into());
    }
    let encoded = encode_file(image, config.jpeg_quality)?;
    let service = HttpFaceService::new(config)?;
    service.enroll(&EnrollmentRequest {
        name: name.clone(),
        image: encoded,
    })?;
    println!("Enrolled {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_watch_flags() {
        let cli = Cli::try_parse_from([
            "facewatch",
            "--server",
            "http://example:5000",
            "watch",
            "--recognize",
            "--ticks",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://example:5000"));
        match cli.command {
            Command::Watch {
                recognize, ticks, ..
            } => {
                assert!(recognize);
                assert_eq!(ticks, Some(5));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["facewatch", "detect", "a.jpg", "--interval-ms", "50"]).unwrap();
        assert_eq!(cli.interval_ms, Some(50));
    }

    #[test]
    fn test_images_conflict_with_device() {
        assert!(Cli::try_parse_from([
            "facewatch",
            "watch",
            "--images",
            "dir",
            "--device",
            "/dev/video0"
        ])
        .is_err());
    }

    #[test]
    fn test_enroll_requires_name() {
        assert!(Cli::try_parse_from(["facewatch", "enroll", "a.jpg"]).is_err());
    }

    #[test]
    fn test_watch_limit() {
        assert_eq!(
            WatchLimit::from_args(Some(3), None).unwrap(),
            WatchLimit::Ticks(3)
        );
        assert_eq!(
            WatchLimit::from_args(None, None).unwrap(),
            WatchLimit::Duration(Duration::from_secs(10))
        );
        assert!(WatchLimit::from_args(Some(3), Some(1.0)).is_err());
        assert!(WatchLimit::from_args(Some(0), None).is_err());
        assert!(WatchLimit::from_args(None, Some(-1.0)).is_err());
    }

    #[test]
    fn test_enroll_with_blank_name_fails_before_any_request() {
        // The server URL is unreachable: reaching the network would fail
        // with a different error.
        let config = ClientConfig {
            server_url: "http://127.0.0.1:1".into(),
            ..ClientConfig::default()
        };
        let err = run_enroll(&config, "   ", Path::new("missing.jpg")).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a name");
    }
}
