pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

pub const DETECT_PATH: &str = "/detect";
pub const RECOGNIZE_PATH: &str = "/recognize";
pub const ENROLL_PATH: &str = "/enroll";

/// Period between capture ticks while a session is running.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Preferred capture resolution; devices may pick something else.
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Environment variable that overrides the configured server URL.
pub const SERVER_URL_ENV: &str = "FACEWATCH_SERVER";

pub const CONFIG_DIR_NAME: &str = "FaceWatch";
