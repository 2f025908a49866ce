/// Nearest distance mapped to black in the grayscale depth view.
pub const DEFAULT_MIN_DEPTH_METERS: f32 = 0.25;
/// Farthest distance mapped to white in the grayscale depth view.
pub const DEFAULT_MAX_DEPTH_METERS: f32 = 5.0;

/// LiDAR depth delivery rate on supported devices.
pub const DEFAULT_CAPTURE_FPS: u32 = 15;

pub const DEFAULT_FILE_PREFIX: &str = "depth_capture";
pub const DEFAULT_CONTAINER: &str = "mp4";

/// Bundles waiting for the synchronizer thread beyond this are discarded.
pub const DEFAULT_SAMPLE_QUEUE_CAPACITY: usize = 2;

pub const SETTINGS_DIR_NAME: &str = "depthcam";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
