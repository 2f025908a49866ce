use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use depthcam_core::bridge::control::RecorderControl;
use depthcam_core::bridge::method_channel::{MethodChannel, MethodResult};
use depthcam_core::capture::domain::capture_device::CameraProvider;
use depthcam_core::capture::infrastructure::synthetic_camera::{
    SyntheticCameraConfig, SyntheticCameraProvider,
};
use depthcam_core::encoding::infrastructure::ffmpeg_encoder::FfmpegEncoderFactory;
use depthcam_core::pipeline::capture_session::CaptureSession;
use depthcam_core::shared::capture_settings::CaptureSettings;

/// Record side-by-side color + depth video from a depth camera.
#[derive(Parser)]
#[command(name = "depthcam")]
struct Cli {
    /// Recording length in seconds.
    #[arg(long, default_value = "3.0")]
    duration: f64,

    /// Capture frame rate (overrides settings).
    #[arg(long)]
    fps: Option<u32>,

    /// Directory for the recording (overrides settings).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Color stream size, WIDTHxHEIGHT.
    #[arg(long, default_value = "512x384", value_parser = parse_size)]
    video_size: (u32, u32),

    /// Depth stream size, WIDTHxHEIGHT. Height must match the color stream.
    #[arg(long, default_value = "256x384", value_parser = parse_size)]
    depth_size: (u32, u32),

    /// Also save the first composite frame as an image.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Simulate a device without a depth-capable camera.
    #[arg(long)]
    no_depth_camera: bool,

    /// Drop the depth half of every Nth bundle.
    #[arg(long)]
    drop_every: Option<u64>,

    /// Deliver depth as disparity (1/m) instead of meters.
    #[arg(long)]
    disparity: bool,

    /// Settings file (default: user config dir).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save_settings: bool,
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
    validate(&cli)?;

    let settings = build_settings(&cli)?;
    if cli.save_settings {
        match &cli.settings {
            Some(path) => settings.save_to(path)?,
            None => settings.save()?,
        }
    }

    let provider: Arc<dyn CameraProvider> = if cli.no_depth_camera {
        Arc::new(SyntheticCameraProvider::without_depth_camera())
    } else {
        Arc::new(SyntheticCameraProvider::new(camera_config(&cli)))
    };
    let session = CaptureSession::new(provider, Arc::new(FfmpegEncoderFactory::new()), settings);
    let channel = MethodChannel::new(RecorderControl::new(session));

    if call(&channel, "startCapture")? != MethodResult::Bool(true) {
        return Err("Depth capture is not available".into());
    }
    log::info!("Recording for {:.1}s", cli.duration);
    std::thread::sleep(Duration::from_secs_f64(cli.duration));

    match call(&channel, "stopCapture")? {
        MethodResult::Path(path) => {
            println!("{}", path.display());
            Ok(())
        }
        MethodResult::Error { message, .. } => Err(message.into()),
        other => Err(format!("Unexpected reply: {other:?}").into()),
    }
}

fn call(channel: &MethodChannel, method: &str) -> Result<MethodResult, Box<dyn std::error::Error>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    channel.handle(method, move |result| {
        let _ = tx.send(result);
    });
    Ok(rx.recv()?)
}

fn build_settings(cli: &Cli) -> Result<CaptureSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) if path.exists() => CaptureSettings::load_from(path)?,
        Some(_) => CaptureSettings::default(),
        None => CaptureSettings::load(),
    };
    if let Some(fps) = cli.fps {
        settings.fps = fps;
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.snapshot {
        settings.snapshot_path = Some(path.clone());
    }
    Ok(settings)
}

fn camera_config(cli: &Cli) -> SyntheticCameraConfig {
    SyntheticCameraConfig {
        video_width: cli.video_size.0,
        video_height: cli.video_size.1,
        depth_width: cli.depth_size.0,
        drop_depth_every: cli.drop_every,
        disparity: cli.disparity,
        ..SyntheticCameraConfig::default()
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.duration.is_finite() || cli.duration <= 0.0 {
        return Err(format!("Duration must be a positive number, got {}", cli.duration).into());
    }
    if cli.fps == Some(0) {
        return Err("Frame rate must be at least 1".into());
    }
    if cli.video_size.1 != cli.depth_size.1 {
        return Err(format!(
            "Depth height ({}) must match video height ({})",
            cli.depth_size.1, cli.video_size.1
        )
        .into());
    }
    if cli.drop_every == Some(0) {
        return Err("--drop-every must be at least 1".into());
    }
    if let Some(dir) = &cli.output_dir {
        if !dir.is_dir() {
            return Err(format!("Output directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(|c: char| c.eq_ignore_ascii_case(&'x'))
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("invalid dimension '{s}' in '{value}'"))
    };
    Ok((parse(w)?, parse(h)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    use rstest::rstest;

    #[rstest]
    #[case::lowercase("512x384", Ok((512, 384)))]
    #[case::uppercase("256X192", Ok((256, 192)))]
    #[case::spaces(" 64 x 48 ", Ok((64, 48)))]
    fn test_parse_size(#[case] input: &str, #[case] expected: Result<(u32, u32), String>) {
        assert_eq!(parse_size(input), expected);
    }

    #[rstest]
    #[case::missing_separator("512")]
    #[case::zero_width("0x10")]
    #[case::not_a_number("ax10")]
    fn test_parse_size_rejects(#[case] input: &str) {
        assert!(parse_size(input).is_err());
    }

    #[test]
    fn test_mismatched_heights_rejected() {
        let cli = Cli::parse_from(["depthcam", "--video-size", "64x48", "--depth-size", "32x40"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        CaptureSettings {
            fps: 30,
            ..CaptureSettings::default()
        }
        .save_to(&settings_path)
        .unwrap();

        let cli = Cli::parse_from([
            OsStr::new("depthcam"),
            OsStr::new("--settings"),
            settings_path.as_os_str(),
            OsStr::new("--output-dir"),
            dir.path().as_os_str(),
        ]);
        let settings = build_settings(&cli).unwrap();
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.output_dir.as_deref(), Some(dir.path()));
    }
}
