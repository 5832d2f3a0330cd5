use std::path::PathBuf;
use std::process;

use clap::Parser;

use facepix_core::detection::domain::face_detector::FaceDetector;
use facepix_core::detection::domain::face_tracker::TrackerConfig;
use facepix_core::detection::infrastructure::sidecar_detection_source::SidecarDetectionSource;
use facepix_core::overlay::domain::overlay_renderer::OverlayRenderer;
use facepix_core::overlay::infrastructure::watermark_overlay::{Caption, WatermarkOverlay};
use facepix_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use facepix_core::pipeline::redact_video_use_case::{RedactVideoConfig, RedactVideoUseCase};
use facepix_core::redaction::domain::frame_redactor::FrameRedactor;
use facepix_core::redaction::infrastructure::pixelate_redactor::PixelateRedactor;
use facepix_core::shared::constants::{
    DEFAULT_EXPAND_MARGIN, DEFAULT_FACE_TTL, DEFAULT_IOU_THRESHOLD, DEFAULT_PIXEL_SIZE,
};
use facepix_core::video::domain::video_reader::VideoReader;
use facepix_core::video::domain::video_writer::VideoWriter;
use facepix_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facepix_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Face pixelation for videos, driven by precomputed face landmarks.
#[derive(Parser)]
#[command(name = "facepix")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Output video file.
    output: PathBuf,

    /// JSON file with per-frame face landmark points.
    #[arg(long)]
    detections: PathBuf,

    /// Fractional growth applied to each face box (0.0-2.0).
    #[arg(long, default_value_t = DEFAULT_EXPAND_MARGIN)]
    margin: f64,

    /// Frames a face stays pixelated after its last detection.
    #[arg(long, default_value_t = DEFAULT_FACE_TTL)]
    face_ttl: u32,

    /// Minimum IOU for a detection to refresh an existing track (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou_threshold: f64,

    /// Mosaic grid resolution; lower is coarser.
    #[arg(long, default_value_t = DEFAULT_PIXEL_SIZE)]
    pixel_size: u32,

    /// Logo image stamped into the top-right corner.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// TrueType font for the caption text (required with --name).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Recipient name for the "Issued to" caption (requires --logo).
    #[arg(long)]
    name: Option<String>,

    /// Document identifier printed beneath the name.
    #[arg(long, default_value = "")]
    document_id: String,
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

    let detector: Box<dyn FaceDetector> =
        Box::new(SidecarDetectionSource::load(&cli.detections)?);
    let redactor: Box<dyn FrameRedactor> = Box::new(PixelateRedactor::new(cli.pixel_size));

    // Probe the input once so the overlay can be sized before the run.
    let mut probe = FfmpegReader::new();
    let metadata = probe.open(&cli.input)?;
    probe.close();
    log::info!(
        "Input: {}x{} @ {:.2} fps, {} frames ({})",
        metadata.width,
        metadata.height,
        metadata.fps,
        metadata.total_frames,
        metadata.codec
    );

    let overlay: Option<Box<dyn OverlayRenderer>> = match &cli.logo {
        Some(logo_path) => {
            let caption = cli.name.as_ref().map(|name| Caption {
                font_path: cli.font.clone().unwrap(),
                name: name.clone(),
                document_id: cli.document_id.clone(),
            });
            Some(Box::new(WatermarkOverlay::new(
                logo_path,
                caption,
                metadata.width,
                metadata.height,
            )?))
        }
        None => None,
    };

    let reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let writer: Box<dyn VideoWriter> = Box::new(FfmpegWriter::new());
    let logger: Box<dyn PipelineLogger> = Box::new(StdoutPipelineLogger::default());

    let config = RedactVideoConfig {
        expand_margin: cli.margin,
        tracker: TrackerConfig {
            face_ttl: cli.face_ttl,
            iou_threshold: cli.iou_threshold,
        },
    };

    let progress: Box<dyn Fn(usize, usize) -> bool + Send> = Box::new(|current, total| {
        eprint!("\rProcessing frame {current}/{total}");
        true
    });

    let mut use_case = RedactVideoUseCase::new(
        reader, writer, detector, redactor, overlay, logger, config,
    );
    let report = use_case.execute(&cli.input, &cli.output, Some(progress))?;
    eprintln!();

    log::info!(
        "Wrote {} of {} frames to {}",
        report.frames_processed,
        report.total_frames,
        cli.output.display()
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !cli.detections.exists() {
        return Err(format!(
            "Detections file not found: {}",
            cli.detections.display()
        )
        .into());
    }
    if !(0.0..=2.0).contains(&cli.margin) {
        return Err(format!("Margin must be between 0.0 and 2.0, got {}", cli.margin).into());
    }
    if cli.face_ttl == 0 {
        return Err("Face TTL must be at least 1".into());
    }
    if !(0.0..=1.0).contains(&cli.iou_threshold) {
        return Err(format!(
            "IOU threshold must be between 0.0 and 1.0, got {}",
            cli.iou_threshold
        )
        .into());
    }
    if cli.pixel_size == 0 {
        return Err("Pixel size must be at least 1".into());
    }
    if let Some(logo) = &cli.logo {
        if !logo.exists() {
            return Err(format!("Logo file not found: {}", logo.display()).into());
        }
    }
    if cli.name.is_some() {
        if cli.logo.is_none() {
            return Err("--name requires --logo".into());
        }
        match &cli.font {
            None => return Err("--name requires --font".into()),
            Some(font) if !font.exists() => {
                return Err(format!("Font file not found: {}", font.display()).into());
            }
            Some(_) => {}
        }
    }
    Ok(())
}
