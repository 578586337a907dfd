use std::process;

use clap::Parser;

use agelens_core::analysis::domain::face_analyzer::FaceAnalyzer;
use agelens_core::analysis::infrastructure::model_resolver;
use agelens_core::analysis::infrastructure::onnx_attribute_analyzer::OnnxAttributeAnalyzer;
use agelens_core::annotation::infrastructure::opencv_box_annotator::OpenCvBoxAnnotator;
use agelens_core::capture::infrastructure::highgui_display::HighguiDisplay;
use agelens_core::capture::infrastructure::opencv_camera::OpenCvCamera;
use agelens_core::pipeline::cadence::FrameCadence;
use agelens_core::pipeline::live_annotate_use_case::LiveAnnotateUseCase;
use agelens_core::shared::constants::{
    DETECT_MODEL_NAME, DETECT_MODEL_URL, EXIT_KEY, GENDERAGE_MODEL_NAME, GENDERAGE_MODEL_URL,
    WINDOW_TITLE,
};

/// Live webcam age and gender annotation.
#[derive(Parser)]
#[command(name = "agelens")]
struct Cli {
    /// Camera device index.
    #[arg(long, default_value = "0")]
    device: i32,

    /// Analyze every Nth frame (1 = every frame).
    #[arg(long, default_value = "10")]
    cadence: u64,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,

    /// Display window title.
    #[arg(long, default_value = WINDOW_TITLE)]
    window: String,
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

    let analyzer = build_analyzer(&cli)?;
    let cadence = FrameCadence::new(cli.cadence)?;
    let camera = OpenCvCamera::open(cli.device)?;
    let display = HighguiDisplay::open(&cli.window)?;

    let mut use_case = LiveAnnotateUseCase::new(
        Box::new(camera),
        analyzer,
        Box::new(OpenCvBoxAnnotator::new()),
        Box::new(display),
        cadence,
        EXIT_KEY,
    );
    let summary = use_case.run()?;

    log::info!(
        "Displayed {} frames; {} analyses attempted, {} succeeded",
        summary.frames_displayed,
        summary.analyses_attempted,
        summary.analyses_succeeded
    );
    Ok(())
}

fn build_analyzer(cli: &Cli) -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {DETECT_MODEL_NAME}");
    let detect_model = model_resolver::resolve(
        DETECT_MODEL_NAME,
        DETECT_MODEL_URL,
        None,
        Some(Box::new(|done, total| {
            download_progress("face detection", done, total)
        })),
    )?;
    eprintln!();

    log::info!("Resolving model: {GENDERAGE_MODEL_NAME}");
    let attr_model = model_resolver::resolve(
        GENDERAGE_MODEL_NAME,
        GENDERAGE_MODEL_URL,
        None,
        Some(Box::new(|done, total| {
            download_progress("gender/age", done, total)
        })),
    )?;
    eprintln!();

    Ok(Box::new(OnnxAttributeAnalyzer::new(
        &detect_model,
        &attr_model,
        cli.confidence,
    )?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.cadence < 1 {
        return Err("Cadence must be at least 1".into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    Ok(())
}

fn download_progress(what: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {what} model... {pct}%");
    } else {
        eprint!("\rDownloading {what} model... {downloaded} bytes");
    }
}
