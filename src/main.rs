use anyhow::{Context, Result};
use ckplus_prep::config::DEFAULT_REFERENCE_IDS;
use ckplus_prep::pipeline::check_corpus;
use ckplus_prep::{
    Pipeline, PipelineConfig, SimilarityAligner, create_detector, load_reference_ids,
};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Prepare the CK+ dataset: label, align faces and split subject-independent folds")]
struct Args {
    /// Raw CK+ directory holding cohn-kanade-images/ and Emotion/
    #[clap(long, value_parser, default_value = "datasets/CKPlus/RAW")]
    raw_dir: PathBuf,

    /// Output directory for aligned images, checkpoints and fold files
    #[clap(long, value_parser, default_value = "datasets/CKPlus")]
    out_dir: PathBuf,

    /// Number of folds for splitting train and test sets
    #[clap(long, default_value = "5")]
    n_folds: usize,

    /// Cross-check aligned images against a reference id list before splitting
    #[clap(long)]
    is_debug: bool,

    /// Reference id list used with --is-debug (default: <out-dir>/reference_ids.txt)
    #[clap(long, value_parser)]
    reference: Option<PathBuf>,

    /// Face detector to use (rustface, etc.)
    #[clap(long, default_value = "rustface")]
    detector: String,

    /// Detector model file (downloaded if missing)
    #[clap(long, value_parser)]
    model_path: Option<PathBuf>,

    /// Minimum detector score for a face to count
    #[clap(short, long, default_value = "0.5")]
    threshold: f32,

    /// Optional detector-specific parameters (key=value,...)
    #[clap(long, default_value = "")]
    detector_params: String,

    /// Reuse bbox_landmark.json from a previous run instead of detecting again
    #[clap(long)]
    reuse_detections: bool,

    /// Extract cohn-kanade-images.zip / Emotion_labels.zip found in the raw directory
    #[clap(long)]
    extract_archives: bool,
}

/// Main program logic
fn run(args: Args) -> Result<()> {
    // Initialize logger, progress lines on by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = PipelineConfig::new(&args.raw_dir, &args.out_dir).with_n_folds(args.n_folds);
    config.reuse_detections = args.reuse_detections;
    config.extract_archives = args.extract_archives;
    config.validate()?;
    check_corpus(&config)?;

    // Initialize face detector
    info!("Initializing face detector: {}", args.detector);
    let mut detector = create_detector(&args.detector, args.model_path.clone(), args.threshold)
        .context("Failed to initialize face detector")?;

    // Set detector params if provided
    if !args.detector_params.is_empty() {
        detector.set_params(&args.detector_params)?;
    }

    let mut pipeline = Pipeline::new(config, detector, Box::new(SimilarityAligner::default()));

    if args.is_debug {
        let reference_path = args
            .reference
            .clone()
            .unwrap_or_else(|| args.out_dir.join(DEFAULT_REFERENCE_IDS));
        let reference = load_reference_ids(&reference_path)
            .with_context(|| format!("Failed to load reference ids from {:?}", reference_path))?;
        info!("Loaded {} reference ids from {:?}", reference.len(), reference_path);
        pipeline = pipeline.with_reference(Box::new(reference));
    }

    let summary = pipeline.run().context("Preprocessing failed")?;

    info!(
        "Finished: {} labeled clips, {} apex frames, {} kept, {} detected, {} aligned, {} folds",
        summary.labeled_clips,
        summary.catalogued_images,
        summary.filtered_samples,
        summary.detection.detected,
        summary.alignment.written,
        summary.folds.len()
    );
    if !summary.integrity.is_empty() {
        warn!("Excluded by cross-check: {}", summary.integrity);
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    run(args)
}
