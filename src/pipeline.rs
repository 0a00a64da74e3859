//! Runs the preparation stages in order and checkpoints between them.
//!
//! labels + catalog -> filter -> detect -> align -> folds. Only missing
//! corpus directories and configuration problems stop a run; per-sample
//! failures are counted and the sample is left out of the next stage.

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::align::{AlignmentReport, FaceAligner, align_all, clear_aligned};
use crate::archive::ensure_extracted;
use crate::catalog::build_image_catalog;
use crate::checkpoint::{load_json, save_json};
use crate::config::{PipelineConfig, RAW_IMAGES_ARCHIVE, RAW_IMAGES_DIR, RAW_LABELS_ARCHIVE, RAW_LABELS_DIR};
use crate::detector::FaceDetector;
use crate::error::{PrepError, Result, SkipTally};
use crate::filter::filter_samples;
use crate::folds::{FoldAssignment, ReferenceSet, split_folds, write_fold_files};
use crate::labels::build_label_record;
use crate::locate::{DetectionReport, DetectionResult, locate_all};

/// Fails with [`PrepError::MissingCorpus`] unless both raw directories
/// exist, extracting their archives first when the config asks for it.
pub fn check_corpus(config: &PipelineConfig) -> Result<()> {
    let raw_dir = &config.raw_dir;
    for (dir_name, archive_name) in [
        (RAW_IMAGES_DIR, RAW_IMAGES_ARCHIVE),
        (RAW_LABELS_DIR, RAW_LABELS_ARCHIVE),
    ] {
        if config.extract_archives {
            ensure_extracted(raw_dir, dir_name, archive_name)?;
        }
        let path = raw_dir.join(dir_name);
        if !path.is_dir() {
            return Err(PrepError::MissingCorpus {
                hint: format!(
                    "download the CK+ archive '{}' and extract it to {:?}",
                    archive_name, path
                ),
                path,
            });
        }
    }
    Ok(())
}

/// Counts gathered over one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub labeled_clips: usize,
    pub catalogued_images: usize,
    pub filtered_samples: usize,
    pub detection: DetectionReport,
    pub alignment: AlignmentReport,
    pub integrity: SkipTally,
    pub folds: Vec<FoldAssignment>,
}

pub struct Pipeline {
    config: PipelineConfig,
    detector: Box<dyn FaceDetector>,
    aligner: Box<dyn FaceAligner>,
    reference: Option<Box<dyn ReferenceSet>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        detector: Box<dyn FaceDetector>,
        aligner: Box<dyn FaceAligner>,
    ) -> Self {
        Self {
            config,
            detector,
            aligner,
            reference: None,
        }
    }

    /// Cross-checks aligned images against `reference` before fold splitting.
    pub fn with_reference(mut self, reference: Box<dyn ReferenceSet>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Detections for exactly `paths`. With `reuse_detections` the stored
    /// entries of these paths are kept, entries for paths no longer in the
    /// filter output are dropped, and paths without an entry are detected.
    fn detections(&mut self, paths: Vec<&Path>) -> Result<(DetectionResult, DetectionReport)> {
        let checkpoint = self.config.detections_checkpoint();
        let mut result = DetectionResult::new();
        let mut pending = paths;

        if self.config.reuse_detections && checkpoint.is_file() {
            info!("Reusing detections from {:?}", checkpoint);
            let mut stored: DetectionResult = load_json(&checkpoint)?;
            pending.retain(|path| {
                let key = path.to_string_lossy().into_owned();
                match stored.remove(&key) {
                    Some(entry) => {
                        result.insert(key, entry);
                        false
                    }
                    None => true,
                }
            });
            if !stored.is_empty() {
                debug!("Dropped {} stored detections not in this run", stored.len());
            }
            info!(
                "Reused {} stored detections, {} images left to detect",
                result.len(),
                pending.len()
            );
        }

        let reused = result.len();
        let (fresh, mut report) = locate_all(pending, self.detector.as_mut());
        result.extend(fresh);
        report.detected += reused;
        save_json(&result, &checkpoint)?;
        Ok((result, report))
    }

    pub fn run(&mut self) -> Result<PipelineSummary> {
        self.config.validate()?;
        check_corpus(&self.config)?;

        let start_time = Instant::now();
        let aligned_dir = self.config.aligned_dir();
        fs::create_dir_all(&aligned_dir)?;
        let mut summary = PipelineSummary::default();

        info!(">>> Start preprocessing CK+ dataset.");
        info!(">>> Getting images labels.");
        let labels = build_label_record(&self.config.raw_label_dir(), &self.config.vocabulary);
        summary.labeled_clips = labels.len();
        info!("Found {} labeled clips", labels.len());

        info!(">>> Getting images path.");
        let catalog = build_image_catalog(&self.config.raw_image_dir(), self.config.apex_window);
        summary.catalogued_images = catalog.len();
        info!("Found {} apex frames", catalog.len());

        info!(">>> Filtering images by labels.");
        let filtered = filter_samples(&catalog, &labels, &self.config.accepted);
        summary.filtered_samples = filtered.len();
        info!(
            "Kept {} samples ({} unlabeled, {} excluded expressions)",
            filtered.len(),
            filtered.unlabeled,
            filtered.excluded
        );
        save_json(&filtered.label_map(), &self.config.labels_checkpoint())?;

        info!(">>> Start detecting faces.");
        let (detections, detection) = self.detections(filtered.paths().collect())?;
        info!(
            "Detected faces in {} images (skipped: {})",
            detection.detected, detection.skipped
        );
        summary.detection = detection;

        info!(">>> Start aligning faces.");
        let stale = clear_aligned(&aligned_dir)?;
        if stale > 0 {
            info!("Removed {} aligned images from a previous run", stale);
        }
        summary.alignment = align_all(
            &detections,
            &aligned_dir,
            self.aligner.as_ref(),
            self.config.crop_size,
        );

        info!(">>> Start generating train and test files.");
        let (folds, integrity) = split_folds(
            &aligned_dir,
            self.config.n_folds,
            self.reference.as_deref(),
        )?;
        write_fold_files(self.config.out_root(), &folds)?;
        summary.integrity = integrity;
        summary.folds = folds;

        info!(
            "Finished preprocessing in {} seconds",
            start_time.elapsed().as_secs()
        );
        Ok(summary)
    }
}
