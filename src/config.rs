use std::path::{Path, PathBuf};

use crate::align::CROP_SIZE;
use crate::catalog::APEX_WINDOW;
use crate::error::{PrepError, Result};
use crate::expression::{AcceptedExpressions, Vocabulary};

pub const RAW_IMAGES_DIR: &str = "cohn-kanade-images";
pub const RAW_IMAGES_ARCHIVE: &str = "cohn-kanade-images.zip";
pub const RAW_LABELS_DIR: &str = "Emotion";
pub const RAW_LABELS_ARCHIVE: &str = "Emotion_labels.zip";

pub const ALIGNED_IMAGES_DIR: &str = "imgs";
pub const LABELS_CHECKPOINT: &str = "emotion_labels.json";
pub const DETECTIONS_CHECKPOINT: &str = "bbox_landmark.json";
pub const DEFAULT_REFERENCE_IDS: &str = "reference_ids.txt";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub out_dir: PathBuf,
    pub n_folds: usize,
    pub vocabulary: Vocabulary,
    pub accepted: AcceptedExpressions,
    pub apex_window: usize,
    pub crop_size: u32,
    /// Load `bbox_landmark.json` instead of running the detector when it exists
    pub reuse_detections: bool,
    /// Unpack the CK+ zip archives found in `raw_dir` when their directories are missing
    pub extract_archives: bool,
}

impl PipelineConfig {
    pub fn new(raw_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            out_dir: out_dir.into(),
            n_folds: 5,
            vocabulary: Vocabulary::ck_plus(),
            accepted: AcceptedExpressions::ck_plus(),
            apex_window: APEX_WINDOW,
            crop_size: CROP_SIZE,
            reuse_detections: false,
            extract_archives: false,
        }
    }

    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_folds == 0 {
            return Err(PrepError::Configuration(
                "number of folds must be at least 1".to_string(),
            ));
        }
        if self.apex_window == 0 {
            return Err(PrepError::Configuration(
                "apex window must keep at least one frame".to_string(),
            ));
        }
        if self.crop_size == 0 {
            return Err(PrepError::Configuration(
                "crop size must be positive".to_string(),
            ));
        }
        if self.vocabulary.is_empty() {
            return Err(PrepError::Configuration(
                "expression vocabulary is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn raw_image_dir(&self) -> PathBuf {
        self.raw_dir.join(RAW_IMAGES_DIR)
    }

    pub fn raw_label_dir(&self) -> PathBuf {
        self.raw_dir.join(RAW_LABELS_DIR)
    }

    pub fn aligned_dir(&self) -> PathBuf {
        self.out_dir.join(ALIGNED_IMAGES_DIR)
    }

    pub fn labels_checkpoint(&self) -> PathBuf {
        self.out_dir.join(LABELS_CHECKPOINT)
    }

    pub fn detections_checkpoint(&self) -> PathBuf {
        self.out_dir.join(DETECTIONS_CHECKPOINT)
    }

    pub fn out_root(&self) -> &Path {
        &self.out_dir
    }
}
