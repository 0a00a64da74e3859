//! Prepares the CK+ facial expression dataset for training.
//!
//! Stages, each taking the previous stage's output:
//! 1. label files -> [`LabelRecord`] and clip frames -> apex-frame catalog
//! 2. [`filter_samples`] keeps labelled frames with an accepted expression
//! 3. [`locate_all`] runs a [`FaceDetector`] and produces the detection checkpoint
//! 4. [`align_all`] warps each first face onto a canonical 80x80 crop
//! 5. [`split_folds`] partitions subjects into subject-independent folds

pub mod align;
pub mod archive;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod corpus;
pub mod detector;
pub mod error;
pub mod expression;
pub mod filter;
pub mod folds;
pub mod geometry;
pub mod labels;
pub mod locate;
pub mod pipeline;

// Re-export commonly used items
pub use align::{AlignmentReport, FaceAligner, SimilarityAligner, align_all, landmark_pairs};
pub use catalog::build_image_catalog;
pub use config::PipelineConfig;
pub use detector::{BoundingBox, Face, FaceDetector, create_detector};
pub use error::{PrepError, Result, SkipReason, SkipTally};
pub use expression::{AcceptedExpressions, Vocabulary};
pub use filter::{FilteredSample, FilteredSamples, filter_samples};
pub use folds::{FoldAssignment, ReferenceSet, load_reference_ids, split_folds, write_fold_files};
pub use geometry::Point;
pub use labels::{LabelRecord, build_label_record};
pub use locate::{DetectionEntry, DetectionReport, DetectionResult, locate_all};
pub use pipeline::{Pipeline, PipelineSummary};
