use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures. Anything that only affects one sample is a [`SkipReason`] instead.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("missing corpus directory {path:?}: {hint}")]
    MissingCorpus { path: PathBuf, hint: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint {path:?} could not be read or written: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, PrepError>;

/// Why a sample dropped out of a per-sample stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    UnreadableImage,
    NoFaceDetected,
    DetectorFailed,
    MalformedDetection,
    PartialLandmarks,
    DegenerateLandmarks,
    WriteFailed,
    IntegrityMismatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::UnreadableImage => "unreadable image",
            SkipReason::NoFaceDetected => "no face detected",
            SkipReason::DetectorFailed => "detector failed",
            SkipReason::MalformedDetection => "malformed detection",
            SkipReason::PartialLandmarks => "partial landmarks",
            SkipReason::DegenerateLandmarks => "degenerate landmarks",
            SkipReason::WriteFailed => "write failed",
            SkipReason::IntegrityMismatch => "no reference record",
        };
        f.write_str(text)
    }
}

/// Per-reason skip counts for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipTally {
    counts: BTreeMap<SkipReason, usize>,
}

impl SkipTally {
    pub fn record(&mut self, reason: SkipReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for SkipTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return f.write_str("none");
        }
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(reason, count)| format!("{reason}={count}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
