//! Face detection over the filtered samples.
//!
//! The result is the detection checkpoint: alignment only ever reads this map,
//! never the detector, so it can be reloaded instead of detecting again.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::detector::{BoundingBox, Face, FaceDetector};
use crate::error::{SkipReason, SkipTally};

/// Boxes and landmark sets reported for one image, in detector order.
///
/// Both fields are optional so a hand-edited or truncated checkpoint still
/// loads; alignment treats a missing half as a malformed entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bboxes: Option<Vec<BoundingBox>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<Vec<f32>>>,
}

impl DetectionEntry {
    pub fn from_faces(faces: &[Face]) -> Self {
        Self {
            bboxes: Some(faces.iter().map(|face| face.bbox).collect()),
            landmarks: Some(faces.iter().map(|face| face.landmarks.clone()).collect()),
        }
    }

    pub fn parts(&self) -> Option<(&[BoundingBox], &[Vec<f32>])> {
        match (&self.bboxes, &self.landmarks) {
            (Some(bboxes), Some(landmarks)) => Some((bboxes, landmarks)),
            _ => None,
        }
    }
}

/// Source image path to detection entry, ordered by path.
pub type DetectionResult = BTreeMap<String, DetectionEntry>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    pub detected: usize,
    pub skipped: SkipTally,
}

/// Decodes `path` as RGB and runs the detector on it.
pub fn locate(path: &Path, detector: &mut dyn FaceDetector) -> Result<Vec<Face>, SkipReason> {
    let image = match image::open(path) {
        Ok(image) => image::DynamicImage::ImageRgb8(image.to_rgb8()),
        Err(err) => {
            warn!("Failed to open image {:?}: {}", path, err);
            return Err(SkipReason::UnreadableImage);
        }
    };

    match detector.detect_faces(&image) {
        Ok(faces) if faces.is_empty() => {
            warn!("No face found in {:?}", path);
            Err(SkipReason::NoFaceDetected)
        }
        Ok(faces) => Ok(faces),
        Err(err) => {
            warn!("Face detector failed on {:?}: {:#}", path, err);
            Err(SkipReason::DetectorFailed)
        }
    }
}

/// Runs [`locate`] over `paths` in order. Failed images are left out of the result.
pub fn locate_all<'a, I>(paths: I, detector: &mut dyn FaceDetector) -> (DetectionResult, DetectionReport)
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut result = DetectionResult::new();
    let mut report = DetectionReport::default();

    for (idx, path) in paths.into_iter().enumerate() {
        debug!("{:03} {:?}", idx, path);
        match locate(path, detector) {
            Ok(faces) => {
                result.insert(
                    path.to_string_lossy().into_owned(),
                    DetectionEntry::from_faces(&faces),
                );
                report.detected += 1;
            }
            Err(reason) => report.skipped.record(reason),
        }
        if (idx + 1) % 100 == 0 {
            info!("Detected faces in {}/{} images so far", report.detected, idx + 1);
        }
    }

    (result, report)
}
