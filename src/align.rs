use std::fs;
use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use log::{debug, info, warn};

use crate::corpus::{file_name_of, files_with_extension};
use crate::detector::BoundingBox;
use crate::error::{SkipReason, SkipTally};
use crate::geometry::{Point, SimilarityTransform2D, find_similarity_transform};
use crate::locate::DetectionResult;

/// Side length of the aligned crop in pixels.
pub const CROP_SIZE: u32 = 80;

/// Reference positions of the five landmarks in a 112x112 crop
/// (left eye, right eye, nose tip, left and right mouth corner).
const REFERENCE_112: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Canonical-pose cropper.
pub trait FaceAligner {
    fn align(&self, image: &DynamicImage, landmarks: &[Point; 5], size: u32) -> Result<RgbImage>;
}

/// Pairs a `[x0..x4, y0..y4]` landmark array into `(x_i, y_i)` points.
///
/// Returns `None` when fewer than five pairs can be formed.
pub fn landmark_pairs(raw: &[f32]) -> Option<[Point; 5]> {
    let mut points = [Point::new(0.0, 0.0); 5];
    for (i, point) in points.iter_mut().enumerate() {
        *point = Point::new(*raw.get(i)?, *raw.get(i + 5)?);
    }
    Some(points)
}

/// Warps the face so its landmarks land on a fixed template, using a
/// least-squares similarity transform and bilinear sampling.
#[derive(Debug, Clone)]
pub struct SimilarityAligner {
    template: [Point; 5],
    template_size: f32,
}

impl Default for SimilarityAligner {
    fn default() -> Self {
        Self {
            template: REFERENCE_112.map(|(x, y)| Point::new(x, y)),
            template_size: 112.0,
        }
    }
}

impl SimilarityAligner {
    /// Template points for a `size` x `size` crop.
    pub fn template_for(&self, size: u32) -> [Point; 5] {
        let scale = size as f32 / self.template_size;
        self.template.map(|p| Point::new(p.x * scale, p.y * scale))
    }
}

impl FaceAligner for SimilarityAligner {
    fn align(&self, image: &DynamicImage, landmarks: &[Point; 5], size: u32) -> Result<RgbImage> {
        let template = self.template_for(size);
        // Maps crop coordinates back into the source image
        let to_source = find_similarity_transform(&template, landmarks)
            .ok_or_else(|| anyhow::anyhow!("landmarks are degenerate: {:?}", landmarks))?;

        let source = image.to_rgb8();
        Ok(warp(&source, &to_source, size))
    }
}

fn warp(source: &RgbImage, to_source: &SimilarityTransform2D, size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |u, v| {
        let p = to_source.apply(Point::new(u as f32, v as f32));
        sample_bilinear(source, p.x, p.y)
    })
}

fn pixel_or_black(image: &RgbImage, x: i64, y: i64) -> [f32; 3] {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return [0.0; 3];
    }
    let Rgb(px) = *image.get_pixel(x as u32, y as u32);
    px.map(f32::from)
}

/// Sample a pixel with bilinear interpolation; outside the image is black.
fn sample_bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    if !x.is_finite() || !y.is_finite() {
        return Rgb([0, 0, 0]);
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = pixel_or_black(image, x0, y0);
    let p10 = pixel_or_black(image, x0 + 1, y0);
    let p01 = pixel_or_black(image, x0, y0 + 1);
    let p11 = pixel_or_black(image, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Removes the `.png` crops already in `out_dir`, so the directory holds
/// only what the current run aligns. Returns how many were removed.
pub fn clear_aligned(out_dir: &Path) -> std::io::Result<usize> {
    let stale = files_with_extension(out_dir, "png");
    for path in &stale {
        fs::remove_file(path)?;
    }
    Ok(stale.len())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    pub written: usize,
    pub skipped: SkipTally,
}

/// Aligns every detection, in path order, into `out_dir/<source file name>`.
///
/// Only the first face of each image is used. Samples that cannot be
/// aligned get no output file.
pub fn align_all(
    detections: &DetectionResult,
    out_dir: &Path,
    aligner: &dyn FaceAligner,
    size: u32,
) -> AlignmentReport {
    let mut report = AlignmentReport::default();

    for (idx, (source, entry)) in detections.iter().enumerate() {
        let source = Path::new(source);
        match align_one(source, entry.parts(), out_dir, aligner, size, idx) {
            Ok(()) => report.written += 1,
            Err(reason) => report.skipped.record(reason),
        }
    }

    info!(
        "Aligned {} faces into {:?} (skipped: {})",
        report.written, out_dir, report.skipped
    );
    report
}

fn align_one(
    source: &Path,
    parts: Option<(&[BoundingBox], &[Vec<f32>])>,
    out_dir: &Path,
    aligner: &dyn FaceAligner,
    size: u32,
    counter: usize,
) -> Result<(), SkipReason> {
    let Some((_bboxes, landmarks)) = parts else {
        warn!("Skipping {:?}: detection entry is incomplete", source);
        return Err(SkipReason::MalformedDetection);
    };
    let Some(file_name) = file_name_of(source) else {
        warn!("Skipping {:?}: no file name", source);
        return Err(SkipReason::MalformedDetection);
    };
    debug!("{:03} {:?}", counter, source);

    let Some(points) = landmarks.first().and_then(|raw| landmark_pairs(raw)) else {
        warn!("Skipping {:?}: fewer than five landmark pairs", source);
        return Err(SkipReason::PartialLandmarks);
    };

    let image = image::open(source).map_err(|err| {
        warn!("Failed to open image {:?}: {}", source, err);
        SkipReason::UnreadableImage
    })?;

    let aligned = aligner.align(&image, &points, size).map_err(|err| {
        warn!("Failed to align {:?}: {:#}", source, err);
        SkipReason::DegenerateLandmarks
    })?;

    let output_path = out_dir.join(file_name);
    aligned.save(&output_path).map_err(|err| {
        warn!("Failed to save aligned face to {:?}: {}", output_path, err);
        SkipReason::WriteFailed
    })?;

    Ok(())
}
