use anyhow::{Context, Result};
use image::DynamicImage;
use log::info;
use rustface::{Detector, ImageData};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the SeetaFace model is looked for (and downloaded to) by default
pub const DEFAULT_MODEL_PATH: &str = "model/seeta_fd_frontal_v1.0.bin";

/// Represents a detected face with bounding box and confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,      // Left coordinate
    pub y: i32,      // Top coordinate
    pub width: i32,  // Width of bounding box
    pub height: i32, // Height of bounding box
    pub confidence: f32,
}

/// A detected face. `landmarks` holds five x coordinates followed by five
/// y coordinates: left eye, right eye, nose tip, left and right mouth corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub bbox: BoundingBox,
    pub landmarks: Vec<f32>,
}

/// Trait for face detector implementations
pub trait FaceDetector {
    /// Detect faces in an image
    fn detect_faces(&mut self, image: &DynamicImage) -> Result<Vec<Face>>;

    /// Optional method to set detector-specific parameters
    fn set_params(&mut self, _params: &str) -> Result<()> {
        Ok(())
    }
}

/// Landmark positions as fractions of the face box, same order as [`Face::landmarks`].
const BOX_TEMPLATE: [(f32, f32); 5] = [
    (0.30, 0.38),
    (0.70, 0.38),
    (0.50, 0.58),
    (0.35, 0.78),
    (0.65, 0.78),
];

/// Places the five landmarks of a frontal face inside `bbox`.
pub fn template_landmarks(bbox: &BoundingBox) -> Vec<f32> {
    let xs = BOX_TEMPLATE
        .iter()
        .map(|(fx, _)| bbox.x as f32 + fx * bbox.width as f32);
    let ys = BOX_TEMPLATE
        .iter()
        .map(|(_, fy)| bbox.y as f32 + fy * bbox.height as f32);
    xs.chain(ys).collect()
}

/// RustFace (SeetaFace) detector implementation.
///
/// SeetaFace reports boxes only; landmarks come from [`template_landmarks`],
/// so alignment with this detector is a box crop. Landmark-accurate
/// alignment needs a [`FaceDetector`] that reports real landmarks.
pub struct RustFaceDetector {
    detector: Box<dyn Detector>,
    threshold: f32,
}

impl RustFaceDetector {
    pub fn new(model_path: &Path, threshold: f32) -> Result<Self> {
        if !model_path.exists() {
            download_model(model_path)?;
        } else {
            info!("Model already exists at: {:?}", model_path);
        }

        let path = model_path
            .to_str()
            .with_context(|| format!("Model path is not valid UTF-8: {:?}", model_path))?;
        let detector = rustface::create_detector(path).context("Failed to create face detector")?;

        Ok(Self {
            detector,
            threshold,
        })
    }
}

fn download_model(model_path: &Path) -> Result<()> {
    info!("Downloading face detection model...");

    if let Some(parent) = model_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Try multiple URLs for the model
    let model_urls = [
        "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin",
        "https://raw.githubusercontent.com/atomashpolskiy/rustface/master/model/seeta_fd_frontal_v1.0.bin",
    ];

    let mut last_error = None;

    for url in &model_urls {
        info!("Trying to download from: {}", url);

        match ureq::get(url).call() {
            Ok(response) => {
                let mut reader = response.into_reader();
                let mut file = std::fs::File::create(model_path)?;
                std::io::copy(&mut reader, &mut file)?;
                info!("Model downloaded successfully from {}", url);
                return Ok(());
            }
            Err(err) => {
                info!("Failed to download from {}: {}", url, err);
                last_error = Some(err);
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to download model from all sources. Last error: {:?}\n\
        Please download the model manually from:\n\
        https://github.com/atomashpolskiy/rustface/tree/master/model\n\
        and place it at: {:?}",
        last_error,
        model_path
    ))
}

impl FaceDetector for RustFaceDetector {
    fn detect_faces(&mut self, image: &DynamicImage) -> Result<Vec<Face>> {
        let gray_image = image.to_luma8();

        // Convert to rustface ImageData format
        let (width, height) = gray_image.dimensions();
        let mut image_data = ImageData::new(gray_image.as_raw(), width, height);

        let faces = self.detector.detect(&mut image_data);

        // Strongest face first; the pipeline only consumes the first one
        let mut result: Vec<Face> = faces
            .iter()
            .filter(|face| face.score() >= f64::from(self.threshold))
            .map(|face| {
                let bbox = face.bbox();
                let bbox = BoundingBox {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width() as i32,
                    height: bbox.height() as i32,
                    confidence: face.score() as f32,
                };
                Face {
                    landmarks: template_landmarks(&bbox),
                    bbox,
                }
            })
            .collect();
        result.sort_by(|a, b| b.bbox.confidence.total_cmp(&a.bbox.confidence));

        Ok(result)
    }

    /// Accepts a comma separated `key=value` list, e.g. `min_face_size=40,score_thresh=2.0`.
    fn set_params(&mut self, params: &str) -> Result<()> {
        for pair in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected key=value, got {:?}", pair))?;
            let value = value.trim();
            match key.trim() {
                "min_face_size" => self.detector.set_min_face_size(value.parse()?),
                "score_thresh" => self.detector.set_score_thresh(value.parse()?),
                "pyramid_scale_factor" => self.detector.set_pyramid_scale_factor(value.parse()?),
                "slide_window_step" => {
                    let step: u32 = value.parse()?;
                    self.detector.set_slide_window_step(step, step);
                }
                "threshold" => self.threshold = value.parse()?,
                other => return Err(anyhow::anyhow!("Unknown detector parameter: {}", other)),
            }
        }
        Ok(())
    }
}

// Factory function to create detectors by name
pub fn create_detector(
    name: &str,
    model_path: Option<PathBuf>,
    threshold: f32,
) -> Result<Box<dyn FaceDetector>> {
    match name.to_lowercase().as_str() {
        "rustface" => {
            let model_path = model_path.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
            Ok(Box::new(RustFaceDetector::new(&model_path, threshold)?))
        }
        // Add other detectors here as needed
        _ => Err(anyhow::anyhow!("Unknown detector: {}", name)),
    }
}
