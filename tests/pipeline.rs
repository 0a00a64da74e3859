use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ckplus_prep::checkpoint::load_json;
use ckplus_prep::folds::{test_ids_path, train_ids_path};
use ckplus_prep::{
    BoundingBox, DetectionResult, Face, FaceDetector, Pipeline, PipelineConfig, PrepError,
    SimilarityAligner, SkipReason,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tempfile::tempdir;

/// Reports one face with fixed landmarks in every image.
struct FixedDetector;

impl FaceDetector for FixedDetector {
    fn detect_faces(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<Face>> {
        Ok(vec![Face {
            bbox: BoundingBox {
                x: 8,
                y: 8,
                width: 48,
                height: 48,
                confidence: 0.99,
            },
            landmarks: vec![20.0, 44.0, 32.0, 24.0, 40.0, 24.0, 24.0, 34.0, 46.0, 46.0],
        }])
    }
}

fn write_clip(raw: &Path, subject: &str, clip: &str, frames: usize, label: &str) {
    let image_dir = raw.join("cohn-kanade-images").join(subject).join(clip);
    let label_dir = raw.join("Emotion").join(subject).join(clip);
    fs::create_dir_all(&image_dir).unwrap();
    fs::create_dir_all(&label_dir).unwrap();
    for frame in 1..=frames {
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
            .save(image_dir.join(format!("{subject}_{clip}_{frame:08}.png")))
            .unwrap();
    }
    fs::write(
        label_dir.join(format!("{subject}_{clip}_{frames:08}_emotion.txt")),
        format!("   {label}\n"),
    )
    .unwrap();
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn excluded_subject_never_reaches_the_folds() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("RAW");
    let out = dir.path().join("CKPlus");
    // Happiness is index 5, Contempt index 2
    write_clip(&raw, "S1", "001", 4, "5.0000000e+00");
    write_clip(&raw, "S2", "001", 4, "2.0000000e+00");

    let config = PipelineConfig::new(&raw, &out).with_n_folds(2);
    let mut pipeline = Pipeline::new(
        config,
        Box::new(FixedDetector),
        Box::new(SimilarityAligner::default()),
    );
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.labeled_clips, 2);
    assert_eq!(summary.catalogued_images, 6);
    assert_eq!(summary.filtered_samples, 3);
    assert_eq!(summary.detection.detected, 3);
    assert_eq!(summary.alignment.written, 3);

    let survivors = "S1_001_00000002.png\nS1_001_00000003.png\nS1_001_00000004.png";
    assert_eq!(read(&test_ids_path(&out, 0)), survivors);
    assert_eq!(read(&train_ids_path(&out, 0)), "");
    assert_eq!(read(&test_ids_path(&out, 1)), "");
    assert_eq!(read(&train_ids_path(&out, 1)), survivors);

    let labels: BTreeMap<String, String> = load_json(&out.join("emotion_labels.json")).unwrap();
    assert_eq!(labels.len(), 3);
    assert!(labels.values().all(|label| label == "Happiness"));

    let detections: DetectionResult = load_json(&out.join("bbox_landmark.json")).unwrap();
    assert_eq!(detections.len(), 3);

    for name in survivors.lines() {
        let crop = image::open(out.join("imgs").join(name)).unwrap();
        assert_eq!((crop.width(), crop.height()), (80, 80));
    }
}

#[test]
fn reused_detections_skip_the_detector() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("RAW");
    let out = dir.path().join("CKPlus");
    write_clip(&raw, "S1", "001", 3, "1.0");
    write_clip(&raw, "S2", "002", 3, "7.0");

    let mut first = Pipeline::new(
        PipelineConfig::new(&raw, &out).with_n_folds(2),
        Box::new(FixedDetector),
        Box::new(SimilarityAligner::default()),
    );
    let first_summary = first.run().unwrap();
    let fold_files = |out: &Path| -> Vec<String> {
        (0..2)
            .flat_map(|i| [read(&train_ids_path(out, i)), read(&test_ids_path(out, i))])
            .collect()
    };
    let before = fold_files(&out);

    let mut config = PipelineConfig::new(&raw, &out).with_n_folds(2);
    config.reuse_detections = true;
    let mut second = Pipeline::new(
        config,
        Box::new(FailingDetector),
        Box::new(SimilarityAligner::default()),
    );
    let second_summary = second.run().unwrap();

    assert_eq!(first_summary.alignment.written, 6);
    assert_eq!(second_summary.detection.detected, 6);
    assert_eq!(second_summary.alignment.written, 6);
    assert_eq!(fold_files(&out), before);

    // S2 is relabelled Contempt; its stored detections must not be used
    write_clip(&raw, "S2", "002", 3, "2.0");
    let mut config = PipelineConfig::new(&raw, &out).with_n_folds(2);
    config.reuse_detections = true;
    let mut third = Pipeline::new(
        config,
        Box::new(FailingDetector),
        Box::new(SimilarityAligner::default()),
    );
    let third_summary = third.run().unwrap();

    assert_eq!(third_summary.filtered_samples, 3);
    assert_eq!(third_summary.detection.detected, 3);
    assert!(third_summary.detection.skipped.is_empty());
    assert_eq!(third_summary.alignment.written, 3);
    assert!(fold_files(&out).iter().all(|ids| !ids.contains("S2_")));
    assert_eq!(
        read(&test_ids_path(&out, 0)),
        "S1_001_00000001.png\nS1_001_00000002.png\nS1_001_00000003.png"
    );

    let detections: DetectionResult = load_json(&out.join("bbox_landmark.json")).unwrap();
    assert_eq!(detections.len(), 3);
    assert!(detections.keys().all(|path| !path.contains("S2_")));
}

#[test]
fn reused_detections_fill_in_new_samples() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("RAW");
    let out = dir.path().join("CKPlus");
    write_clip(&raw, "S1", "001", 3, "5.0");

    let mut first = Pipeline::new(
        PipelineConfig::new(&raw, &out).with_n_folds(1),
        Box::new(FixedDetector),
        Box::new(SimilarityAligner::default()),
    );
    first.run().unwrap();

    write_clip(&raw, "S2", "001", 3, "5.0");
    let mut config = PipelineConfig::new(&raw, &out).with_n_folds(1);
    config.reuse_detections = true;
    let mut second = Pipeline::new(
        config,
        Box::new(FixedDetector),
        Box::new(SimilarityAligner::default()),
    );
    let summary = second.run().unwrap();

    assert_eq!(summary.detection.detected, 6);
    assert_eq!(summary.alignment.written, 6);
    let detections: DetectionResult = load_json(&out.join("bbox_landmark.json")).unwrap();
    assert_eq!(detections.len(), 6);
}

#[test]
fn rerun_after_relabelling_drops_stale_crops() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("RAW");
    let out = dir.path().join("CKPlus");
    write_clip(&raw, "S1", "001", 3, "5.0");
    write_clip(&raw, "S2", "001", 3, "5.0");

    let run = || {
        let mut pipeline = Pipeline::new(
            PipelineConfig::new(&raw, &out).with_n_folds(1),
            Box::new(FixedDetector),
            Box::new(SimilarityAligner::default()),
        );
        pipeline.run().unwrap()
    };
    assert_eq!(run().alignment.written, 6);

    write_clip(&raw, "S2", "001", 3, "2.0");
    let summary = run();

    assert_eq!(summary.filtered_samples, 3);
    assert_eq!(summary.alignment.written, 3);
    assert_eq!(
        read(&test_ids_path(&out, 0)),
        "S1_001_00000001.png\nS1_001_00000002.png\nS1_001_00000003.png"
    );
    let mut crops: Vec<String> = fs::read_dir(out.join("imgs"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    crops.sort();
    assert_eq!(
        crops,
        vec![
            "S1_001_00000001.png",
            "S1_001_00000002.png",
            "S1_001_00000003.png"
        ]
    );
}

struct FailingDetector;

impl FaceDetector for FailingDetector {
    fn detect_faces(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<Face>> {
        anyhow::bail!("detector must not run when detections are reused")
    }
}

#[test]
fn missing_corpus_aborts_before_writing() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("RAW");
    let out = dir.path().join("CKPlus");
    fs::create_dir_all(raw.join("cohn-kanade-images")).unwrap();

    let mut pipeline = Pipeline::new(
        PipelineConfig::new(&raw, &out),
        Box::new(FixedDetector),
        Box::new(SimilarityAligner::default()),
    );
    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, PrepError::MissingCorpus { .. }));
    assert!(!out.exists());
}

#[test]
fn unreadable_frames_are_dropped() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("RAW");
    let out = dir.path().join("CKPlus");
    write_clip(&raw, "S1", "001", 3, "5.0");
    fs::write(
        raw.join("cohn-kanade-images/S1/001/S1_001_00000003.png"),
        b"truncated",
    )
    .unwrap();

    let mut pipeline = Pipeline::new(
        PipelineConfig::new(&raw, &out).with_n_folds(1),
        Box::new(FixedDetector),
        Box::new(SimilarityAligner::default()),
    );
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.filtered_samples, 3);
    assert_eq!(summary.detection.detected, 2);
    assert_eq!(
        summary.detection.skipped.count(SkipReason::UnreadableImage),
        1
    );
    assert_eq!(
        read(&test_ids_path(&out, 0)),
        "S1_001_00000001.png\nS1_001_00000002.png"
    );
    assert_eq!(read(&train_ids_path(&out, 0)), "");
}
