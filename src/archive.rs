use std::fs::File;
use std::path::Path;

use log::info;

use crate::error::Result;

/// Extracts `archive_name` from `raw_dir` when `dir_name` is not there yet.
///
/// Returns whether anything was extracted.
pub fn ensure_extracted(raw_dir: &Path, dir_name: &str, archive_name: &str) -> Result<bool> {
    if raw_dir.join(dir_name).is_dir() {
        return Ok(false);
    }
    let archive_path = raw_dir.join(archive_name);
    if !archive_path.is_file() {
        return Ok(false);
    }

    info!("Extracting {:?} into {:?}", archive_path, raw_dir);
    let mut archive = zip::ZipArchive::new(File::open(&archive_path)?)?;
    archive.extract(raw_dir)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_missing_directory() {
        let dir = tempdir().unwrap();
        write_archive(
            &dir.path().join("Emotion_labels.zip"),
            &[("Emotion/S005/001/S005_001_00000011_emotion.txt", "3.0")],
        );

        assert!(ensure_extracted(dir.path(), "Emotion", "Emotion_labels.zip").unwrap());
        let label = dir.path().join("Emotion/S005/001/S005_001_00000011_emotion.txt");
        assert_eq!(std::fs::read_to_string(label).unwrap(), "3.0");

        // Second call finds the directory
        assert!(!ensure_extracted(dir.path(), "Emotion", "Emotion_labels.zip").unwrap());
    }

    #[test]
    fn missing_archive_is_not_an_error() {
        let dir = tempdir().unwrap();
        assert!(!ensure_extracted(dir.path(), "cohn-kanade-images", "cohn-kanade-images.zip").unwrap());
    }
}
