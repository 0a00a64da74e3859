//! Sample identifiers and the `subject/clip/file` corpus layout.

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

/// Joins label and image records: the first two `_`-separated components
/// of a file name (subject id and clip id).
///
/// `S005_001_00000011_emotion.txt` and `S005_001_00000011.png` both map to
/// `S005_001`.
pub fn sample_key(file_name: &str) -> String {
    file_name.split('_').take(2).collect::<Vec<_>>().join("_")
}

/// Subject id: the first `_`-separated component of a file name.
pub fn subject_id(file_name: &str) -> &str {
    file_name.split('_').next().unwrap_or(file_name)
}

pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Clip directories (`root/<subject>/<clip>`), sorted by subject then clip.
pub fn clip_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable corpus entry under {:?}: {}", root, err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

/// Files directly inside `dir` with the given extension, sorted by file name.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir, err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), extension))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn label_and_image_names_share_a_key() {
        let label = "S005_001_00000011_emotion.txt";
        let image = "S005_001_00000011.png";
        let onset = "S005_001_00000001.png";
        assert_eq!(sample_key(label), "S005_001");
        assert_eq!(sample_key(label), sample_key(image));
        assert_eq!(sample_key(image), sample_key(onset));
        assert_ne!(sample_key("S005_002_00000001.png"), sample_key(image));
    }

    #[test]
    fn short_names_keep_what_they_have() {
        assert_eq!(sample_key("S005.png"), "S005.png");
        assert_eq!(sample_key("S005_001"), "S005_001");
        assert_eq!(subject_id("S005_001_00000011.png"), "S005");
        assert_eq!(subject_id("plain.png"), "plain.png");
    }

    #[test]
    fn walks_two_levels_in_sorted_order() {
        let dir = tempdir().unwrap();
        for clip in ["S010/002", "S010/001", "S005/001"] {
            fs::create_dir_all(dir.path().join(clip)).unwrap();
        }
        fs::write(dir.path().join("S005/stray.txt"), "x").unwrap();

        let clips = clip_dirs(dir.path());
        let rel: Vec<_> = clips
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("S005/001"),
                PathBuf::from("S010/001"),
                PathBuf::from("S010/002"),
            ]
        );
    }

    #[test]
    fn filters_by_extension() {
        let dir = tempdir().unwrap();
        for name in ["b.png", "a.PNG", "c.txt", ".DS_Store"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<_> = files_with_extension(dir.path(), "png")
            .iter()
            .filter_map(|p| file_name_of(p))
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png"]);
    }
}
