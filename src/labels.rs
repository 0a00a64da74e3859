use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::corpus::{clip_dirs, file_name_of, files_with_extension, sample_key};
use crate::expression::Vocabulary;

/// Sample key (subject + clip) to expression name.
pub type LabelRecord = BTreeMap<String, String>;

/// Reads every `<subject>/<clip>/*.txt` label file under `label_root`.
///
/// A clip without label files contributes nothing. A label file that is
/// empty, unreadable or outside the vocabulary is logged and skipped. When
/// several files share a key the last one read wins.
pub fn build_label_record(label_root: &Path, vocabulary: &Vocabulary) -> LabelRecord {
    clip_dirs(label_root)
        .iter()
        .flat_map(|clip| files_with_extension(clip, "txt"))
        .fold(LabelRecord::new(), |mut record, path| {
            let Some(file_name) = file_name_of(&path) else {
                return record;
            };
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!("Failed to read label file {:?}: {}", path, err);
                    return record;
                }
            };
            let first_line = content.lines().next().unwrap_or("");
            match vocabulary.name_for_code(first_line) {
                Some(expression) => {
                    debug!("{} -> {}", file_name, expression);
                    record.insert(sample_key(&file_name), expression.to_string());
                }
                None => warn!(
                    "Ignoring label file {:?}: {:?} is not a valid expression code",
                    path,
                    first_line.trim()
                ),
            }
            record
        })
}
