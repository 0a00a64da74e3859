use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::corpus::{file_name_of, sample_key};
use crate::expression::AcceptedExpressions;
use crate::labels::LabelRecord;

/// An image that survived filtering, with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredSample {
    pub path: PathBuf,
    pub file_name: String,
    pub expression: String,
}

/// Filtered samples in catalog order.
///
/// Paths and labels live in the same entries, so the retained path list and
/// the label map always describe the same samples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredSamples {
    samples: Vec<FilteredSample>,
    pub unlabeled: usize,
    pub excluded: usize,
}

impl FilteredSamples {
    pub fn samples(&self) -> &[FilteredSample] {
        &self.samples
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.samples.iter().map(|sample| sample.path.as_path())
    }

    /// Image file name to expression.
    pub fn label_map(&self) -> BTreeMap<String, String> {
        self.samples
            .iter()
            .map(|sample| (sample.file_name.clone(), sample.expression.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Keeps images whose sample key has a label in `accepted`.
pub fn filter_samples(
    image_paths: &[PathBuf],
    labels: &LabelRecord,
    accepted: &AcceptedExpressions,
) -> FilteredSamples {
    image_paths
        .iter()
        .fold(FilteredSamples::default(), |mut filtered, path| {
            let Some(file_name) = file_name_of(path) else {
                filtered.unlabeled += 1;
                return filtered;
            };
            match labels.get(&sample_key(&file_name)) {
                None => filtered.unlabeled += 1,
                Some(expression) if !accepted.contains(expression) => filtered.excluded += 1,
                Some(expression) => filtered.samples.push(FilteredSample {
                    path: path.clone(),
                    file_name,
                    expression: expression.clone(),
                }),
            }
            filtered
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelRecord {
        [("S005_001", "Happiness"), ("S006_001", "Contempt"), ("S007_002", "Fear")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn keeps_only_accepted_labels_in_input_order() {
        let paths: Vec<PathBuf> = [
            "raw/S007/002/S007_002_00000020.png",
            "raw/S005/001/S005_001_00000009.png",
            "raw/S006/001/S006_001_00000015.png",
            "raw/S008/001/S008_001_00000003.png",
            "raw/S005/001/S005_001_00000010.png",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let filtered = filter_samples(&paths, &labels(), &AcceptedExpressions::ck_plus());

        let kept: Vec<_> = filtered.paths().map(Path::to_path_buf).collect();
        assert_eq!(kept, vec![paths[0].clone(), paths[1].clone(), paths[4].clone()]);
        assert_eq!(filtered.unlabeled, 1);
        assert_eq!(filtered.excluded, 1);

        let map = filtered.label_map();
        assert_eq!(map.len(), filtered.len());
        assert_eq!(map["S007_002_00000020.png"], "Fear");
        assert_eq!(map["S005_001_00000010.png"], "Happiness");
        for sample in filtered.samples() {
            assert_eq!(map[&sample.file_name], sample.expression);
            assert!(AcceptedExpressions::ck_plus().contains(&sample.expression));
        }
    }

    #[test]
    fn custom_accepted_set() {
        let paths = vec![PathBuf::from("S006_001_00000015.png")];
        let accepted = AcceptedExpressions::new(["Contempt"]);
        let filtered = filter_samples(&paths, &labels(), &accepted);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.samples()[0].expression, "Contempt");
    }

    #[test]
    fn empty_input() {
        let filtered = filter_samples(&[], &labels(), &AcceptedExpressions::ck_plus());
        assert!(filtered.is_empty());
        assert!(filtered.label_map().is_empty());
    }
}
