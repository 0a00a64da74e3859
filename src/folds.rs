//! Subject-independent cross-validation folds over the aligned images.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::corpus::{file_name_of, files_with_extension, subject_id};
use crate::error::{PrepError, Result, SkipReason, SkipTally};

/// Answers whether an image id has a record in some external reference.
pub trait ReferenceSet {
    fn contains(&self, id: &str) -> bool;
}

impl ReferenceSet for HashSet<String> {
    fn contains(&self, id: &str) -> bool {
        HashSet::contains(self, id)
    }
}

impl ReferenceSet for BTreeSet<String> {
    fn contains(&self, id: &str) -> bool {
        BTreeSet::contains(self, id)
    }
}

/// Reads reference ids, one per line; blank lines are ignored.
pub fn load_reference_ids(path: &Path) -> Result<BTreeSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// One held-out fold: its subjects are the test set, everyone else trains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAssignment {
    pub index: usize,
    pub train_subjects: Vec<String>,
    pub test_subjects: Vec<String>,
    pub train_ids: Vec<String>,
    pub test_ids: Vec<String>,
}

impl FoldAssignment {
    pub fn total(&self) -> usize {
        self.train_ids.len() + self.test_ids.len()
    }
}

/// Subject slice of each fold: `[round(d*i), round(d*(i+1)))` with
/// `d = subjects / n_folds`, rounding half away from zero.
///
/// Ties are not rounded to even: 5 subjects in 2 folds split as `0..3, 3..5`,
/// and a single subject in 2 folds lands in fold 0.
pub fn fold_ranges(subject_count: usize, n_folds: usize) -> Vec<Range<usize>> {
    if n_folds == 0 {
        return Vec::new();
    }
    let division = subject_count as f64 / n_folds as f64;
    let boundary = |i: usize| ((division * i as f64).round() as usize).min(subject_count);
    (0..n_folds).map(|i| boundary(i)..boundary(i + 1)).collect()
}

/// Groups image names by subject id; names within a subject keep their order.
pub fn group_by_subject<I>(names: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .fold(BTreeMap::new(), |mut groups: BTreeMap<String, Vec<String>>, name| {
            groups
                .entry(subject_id(&name).to_string())
                .or_default()
                .push(name);
            groups
        })
}

/// Builds `n_folds` assignments over `groups` (subject to image names).
pub fn assign_folds(
    groups: &BTreeMap<String, Vec<String>>,
    n_folds: usize,
) -> Result<Vec<FoldAssignment>> {
    if n_folds == 0 {
        return Err(PrepError::Configuration(
            "number of folds must be at least 1".to_string(),
        ));
    }
    let subjects: Vec<&String> = groups.keys().collect();
    if n_folds > subjects.len() {
        warn!(
            "{} folds requested for {} subjects; some folds will have no test subjects",
            n_folds,
            subjects.len()
        );
    }

    let folds = fold_ranges(subjects.len(), n_folds)
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            let held_out: BTreeSet<&String> = subjects[range].iter().copied().collect();
            let mut fold = FoldAssignment {
                index,
                train_subjects: Vec::new(),
                test_subjects: Vec::new(),
                train_ids: Vec::new(),
                test_ids: Vec::new(),
            };
            for (subject, names) in groups {
                if held_out.contains(subject) {
                    fold.test_subjects.push(subject.clone());
                    fold.test_ids.extend(names.iter().cloned());
                } else {
                    fold.train_subjects.push(subject.clone());
                    fold.train_ids.extend(names.iter().cloned());
                }
            }
            fold.train_ids.sort();
            fold.test_ids.sort();
            fold
        })
        .collect();
    Ok(folds)
}

/// Sorted file names of the aligned `.png` images in `aligned_dir`.
pub fn list_aligned_images(aligned_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = files_with_extension(aligned_dir, "png")
        .iter()
        .filter_map(|path| file_name_of(path))
        .collect();
    names.sort();
    names
}

/// Splits the aligned images into folds, dropping images the optional
/// reference does not know about.
pub fn split_folds(
    aligned_dir: &Path,
    n_folds: usize,
    reference: Option<&dyn ReferenceSet>,
) -> Result<(Vec<FoldAssignment>, SkipTally)> {
    let mut skipped = SkipTally::default();
    let names = list_aligned_images(aligned_dir)
        .into_iter()
        .filter(|name| match reference {
            Some(reference) if !reference.contains(name) => {
                warn!("Cannot find reference record of {}", name);
                skipped.record(SkipReason::IntegrityMismatch);
                false
            }
            _ => true,
        });
    let groups = group_by_subject(names);
    let folds = assign_folds(&groups, n_folds)?;

    for fold in &folds {
        if fold.test_subjects.is_empty() {
            warn!("Fold {} has no test subjects", fold.index);
        }
        info!(
            "[Fold {}] Split {} samples. Train: {} subjects, {} samples; Test: {} subjects, {} samples",
            fold.index,
            fold.total(),
            fold.train_subjects.len(),
            fold.train_ids.len(),
            fold.test_subjects.len(),
            fold.test_ids.len()
        );
    }
    Ok((folds, skipped))
}

pub fn train_ids_path(out_root: &Path, index: usize) -> PathBuf {
    out_root.join(format!("train_ids_{index}.csv"))
}

pub fn test_ids_path(out_root: &Path, index: usize) -> PathBuf {
    out_root.join(format!("test_ids_{index}.csv"))
}

/// Writes `train_ids_<i>.csv` and `test_ids_<i>.csv`: one name per line, no header.
pub fn write_fold_files(out_root: &Path, folds: &[FoldAssignment]) -> Result<()> {
    for fold in folds {
        fs::write(train_ids_path(out_root, fold.index), fold.train_ids.join("\n"))?;
        fs::write(test_ids_path(out_root, fold.index), fold.test_ids.join("\n"))?;
    }
    Ok(())
}
