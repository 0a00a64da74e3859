//! JSON checkpoints written between stages.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{PrepError, Result};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes `value` to `path`, replacing any previous checkpoint only once
/// the new one is fully written.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
            PrepError::Checkpoint {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    info!("Saved to {:?}", path);
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| PrepError::Checkpoint {
        path: path.to_path_buf(),
        source,
    })
}
