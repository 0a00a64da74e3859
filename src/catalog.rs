use std::path::{Path, PathBuf};

use log::debug;

use crate::corpus::{clip_dirs, files_with_extension};

/// Frames kept from the end of each clip.
pub const APEX_WINDOW: usize = 3;

/// Last `window` frames of a clip whose frames are already sorted by name.
pub fn apex_frames(mut frames: Vec<PathBuf>, window: usize) -> Vec<PathBuf> {
    let start = frames.len().saturating_sub(window);
    frames.split_off(start)
}

/// Apex frames of every `<subject>/<clip>/*.png` clip under `image_root`,
/// concatenated in clip order.
pub fn build_image_catalog(image_root: &Path, window: usize) -> Vec<PathBuf> {
    clip_dirs(image_root)
        .iter()
        .fold(Vec::new(), |mut catalog, clip| {
            let frames = files_with_extension(clip, "png");
            debug!("{:?}: {} frames", clip, frames.len());
            catalog.extend(apex_frames(frames, window));
            catalog
        })
}
