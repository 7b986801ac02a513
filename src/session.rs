//! Adjustment sessions
//!
//! Applying a range writes `<stem>-Adjusted.<ext>` next to each original and
//! moves the original into the output folder. A session is then either
//! finished (a log of what was produced is written) or reverted (adjusted
//! files are deleted and originals put back). The session is persisted as a
//! JSON manifest so both steps can happen in a later invocation.

use crate::analysis::sorted_ignore_case;
use crate::codec;
use crate::config::Config;
use crate::error::AdjustError;
use crate::report::utc_stamp;
use crate::stretch::{ContrastLimits, LookupTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths touched for one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Where the image was before the session
    pub original: PathBuf,
    /// Where the untouched original now lives
    pub moved_to: PathBuf,
    /// The stretched copy
    pub adjusted: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub limits: ContrastLimits,
    /// Output folder next to the first input, home of logs and manifests
    pub work_dir: PathBuf,
    pub entries: Vec<SessionEntry>,
}

impl Session {
    /// Stretch every image with `limits`
    ///
    /// On failure, images already handled are restored before the error is
    /// returned.
    pub fn apply(paths: &[PathBuf], limits: ContrastLimits, config: &Config) -> Result<Self, AdjustError> {
        let first = paths
            .first()
            .ok_or_else(|| AdjustError::InvalidRequest("no images given".to_string()))?;

        let table = LookupTable::from_limits(limits);
        let mut session = Self {
            limits,
            work_dir: config.output_dir_for(first),
            entries: Vec::with_capacity(paths.len()),
        };

        tracing::info!("Applying limits {} to {} image(s)", limits, paths.len());

        for path in sorted_ignore_case(paths) {
            match adjust_one(&path, &table, config) {
                Ok(entry) => session.entries.push(entry),
                Err(e) => {
                    tracing::warn!("Adjusting {} failed, restoring earlier images", path.display());
                    if let Err(revert_err) = session.revert() {
                        tracing::warn!("Restore after failure was incomplete: {}", revert_err);
                    }
                    return Err(e);
                }
            }
        }

        Ok(session)
    }

    /// Write the session manifest into the work folder
    pub fn save_manifest(&self) -> Result<PathBuf, AdjustError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| AdjustError::io(&self.work_dir, e))?;
        let path = self.work_dir.join(format!("Session-{}.json", utc_stamp()));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AdjustError::Internal(format!("Failed to serialize session: {}", e)))?;
        fs::write(&path, json).map_err(|e| AdjustError::io(&path, e))?;
        tracing::info!("Session manifest saved to: {}", path.display());
        Ok(path)
    }

    pub fn load_manifest(path: &Path) -> Result<Self, AdjustError> {
        let json = fs::read_to_string(path).map_err(|e| AdjustError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| AdjustError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn discard_manifest(path: &Path) -> Result<(), AdjustError> {
        fs::remove_file(path).map_err(|e| AdjustError::io(path, e))
    }

    /// Accept the session and write the adjustment log, returning its path
    pub fn finish(&self) -> Result<PathBuf, AdjustError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| AdjustError::io(&self.work_dir, e))?;
        let path = self.work_dir.join(format!("Adjusted-{}.txt", utc_stamp()));
        fs::write(&path, self.log()).map_err(|e| AdjustError::io(&path, e))?;
        tracing::info!("Adjustment info saved to: {}", path.display());
        Ok(path)
    }

    /// Text of the adjustment log
    pub fn log(&self) -> String {
        let mut log = format!(
            "Min Value: {}\nMax Value: {}\n\n",
            self.limits.min, self.limits.max
        );
        for entry in &self.entries {
            log.push_str(&format!(
                "{} => {}\n",
                entry.original.display(),
                entry.adjusted.display()
            ));
        }
        log
    }

    /// Delete the adjusted copies and put the originals back
    ///
    /// Entries restored by an earlier, interrupted revert are skipped, so a
    /// revert that stopped on a blocked path can be run again.
    pub fn revert(&self) -> Result<(), AdjustError> {
        for entry in &self.entries {
            if entry.original.exists() {
                if !entry.moved_to.exists() {
                    tracing::debug!("Already restored: {}", entry.original.display());
                    continue;
                }
                return Err(AdjustError::ProcessingError(format!(
                    "Cannot restore {}: a file with that name exists",
                    entry.original.display()
                )));
            }

            if entry.adjusted.exists() {
                fs::remove_file(&entry.adjusted).map_err(|e| AdjustError::io(&entry.adjusted, e))?;
                tracing::info!("Adjusted image deleted: {}", entry.adjusted.display());
            } else {
                tracing::warn!("Adjusted image already gone: {}", entry.adjusted.display());
            }

            fs::rename(&entry.moved_to, &entry.original)
                .map_err(|e| AdjustError::io(&entry.moved_to, e))?;
            tracing::info!("Original image restored: {}", entry.original.display());
        }
        Ok(())
    }
}

/// `<stem>-Adjusted.<ext>` beside the original
pub fn adjusted_path(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match original.extension() {
        Some(ext) => format!("{}-Adjusted.{}", stem, ext.to_string_lossy()),
        None => format!("{}-Adjusted", stem),
    };
    original.with_file_name(name)
}

fn adjust_one(path: &Path, table: &LookupTable, config: &Config) -> Result<SessionEntry, AdjustError> {
    let mut image = codec::load(path)?;
    codec::apply_lut(&mut image, table)?;

    let moved_dir = config.output_dir_for(path);
    let file_name = path.file_name().ok_or_else(|| AdjustError::InvalidImage {
        path: path.to_path_buf(),
        reason: "path has no file name".to_string(),
    })?;
    let moved_to = moved_dir.join(file_name);
    if moved_to.exists() {
        return Err(AdjustError::ProcessingError(format!(
            "{} already exists; finish or revert the earlier session first",
            moved_to.display()
        )));
    }

    let adjusted = adjusted_path(path);
    codec::save(&image, &adjusted)?;
    tracing::info!("Adjusted image saved to: {}", adjusted.display());

    fs::create_dir_all(&moved_dir).map_err(|e| AdjustError::io(&moved_dir, e))?;
    if let Err(e) = fs::rename(path, &moved_to) {
        discard_adjusted(&adjusted);
        return Err(AdjustError::io(path, e));
    }
    tracing::info!("Original image moved to: {}", moved_to.display());

    Ok(SessionEntry {
        original: path.to_path_buf(),
        moved_to,
        adjusted,
    })
}

/// Remove an adjusted copy whose original could not be moved aside
///
/// The move error is what gets reported, so a failed removal is only logged.
fn discard_adjusted(adjusted: &Path) -> bool {
    match fs::remove_file(adjusted) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Could not remove {} after failed move: {}",
                adjusted.display(),
                e
            );
            false
        }
    }
}
