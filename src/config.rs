use crate::cli::Args;
use crate::stretch::{CutoffPair, LuminanceMode};
use std::path::{Path, PathBuf};

/// Folder, next to the inputs, that receives reports and moved originals
pub const DEFAULT_OUTPUT_DIR: &str = "Adjusted";

/// Analysis and adjustment settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct Config {
    pub luminance: LuminanceMode,
    pub cutoffs: Vec<CutoffPair>,
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            luminance: LuminanceMode::default(),
            cutoffs: default_cutoffs(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            luminance: args.luminance,
            cutoffs: if args.cutoffs.is_empty() {
                default_cutoffs()
            } else {
                args.cutoffs.clone()
            },
            output_dir: args.output_dir.clone(),
        }
    }
}

impl Config {
    /// Output folder beside `path`
    pub fn output_dir_for(&self, path: &Path) -> PathBuf {
        parent_dir(path).join(&self.output_dir)
    }
}

/// 0% and 1% on both ends
pub fn default_cutoffs() -> Vec<CutoffPair> {
    vec![CutoffPair::symmetric(0.0), CutoffPair::symmetric(1.0)]
}

/// Directory containing `path`, `.` for bare file names
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
