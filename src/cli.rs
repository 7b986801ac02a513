//! Command-line interface definition

use crate::config;
use crate::stretch::{CutoffPair, LuminanceMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "image-adjuster")]
#[command(about = "Suggest and apply luminance contrast stretching for batches of images")]
#[command(version)]
pub struct Args {
    /// How pixel luminance is bucketed
    #[arg(long, value_enum, env = "IMAGE_ADJUSTER_LUMINANCE", default_value = "byte", global = true)]
    pub luminance: LuminanceMode,

    /// Cutoff percentages to analyze, `P` for both ends or `LOWER:UPPER`
    /// ("off" or a negative value disables one end)
    #[arg(
        long = "cutoff",
        env = "IMAGE_ADJUSTER_CUTOFFS",
        value_delimiter = ',',
        global = true
    )]
    pub cutoffs: Vec<CutoffPair>,

    /// Folder created next to the images for reports and moved originals
    #[arg(long, default_value = config::DEFAULT_OUTPUT_DIR, global = true)]
    pub output_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze images and write the HTML report
    Analyze {
        /// Images to analyze
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Also write a histogram chart per image
        #[arg(long)]
        charts: bool,

        /// Print the full analysis as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Stretch images to a chosen range and move the originals aside
    Adjust {
        /// Lowest luminance to keep (maps to 0)
        #[arg(long)]
        min: u8,

        /// Highest luminance to keep (maps to 255)
        #[arg(long)]
        max: u8,

        /// Images to adjust
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Accept an adjustment session and write its log
    Finish {
        /// Session manifest written by `adjust`
        manifest: PathBuf,
    },

    /// Undo an adjustment session
    Revert {
        /// Session manifest written by `adjust`
        manifest: PathBuf,
    },

    /// Analyze, then choose a range interactively and finish or revert
    Run {
        /// Images to process
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Also write a histogram chart per image
        #[arg(long)]
        charts: bool,
    },

    /// Serve analysis and adjustment over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Host address to bind to
        #[arg(long, env = "IMAGE_ADJUSTER_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "IMAGE_ADJUSTER_PORT", default_value = "9393")]
        port: u16,

        /// Maximum upload size in bytes (default: 50MB)
        #[arg(long, env = "IMAGE_ADJUSTER_MAX_FILE_SIZE", default_value = "52428800")]
        max_file_size: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::stretch::Cutoff;

    #[test]
    fn test_global_options_after_subcommand() {
        let args = Args::try_parse_from([
            "image-adjuster",
            "analyze",
            "a.png",
            "--cutoff",
            "0.5:2,off:1",
            "--luminance",
            "real",
        ])
        .unwrap();

        let config = Config::from(&args);
        assert_eq!(config.luminance, LuminanceMode::Real);
        assert_eq!(
            config.cutoffs,
            vec![
                CutoffPair::new(Cutoff::Percent(0.5), Cutoff::Percent(2.0)),
                CutoffPair::new(Cutoff::Disabled, Cutoff::Percent(1.0)),
            ]
        );
        assert!(matches!(args.command, Command::Analyze { ref images, .. } if images.len() == 1));
    }

    #[test]
    fn test_adjust_requires_byte_limits() {
        assert!(Args::try_parse_from(["image-adjuster", "adjust", "--min", "10", "--max", "300", "a.png"]).is_err());
        assert!(Args::try_parse_from(["image-adjuster", "adjust", "--min", "10", "--max", "30"]).is_err());
        let args =
            Args::try_parse_from(["image-adjuster", "adjust", "--min", "10", "--max", "30", "a.png"]).unwrap();
        assert!(matches!(args.command, Command::Adjust { min: 10, max: 30, .. }));
    }

    #[test]
    fn test_rejects_bad_cutoff() {
        assert!(Args::try_parse_from(["image-adjuster", "--cutoff", "lots", "analyze", "a.png"]).is_err());
    }
}
