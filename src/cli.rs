use crate::pipeline::{DEFAULT_INPUT_DIR, PipelineConfig};
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "bright_mask",
    version = env!("CARGO_PKG_VERSION"),
    about = "Write a bright-pixel mask for every image in a directory",
    long_about = "For every .jpg, .jpeg and .png file directly inside INPUT_DIR, writes \
                  INPUT_DIR/masks/<name>_mask.png where a pixel is white if every channel \
                  is above 200, then logs the total number of bright pixels."
)]
pub struct Cli {
    /// Directory containing the images to mask
    #[arg(default_value = DEFAULT_INPUT_DIR)]
    pub input_dir: PathBuf,

    /// Maximum number of parallel workers (defaults to the CPU count)
    #[arg(short, long, env = "BRIGHT_MASK_JOBS")]
    pub jobs: Option<NonZeroUsize>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            input_dir: self.input_dir,
            max_workers: self.jobs,
        }
    }
}
