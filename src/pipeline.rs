// THEORY:
// The `pipeline` module is the top-level API for the whole tool. It ties the
// directory scan, the worker pool and the final aggregation into one `run` call.
//
// Key architectural principles:
// 1.  **One Join Point**: Results are only summed after every dispatched task has
//     answered. No partial total is ever reported as final.
// 2.  **Failure Is Zero, By Rule**: `MaskResult::Failure` contributes nothing to
//     the total, and is counted separately so a dark batch and a broken batch
//     can be told apart.
// 3.  **Sized Once**: The CPU core count is read when the pipeline is built and
//     the pool is sized from it for each batch.

use crate::core_modules::scanner::scan_directory;
use crate::error::Result;
use crate::parallel_pipeline::{WorkerPool, group_by_output, pool_size};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::mask::MaskResult;
pub use crate::core_modules::scanner::{ImageTask, WorkSet};

/// Directory processed when none is given.
pub const DEFAULT_INPUT_DIR: &str = "./sample_images/";

/// Configuration for the MaskPipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    /// Upper bound on workers in place of the CPU core count.
    pub max_workers: Option<NonZeroUsize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            max_workers: None,
        }
    }
}

/// The aggregated outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Sum of bright pixels over every successful image.
    pub total_bright_pixels: u64,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Folds results into a summary. Order of `results` does not matter.
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a MaskResult>,
    {
        results
            .into_iter()
            .fold(BatchSummary::default(), |mut summary, result| {
                match result {
                    MaskResult::Success { bright_pixels, .. } => {
                        summary.total_bright_pixels += bright_pixels;
                        summary.succeeded += 1;
                    }
                    MaskResult::Failure { .. } => summary.failed += 1,
                }
                summary
            })
    }

    pub fn image_count(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// The main, top-level struct for a masking run.
pub struct MaskPipeline {
    config: PipelineConfig,
    cpu_cores: usize,
}

impl MaskPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let cpu_cores = config
            .max_workers
            .map(NonZeroUsize::get)
            .unwrap_or_else(num_cpus::get);
        Self { config, cpu_cores }
    }

    /// Scans the input directory, masks every image in parallel and logs the
    /// total.
    ///
    /// Returns `Ok(None)` when there was nothing to process. Only scan errors
    /// are returned as `Err`; per-image failures are part of the summary.
    pub async fn run(&self) -> Result<Option<BatchSummary>> {
        let work_set = scan_directory(&self.config.input_dir)?;

        if work_set.is_empty() {
            warn!(
                "No supported image files found in {}",
                self.config.input_dir.display()
            );
            return Ok(None);
        }

        let summary = self.process_work_set(work_set).await;
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Total bright pixels across all images: {}",
            summary.total_bright_pixels
        );

        Ok(Some(summary))
    }

    /// Processes an already built work set and aggregates the results.
    pub async fn process_work_set(&self, work_set: WorkSet) -> BatchSummary {
        let image_count = work_set.len();
        // Images writing the same mask share a group, so there can be fewer
        // groups than images.
        let groups = group_by_output(work_set);
        let workers = pool_size(self.cpu_cores, groups.len());
        debug!(
            "Processing {} image(s) with {} worker(s)",
            image_count, workers
        );

        let pool = WorkerPool::new(workers);
        let results = pool.process_groups(groups).await;
        pool.shutdown().await;

        BatchSummary::from_results(&results)
    }
}
