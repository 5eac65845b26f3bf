// THEORY:
// This file is the main entry point for the `bright_mask` library crate.
// It defines the public API used by the `bright_mask` binary and by the
// integration tests.
//
// The primary goal is to export `MaskPipeline` and its associated data
// structures (`PipelineConfig`, `BatchSummary`, `MaskResult`) as the
// high-level interface. The per-image and per-pixel logic lives in
// `core_modules`, the parallel dispatch in `parallel_pipeline`.

pub mod cli;
pub mod core_modules;
pub mod error;
pub mod logging;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{MaskError, Result};
pub use pipeline::{BatchSummary, MaskPipeline, MaskResult, PipelineConfig};
