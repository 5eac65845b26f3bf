//! Error types for the masking pipeline.
//!
//! Errors are split by where they happen. Scan errors surface before any work
//! is dispatched and end the run. Every other variant is produced inside a
//! single task and is recovered into a `MaskResult::Failure` for that image.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MaskError>;

#[derive(Debug, Error)]
pub enum MaskError {
    /// The input directory does not exist
    #[error("input directory {} does not exist", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// The input path exists but is not a directory
    #[error("input path {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// The input directory could not be listed
    #[error("failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image file could not be opened
    #[error("failed to open image {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image file could not be decoded
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The `masks` directory could not be created
    #[error("failed to create mask directory {}: {source}", path.display())]
    CreateMaskDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The mask PNG could not be encoded or written
    #[error("failed to write mask {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The input path has no file stem to derive a mask name from
    #[error("cannot derive a mask name from {}", path.display())]
    InvalidFileName { path: PathBuf },

    /// The masking task panicked
    #[error("worker processing {} panicked: {message}", path.display())]
    WorkerPanicked { path: PathBuf, message: String },

    /// The worker pool dropped a task without answering
    #[error("no result received for {}", path.display())]
    ResultLost { path: PathBuf },

    /// The tracing subscriber could not be installed
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_message() {
        let err = MaskError::DirectoryNotFound {
            path: PathBuf::from("missing"),
        };
        assert_eq!(err.to_string(), "input directory missing does not exist");
    }

    #[test]
    fn worker_panic_message() {
        let err = MaskError::WorkerPanicked {
            path: PathBuf::from("a.png"),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "worker processing a.png panicked: boom");
    }

    #[test]
    fn open_error_keeps_source() {
        use std::error::Error as _;

        let err = MaskError::Open {
            path: PathBuf::from("gone.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("gone.jpg"));
    }
}
