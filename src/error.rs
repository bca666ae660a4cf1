//! Error types for batch validation, conversion and packaging

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors that reject a batch before any worker is started
#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    /// No input documents were supplied
    #[error("No input documents were selected")]
    EmptyInput,

    /// Worker limit outside the supported range
    #[error("Worker limit must be between {min} and {max}, got {got}")]
    InvalidWorkerLimit { got: usize, min: usize, max: usize },

    /// A password was requested but is empty
    #[error("Archive password must not be empty")]
    EmptyPassword,

    /// The password and its confirmation differ
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Failure of a single conversion attempt
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Source document does not exist or is not a regular file
    #[error("Source document not found: {0:?}")]
    MissingSource(PathBuf),

    /// Converter process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Host refused to start the converter for lack of memory
    #[error("Not enough memory to start {program}")]
    ResourceExhausted { program: String },

    /// Converter exited with a failure status
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Converter did not finish in time and was killed
    #[error("{program} timed out after {}s", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    /// Converter reported success but produced no usable PDF
    #[error("PDF is empty or missing after conversion: {0:?}")]
    EmptyOutput(PathBuf),

    /// Filesystem error around the conversion
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Classify a process spawn failure
    pub fn spawn(program: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::OutOfMemory {
            Self::ResourceExhausted {
                program: program.to_string(),
            }
        } else {
            Self::Spawn {
                program: program.to_string(),
                source,
            }
        }
    }
}

/// Terminal failure reason recorded on a task
#[derive(Error, Debug)]
pub enum TaskError {
    /// Primary conversion failed and no alternate mechanism exists on this host
    #[error("{primary} (no alternate converter available)")]
    RetryUnavailable { primary: ConversionError },

    /// Alternate conversion failed as well; only the retry's error is kept
    #[error("alternate converter failed: {0}")]
    RetryFailed(ConversionError),

    /// Batch was cancelled before the task could finish
    #[error("cancelled before conversion")]
    Cancelled,

    /// Primary conversion failed and the retry was skipped because the batch was cancelled
    #[error("{primary} (retry skipped: batch cancelled)")]
    CancelledAfterFailure { primary: ConversionError },

    /// Worker running the task terminated unexpectedly
    #[error("worker terminated before reporting a result")]
    WorkerLost,
}

/// Errors that abort the packaging step
#[derive(Error, Debug)]
pub enum PackagingError {
    /// Nothing to put in the archive
    #[error("No converted PDFs to package")]
    NothingToPackage,

    /// IO error while writing the archive
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive destination cannot be written
    #[error("Cannot write archive to {path:?}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ZIP writer error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Encryption could not be set up for an entry
    #[error("Failed to set up encryption for {entry}: {source}")]
    Encryption {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },
}
