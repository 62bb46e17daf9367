//! Failure domains of the tracking pipeline.

use std::io;
use thiserror::Error;

/// Reading or writing one of the persisted slots failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to (de)serialize stored record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A position fix could not be obtained. Never surfaced to the user.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location capability unavailable: {0}")]
    Unavailable(String),

    #[error("location request timed out after {0} ms")]
    Timeout(u64),

    #[error("platform location error: {0}")]
    Platform(String),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no target device name configured")]
    NoTargetDevice,

    #[error("Bluetooth radio is not supported on this platform")]
    Unsupported,

    #[error("Bluetooth radio error: {0}")]
    Radio(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No events to export")]
    EmptyInput,

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to deliver export to {path}: {source}")]
    Delivery {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to initialize {capability}: {reason}")]
    Initialization {
        capability: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
