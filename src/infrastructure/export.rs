//! CSV export of the event log.

use crate::domain::errors::ExportError;
use crate::domain::models::ConnectionEvent;
use chrono::{NaiveDate, SecondsFormat, Utc};
use csv::{QuoteStyle, WriterBuilder};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const CSV_HEADER: [&str; 5] = [
    "Timestamp",
    "Device Name",
    "Connection Status",
    "Latitude",
    "Longitude",
];

/// Destination for a finished export.
pub trait ExportSink: Send {
    /// Hand off `contents` under `file_name`, returning where it landed.
    fn deliver(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Writes exports as files into a directory, creating it when missing.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ExportError> {
        let path = self.dir.join(file_name);
        let delivery = |source| ExportError::Delivery {
            path: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(delivery)?;
        fs::write(&path, contents).map_err(delivery)?;
        Ok(path)
    }
}

pub fn file_name_for(date: NaiveDate) -> String {
    format!("bluetooth-events-{}.csv", date.format("%Y-%m-%d"))
}

/// Only the device name is quoted, so quoting is done here rather than by
/// the writer.
fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Serialize `events` as CSV, one row per event in the given order.
pub fn to_csv(events: &[ConnectionEvent]) -> Result<Vec<u8>, ExportError> {
    if events.is_empty() {
        return Err(ExportError::EmptyInput);
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for event in events {
        writer.write_record([
            event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            quoted(&event.device_name),
            event.connection_status.as_str().to_string(),
            event.location.latitude.to_string(),
            event.location.longitude.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

/// Export the log through `sink` under today's file name.
pub fn export(events: &[ConnectionEvent], sink: &dyn ExportSink) -> Result<PathBuf, ExportError> {
    let contents = to_csv(events)?;
    let path = sink.deliver(&file_name_for(Utc::now().date_naive()), &contents)?;
    info!("Exported {} events to {}", events.len(), path.display());
    Ok(path)
}
