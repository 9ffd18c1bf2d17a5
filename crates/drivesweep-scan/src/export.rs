//! Result set export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use drivesweep_core::FileRecord;

/// Column header of a CSV export.
pub const CSV_HEADER: [&str; 6] = [
    "FileName",
    "Extension",
    "Size",
    "Drive",
    "LastModified",
    "FilePath",
];

/// Local-time format of the `LastModified` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors writing an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON to {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `records` as CSV to `path`, replacing any existing file.
///
/// Returns the number of data rows written. An empty slice produces a file
/// holding only the header.
///
/// `path` is chosen by the operator and is not checked against the approval
/// sandbox; only the records themselves come from approved roots.
pub fn export_csv(records: &[FileRecord], path: impl AsRef<Path>) -> Result<usize, ExportError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = write_csv(records, BufWriter::new(file))?;
    info!(path = %path.display(), rows, "exported csv");
    Ok(rows)
}

/// Write `records` as CSV to any writer.
pub fn write_csv<W: Write>(records: &[FileRecord], writer: W) -> Result<usize, ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    for record in records {
        let size = record.display_size();
        let modified = record.modified_local().format(TIMESTAMP_FORMAT).to_string();
        let path = record.path.to_string_lossy();
        wtr.write_record([
            record.name.as_str(),
            record.extension.as_str(),
            size.as_str(),
            record.drive.as_str(),
            modified.as_str(),
            path.as_ref(),
        ])?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(records.len())
}

/// Write `records` as pretty-printed JSON to `path`.
///
/// Like [`export_csv`], the output path is not sandbox-checked.
pub fn export_json(records: &[FileRecord], path: impl AsRef<Path>) -> Result<usize, ExportError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = records.len(), "exported json");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn to_string(records: &[FileRecord]) -> String {
        let mut out = Vec::new();
        write_csv(records, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(
            to_string(&[]),
            "FileName,Extension,Size,Drive,LastModified,FilePath\n"
        );
    }

    #[test]
    fn test_row_layout() {
        let record = FileRecord::new("/data/song.MP3", 2048, SystemTime::now(), "/data");
        let out = to_string(&[record]);
        let row = out.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();

        assert_eq!(fields[0], "song.MP3");
        assert_eq!(fields[1], ".MP3");
        assert_eq!(fields[2], "2.0 KB");
        assert_eq!(fields[3], "/data");
        assert_eq!(fields[4].len(), "2024-01-31 12:00".len());
        assert_eq!(fields[5], "/data/song.MP3");
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let record = FileRecord::new("/data/a, b.txt", 1, SystemTime::now(), "/data");
        let out = to_string(&[record]);
        assert!(out.contains("\"a, b.txt\""));
        assert!(out.contains("\"/data/a, b.txt\""));
    }
}
