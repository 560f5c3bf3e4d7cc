//! CSV artifacts: the raw export and the canonical intermediate file.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::document::sanitize;
use crate::error::PipelineError;
use crate::record::{CanonicalRecord, RawRecord};

fn ensure_exists(path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        error!(path = %path.display(), "Input file not found");
        Err(PipelineError::SourceNotFound(path.to_path_buf()))
    }
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> PipelineError + '_ {
    move |source| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn io_error(path: &Path) -> impl Fn(io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads every row of the raw export. Bytes that are not valid UTF-8 are replaced rather than
/// failing the read; rows shorter than the header simply lack the trailing columns.
pub fn read_raw_records(path: &Path) -> Result<Vec<RawRecord>, PipelineError> {
    ensure_exists(path)?;
    info!(path = %path.display(), "Reading raw records");

    let file = File::open(path).map_err(io_error(path))?;
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));
    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(csv_error(path))?
        .iter()
        .map(sanitize)
        .collect();

    let mut records = Vec::new();
    for row in reader.byte_records() {
        let row = row.map_err(csv_error(path))?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.clone(), sanitize(value)))
            .collect();
        records.push(record);
    }

    info!(path = %path.display(), rows = records.len(), columns = headers.len(), "Raw records read");
    Ok(records)
}

/// Writes the canonical file, replacing any previous one. The file is written next to its
/// destination and renamed into place, so a failed write never leaves a truncated artifact.
pub fn write_canonical(path: &Path, records: &[CanonicalRecord]) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_error(&dir))?;
    {
        let mut writer = WriterBuilder::new().from_writer(tmp.as_file_mut());
        for record in records {
            writer.serialize(record).map_err(csv_error(path))?;
        }
        writer.flush().map_err(io_error(path))?;
    }
    tmp.persist(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    info!(path = %path.display(), records = records.len(), "Canonical records written");
    Ok(())
}

/// Reads the canonical file back. Dates and amenities go through the same parsers that
/// produced them.
pub fn read_canonical(path: &Path) -> Result<Vec<CanonicalRecord>, PipelineError> {
    ensure_exists(path)?;
    info!(path = %path.display(), "Reading canonical records");

    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .map_err(csv_error(path))?;
    let records = reader
        .deserialize::<CanonicalRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error(path))?;

    info!(path = %path.display(), records = records.len(), "Canonical records read");
    Ok(records)
}
