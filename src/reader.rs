//! Parquet reading: row materialization back into a dataset.
//!
//! Semantic types are recovered from the codec's own footer annotations when
//! present; foreign files fall back to inference from the Parquet schema,
//! which cannot distinguish source types that share one physical encoding.
//! The materialized dataset is fully resident in memory.

use crate::arrow_conversion::cell_from_array;
use crate::dataset::{Column, Dataset, DEFAULT_NAME};
use crate::io::drain_to_bytes;
use crate::metadata::FileAnnotations;
use crate::types::semantic_from_arrow;
use crate::writer::file_name_for;
use crate::{CodecError, Result};
use bytes::Bytes;
use jiff::tz::TimeZone;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Options for a read call.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Name for the materialized dataset; defaults to the stored name.
    pub dataset_name: Option<String>,
    /// Zone used to convert stored timestamps back to naive date-times;
    /// defaults to the zone recorded at write time, then the system zone.
    pub time_zone: Option<TimeZone>,
}

/// Low-level reader over any positioned byte source.
pub struct Reader<R> {
    input: R,
    fallback_name: Option<String>,
}

impl<R> Reader<R>
where
    R: ChunkReader + 'static,
{
    pub fn new(input: R) -> Self {
        Self {
            input,
            fallback_name: None,
        }
    }

    fn with_fallback_name(input: R, name: Option<String>) -> Self {
        Self {
            input,
            fallback_name: name,
        }
    }

    /// Materialize the source into a dataset.
    pub fn read(self, options: &ReadOptions) -> Result<Dataset> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(self.input)
            .map_err(|e| CodecError::corrupt(e.to_string()))?;
        let file_metadata = builder.metadata().file_metadata();
        let declared_rows = file_metadata.num_rows();
        let annotations = FileAnnotations::from_key_value(file_metadata.key_value_metadata())?;
        let arrow_schema = builder.schema().clone();

        let columns = match &annotations {
            Some(annotations) => {
                if annotations.columns.len() != arrow_schema.fields().len() {
                    return Err(CodecError::corrupt(format!(
                        "annotations describe {} columns but the file has {}",
                        annotations.columns.len(),
                        arrow_schema.fields().len()
                    )));
                }
                for (annotation, field) in
                    annotations.columns.iter().zip(arrow_schema.fields())
                {
                    if &annotation.name != field.name() {
                        return Err(CodecError::corrupt(format!(
                            "annotations name column '{}' where the file has '{}'",
                            annotation.name,
                            field.name()
                        )));
                    }
                }
                annotations
                    .columns
                    .iter()
                    .map(|c| Column::new(c.name.clone(), c.dtype.clone()))
                    .collect()
            }
            None => {
                debug!("no codec annotations; inferring semantic types from the Parquet schema");
                arrow_schema
                    .fields()
                    .iter()
                    .map(|f| {
                        Ok(Column::new(
                            f.name().clone(),
                            semantic_from_arrow(f.data_type())?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let tz = match &options.time_zone {
            Some(tz) => tz.clone(),
            None => match annotations.as_ref().and_then(|a| a.time_zone.as_deref()) {
                Some(id) => TimeZone::get(id).map_err(|e| {
                    CodecError::corrupt(format!("stored time zone '{}': {}", id, e))
                })?,
                None => TimeZone::system(),
            },
        };

        let name = options
            .dataset_name
            .clone()
            .or_else(|| annotations.as_ref().map(|a| a.dataset.clone()))
            .or(self.fallback_name)
            .unwrap_or_else(|| DEFAULT_NAME.to_string());

        let reader = builder
            .build()
            .map_err(|e| CodecError::corrupt(e.to_string()))?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| CodecError::corrupt(e.to_string()))?;
            for row_idx in 0..batch.num_rows() {
                let mut row = Vec::with_capacity(batch.num_columns());
                for (col_idx, array) in batch.columns().iter().enumerate() {
                    row.push(cell_from_array(
                        array,
                        row_idx,
                        &columns[col_idx].dtype,
                        &tz,
                    )?);
                }
                rows.push(row);
            }
        }

        if rows.len() as i64 != declared_rows {
            return Err(CodecError::corrupt(format!(
                "footer declares {} rows but {} were read",
                declared_rows,
                rows.len()
            )));
        }

        debug!(rows = rows.len(), columns = columns.len(), "dataset materialized");
        Dataset::new(name, columns, rows)
    }
}

/// Read a dataset from a file path.
pub fn read_file(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let fallback = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(String::from);
    Reader::with_fallback_name(file, fallback).read(options)
}

/// Read a dataset from a directory, locating the file by dataset name using
/// the same naming rule the directory writer applies.
pub fn read_dir(
    dir: impl AsRef<Path>,
    dataset_name: &str,
    options: &ReadOptions,
) -> Result<Dataset> {
    read_file(dir.as_ref().join(file_name_for(dataset_name)), options)
}

/// Read a dataset from raw bytes.
pub fn read_bytes(bytes: impl Into<Bytes>, options: &ReadOptions) -> Result<Dataset> {
    Reader::new(bytes.into()).read(options)
}

/// Read a dataset from an arbitrary byte stream.
///
/// The stream is drained into memory first; Parquet needs positioned access
/// to locate the footer.
pub fn read_reader(reader: impl Read, options: &ReadOptions) -> Result<Dataset> {
    read_bytes(drain_to_bytes(reader)?, options)
}

/// Read a dataset from a URL.
#[cfg(feature = "http")]
pub fn read_url(url: &str, options: &ReadOptions) -> Result<Dataset> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| CodecError::Io(std::io::Error::other(e)))?;
    let bytes = response
        .bytes()
        .map_err(|e| CodecError::Io(std::io::Error::other(e)))?;
    read_bytes(bytes, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_corrupt() {
        let result = read_bytes(vec![0u8; 64], &ReadOptions::default());
        assert!(matches!(result, Err(CodecError::CorruptFile(_))));
    }

    #[test]
    fn test_missing_file_is_io() {
        let result = read_file("/nonexistent/deeply/nested.parquet", &ReadOptions::default());
        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
