//! Parquet writing: a schema-driven row writer plus the dataset pipeline.
//!
//! The low-level [`Writer`] buffers rows and flushes them as record batches,
//! sizing batches dynamically from sampled row sizes. The high-level entry
//! points ([`write_file`], [`write_dir`], [`write_bytes`], [`write_to`])
//! validate the dataset, resolve decimal precision, build the schema, and
//! stream rows through it. All validation happens before the first byte is
//! emitted, and file destinations are materialized only after the footer is
//! complete, so a failed call never leaves a partial file behind.

use crate::arrow_conversion::cells_to_array;
use crate::dataset::DEFAULT_NAME;
use crate::io::MemorySink;
use crate::metadata::{ColumnAnnotation, FileAnnotations};
use crate::types::encode_cell;
use crate::{
    CellValue, CodecError, DataSource, PrecisionSpec, Result, Schema, SchemaNode,
};
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, Field, TimeUnit};
use bytes::Bytes;
use jiff::tz::TimeZone;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use rand::Rng;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

// Default configuration constants
const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_MEMORY_THRESHOLD: usize = 100 * 1024 * 1024; // 100MB
const DEFAULT_SAMPLE_SIZE: usize = 100;
const MIN_BATCH_SIZE: usize = 10;
const MIN_SAMPLES_FOR_ESTIMATE: usize = 10;

/// Options for a write call.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// How decimal precision/scale is chosen; defaults to per-column inference.
    pub precision: PrecisionSpec,
    /// Zone used to convert naive timestamps; defaults to the system zone.
    pub time_zone: Option<TimeZone>,
}

/// Builder for creating a configured Writer
pub struct WriterBuilder {
    compression: Compression,
    batch_size: Option<usize>,
    memory_threshold: usize,
    sample_size: usize,
    time_zone: TimeZone,
    file_metadata: Option<Vec<KeyValue>>,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            batch_size: None,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            sample_size: DEFAULT_SAMPLE_SIZE,
            time_zone: TimeZone::UTC,
            file_metadata: None,
        }
    }
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression algorithm
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set a fixed batch size (disables dynamic sizing)
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the memory threshold for flushing
    pub fn with_memory_threshold(mut self, threshold: usize) -> Self {
        self.memory_threshold = threshold;
        self
    }

    /// Set the sample size for row size estimation
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    /// Set the zone used to convert naive timestamps
    pub fn with_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Attach key/value entries to the file footer
    pub fn with_file_metadata(mut self, entries: Vec<KeyValue>) -> Self {
        self.file_metadata = Some(entries);
        self
    }

    /// Build a Writer with the configured settings
    pub fn build<W: Write + Send>(self, writer: W, schema: Schema) -> Result<Writer<W>> {
        let arrow_schema = schema_to_arrow(&schema)?;

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_key_value_metadata(self.file_metadata)
            .build();

        let arrow_writer = ArrowWriter::try_new(writer, arrow_schema.clone(), Some(props))?;

        Ok(Writer {
            arrow_writer: Some(arrow_writer),
            arrow_schema,
            time_zone: self.time_zone,
            buffered_rows: Vec::new(),
            current_batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            memory_threshold: self.memory_threshold,
            sample_size: self.sample_size,
            size_samples: Vec::with_capacity(self.sample_size),
            total_rows_written: 0,
            fixed_batch_size: self.batch_size,
        })
    }
}

/// Schema-driven Parquet writer over any `Write + Send` sink.
pub struct Writer<W: Write> {
    arrow_writer: Option<ArrowWriter<W>>,
    arrow_schema: Arc<arrow_schema::Schema>,
    time_zone: TimeZone,
    buffered_rows: Vec<Vec<CellValue>>,
    current_batch_size: usize,
    memory_threshold: usize,
    sample_size: usize,
    size_samples: Vec<usize>,
    total_rows_written: usize,
    fixed_batch_size: Option<usize>,
}

impl<W> Writer<W>
where
    W: Write + Send,
{
    /// Create a new writer with default settings
    pub fn new(writer: W, schema: Schema) -> Result<Self> {
        WriterBuilder::new().build(writer, schema)
    }

    /// Write a batch of rows
    pub fn write_rows(&mut self, rows: Vec<Vec<CellValue>>) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Write a single row.
    ///
    /// Rows are buffered internally and flushed in batches sized to the
    /// memory threshold.
    pub fn write_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        let num_cols = self.arrow_schema.fields().len();
        if row.len() != num_cols {
            return Err(CodecError::schema(format!(
                "row has {} values but schema has {} fields",
                row.len(),
                num_cols
            )));
        }

        for (idx, (value, field)) in row.iter().zip(self.arrow_schema.fields()).enumerate() {
            validate_cell(value, field, &format!("row[{}]", idx))?;
        }

        if self.fixed_batch_size.is_none() {
            self.sample_row_size(&row);
        }

        self.buffered_rows.push(row);
        if self.buffered_rows.len() >= self.current_batch_size {
            self.flush_buffered_rows()?;
        }
        Ok(())
    }

    /// Sample row size for dynamic batch sizing using reservoir sampling
    fn sample_row_size(&mut self, row: &[CellValue]) {
        let row_size = row.iter().map(estimate_cell_size).sum();

        if self.size_samples.len() < self.sample_size {
            self.size_samples.push(row_size);
        } else {
            let mut rng = rand::rng();
            let idx = rng.random_range(0..=self.total_rows_written);
            if idx < self.sample_size {
                self.size_samples[idx] = row_size;
            }
        }

        if self.size_samples.len() >= MIN_SAMPLES_FOR_ESTIMATE {
            self.update_batch_size();
        }
    }

    /// Update dynamic batch size based on current samples
    fn update_batch_size(&mut self) {
        if self.size_samples.is_empty() {
            return;
        }
        let total_size: usize = self.size_samples.iter().sum();
        let avg_row_size = (total_size as f64 / self.size_samples.len() as f64).max(1.0);
        let suggested = (self.memory_threshold as f64 / avg_row_size).floor() as usize;
        self.current_batch_size = suggested.max(MIN_BATCH_SIZE);
    }

    /// Flush buffered rows as one record batch
    fn flush_buffered_rows(&mut self) -> Result<()> {
        if self.buffered_rows.is_empty() {
            return Ok(());
        }

        let rows = std::mem::take(&mut self.buffered_rows);
        let num_rows = rows.len();
        self.total_rows_written += num_rows;

        let num_cols = self.arrow_schema.fields().len();
        let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(num_rows); num_cols];
        for row in rows {
            for (col_idx, value) in row.into_iter().enumerate() {
                columns[col_idx].push(value);
            }
        }

        let arrow_columns = columns
            .into_iter()
            .zip(self.arrow_schema.fields())
            .map(|(values, field)| cells_to_array(values, field, &self.time_zone))
            .collect::<Result<Vec<_>>>()?;

        let batch = RecordBatch::try_new(self.arrow_schema.clone(), arrow_columns)?;

        let writer = self
            .arrow_writer
            .as_mut()
            .ok_or_else(|| CodecError::internal("writer has been closed".to_string()))?;
        writer.write(&batch)?;
        if writer.in_progress_size() >= self.memory_threshold {
            writer.flush()?;
            debug!(rows = self.total_rows_written, "row group flushed");
        }
        Ok(())
    }

    /// Flush any buffered data
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffered_rows()?;
        if let Some(writer) = &mut self.arrow_writer {
            writer.flush()?;
        }
        Ok(())
    }

    /// Write the footer and return the underlying sink.
    pub fn close(mut self) -> Result<W> {
        self.flush_buffered_rows()?;
        let writer = self
            .arrow_writer
            .take()
            .ok_or_else(|| CodecError::internal("writer has been closed".to_string()))?;
        // `into_inner` writes the footer and returns the sink; it must not be
        // preceded by `finish`, which would finalize the file twice.
        Ok(writer.into_inner()?)
    }
}

/// Rough in-memory footprint of one cell, for batch sizing only.
fn estimate_cell_size(value: &CellValue) -> usize {
    match value {
        CellValue::Null => 0,
        CellValue::Boolean(_) => 1,
        CellValue::Int32(_) | CellValue::Float32(_) => 4,
        CellValue::Int64(_) | CellValue::Float64(_) => 8,
        CellValue::BigInt(i) => (i.bits() as usize / 8) + 8,
        CellValue::Decimal { unscaled, .. } => (unscaled.bits() as usize / 8) + 8,
        CellValue::String(s) => s.len() + std::mem::size_of::<usize>() * 3,
        CellValue::Bytes(b) => b.len() + std::mem::size_of::<usize>() * 3,
        CellValue::Date(_) | CellValue::Time(_) => 4,
        CellValue::DateTime(_) => 8,
        CellValue::List(items) => {
            let base = std::mem::size_of::<usize>() * 3;
            base + items.iter().map(estimate_cell_size).sum::<usize>()
        }
        CellValue::Map(entries) => {
            let base = std::mem::size_of::<usize>() * 4;
            base + entries
                .iter()
                .map(|(k, v)| estimate_cell_size(k) + estimate_cell_size(v))
                .sum::<usize>()
        }
        CellValue::Record(fields) => {
            let base = std::mem::size_of::<usize>() * 3;
            base + fields.values().map(estimate_cell_size).sum::<usize>()
        }
        CellValue::Object(_) => 64,
    }
}

/// Validate a cell against its field schema
fn validate_cell(value: &CellValue, field: &Field, path: &str) -> Result<()> {
    if value.is_null() {
        if !field.is_nullable() {
            return Err(CodecError::schema(format!(
                "found null value for non-nullable field at {}",
                path
            )));
        }
        return Ok(());
    }

    match (value, field.data_type()) {
        (CellValue::Boolean(_), DataType::Boolean) => Ok(()),
        (CellValue::Int32(_), DataType::Int32) => Ok(()),
        (CellValue::Int32(_) | CellValue::Int64(_), DataType::Int64) => Ok(()),
        (CellValue::Float32(_), DataType::Float32) => Ok(()),
        (CellValue::Float32(_) | CellValue::Float64(_), DataType::Float64) => Ok(()),
        (CellValue::String(_), DataType::Utf8) => Ok(()),
        (CellValue::Bytes(_), DataType::Binary) => Ok(()),
        (CellValue::Date(_), DataType::Date32) => Ok(()),
        (CellValue::Time(_), DataType::Time32(_)) => Ok(()),
        (CellValue::DateTime(_), DataType::Timestamp(_, _)) => Ok(()),
        (CellValue::Decimal { .. }, DataType::Decimal128(_, _) | DataType::Decimal256(_, _)) => {
            Ok(())
        }

        (CellValue::List(items), DataType::List(item_field)) => {
            for (idx, item) in items.iter().enumerate() {
                validate_cell(item, item_field, &format!("{}[{}]", path, idx))?;
            }
            Ok(())
        }

        (CellValue::Map(entries), DataType::Map(entries_field, _)) => {
            if let DataType::Struct(fields) = entries_field.data_type() {
                if fields.len() >= 2 {
                    for (idx, (key, val)) in entries.iter().enumerate() {
                        validate_cell(key, &fields[0], &format!("{}.key[{}]", path, idx))?;
                        validate_cell(val, &fields[1], &format!("{}.value[{}]", path, idx))?;
                    }
                }
            }
            Ok(())
        }

        (CellValue::Record(record_fields), DataType::Struct(schema_fields)) => {
            for field in schema_fields {
                if let Some(value) = record_fields.get(field.name().as_str()) {
                    validate_cell(value, field, &format!("{}.{}", path, field.name()))?;
                } else if !field.is_nullable() {
                    return Err(CodecError::schema(format!(
                        "required field '{}' is missing in struct at {}",
                        field.name(),
                        path
                    )));
                }
            }
            Ok(())
        }

        (value, expected_type) => Err(CodecError::schema(format!(
            "type mismatch at {}: expected {:?}, got {}",
            path,
            expected_type,
            value.type_name()
        ))),
    }
}

/// Convert our Schema to Arrow Schema
fn schema_to_arrow(schema: &Schema) -> Result<Arc<arrow_schema::Schema>> {
    match &schema.root {
        SchemaNode::Struct { fields, .. } => {
            let arrow_fields = fields
                .iter()
                .map(schema_node_to_arrow_field)
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(arrow_schema::Schema::new(arrow_fields)))
        }
        _ => Err(CodecError::schema("root schema node must be a struct")),
    }
}

/// Convert a SchemaNode to an Arrow Field
fn schema_node_to_arrow_field(node: &SchemaNode) -> Result<Field> {
    match node {
        SchemaNode::Primitive {
            name,
            primitive_type,
            nullable,
        } => Ok(Field::new(
            name,
            primitive_type_to_arrow(primitive_type),
            *nullable,
        )),
        SchemaNode::List { name, item, .. } => {
            let item_field = schema_node_to_arrow_field(item)?;
            let list_type = DataType::List(Arc::new(Field::new(
                "item",
                item_field.data_type().clone(),
                true,
            )));
            Ok(Field::new(name, list_type, node.is_nullable()))
        }
        SchemaNode::Map {
            name, key, value, ..
        } => {
            let key_field = schema_node_to_arrow_field(key)?;
            let value_field = schema_node_to_arrow_field(value)?;

            let entry_fields = vec![
                Field::new("key", key_field.data_type().clone(), false),
                Field::new("value", value_field.data_type().clone(), true),
            ];
            let map_type = DataType::Map(
                Arc::new(Field::new(
                    "entries",
                    DataType::Struct(entry_fields.into()),
                    false,
                )),
                false,
            );
            Ok(Field::new(name, map_type, node.is_nullable()))
        }
        SchemaNode::Struct {
            name,
            fields,
            nullable,
        } => {
            let struct_fields = fields
                .iter()
                .map(schema_node_to_arrow_field)
                .collect::<Result<Vec<_>>>()?;
            Ok(Field::new(
                name,
                DataType::Struct(struct_fields.into()),
                *nullable,
            ))
        }
    }
}

/// Convert a PrimitiveType to an Arrow DataType.
///
/// Timestamps are UTC-adjusted: the zone context already normalized the
/// values, so the stored representation is always instant-based.
fn primitive_type_to_arrow(ptype: &crate::PrimitiveType) -> DataType {
    use crate::PrimitiveType::*;

    match ptype {
        Boolean => DataType::Boolean,
        Int32 => DataType::Int32,
        Int64 => DataType::Int64,
        Float32 => DataType::Float32,
        Float64 => DataType::Float64,
        Decimal128(precision, scale) => DataType::Decimal128(*precision, *scale),
        Decimal256(precision, scale) => DataType::Decimal256(*precision, *scale),
        String => DataType::Utf8,
        Binary => DataType::Binary,
        Date32 => DataType::Date32,
        TimeMillis => DataType::Time32(TimeUnit::Millisecond),
        TimestampMicros => DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))),
    }
}

fn validate_source(source: &dyn DataSource) -> Result<()> {
    if source.column_count() == 0 {
        return Err(CodecError::invalid_argument("dataset has no columns"));
    }
    let mut seen = HashSet::new();
    for col in 0..source.column_count() {
        if !seen.insert(source.column_name(col).to_string()) {
            return Err(CodecError::invalid_argument(format!(
                "duplicate column name '{}'",
                source.column_name(col)
            )));
        }
    }
    Ok(())
}

/// Encode a dataset into any `Write + Send` sink and return the sink.
pub fn write_to<W: Write + Send>(
    source: &dyn DataSource,
    sink: W,
    options: &WriteOptions,
) -> Result<W> {
    validate_source(source)?;
    let tz = options
        .time_zone
        .clone()
        .unwrap_or_else(TimeZone::system);

    let precisions = crate::precision::resolve(source, &options.precision)?;
    let (schema, columns) = crate::schema::dataset_schema(source, &precisions)?;

    let dataset_name = match source.name() {
        "" => DEFAULT_NAME.to_string(),
        name => name.to_string(),
    };
    let annotations = FileAnnotations {
        dataset: dataset_name,
        time_zone: tz.iana_name().map(str::to_string),
        columns: columns
            .iter()
            .map(|c| ColumnAnnotation {
                name: c.name.clone(),
                dtype: c.dtype.clone(),
            })
            .collect(),
    };

    let mut writer = WriterBuilder::new()
        .with_time_zone(tz)
        .with_file_metadata(vec![annotations.to_key_value()?])
        .build(sink, schema)?;

    debug!(
        columns = columns.len(),
        rows = source.row_count(),
        "dataset schema built"
    );

    for row in 0..source.row_count() {
        let mut cells = Vec::with_capacity(columns.len());
        for (col, column) in columns.iter().enumerate() {
            cells.push(encode_cell(
                source.value(row, col),
                &column.dtype,
                &column.name,
                row,
            )?);
        }
        writer.write_row(cells)?;
    }
    writer.close()
}

/// Write a dataset to a file path.
///
/// Encoding happens in a scratch file next to the destination; the real path
/// is materialized atomically only once the footer is complete, so a failed
/// call never leaves a partial or corrupt file at `path`.
pub fn write_file(
    source: &dyn DataSource,
    path: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Err(CodecError::invalid_argument(format!(
            "destination '{}' is a directory; use write_dir",
            path.display()
        )));
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(CodecError::invalid_argument(format!(
            "parent directory '{}' does not exist",
            parent.display()
        )));
    }

    let scratch = NamedTempFile::new_in(&parent)?;
    let (file, scratch_path) = scratch.into_parts();
    write_to(source, file, options)?;
    scratch_path
        .persist(path)
        .map_err(|e| CodecError::Io(e.error))?;
    debug!(path = %path.display(), "dataset written");
    Ok(())
}

/// Write a dataset into a directory, deriving the file name from the
/// dataset name. Returns the path written.
pub fn write_dir(
    source: &dyn DataSource,
    dir: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CodecError::invalid_argument(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }
    let name = match source.name() {
        "" => DEFAULT_NAME,
        name => name,
    };
    let path = dir.join(file_name_for(name));
    write_file(source, &path, options)?;
    Ok(path)
}

/// Write a dataset to an in-memory buffer and return the encoded bytes.
pub fn write_bytes(source: &dyn DataSource, options: &WriteOptions) -> Result<Bytes> {
    let sink = write_to(source, MemorySink::new(), options)?;
    Ok(sink.into_bytes())
}

/// File name for a dataset written into a directory: the name restricted to
/// a safe character set, with the parquet extension appended.
pub(crate) fn file_name_for(dataset: &str) -> String {
    let cleaned: String = dataset
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = sanitize_filename::sanitize_with_options(
        cleaned,
        sanitize_filename::Options {
            truncate: true,
            replacement: "",
            ..sanitize_filename::Options::default()
        },
    );
    let stem = if cleaned.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        cleaned
    };
    format!("{}.parquet", stem)
}
