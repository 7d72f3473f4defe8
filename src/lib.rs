//! Parquet reader/writer for in-memory tabular datasets.
//!
//! `tabular-parquet` serializes named, ordered, typed columns of rows to and
//! from the Parquet file format, wrapping the Apache parquet-rs crate with an
//! API built around a dynamic cell model instead of a record mapping
//! framework.
//!
//! # Key Components
//!
//! - **Writer**: streams rows into column chunks against a schema built per
//!   call; targets a file, a directory, or an in-memory buffer, and never
//!   leaves a partial file behind on failure.
//! - **Reader**: materializes a file, byte buffer, stream, or URL back into a
//!   [`Dataset`], recovering exact column types from the codec's own footer
//!   annotations or inferring them for foreign files.
//! - **Schema**: a tree of nested struct/list/map nodes over a small set of
//!   physical encodings; mapping columns are classified as MAP or STRUCT by
//!   scanning their values.
//! - **Values**: [`CellValue`] covers all supported semantic types, including
//!   exact-precision decimals and naive temporal values converted through an
//!   explicit per-call time zone.
//!
//! # Design Philosophy
//!
//! Writer and reader calls are synchronous and self-contained: time zone and
//! precision policy are parameters, never ambient state. The only shared
//! state is the process-wide descriptor cache for bean-like value shapes.

pub mod arrow_conversion;
pub mod dataset;
pub mod error;
pub mod io;
pub mod metadata;
pub mod precision;
pub mod reader;
pub mod reflect;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use dataset::{Column, Dataset};
pub use error::{CodecError, ErrorContext, Result};
pub use io::MemorySink;
pub use precision::PrecisionSpec;
pub use reader::{read_bytes, read_dir, read_file, read_reader, ReadOptions, Reader};
pub use reflect::{descriptors, shapes, DescriptorCache, FieldDescriptor, ShapeBuilder, ShapeRegistry};
pub use schema::{PrimitiveType, Schema, SchemaBuilder, SchemaNode};
pub use traits::{DataSource, RecordLike};
pub use types::{SemanticType, StructField};
pub use value::CellValue;
pub use writer::{write_bytes, write_dir, write_file, write_to, WriteOptions, Writer, WriterBuilder};

#[cfg(feature = "http")]
pub use reader::read_url;
