use thiserror::Error;

/// Error type for all codec operations.
#[derive(Error, Debug)]
pub enum CodecError {
    /// IO errors from file and stream operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow errors from array construction
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Parquet format errors
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Date/time conversion errors
    #[error("Temporal error: {0}")]
    Temporal(#[from] jiff::Error),

    /// Bad arguments detected before any bytes are written
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Schema construction or value/schema mismatch errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// A value whose runtime type has no Parquet mapping
    #[error("Column '{column}': no Parquet mapping for value of type {type_name}")]
    UnsupportedType { column: String, type_name: String },

    /// A decimal value that does not fit the configured precision/scale
    #[error(
        "Column '{column}' row {row}: value requires precision {required_precision} \
         and scale {required_scale} but the column is configured as \
         ({configured_precision}, {configured_scale})"
    )]
    PrecisionExceeded {
        column: String,
        row: usize,
        required_precision: u32,
        required_scale: i32,
        configured_precision: u8,
        configured_scale: i8,
    },

    /// Malformed container, footer, or declared/actual inconsistency
    #[error("Corrupt Parquet file: {0}")]
    CorruptFile(String),

    /// A physical/logical type combination with no semantic mapping
    #[error("Unsupported Parquet schema: {0}")]
    UnsupportedSchema(String),

    /// Internal errors that indicate a bug rather than bad input
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        CodecError::InvalidArgument(msg.into())
    }

    /// Create a new schema error
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        CodecError::Schema(msg.into())
    }

    /// Create a new corrupt file error
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        CodecError::CorruptFile(msg.into())
    }

    /// Create a new unsupported schema error
    pub fn unsupported_schema<S: Into<String>>(msg: S) -> Self {
        CodecError::UnsupportedSchema(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        CodecError::Internal(msg.into())
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<CodecError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            CodecError::Internal(format!("{}: {}", ctx.into(), base_error))
        })
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            CodecError::Internal(format!("{}: {}", f().into(), base_error))
        })
    }
}
