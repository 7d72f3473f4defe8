//! Codec-private footer annotations.
//!
//! Parquet's own logical types are ambiguous for some semantic types (a
//! legacy instant and a timestamp share one encoding), so every file this
//! codec writes carries one key/value footer entry recording the dataset
//! name, the write-time zone, and the exact semantic tag per column. A reader
//! that finds the entry recovers exact types; a foreign file without it falls
//! back to schema inference.

use crate::{CodecError, Result, SemanticType};
use parquet::file::metadata::KeyValue;
use serde::{Deserialize, Serialize};

/// Footer key under which the annotation document is stored.
pub(crate) const ANNOTATIONS_KEY: &str = "tabular.parquet.annotations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileAnnotations {
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    pub columns: Vec<ColumnAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ColumnAnnotation {
    pub name: String,
    pub dtype: SemanticType,
}

impl FileAnnotations {
    pub(crate) fn to_key_value(&self) -> Result<KeyValue> {
        let json = serde_json::to_string(self)
            .map_err(|e| CodecError::internal(format!("encoding annotations: {}", e)))?;
        Ok(KeyValue {
            key: ANNOTATIONS_KEY.to_string(),
            value: Some(json),
        })
    }

    /// Parse the annotation entry out of a file's key/value metadata.
    ///
    /// `None` when the file carries no entry; `CorruptFile` when the entry
    /// exists but does not parse.
    pub(crate) fn from_key_value(entries: Option<&Vec<KeyValue>>) -> Result<Option<Self>> {
        let Some(entries) = entries else {
            return Ok(None);
        };
        let Some(entry) = entries.iter().find(|kv| kv.key == ANNOTATIONS_KEY) else {
            return Ok(None);
        };
        let Some(json) = entry.value.as_deref() else {
            return Err(CodecError::corrupt("empty annotation entry".to_string()));
        };
        serde_json::from_str(json)
            .map(Some)
            .map_err(|e| CodecError::corrupt(format!("unreadable annotations: {}", e)))
    }
}
