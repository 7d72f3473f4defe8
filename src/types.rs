//! Semantic column types and their Parquet-facing encodings.
//!
//! The mapping between semantic types and physical encodings is total in both
//! directions for everything this codec writes: [`leaf_primitive`] picks the
//! physical shape for a semantic leaf, and [`semantic_from_arrow`] recovers a
//! semantic type from a file's Arrow-level schema when no codec annotations
//! are present. The reverse direction also accepts foreign shapes the codec
//! never writes (small integers, second/nano timestamps), degrading to the
//! nearest semantic type.

use crate::precision::{minimal_precision_scale, MAX_PRECISION};
use crate::schema::PrimitiveType;
use crate::{CellValue, CodecError, Result};
use arrow_schema::{DataType, TimeUnit};
use jiff::civil;
use jiff::tz::TimeZone;
use jiff::{Span, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Column type tag, richer than Parquet's own physical/logical types.
///
/// `Mapping` and `Object` are write-side declarations for columns whose shape
/// is decided by scanning values; they are resolved to `Map`/`Struct` before
/// any bytes are emitted and never appear in file annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticType {
    Int32,
    Int64,
    /// Arbitrary-precision integers, narrowed to 64 bits on write.
    BigInteger,
    Float32,
    Float64,
    /// `(precision, scale)`; `(0, 0)` in a declaration means "infer".
    Decimal(u8, i8),
    Boolean,
    Date,
    Time,
    Timestamp,
    /// Millisecond-precision instant from older date APIs; shares the
    /// Timestamp encode path and differs only in its tag.
    LegacyDate,
    String,
    Binary,
    List(Box<SemanticType>),
    Struct {
        fields: Vec<StructField>,
        /// Recorded shape name for flattened bean values, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shape: Option<std::string::String>,
    },
    Map(Box<SemanticType>),
    #[serde(skip)]
    Mapping,
    #[serde(skip)]
    Object,
}

/// Named field of a struct column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: std::string::String,
    pub dtype: SemanticType,
}

impl StructField {
    pub fn new(name: impl Into<std::string::String>, dtype: SemanticType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

impl SemanticType {
    /// Struct type without a recorded shape name.
    pub fn record(fields: Vec<StructField>) -> Self {
        SemanticType::Struct {
            fields,
            shape: None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Int32 => write!(f, "int32"),
            SemanticType::Int64 => write!(f, "int64"),
            SemanticType::BigInteger => write!(f, "big-integer"),
            SemanticType::Float32 => write!(f, "float32"),
            SemanticType::Float64 => write!(f, "float64"),
            SemanticType::Decimal(p, s) => write!(f, "decimal({}, {})", p, s),
            SemanticType::Boolean => write!(f, "boolean"),
            SemanticType::Date => write!(f, "date"),
            SemanticType::Time => write!(f, "time"),
            SemanticType::Timestamp => write!(f, "timestamp"),
            SemanticType::LegacyDate => write!(f, "legacy-date"),
            SemanticType::String => write!(f, "string"),
            SemanticType::Binary => write!(f, "binary"),
            SemanticType::List(item) => write!(f, "list<{}>", item),
            SemanticType::Struct { fields, .. } => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.dtype)?;
                }
                write!(f, ">")
            }
            SemanticType::Map(value) => write!(f, "map<{}>", value),
            SemanticType::Mapping => write!(f, "mapping"),
            SemanticType::Object => write!(f, "object"),
        }
    }
}

/// Physical encoding for a semantic leaf; `None` for nested types.
pub(crate) fn leaf_primitive(dtype: &SemanticType) -> Option<PrimitiveType> {
    match dtype {
        SemanticType::Int32 => Some(PrimitiveType::Int32),
        SemanticType::Int64 | SemanticType::BigInteger => Some(PrimitiveType::Int64),
        SemanticType::Float32 => Some(PrimitiveType::Float32),
        SemanticType::Float64 => Some(PrimitiveType::Float64),
        SemanticType::Decimal(p, s) => {
            if *p <= 38 {
                Some(PrimitiveType::Decimal128(*p, *s))
            } else {
                Some(PrimitiveType::Decimal256(*p, *s))
            }
        }
        SemanticType::Boolean => Some(PrimitiveType::Boolean),
        SemanticType::Date => Some(PrimitiveType::Date32),
        SemanticType::Time => Some(PrimitiveType::TimeMillis),
        SemanticType::Timestamp | SemanticType::LegacyDate => {
            Some(PrimitiveType::TimestampMicros)
        }
        SemanticType::String => Some(PrimitiveType::String),
        SemanticType::Binary => Some(PrimitiveType::Binary),
        _ => None,
    }
}

/// Recover a semantic type from an Arrow-level field type.
///
/// Lossy by design: shapes that share one physical/logical encoding map to a
/// single semantic type, and foreign shapes this codec never writes degrade
/// to the nearest one.
pub(crate) fn semantic_from_arrow(dt: &DataType) -> Result<SemanticType> {
    Ok(match dt {
        DataType::Boolean => SemanticType::Boolean,
        DataType::Int8 | DataType::Int16 | DataType::Int32 => SemanticType::Int32,
        DataType::Int64 => SemanticType::Int64,
        DataType::UInt8 | DataType::UInt16 => SemanticType::Int32,
        DataType::UInt32 => SemanticType::Int64,
        DataType::UInt64 => SemanticType::BigInteger,
        DataType::Float32 => SemanticType::Float32,
        DataType::Float64 => SemanticType::Float64,
        DataType::Utf8 | DataType::LargeUtf8 => SemanticType::String,
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => {
            SemanticType::Binary
        }
        DataType::Date32 => SemanticType::Date,
        DataType::Date64 => SemanticType::LegacyDate,
        DataType::Time32(TimeUnit::Second) | DataType::Time32(TimeUnit::Millisecond) => {
            SemanticType::Time
        }
        DataType::Time64(TimeUnit::Microsecond) | DataType::Time64(TimeUnit::Nanosecond) => {
            SemanticType::Time
        }
        DataType::Timestamp(_, _) => SemanticType::Timestamp,
        DataType::Decimal128(p, s) | DataType::Decimal256(p, s) => SemanticType::Decimal(*p, *s),
        DataType::List(item) | DataType::LargeList(item) => {
            SemanticType::List(Box::new(semantic_from_arrow(item.data_type())?))
        }
        DataType::Struct(fields) => SemanticType::Struct {
            fields: fields
                .iter()
                .map(|f| {
                    Ok(StructField::new(
                        f.name().clone(),
                        semantic_from_arrow(f.data_type())?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?,
            shape: None,
        },
        DataType::Map(entries, _) => match entries.data_type() {
            DataType::Struct(kv) if kv.len() == 2 => {
                SemanticType::Map(Box::new(semantic_from_arrow(kv[1].data_type())?))
            }
            other => {
                return Err(CodecError::unsupported_schema(format!(
                    "map entries must be a two-field group, found {:?}",
                    other
                )))
            }
        },
        other => {
            return Err(CodecError::unsupported_schema(format!(
                "no semantic mapping for Arrow type {:?}",
                other
            )))
        }
    })
}

/// Infer a semantic type from a single non-null cell, for schema resolution.
pub(crate) fn infer_cell_type(cell: &CellValue) -> Option<SemanticType> {
    match cell {
        CellValue::Null => None,
        CellValue::Boolean(_) => Some(SemanticType::Boolean),
        CellValue::Int32(_) => Some(SemanticType::Int32),
        CellValue::Int64(_) => Some(SemanticType::Int64),
        CellValue::BigInt(_) => Some(SemanticType::BigInteger),
        CellValue::Float32(_) => Some(SemanticType::Float32),
        CellValue::Float64(_) => Some(SemanticType::Float64),
        CellValue::Decimal { unscaled, scale } => {
            let (p, s) = minimal_precision_scale(unscaled, *scale);
            Some(SemanticType::Decimal(p.min(u8::MAX as u32) as u8, s as i8))
        }
        CellValue::String(_) => Some(SemanticType::String),
        CellValue::Bytes(_) => Some(SemanticType::Binary),
        CellValue::Date(_) => Some(SemanticType::Date),
        CellValue::Time(_) => Some(SemanticType::Time),
        CellValue::DateTime(_) => Some(SemanticType::Timestamp),
        CellValue::List(items) => {
            let element = items
                .iter()
                .filter_map(infer_cell_type)
                .reduce(unify)
                .unwrap_or(SemanticType::String);
            Some(SemanticType::List(Box::new(element)))
        }
        CellValue::Map(_) | CellValue::Record(_) => Some(SemanticType::Mapping),
        CellValue::Object(_) => Some(SemanticType::Object),
    }
}

/// Widen two inferred types to one that represents both values.
///
/// Unrelated kinds fall back to `String`, which every value can coerce into.
pub(crate) fn unify(a: SemanticType, b: SemanticType) -> SemanticType {
    use SemanticType::*;
    if a == b {
        return a;
    }
    match (a, b) {
        (Int32, Int64) | (Int64, Int32) => Int64,
        (Int32 | Int64, BigInteger) | (BigInteger, Int32 | Int64) => BigInteger,
        (Float32, Float64) | (Float64, Float32) => Float64,
        (Decimal(p1, s1), Decimal(p2, s2)) => {
            let int_digits = (p1 as i32 - s1 as i32).max(p2 as i32 - s2 as i32);
            let scale = s1.max(s2);
            Decimal(
                ((int_digits + scale as i32).max(1) as u32).min(u8::MAX as u32) as u8,
                scale,
            )
        }
        (Decimal(p, s), Int32) | (Int32, Decimal(p, s)) => {
            unify(Decimal(p, s), Decimal(10, 0))
        }
        (Decimal(p, s), Int64 | BigInteger) | (Int64 | BigInteger, Decimal(p, s)) => {
            unify(Decimal(p, s), Decimal(19, 0))
        }
        (List(a), List(b)) => List(Box::new(unify(*a, *b))),
        (Map(a), Map(b)) => Map(Box::new(unify(*a, *b))),
        (
            Struct {
                fields: fa,
                shape: sa,
            },
            Struct {
                fields: fb,
                shape: sb,
            },
        ) if fa.len() == fb.len()
            && fa.iter().zip(fb.iter()).all(|(x, y)| x.name == y.name) =>
        {
            SemanticType::Struct {
                fields: fa
                    .into_iter()
                    .zip(fb)
                    .map(|(x, y)| StructField::new(x.name, unify(x.dtype, y.dtype)))
                    .collect(),
                shape: if sa == sb { sa } else { None },
            }
        }
        _ => String,
    }
}

/// Normalize a raw cell against its resolved column type.
///
/// Produces a cell the Arrow conversion layer accepts directly: big integers
/// narrowed, decimals rescaled to the column scale, objects flattened into
/// ordered records, non-string values coerced for string columns.
pub(crate) fn encode_cell(
    value: CellValue,
    dtype: &SemanticType,
    column: &str,
    row: usize,
) -> Result<CellValue> {
    use SemanticType as T;

    if value.is_null() {
        return Ok(CellValue::Null);
    }
    match (dtype, value) {
        (T::Boolean, v @ CellValue::Boolean(_)) => Ok(v),
        (T::Int32, v @ CellValue::Int32(_)) => Ok(v),

        (T::Int64 | T::BigInteger, CellValue::Int32(i)) => Ok(CellValue::Int64(i as i64)),
        (T::Int64 | T::BigInteger, v @ CellValue::Int64(_)) => Ok(v),
        (T::Int64 | T::BigInteger, CellValue::BigInt(i)) => {
            use num::ToPrimitive;
            match i.to_i64() {
                Some(narrow) => Ok(CellValue::Int64(narrow)),
                None => Err(CodecError::UnsupportedType {
                    column: column.to_string(),
                    type_name: "BigInt beyond 64-bit range".to_string(),
                }),
            }
        }

        (T::Float32, v @ CellValue::Float32(_)) => Ok(v),
        (T::Float64, v @ CellValue::Float64(_)) => Ok(v),
        (T::Float64, CellValue::Float32(f)) => {
            Ok(CellValue::Float64(ordered_float::OrderedFloat(f.0 as f64)))
        }

        (T::Decimal(p, s), CellValue::Decimal { unscaled, scale }) => {
            let rescaled =
                crate::precision::fit_decimal(&unscaled, scale, *p, *s, column, row)?;
            Ok(CellValue::Decimal {
                unscaled: rescaled,
                scale: *s,
            })
        }
        (T::Decimal(p, s), CellValue::Int32(i)) => {
            let rescaled =
                crate::precision::fit_decimal(&num::BigInt::from(i), 0, *p, *s, column, row)?;
            Ok(CellValue::Decimal {
                unscaled: rescaled,
                scale: *s,
            })
        }
        (T::Decimal(p, s), CellValue::Int64(i)) => {
            let rescaled =
                crate::precision::fit_decimal(&num::BigInt::from(i), 0, *p, *s, column, row)?;
            Ok(CellValue::Decimal {
                unscaled: rescaled,
                scale: *s,
            })
        }
        (T::Decimal(p, s), CellValue::BigInt(i)) => {
            let rescaled = crate::precision::fit_decimal(&i, 0, *p, *s, column, row)?;
            Ok(CellValue::Decimal {
                unscaled: rescaled,
                scale: *s,
            })
        }

        (T::Date, v @ CellValue::Date(_)) => Ok(v),
        (T::Time, v @ CellValue::Time(_)) => Ok(v),
        (T::Timestamp | T::LegacyDate, v @ CellValue::DateTime(_)) => Ok(v),
        (T::Timestamp | T::LegacyDate, CellValue::Date(d)) => {
            Ok(CellValue::DateTime(d.to_datetime(civil::Time::midnight())))
        }

        (T::String, v @ CellValue::String(_)) => Ok(v),
        (T::String, other) => Ok(CellValue::String(Arc::from(other.to_string()))),

        (T::Binary, v @ CellValue::Bytes(_)) => Ok(v),

        (T::List(item), CellValue::List(items)) => Ok(CellValue::List(
            items
                .into_iter()
                .map(|v| encode_cell(v, item, column, row))
                .collect::<Result<Vec<_>>>()?,
        )),

        (T::Struct { fields, .. }, CellValue::Record(map)) => {
            encode_record(map, fields, column, row)
        }
        (T::Struct { fields, .. }, CellValue::Object(object)) => {
            encode_record(CellValue::flatten_object(object.as_ref()), fields, column, row)
        }
        // a mapping cell against a struct-classified column: entries become
        // fields, keys stringified the same way the classification saw them
        (T::Struct { fields, .. }, CellValue::Map(entries)) => {
            let mut map = indexmap::IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(Arc::from(key.to_string().as_str()), value);
            }
            encode_record(map, fields, column, row)
        }

        (T::Map(value_type), CellValue::Map(entries)) => {
            encode_map(entries, value_type, column, row)
        }
        (T::Map(value_type), CellValue::Record(map)) => {
            let entries = map
                .into_iter()
                .map(|(k, v)| (CellValue::String(k), v))
                .collect();
            encode_map(entries, value_type, column, row)
        }

        (T::Mapping | T::Object, _) => Err(CodecError::internal(format!(
            "column '{}' reached encoding with an unresolved type",
            column
        ))),

        (_, other) => Err(CodecError::UnsupportedType {
            column: column.to_string(),
            type_name: other.type_name().to_string(),
        }),
    }
}

fn encode_record(
    map: indexmap::IndexMap<Arc<str>, CellValue>,
    fields: &[StructField],
    column: &str,
    row: usize,
) -> Result<CellValue> {
    let mut out = indexmap::IndexMap::with_capacity(fields.len());
    for field in fields {
        let value = map
            .get(field.name.as_str())
            .cloned()
            .unwrap_or(CellValue::Null);
        out.insert(
            Arc::from(field.name.as_str()),
            encode_cell(value, &field.dtype, column, row)?,
        );
    }
    Ok(CellValue::Record(out))
}

fn encode_map(
    entries: Vec<(CellValue, CellValue)>,
    value_type: &SemanticType,
    column: &str,
    row: usize,
) -> Result<CellValue> {
    let mut out = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let key = match key {
            CellValue::String(s) => CellValue::String(s),
            CellValue::Null => {
                return Err(CodecError::UnsupportedType {
                    column: column.to_string(),
                    type_name: "null map key".to_string(),
                })
            }
            other => CellValue::String(Arc::from(other.to_string())),
        };
        out.push((key, encode_cell(value, value_type, column, row)?));
    }
    Ok(CellValue::Map(out))
}

pub(crate) const EPOCH_DATE: civil::Date = civil::date(1970, 1, 1);

pub(crate) fn date_to_epoch_days(d: civil::Date) -> Result<i32> {
    Ok(d.since(EPOCH_DATE)?.get_days() as i32)
}

pub(crate) fn epoch_days_to_date(days: i32) -> Result<civil::Date> {
    Ok(EPOCH_DATE.checked_add(Span::new().try_days(days as i64)?)?)
}

/// Millisecond of day; sub-millisecond precision is truncated.
pub(crate) fn time_to_millis_of_day(t: civil::Time) -> i32 {
    (t.hour() as i32 * 3600 + t.minute() as i32 * 60 + t.second() as i32) * 1000
        + t.subsec_nanosecond() / 1_000_000
}

pub(crate) fn millis_of_day_to_time(millis: i32) -> Result<civil::Time> {
    let seconds = millis.div_euclid(1000);
    let subsec_nanos = millis.rem_euclid(1000) * 1_000_000;
    Ok(civil::Time::new(
        (seconds / 3600) as i8,
        (seconds % 3600 / 60) as i8,
        (seconds % 60) as i8,
        subsec_nanos,
    )?)
}

/// Microseconds since the Unix epoch for a naive date-time in `tz`.
/// Nanosecond components are truncated, not rounded.
pub(crate) fn datetime_to_epoch_micros(dt: civil::DateTime, tz: &TimeZone) -> Result<i64> {
    Ok(tz.to_timestamp(dt)?.as_microsecond())
}

pub(crate) fn epoch_micros_to_datetime(micros: i64, tz: &TimeZone) -> Result<civil::DateTime> {
    Ok(tz.to_datetime(Timestamp::from_microsecond(micros)?))
}

/// Cap check for decimals produced by inference rather than resolution.
pub(crate) fn check_precision_cap(dtype: &SemanticType, column: &str) -> Result<()> {
    if let SemanticType::Decimal(p, _) = dtype {
        if *p == 0 || *p > MAX_PRECISION {
            return Err(CodecError::invalid_argument(format!(
                "column '{}': precision {} is outside 1..={}",
                column, p, MAX_PRECISION
            )));
        }
    }
    Ok(())
}
