use crate::precision::rescale;
use crate::traits::RecordLike;
use bytes::Bytes;
use indexmap::IndexMap;
use jiff::civil;
use num::BigInt;
use ordered_float::OrderedFloat;
use std::fmt;
use std::sync::Arc;

/// Dynamic cell value flowing between a dataset and the codec.
///
/// Temporal values are naive (no zone); the time zone context supplied to a
/// write or read call decides how they map onto Parquet's UTC-based encoding.
/// Decimals carry an arbitrary-precision unscaled integer plus a scale and
/// compare numerically, so `1.5` and `1.50` are equal.
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// Arbitrary-precision integer; must fit in 64 bits when written.
    BigInt(BigInt),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    /// `unscaled * 10^(-scale)`
    Decimal { unscaled: BigInt, scale: i8 },
    String(Arc<str>),
    Bytes(Bytes),
    Date(civil::Date),
    Time(civil::Time),
    /// Naive local date-time, converted through the call's time zone.
    DateTime(civil::DateTime),
    List(Vec<CellValue>),
    /// Key/value pairs in insertion order.
    Map(Vec<(CellValue, CellValue)>),
    /// Struct value with ordered fields.
    Record(IndexMap<Arc<str>, CellValue>),
    /// Bean-like value flattened through its [`RecordLike`] implementation.
    Object(Arc<dyn RecordLike>),
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "Null",
            CellValue::Boolean(_) => "Boolean",
            CellValue::Int32(_) => "Int32",
            CellValue::Int64(_) => "Int64",
            CellValue::BigInt(_) => "BigInt",
            CellValue::Float32(_) => "Float32",
            CellValue::Float64(_) => "Float64",
            CellValue::Decimal { .. } => "Decimal",
            CellValue::String(_) => "String",
            CellValue::Bytes(_) => "Bytes",
            CellValue::Date(_) => "Date",
            CellValue::Time(_) => "Time",
            CellValue::DateTime(_) => "DateTime",
            CellValue::List(_) => "List",
            CellValue::Map(_) => "Map",
            CellValue::Record(_) => "Record",
            CellValue::Object(_) => "Object",
        }
    }

    /// Construct a decimal cell from an unscaled value and scale.
    pub fn decimal(unscaled: impl Into<BigInt>, scale: i8) -> Self {
        CellValue::Decimal {
            unscaled: unscaled.into(),
            scale,
        }
    }

    /// Flatten an object cell into an ordered field map.
    pub(crate) fn flatten_object(object: &dyn RecordLike) -> IndexMap<Arc<str>, CellValue> {
        let mut map = IndexMap::new();
        for name in object.field_names() {
            let value = object.get(&name);
            map.insert(name, value);
        }
        map
    }
}

fn decimal_eq(u1: &BigInt, s1: i8, u2: &BigInt, s2: i8) -> bool {
    if s1 == s2 {
        return u1 == u2;
    }
    let target = s1.max(s2);
    match (rescale(u1, s1, target), rescale(u2, s2, target)) {
        (Some(a), Some(b)) => a == b,
        // rescaling to a larger scale never fails, but stay conservative
        _ => false,
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        use CellValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Float32(a), Float32(b)) => a == b,
            (Float64(a), Float64(b)) => a == b,
            (
                Decimal {
                    unscaled: u1,
                    scale: s1,
                },
                Decimal {
                    unscaled: u2,
                    scale: s2,
                },
            ) => decimal_eq(u1, *s1, u2, *s2),
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Record(a), Record(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((k1, v1), (k2, v2))| k1 == k2 && v1 == v2)
            }
            (Object(a), Object(b)) => {
                CellValue::flatten_object(a.as_ref()) == CellValue::flatten_object(b.as_ref())
            }
            // an object compares equal to its flattened form, which is what a
            // round trip through a file materializes
            (Object(a), Record(b)) | (Record(b), Object(a)) => {
                &CellValue::flatten_object(a.as_ref()) == b
            }
            _ => false,
        }
    }
}

/// Render the canonical text form, used when a value lands in a String column.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Int32(i) => write!(f, "{}", i),
            CellValue::Int64(i) => write!(f, "{}", i),
            CellValue::BigInt(i) => write!(f, "{}", i),
            CellValue::Float32(OrderedFloat(v)) => write!(f, "{}", v),
            CellValue::Float64(OrderedFloat(v)) => write!(f, "{}", v),
            CellValue::Decimal { unscaled, scale } => {
                write!(f, "{}", format_decimal(unscaled, *scale))
            }
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Bytes(b) => {
                for byte in b.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            CellValue::Date(d) => write!(f, "{}", d),
            CellValue::Time(t) => write!(f, "{}", t),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
            CellValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            CellValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            CellValue::Record(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            CellValue::Object(o) => write!(f, "{}", o.type_name()),
        }
    }
}

fn format_decimal(unscaled: &BigInt, scale: i8) -> String {
    let negative = unscaled.sign() == num::bigint::Sign::Minus;
    let digits = unscaled.magnitude().to_string();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if scale <= 0 {
        out.push_str(&digits);
        for _ in 0..(-scale) {
            out.push('0');
        }
    } else {
        let scale = scale as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            out.push_str(int_part);
            out.push('.');
            out.push_str(frac_part);
        } else {
            out.push_str("0.");
            for _ in 0..(scale - digits.len()) {
                out.push('0');
            }
            out.push_str(&digits);
        }
    }
    out
}
