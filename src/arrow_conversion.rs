//! Bidirectional conversion between Arrow arrays and cell values.
//!
//! The write direction consumes cells the encoding pass has already
//! normalized against the schema (decimals rescaled, objects flattened), so a
//! variant mismatch here is reported as a schema error. The read direction is
//! wider than what this codec writes: foreign files carry physical shapes
//! such as small integers or nanosecond timestamps, and those decode into the
//! nearest semantic representation.

use crate::precision::rescale;
use crate::reflect::shapes;
use crate::types::{
    date_to_epoch_days, datetime_to_epoch_micros, epoch_days_to_date, epoch_micros_to_datetime,
    millis_of_day_to_time, semantic_from_arrow,
};
use crate::{CellValue, CodecError, Result, SemanticType};
use arrow_array::{builder::*, Array, ArrayRef, LargeListArray, ListArray, MapArray, StructArray};
use arrow_schema::{DataType, Field, TimeUnit};
use bytes::Bytes;
use indexmap::IndexMap;
use jiff::tz::TimeZone;
use num::{BigInt, ToPrimitive};
use ordered_float::OrderedFloat;
use std::sync::Arc;

fn expected(what: &str, got: &CellValue) -> CodecError {
    CodecError::schema(format!("expected {} value, got {}", what, got.type_name()))
}

/// Helper function to downcast an array with better error messages
fn downcast_array<T: 'static>(array: &dyn Array) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        CodecError::internal(format!("failed to cast to {}", std::any::type_name::<T>()))
    })
}

/// Convert a column of normalized cells to an Arrow array.
pub(crate) fn cells_to_array(
    values: Vec<CellValue>,
    field: &Field,
    tz: &TimeZone,
) -> Result<ArrayRef> {
    match field.data_type() {
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Boolean(b) => builder.append_value(b),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Boolean", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int32 => {
            let mut builder = Int32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Int32(i) => builder.append_value(i),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Int32", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Int64(i) => builder.append_value(i),
                    CellValue::Int32(i) => builder.append_value(i as i64),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Int64", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float32 => {
            let mut builder = Float32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Float32(OrderedFloat(f)) => builder.append_value(f),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Float32", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Float64(OrderedFloat(f)) => builder.append_value(f),
                    CellValue::Float32(OrderedFloat(f)) => builder.append_value(f as f64),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Float64", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::with_capacity(values.len(), 0);
            for value in values {
                match value {
                    CellValue::String(s) => builder.append_value(&s),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("String", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Binary => {
            let mut builder = BinaryBuilder::with_capacity(values.len(), 0);
            for value in values {
                match value {
                    CellValue::Bytes(b) => builder.append_value(&b),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Bytes", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Date32 => {
            let mut builder = Date32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Date(d) => builder.append_value(date_to_epoch_days(d)?),
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Date", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            let mut builder = Time32MillisecondBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    CellValue::Time(t) => {
                        builder.append_value(crate::types::time_to_millis_of_day(t))
                    }
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Time", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Timestamp(TimeUnit::Microsecond, zone) => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(values.len())
                .with_timezone_opt(zone.clone());
            for value in values {
                match value {
                    CellValue::DateTime(dt) => {
                        builder.append_value(datetime_to_epoch_micros(dt, tz)?)
                    }
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("DateTime", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Decimal128(precision, scale) => {
            let mut builder = Decimal128Builder::with_capacity(values.len())
                .with_precision_and_scale(*precision, *scale)?;
            for value in values {
                match value {
                    CellValue::Decimal { unscaled, scale: s } => {
                        builder.append_value(decimal_to_i128(&unscaled, s, *scale)?)
                    }
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Decimal", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Decimal256(precision, scale) => {
            let mut builder = Decimal256Builder::with_capacity(values.len())
                .with_precision_and_scale(*precision, *scale)?;
            for value in values {
                match value {
                    CellValue::Decimal { unscaled, scale: s } => {
                        let aligned = align_scale(&unscaled, s, *scale)?;
                        builder.append_value(i256_from_bigint(&aligned)?);
                    }
                    CellValue::Null => builder.append_null(),
                    other => return Err(expected("Decimal", &other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::List(item_field) => build_list_array(values, item_field, tz),
        DataType::Map(entries_field, sorted) => {
            build_map_array(values, entries_field, *sorted, tz)
        }
        DataType::Struct(fields) => build_struct_array(values, fields, tz),
        dt => Err(CodecError::internal(format!(
            "unsupported data type for writing: {:?}",
            dt
        ))),
    }
}

fn align_scale(unscaled: &BigInt, from: i8, to: i8) -> Result<BigInt> {
    rescale(unscaled, from, to).ok_or_else(|| {
        CodecError::internal(format!(
            "decimal scale {} does not align with column scale {}",
            from, to
        ))
    })
}

fn decimal_to_i128(unscaled: &BigInt, from: i8, to: i8) -> Result<i128> {
    align_scale(unscaled, from, to)?.to_i128().ok_or_else(|| {
        CodecError::internal("decimal value exceeds 128-bit storage".to_string())
    })
}

/// Convert a BigInt to a 32-byte two's-complement value.
fn i256_from_bigint(value: &BigInt) -> Result<arrow_buffer::i256> {
    let (sign, mut bytes) = value.to_bytes_le();
    if bytes.len() > 32 {
        return Err(CodecError::internal(
            "decimal value exceeds 256-bit storage".to_string(),
        ));
    }
    bytes.resize(32, 0);

    if sign == num::bigint::Sign::Minus {
        for byte in &mut bytes {
            *byte = !*byte;
        }
        let mut carry = true;
        for byte in &mut bytes {
            if carry {
                let (new_byte, new_carry) = byte.overflowing_add(1);
                *byte = new_byte;
                carry = new_carry;
            } else {
                break;
            }
        }
    }

    let byte_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CodecError::internal("failed to widen decimal to 32 bytes".to_string()))?;
    Ok(arrow_buffer::i256::from_le_bytes(byte_array))
}

/// Convert a 32-byte two's-complement value back to a BigInt.
fn bigint_from_i256(value: arrow_buffer::i256) -> BigInt {
    let bytes = value.to_le_bytes();
    if bytes[31] & 0x80 != 0 {
        let mut inverted = [0u8; 32];
        for (i, &b) in bytes.iter().enumerate() {
            inverted[i] = !b;
        }
        let positive = BigInt::from_bytes_le(num::bigint::Sign::Plus, &inverted);
        -(positive + BigInt::from(1))
    } else {
        BigInt::from_bytes_le(num::bigint::Sign::Plus, &bytes)
    }
}

fn build_list_array(
    values: Vec<CellValue>,
    item_field: &Arc<Field>,
    tz: &TimeZone,
) -> Result<ArrayRef> {
    let mut all_items = Vec::new();
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut null_buffer_builder = arrow_buffer::BooleanBufferBuilder::new(values.len());
    offsets.push(0i32);

    for value in values {
        match value {
            CellValue::List(items) => {
                all_items.extend(items);
                offsets.push(all_items.len() as i32);
                null_buffer_builder.append(true);
            }
            CellValue::Null => {
                offsets.push(all_items.len() as i32);
                null_buffer_builder.append(false);
            }
            other => return Err(expected("List", &other)),
        }
    }

    let item_array = cells_to_array(all_items, item_field, tz)?;
    let offset_buffer = arrow_buffer::OffsetBuffer::new(offsets.into());
    let null_buffer = null_buffer_builder.finish();

    Ok(Arc::new(ListArray::new(
        item_field.clone(),
        offset_buffer,
        item_array,
        Some(null_buffer.into()),
    )))
}

fn build_map_array(
    values: Vec<CellValue>,
    entries_field: &Arc<Field>,
    _sorted: bool,
    tz: &TimeZone,
) -> Result<ArrayRef> {
    let (key_field, value_field) = match entries_field.data_type() {
        DataType::Struct(fields) if fields.len() == 2 => (&fields[0], &fields[1]),
        _ => {
            return Err(CodecError::internal(
                "map entries field must be a struct with exactly 2 fields".to_string(),
            ))
        }
    };

    let mut all_keys = Vec::new();
    let mut all_values = Vec::new();
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut null_buffer_builder = arrow_buffer::BooleanBufferBuilder::new(values.len());
    offsets.push(0i32);

    for value in values {
        match value {
            CellValue::Map(entries) => {
                for (k, v) in entries {
                    all_keys.push(k);
                    all_values.push(v);
                }
                offsets.push(all_keys.len() as i32);
                null_buffer_builder.append(true);
            }
            CellValue::Null => {
                offsets.push(all_keys.len() as i32);
                null_buffer_builder.append(false);
            }
            other => return Err(expected("Map", &other)),
        }
    }

    let key_array = cells_to_array(all_keys, key_field, tz)?;
    let value_array = cells_to_array(all_values, value_field, tz)?;

    let struct_fields = match entries_field.data_type() {
        DataType::Struct(fields) => fields.clone(),
        _ => unreachable!("map entries field must be a struct"),
    };
    let struct_array = StructArray::new(struct_fields, vec![key_array, value_array], None);

    let offset_buffer = arrow_buffer::OffsetBuffer::new(offsets.into());
    let null_buffer = null_buffer_builder.finish();

    Ok(Arc::new(MapArray::new(
        entries_field.clone(),
        offset_buffer,
        struct_array,
        Some(null_buffer.into()),
        false,
    )))
}

fn build_struct_array(
    values: Vec<CellValue>,
    fields: &arrow_schema::Fields,
    tz: &TimeZone,
) -> Result<ArrayRef> {
    let num_rows = values.len();
    let mut null_buffer_builder = arrow_buffer::BooleanBufferBuilder::new(num_rows);
    let mut field_columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(num_rows); fields.len()];

    for value in values {
        match value {
            CellValue::Record(map) => {
                null_buffer_builder.append(true);
                for (idx, field) in fields.iter().enumerate() {
                    let field_value = map
                        .get(field.name().as_str())
                        .cloned()
                        .unwrap_or(CellValue::Null);
                    field_columns[idx].push(field_value);
                }
            }
            CellValue::Null => {
                null_buffer_builder.append(false);
                for field_column in field_columns.iter_mut() {
                    field_column.push(CellValue::Null);
                }
            }
            other => return Err(expected("Record", &other)),
        }
    }

    let mut field_arrays = Vec::with_capacity(fields.len());
    for (column, field) in field_columns.into_iter().zip(fields.iter()) {
        field_arrays.push(cells_to_array(column, field, tz)?);
    }

    let null_buffer = null_buffer_builder.finish();
    Ok(Arc::new(StructArray::new(
        fields.clone(),
        field_arrays,
        Some(null_buffer.into()),
    )))
}

/// Convert a single value from an Arrow array into a cell, guided by the
/// column's semantic type and the call's time zone.
pub(crate) fn cell_from_array(
    array: &dyn Array,
    index: usize,
    dtype: &SemanticType,
    tz: &TimeZone,
) -> Result<CellValue> {
    use arrow_array::*;

    if array.is_null(index) {
        return Ok(CellValue::Null);
    }

    match array.data_type() {
        DataType::Boolean => {
            let array = downcast_array::<BooleanArray>(array)?;
            Ok(CellValue::Boolean(array.value(index)))
        }
        DataType::Int8 => {
            let array = downcast_array::<Int8Array>(array)?;
            Ok(CellValue::Int32(array.value(index) as i32))
        }
        DataType::Int16 => {
            let array = downcast_array::<Int16Array>(array)?;
            Ok(CellValue::Int32(array.value(index) as i32))
        }
        DataType::Int32 => {
            let array = downcast_array::<Int32Array>(array)?;
            Ok(CellValue::Int32(array.value(index)))
        }
        DataType::Int64 => {
            let array = downcast_array::<Int64Array>(array)?;
            let value = array.value(index);
            if matches!(dtype, SemanticType::BigInteger) {
                Ok(CellValue::BigInt(BigInt::from(value)))
            } else {
                Ok(CellValue::Int64(value))
            }
        }
        DataType::UInt8 => {
            let array = downcast_array::<UInt8Array>(array)?;
            Ok(CellValue::Int32(array.value(index) as i32))
        }
        DataType::UInt16 => {
            let array = downcast_array::<UInt16Array>(array)?;
            Ok(CellValue::Int32(array.value(index) as i32))
        }
        DataType::UInt32 => {
            let array = downcast_array::<UInt32Array>(array)?;
            Ok(CellValue::Int64(array.value(index) as i64))
        }
        DataType::UInt64 => {
            let array = downcast_array::<UInt64Array>(array)?;
            Ok(CellValue::BigInt(BigInt::from(array.value(index))))
        }
        DataType::Float32 => {
            let array = downcast_array::<Float32Array>(array)?;
            Ok(CellValue::Float32(OrderedFloat(array.value(index))))
        }
        DataType::Float64 => {
            let array = downcast_array::<Float64Array>(array)?;
            Ok(CellValue::Float64(OrderedFloat(array.value(index))))
        }
        DataType::Utf8 => {
            let array = downcast_array::<StringArray>(array)?;
            Ok(CellValue::String(Arc::from(array.value(index))))
        }
        DataType::LargeUtf8 => {
            let array = downcast_array::<LargeStringArray>(array)?;
            Ok(CellValue::String(Arc::from(array.value(index))))
        }
        DataType::Binary => {
            let array = downcast_array::<BinaryArray>(array)?;
            Ok(CellValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        DataType::LargeBinary => {
            let array = downcast_array::<LargeBinaryArray>(array)?;
            Ok(CellValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        DataType::FixedSizeBinary(_) => {
            let array = downcast_array::<FixedSizeBinaryArray>(array)?;
            Ok(CellValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        DataType::Date32 => {
            let array = downcast_array::<Date32Array>(array)?;
            Ok(CellValue::Date(epoch_days_to_date(array.value(index))?))
        }
        DataType::Date64 => {
            let array = downcast_array::<Date64Array>(array)?;
            let micros = array
                .value(index)
                .checked_mul(1_000)
                .ok_or_else(|| CodecError::corrupt("date64 out of range".to_string()))?;
            Ok(CellValue::DateTime(epoch_micros_to_datetime(micros, tz)?))
        }
        DataType::Time32(unit) => {
            let millis = match unit {
                TimeUnit::Second => {
                    let array = downcast_array::<Time32SecondArray>(array)?;
                    array.value(index) * 1_000
                }
                TimeUnit::Millisecond => {
                    let array = downcast_array::<Time32MillisecondArray>(array)?;
                    array.value(index)
                }
                other => {
                    return Err(CodecError::unsupported_schema(format!(
                        "time32 unit {:?}",
                        other
                    )))
                }
            };
            Ok(CellValue::Time(millis_of_day_to_time(millis)?))
        }
        DataType::Time64(unit) => {
            let millis = match unit {
                TimeUnit::Microsecond => {
                    let array = downcast_array::<Time64MicrosecondArray>(array)?;
                    (array.value(index) / 1_000) as i32
                }
                TimeUnit::Nanosecond => {
                    let array = downcast_array::<Time64NanosecondArray>(array)?;
                    (array.value(index) / 1_000_000) as i32
                }
                other => {
                    return Err(CodecError::unsupported_schema(format!(
                        "time64 unit {:?}",
                        other
                    )))
                }
            };
            Ok(CellValue::Time(millis_of_day_to_time(millis)?))
        }
        DataType::Timestamp(unit, _) => {
            let micros = match unit {
                TimeUnit::Second => {
                    let array = downcast_array::<TimestampSecondArray>(array)?;
                    array
                        .value(index)
                        .checked_mul(1_000_000)
                        .ok_or_else(|| CodecError::corrupt("timestamp out of range".to_string()))?
                }
                TimeUnit::Millisecond => {
                    let array = downcast_array::<TimestampMillisecondArray>(array)?;
                    array
                        .value(index)
                        .checked_mul(1_000)
                        .ok_or_else(|| CodecError::corrupt("timestamp out of range".to_string()))?
                }
                TimeUnit::Microsecond => {
                    let array = downcast_array::<TimestampMicrosecondArray>(array)?;
                    array.value(index)
                }
                TimeUnit::Nanosecond => {
                    let array = downcast_array::<TimestampNanosecondArray>(array)?;
                    array.value(index) / 1_000
                }
            };
            Ok(CellValue::DateTime(epoch_micros_to_datetime(micros, tz)?))
        }
        DataType::Decimal128(_, scale) => {
            let array = downcast_array::<Decimal128Array>(array)?;
            Ok(CellValue::Decimal {
                unscaled: BigInt::from(array.value(index)),
                scale: *scale,
            })
        }
        DataType::Decimal256(_, scale) => {
            let array = downcast_array::<Decimal256Array>(array)?;
            Ok(CellValue::Decimal {
                unscaled: bigint_from_i256(array.value(index)),
                scale: *scale,
            })
        }
        DataType::List(item_field) => {
            let array = downcast_array::<ListArray>(array)?;
            let items = array.value(index);
            let item_type = element_type(dtype, item_field)?;
            let mut values = Vec::with_capacity(items.len());
            for i in 0..items.len() {
                values.push(cell_from_array(&items, i, &item_type, tz)?);
            }
            Ok(CellValue::List(values))
        }
        DataType::LargeList(item_field) => {
            let array = downcast_array::<LargeListArray>(array)?;
            let items = array.value(index);
            let item_type = element_type(dtype, item_field)?;
            let mut values = Vec::with_capacity(items.len());
            for i in 0..items.len() {
                values.push(cell_from_array(&items, i, &item_type, tz)?);
            }
            Ok(CellValue::List(values))
        }
        DataType::Map(_, _) => {
            let array = downcast_array::<MapArray>(array)?;
            let entries = array.value(index);
            let keys = entries.column(0);
            let values = entries.column(1);

            let key_type = semantic_from_arrow(keys.data_type())?;
            let value_type = match dtype {
                SemanticType::Map(value) => (**value).clone(),
                _ => semantic_from_arrow(values.data_type())?,
            };

            let mut pairs = Vec::with_capacity(keys.len());
            for i in 0..keys.len() {
                let key = cell_from_array(keys, i, &key_type, tz)?;
                let value = cell_from_array(values, i, &value_type, tz)?;
                pairs.push((key, value));
            }
            Ok(CellValue::Map(pairs))
        }
        DataType::Struct(_) => {
            let array = downcast_array::<StructArray>(array)?;
            let (semantic_fields, shape) = match dtype {
                SemanticType::Struct { fields, shape } => (Some(fields), shape.clone()),
                _ => (None, None),
            };

            let mut record = IndexMap::new();
            for (col_idx, field) in array.fields().iter().enumerate() {
                let column = array.column(col_idx);
                let field_type = match semantic_fields.and_then(|f| f.get(col_idx)) {
                    Some(f) => f.dtype.clone(),
                    None => semantic_from_arrow(field.data_type())?,
                };
                let value = cell_from_array(column, index, &field_type, tz)?;
                record.insert(Arc::from(field.name().as_str()), value);
            }

            if let Some(name) = shape {
                if let Some(build) = shapes().resolve(&name) {
                    return Ok(build(&record));
                }
            }
            Ok(CellValue::Record(record))
        }
        dt => Err(CodecError::unsupported_schema(format!(
            "unsupported data type for reading: {:?}",
            dt
        ))),
    }
}

fn element_type(dtype: &SemanticType, item_field: &Field) -> Result<SemanticType> {
    match dtype {
        SemanticType::List(item) => Ok((**item).clone()),
        _ => semantic_from_arrow(item_field.data_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_conversion_roundtrip() {
        let values = vec![
            CellValue::Boolean(true),
            CellValue::Boolean(false),
            CellValue::Null,
        ];
        let field = Field::new("test", DataType::Boolean, true);
        let tz = TimeZone::UTC;
        let array = cells_to_array(values.clone(), &field, &tz).unwrap();

        for (i, expected) in values.iter().enumerate() {
            let actual =
                cell_from_array(array.as_ref(), i, &SemanticType::Boolean, &tz).unwrap();
            assert_eq!(&actual, expected);
        }
    }

    #[test]
    fn test_i256_bigint_round_trip() {
        let cases = [
            BigInt::from(0),
            BigInt::from(1),
            BigInt::from(-1),
            BigInt::parse_bytes(b"99999999999999999999999999999999999999999999", 10).unwrap(),
            -BigInt::parse_bytes(b"12345678901234567890123456789012345678901234", 10).unwrap(),
        ];
        for value in cases {
            let wide = i256_from_bigint(&value).unwrap();
            assert_eq!(bigint_from_i256(wide), value);
        }
    }

    #[test]
    fn test_timestamp_encoding_uses_the_zone() {
        let tz = TimeZone::get("America/New_York").unwrap();
        let field = Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC"))),
            true,
        );
        // 2021-06-01 12:00 EDT is 16:00 UTC
        let dt = jiff::civil::date(2021, 6, 1).at(12, 0, 0, 0);
        let array = cells_to_array(vec![CellValue::DateTime(dt)], &field, &tz).unwrap();
        let micros = downcast_array::<arrow_array::TimestampMicrosecondArray>(array.as_ref())
            .unwrap()
            .value(0);
        assert_eq!(micros, 1622563200000000);

        let back = cell_from_array(array.as_ref(), 0, &SemanticType::Timestamp, &tz).unwrap();
        assert_eq!(back, CellValue::DateTime(dt));
    }

    #[test]
    fn test_decimal_narrow_storage() {
        let field = Field::new("d", DataType::Decimal128(10, 2), true);
        let tz = TimeZone::UTC;
        let array = cells_to_array(
            vec![CellValue::decimal(12345, 2), CellValue::Null],
            &field,
            &tz,
        )
        .unwrap();
        let back =
            cell_from_array(array.as_ref(), 0, &SemanticType::Decimal(10, 2), &tz).unwrap();
        assert_eq!(back, CellValue::decimal(12345, 2));
    }
}
