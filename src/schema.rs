//! Parquet-facing schema tree and its construction from a dataset.
//!
//! A [`Schema`] is built fresh for every write call. Primitive columns map
//! straight through the type codec; `Mapping`, `Object`, and under-specified
//! decimal declarations are resolved by scanning the column's values. The
//! MAP-versus-STRUCT decision deliberately scans all rows rather than a
//! sample: silently mis-classifying a column would silently change the file's
//! schema.

use crate::dataset::{Column, DEFAULT_NAME};
use crate::precision::DecimalStats;
use crate::reflect::descriptors;
use crate::types::{
    check_precision_cap, infer_cell_type, leaf_primitive, unify, StructField,
};
use crate::{CellValue, CodecError, DataSource, Result, SemanticType};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Core schema representation for Parquet files
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub root: SchemaNode,
}

/// Represents a node in the Parquet schema tree
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// A struct with named fields
    Struct {
        name: String,
        nullable: bool,
        fields: Vec<SchemaNode>,
    },
    /// A list containing items of a single type
    List {
        name: String,
        nullable: bool,
        item: Box<SchemaNode>,
    },
    /// A map with key-value pairs
    Map {
        name: String,
        nullable: bool,
        key: Box<SchemaNode>,
        value: Box<SchemaNode>,
    },
    /// A primitive/leaf type
    Primitive {
        name: String,
        primitive_type: PrimitiveType,
        nullable: bool,
    },
}

/// Physical encodings this codec emits.
///
/// Timestamps are always stored UTC-adjusted at microsecond precision;
/// decimals widen from 16-byte to 32-byte storage past precision 38.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal128(u8, i8),
    Decimal256(u8, i8),
    String,
    Binary,
    Date32,
    TimeMillis,
    TimestampMicros,
}

impl SchemaNode {
    /// Get the name of this schema node
    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Struct { name, .. } => name,
            SchemaNode::List { name, .. } => name,
            SchemaNode::Map { name, .. } => name,
            SchemaNode::Primitive { name, .. } => name,
        }
    }

    /// Check if this node is nullable
    pub fn is_nullable(&self) -> bool {
        match self {
            SchemaNode::Struct { nullable, .. } => *nullable,
            SchemaNode::List { nullable, .. } => *nullable,
            SchemaNode::Map { nullable, .. } => *nullable,
            SchemaNode::Primitive { nullable, .. } => *nullable,
        }
    }
}

/// Builder for creating schemas
pub struct SchemaBuilder {
    root: Option<SchemaNode>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(mut self, root: SchemaNode) -> Self {
        self.root = Some(root);
        self
    }

    pub fn build(self) -> Result<Schema> {
        match self.root {
            Some(root @ SchemaNode::Struct { .. }) => Ok(Schema { root }),
            Some(_) => Err(CodecError::schema("root schema node must be a struct")),
            None => Err(CodecError::schema("schema must have a root node")),
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the schema tree and the resolved column list for a dataset.
///
/// `precisions` is the output of precision resolution and must contain an
/// entry for every declared decimal column.
pub(crate) fn dataset_schema(
    source: &dyn DataSource,
    precisions: &HashMap<String, (u8, i8)>,
) -> Result<(Schema, Vec<Column>)> {
    let root_name = match source.name() {
        "" => DEFAULT_NAME.to_string(),
        name => name.to_string(),
    };

    let mut fields = Vec::with_capacity(source.column_count());
    let mut columns = Vec::with_capacity(source.column_count());
    for col in 0..source.column_count() {
        let name = source.column_name(col).to_string();
        let resolved = resolve_column_type(source, col, &name, precisions)?;
        fields.push(node_for(&resolved, &name)?);
        columns.push(Column::new(name, resolved));
    }

    let schema = SchemaBuilder::new()
        .with_root(SchemaNode::Struct {
            name: root_name,
            nullable: false,
            fields,
        })
        .build()?;
    Ok((schema, columns))
}

fn resolve_column_type(
    source: &dyn DataSource,
    col: usize,
    column: &str,
    precisions: &HashMap<String, (u8, i8)>,
) -> Result<SemanticType> {
    let declared = source.column_type(col);
    if let SemanticType::Decimal(_, _) = declared {
        let (p, s) = precisions.get(column).copied().ok_or_else(|| {
            CodecError::internal(format!("column '{}' missing resolved precision", column))
        })?;
        return Ok(SemanticType::Decimal(p, s));
    }
    if !needs_resolution(&declared) {
        return Ok(declared);
    }

    let values: Vec<CellValue> = (0..source.row_count())
        .map(|row| source.value(row, col))
        .filter(|v| !v.is_null())
        .collect();
    resolve_values(&declared, &values, column)
}

/// Whether a declared type needs a value scan before it maps onto Parquet.
fn needs_resolution(dtype: &SemanticType) -> bool {
    match dtype {
        SemanticType::Mapping | SemanticType::Object => true,
        SemanticType::Decimal(p, _) => *p == 0,
        SemanticType::List(item) => needs_resolution(item),
        SemanticType::Map(value) => needs_resolution(value),
        SemanticType::Struct { fields, .. } => {
            fields.iter().any(|f| needs_resolution(&f.dtype))
        }
        _ => false,
    }
}

fn resolve_values(
    declared: &SemanticType,
    values: &[CellValue],
    column: &str,
) -> Result<SemanticType> {
    match declared {
        SemanticType::Mapping => classify_mapping(values, column),
        SemanticType::Object => resolve_object(values, column),
        SemanticType::Decimal(0, _) => {
            let mut stats = DecimalStats::default();
            for value in values {
                match value {
                    CellValue::Decimal { unscaled, scale } => stats.observe(unscaled, *scale),
                    CellValue::Int32(i) => stats.observe(&num::BigInt::from(*i), 0),
                    CellValue::Int64(i) => stats.observe(&num::BigInt::from(*i), 0),
                    CellValue::BigInt(i) => stats.observe(i, 0),
                    _ => {}
                }
            }
            let (p, s) = stats.finish();
            let dtype = SemanticType::Decimal(p.min(u8::MAX as u32) as u8, s as i8);
            check_precision_cap(&dtype, column)?;
            Ok(dtype)
        }
        SemanticType::List(item) => {
            let mut elements = Vec::new();
            for value in values {
                match value {
                    CellValue::List(items) => {
                        elements.extend(items.iter().filter(|v| !v.is_null()).cloned())
                    }
                    other => {
                        return Err(CodecError::UnsupportedType {
                            column: column.to_string(),
                            type_name: other.type_name().to_string(),
                        })
                    }
                }
            }
            Ok(SemanticType::List(Box::new(resolve_values(
                item, &elements, column,
            )?)))
        }
        SemanticType::Map(value_type) => {
            let mut entry_values = Vec::new();
            for value in values {
                for (_, v) in mapping_entries(value, column)? {
                    if !v.is_null() {
                        entry_values.push(v);
                    }
                }
            }
            Ok(SemanticType::Map(Box::new(resolve_values(
                value_type,
                &entry_values,
                column,
            )?)))
        }
        SemanticType::Struct { fields, shape } => {
            let mut resolved_fields = Vec::with_capacity(fields.len());
            for field in fields {
                if !needs_resolution(&field.dtype) {
                    resolved_fields.push(field.clone());
                    continue;
                }
                let mut field_values = Vec::new();
                for value in values {
                    let entry = match value {
                        CellValue::Record(map) => map.get(field.name.as_str()).cloned(),
                        CellValue::Object(object) => Some(object.get(&field.name)),
                        CellValue::Map(entries) => entries
                            .iter()
                            .find(|(k, _)| k.to_string() == field.name)
                            .map(|(_, v)| v.clone()),
                        other => {
                            return Err(CodecError::UnsupportedType {
                                column: column.to_string(),
                                type_name: other.type_name().to_string(),
                            })
                        }
                    };
                    if let Some(v) = entry {
                        if !v.is_null() {
                            field_values.push(v);
                        }
                    }
                }
                resolved_fields.push(StructField::new(
                    field.name.clone(),
                    resolve_values(&field.dtype, &field_values, column)?,
                ));
            }
            Ok(SemanticType::Struct {
                fields: resolved_fields,
                shape: shape.clone(),
            })
        }
        other => Ok(other.clone()),
    }
}

/// Group inference for values that already share one runtime kind.
fn infer_group(values: &[CellValue], column: &str) -> Result<SemanticType> {
    let preliminary = values
        .iter()
        .filter_map(infer_cell_type)
        .reduce(unify)
        .unwrap_or(SemanticType::String);
    if needs_resolution(&preliminary) {
        resolve_values(&preliminary, values, column)
    } else {
        check_precision_cap(&preliminary, column)?;
        Ok(preliminary)
    }
}

fn mapping_entries(
    value: &CellValue,
    column: &str,
) -> Result<Vec<(String, CellValue)>> {
    match value {
        CellValue::Map(entries) => Ok(entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()),
        CellValue::Record(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()),
        other => Err(CodecError::UnsupportedType {
            column: column.to_string(),
            type_name: other.type_name().to_string(),
        }),
    }
}

/// MAP versus STRUCT decision for a mapping column.
///
/// One runtime value type across every key of every row emits MAP; more than
/// one emits STRUCT with one field per distinct key in first-seen order, and
/// a row missing a key encodes that field as null.
fn classify_mapping(values: &[CellValue], column: &str) -> Result<SemanticType> {
    let mut keys: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Vec<CellValue>> = HashMap::new();
    let mut all_values: Vec<CellValue> = Vec::new();
    let mut kinds: Vec<&'static str> = Vec::new();

    for value in values {
        for (key, entry) in mapping_entries(value, column)? {
            if !by_key.contains_key(&key) {
                keys.push(key.clone());
                by_key.insert(key.clone(), Vec::new());
            }
            if entry.is_null() {
                continue;
            }
            let kind = entry.type_name();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
            if let Some(seen) = by_key.get_mut(&key) {
                seen.push(entry.clone());
            }
            all_values.push(entry);
        }
    }

    if kinds.len() <= 1 {
        return Ok(SemanticType::Map(Box::new(infer_group(
            &all_values,
            column,
        )?)));
    }

    let mut fields = Vec::with_capacity(keys.len());
    for key in keys {
        let field_values = &by_key[&key];
        let field_kinds: Vec<&'static str> = field_values
            .iter()
            .map(|v| v.type_name())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let dtype = match field_kinds.len() {
            0 => SemanticType::String,
            1 => infer_group(field_values, column)?,
            // one key carrying several runtime types falls back to text
            _ => SemanticType::String,
        };
        fields.push(StructField::new(key, dtype));
    }
    Ok(SemanticType::record(fields))
}

/// Flatten a bean-shaped column through the descriptor cache.
fn resolve_object(values: &[CellValue], column: &str) -> Result<SemanticType> {
    let mut shape: Option<String> = None;
    let mut field_names: Vec<std::sync::Arc<str>> = Vec::new();
    let mut flattened: Vec<IndexMap<std::sync::Arc<str>, CellValue>> = Vec::new();

    for value in values {
        match value {
            CellValue::Object(object) => {
                if field_names.is_empty() {
                    let descriptor = descriptors().describe(object.as_ref());
                    shape = Some(descriptor.type_name.clone());
                    field_names = descriptor.fields.clone();
                }
                flattened.push(CellValue::flatten_object(object.as_ref()));
            }
            CellValue::Record(map) => {
                if field_names.is_empty() {
                    field_names = map.keys().cloned().collect();
                }
                flattened.push(map.clone());
            }
            other => {
                return Err(CodecError::UnsupportedType {
                    column: column.to_string(),
                    type_name: other.type_name().to_string(),
                })
            }
        }
    }

    if field_names.is_empty() {
        return Err(CodecError::schema(format!(
            "column '{}' has no values to derive a record shape from",
            column
        )));
    }

    let mut fields = Vec::with_capacity(field_names.len());
    for name in &field_names {
        let field_values: Vec<CellValue> = flattened
            .iter()
            .filter_map(|map| map.get(name.as_ref()))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        let field_kinds: std::collections::BTreeSet<&'static str> =
            field_values.iter().map(|v| v.type_name()).collect();
        let dtype = match field_kinds.len() {
            0 => SemanticType::String,
            1 => infer_group(&field_values, column)?,
            _ => SemanticType::String,
        };
        fields.push(StructField::new(name.to_string(), dtype));
    }
    Ok(SemanticType::Struct { fields, shape })
}

/// Schema node for a resolved semantic type.
pub(crate) fn node_for(dtype: &SemanticType, name: &str) -> Result<SchemaNode> {
    if let Some(primitive_type) = leaf_primitive(dtype) {
        check_precision_cap(dtype, name)?;
        return Ok(SchemaNode::Primitive {
            name: name.to_string(),
            primitive_type,
            nullable: true,
        });
    }
    match dtype {
        SemanticType::List(item) => Ok(SchemaNode::List {
            name: name.to_string(),
            nullable: true,
            item: Box::new(node_for(item, "item")?),
        }),
        SemanticType::Struct { fields, .. } => Ok(SchemaNode::Struct {
            name: name.to_string(),
            nullable: true,
            fields: fields
                .iter()
                .map(|f| node_for(&f.dtype, &f.name))
                .collect::<Result<Vec<_>>>()?,
        }),
        SemanticType::Map(value) => Ok(SchemaNode::Map {
            name: name.to_string(),
            nullable: true,
            key: Box::new(SchemaNode::Primitive {
                name: "key".to_string(),
                primitive_type: PrimitiveType::String,
                nullable: false,
            }),
            value: Box::new(node_for(value, "value")?),
        }),
        other => Err(CodecError::schema(format!(
            "column '{}' has unresolved type {}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_schema_creation() {
        let schema = SchemaBuilder::new()
            .with_root(SchemaNode::Struct {
                name: "root".to_string(),
                nullable: false,
                fields: vec![
                    SchemaNode::Primitive {
                        name: "id".to_string(),
                        primitive_type: PrimitiveType::Int64,
                        nullable: false,
                    },
                    SchemaNode::Primitive {
                        name: "name".to_string(),
                        primitive_type: PrimitiveType::String,
                        nullable: true,
                    },
                ],
            })
            .build()
            .unwrap();

        assert_eq!(schema.root.name(), "root");
        assert!(!schema.root.is_nullable());
    }

    #[test]
    fn test_root_must_be_struct() {
        let result = SchemaBuilder::new()
            .with_root(SchemaNode::Primitive {
                name: "id".to_string(),
                primitive_type: PrimitiveType::Int64,
                nullable: false,
            })
            .build();
        assert!(result.is_err());
    }

    fn map_cell(pairs: &[(&str, CellValue)]) -> CellValue {
        CellValue::Map(
            pairs
                .iter()
                .map(|(k, v)| (CellValue::String(Arc::from(*k)), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_homogeneous_mapping_classifies_as_map() {
        let values = vec![
            map_cell(&[("a", CellValue::Int32(1)), ("b", CellValue::Int32(2))]),
            map_cell(&[("c", CellValue::Int32(3))]),
        ];
        let resolved = classify_mapping(&values, "m").unwrap();
        assert_eq!(
            resolved,
            SemanticType::Map(Box::new(SemanticType::Int32))
        );
    }

    #[test]
    fn test_mixed_mapping_classifies_as_struct_in_first_seen_order() {
        let values = vec![
            map_cell(&[("a", CellValue::Int32(1))]),
            map_cell(&[
                ("b", CellValue::String(Arc::from("x"))),
                ("a", CellValue::Int32(2)),
            ]),
        ];
        let resolved = classify_mapping(&values, "m").unwrap();
        assert_eq!(
            resolved,
            SemanticType::record(vec![
                StructField::new("a", SemanticType::Int32),
                StructField::new("b", SemanticType::String),
            ])
        );
    }

    #[test]
    fn test_nested_map_values_resolve_recursively() {
        let inner = map_cell(&[("x", CellValue::Int64(5))]);
        let values = vec![map_cell(&[("outer", inner)])];
        let resolved = classify_mapping(&values, "m").unwrap();
        assert_eq!(
            resolved,
            SemanticType::Map(Box::new(SemanticType::Map(Box::new(SemanticType::Int64))))
        );
    }

    #[test]
    fn test_map_node_shape() {
        let node = node_for(
            &SemanticType::Map(Box::new(SemanticType::Int64)),
            "attributes",
        )
        .unwrap();
        match node {
            SchemaNode::Map { name, key, value, .. } => {
                assert_eq!(name, "attributes");
                assert!(!key.is_nullable());
                assert_eq!(value.name(), "value");
            }
            other => panic!("expected map node, got {:?}", other),
        }
    }
}
