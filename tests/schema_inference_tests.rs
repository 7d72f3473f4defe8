use std::any::TypeId;
use std::sync::Arc;
use tabular_parquet::*;

use test_helpers::*;

fn mapping_dataset(values: Vec<CellValue>) -> Dataset {
    Dataset::new(
        "props",
        vec![Column::new("attributes", SemanticType::Mapping)],
        values.into_iter().map(|v| vec![v]).collect(),
    )
    .unwrap()
}

#[test]
fn test_homogeneous_mapping_roundtrips_as_map() {
    let dataset = mapping_dataset(vec![
        map_cell(&[("a", CellValue::Int64(1)), ("b", CellValue::Int64(2))]),
        map_cell(&[("c", CellValue::Int64(3))]),
        CellValue::Null,
    ]);

    let back = roundtrip(&dataset);
    assert_eq!(
        back.columns()[0].dtype,
        SemanticType::Map(Box::new(SemanticType::Int64))
    );
    assert_eq!(
        back.rows()[0][0],
        map_cell(&[("a", CellValue::Int64(1)), ("b", CellValue::Int64(2))])
    );
    assert_eq!(back.rows()[1][0], map_cell(&[("c", CellValue::Int64(3))]));
    assert!(back.rows()[2][0].is_null());
}

#[test]
fn test_heterogeneous_mapping_roundtrips_as_struct() {
    // Int64 in one row, String in another: one field per key, first-seen order
    let dataset = mapping_dataset(vec![
        map_cell(&[("count", CellValue::Int64(5))]),
        map_cell(&[("label", s("high")), ("count", CellValue::Int64(9))]),
    ]);

    let back = roundtrip(&dataset);
    assert_eq!(
        back.columns()[0].dtype,
        SemanticType::record(vec![
            StructField::new("count", SemanticType::Int64),
            StructField::new("label", SemanticType::String),
        ])
    );
    // a row missing a key carries an explicit null for that field
    assert_eq!(
        back.rows()[0][0],
        record_cell(&[("count", CellValue::Int64(5)), ("label", CellValue::Null)])
    );
    assert_eq!(
        back.rows()[1][0],
        record_cell(&[("count", CellValue::Int64(9)), ("label", s("high"))])
    );
}

#[test]
fn test_value_type_homogeneity_is_judged_across_all_rows() {
    // the odd value appears only in the very last row; a full scan finds it
    let mut values: Vec<CellValue> = (0..50)
        .map(|i| map_cell(&[("n", CellValue::Int64(i))]))
        .collect();
    values.push(map_cell(&[("n", s("not a number"))]));

    let back = roundtrip(&mapping_dataset(values));
    match &back.columns()[0].dtype {
        SemanticType::Struct { fields, .. } => {
            assert_eq!(fields.len(), 1);
            // one key holding several runtime types falls back to text
            assert_eq!(fields[0].dtype, SemanticType::String);
        }
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn test_nested_mappings_resolve_recursively() {
    let dataset = mapping_dataset(vec![map_cell(&[(
        "outer",
        map_cell(&[("inner", CellValue::Int64(1))]),
    )])]);

    let back = roundtrip(&dataset);
    assert_eq!(
        back.columns()[0].dtype,
        SemanticType::Map(Box::new(SemanticType::Map(Box::new(SemanticType::Int64))))
    );
}

#[derive(Debug)]
struct Invoice {
    number: i64,
    customer: &'static str,
    total: i64,
}

impl RecordLike for Invoice {
    fn shape_id(&self) -> TypeId {
        TypeId::of::<Invoice>()
    }

    fn type_name(&self) -> &str {
        "Invoice"
    }

    fn field_names(&self) -> Vec<Arc<str>> {
        vec![
            Arc::from("number"),
            Arc::from("customer"),
            Arc::from("total"),
        ]
    }

    fn get(&self, field: &str) -> CellValue {
        match field {
            "number" => CellValue::Int64(self.number),
            "customer" => CellValue::String(Arc::from(self.customer)),
            "total" => CellValue::decimal(self.total, 2),
            _ => CellValue::Null,
        }
    }
}

#[test]
fn test_bean_column_flattens_through_descriptor_cache() {
    let dataset = Dataset::new(
        "billing",
        vec![Column::new("invoice", SemanticType::Object)],
        vec![
            vec![CellValue::Object(Arc::new(Invoice {
                number: 1,
                customer: "ACME",
                total: 12050,
            }))],
            vec![CellValue::Null],
            vec![CellValue::Object(Arc::new(Invoice {
                number: 2,
                customer: "Globex",
                total: 99,
            }))],
        ],
    )
    .unwrap();

    let back = roundtrip(&dataset);
    match &back.columns()[0].dtype {
        SemanticType::Struct { fields, shape } => {
            assert_eq!(shape.as_deref(), Some("Invoice"));
            let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["number", "customer", "total"]);
        }
        other => panic!("expected struct, got {:?}", other),
    }
    assert_eq!(
        back.rows()[0][0],
        record_cell(&[
            ("number", CellValue::Int64(1)),
            ("customer", s("ACME")),
            ("total", dec(12050, 2)),
        ])
    );
    assert!(back.rows()[1][0].is_null());
}

#[derive(Debug, PartialEq)]
struct Tag {
    name: String,
}

impl RecordLike for Tag {
    fn shape_id(&self) -> TypeId {
        TypeId::of::<Tag>()
    }

    fn type_name(&self) -> &str {
        "Tag"
    }

    fn field_names(&self) -> Vec<Arc<str>> {
        vec![Arc::from("name")]
    }

    fn get(&self, field: &str) -> CellValue {
        match field {
            "name" => CellValue::String(Arc::from(self.name.as_str())),
            _ => CellValue::Null,
        }
    }
}

#[test]
fn test_registered_shapes_are_rebuilt_on_read() {
    shapes().register("Tag", |fields| {
        let name = match fields.get("name") {
            Some(CellValue::String(s)) => s.to_string(),
            _ => String::new(),
        };
        CellValue::Object(Arc::new(Tag { name }))
    });

    let dataset = Dataset::new(
        "tags",
        vec![Column::new("tag", SemanticType::Object)],
        vec![vec![CellValue::Object(Arc::new(Tag {
            name: "urgent".to_string(),
        }))]],
    )
    .unwrap();

    let back = roundtrip(&dataset);
    // object equality compares flattened fields
    assert_eq!(
        back.rows()[0][0],
        CellValue::Object(Arc::new(Tag {
            name: "urgent".to_string()
        }))
    );
    assert!(matches!(back.rows()[0][0], CellValue::Object(_)));
}

#[test]
fn test_foreign_file_without_annotations_is_inferred() {
    use arrow_array::{Int16Array, RecordBatch, StringArray};
    use arrow_schema::{DataType, Field, Schema as ArrowSchema};
    use parquet::arrow::ArrowWriter;

    let schema = Arc::new(ArrowSchema::new(vec![
        Field::new("code", DataType::Int16, true),
        Field::new("label", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int16Array::from(vec![Some(7i16), None])),
            Arc::new(StringArray::from(vec![Some("seven"), Some("none")])),
        ],
    )
    .unwrap();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let back = read_bytes(buffer, &ReadOptions::default()).unwrap();
    // Int16 has no exact semantic counterpart; it degrades to Int32
    assert_eq!(back.columns()[0].dtype, SemanticType::Int32);
    assert_eq!(back.columns()[1].dtype, SemanticType::String);
    assert_eq!(back.rows()[0][0], CellValue::Int32(7));
    assert!(back.rows()[1][0].is_null());
    assert_eq!(back.rows()[1][1], s("none"));
}
