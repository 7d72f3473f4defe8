use num::BigInt;
use std::collections::HashMap;
use tabular_parquet::*;

use test_helpers::*;

fn amounts(values: Vec<CellValue>) -> Dataset {
    Dataset::new(
        "ledger",
        vec![Column::new("amount", SemanticType::Decimal(0, 0))],
        values.into_iter().map(|v| vec![v]).collect(),
    )
    .unwrap()
}

#[test]
fn test_auto_inference_tracks_integer_digits_and_scale() {
    // 1.5 and 2.25: one integer digit, scale up to 2
    let dataset = amounts(vec![dec(15, 1), dec(225, 2), CellValue::Null]);
    let back = roundtrip(&dataset);

    assert_eq!(back.columns()[0].dtype, SemanticType::Decimal(3, 2));
    assert_eq!(back.rows()[0][0], dec(15, 1));
    assert_eq!(back.rows()[1][0], dec(225, 2));
    assert!(back.rows()[2][0].is_null());
}

#[test]
fn test_auto_accepts_any_needed_scale() {
    // a value needing scale 5 resolves to at least scale 5 under inference
    let dataset = amounts(vec![dec(12345, 5)]);
    let back = roundtrip(&dataset);
    match back.columns()[0].dtype {
        SemanticType::Decimal(_, scale) => assert!(scale >= 5),
        ref other => panic!("expected decimal, got {:?}", other),
    }
    assert_eq!(back.rows()[0][0], dec(12345, 5));
}

#[test]
fn test_uniform_spec_rejects_values_needing_more_scale() {
    let dataset = amounts(vec![dec(100, 2), dec(12345, 5)]);
    let err = write_bytes(
        &dataset,
        &WriteOptions {
            precision: PrecisionSpec::Uniform(10, 2),
            ..Default::default()
        },
    )
    .unwrap_err();

    match err {
        CodecError::PrecisionExceeded {
            column,
            row,
            required_scale,
            configured_precision,
            configured_scale,
            ..
        } => {
            assert_eq!(column, "amount");
            assert_eq!(row, 1);
            assert_eq!(required_scale, 5);
            assert_eq!((configured_precision, configured_scale), (10, 2));
        }
        other => panic!("expected precision error, got {other}"),
    }
}

#[test]
fn test_uniform_spec_rescales_coarser_values() {
    let dataset = amounts(vec![dec(15, 1)]);
    let back = roundtrip_with(
        &dataset,
        &WriteOptions {
            precision: PrecisionSpec::Uniform(10, 3),
            ..Default::default()
        },
        &ReadOptions::default(),
    );

    assert_eq!(back.columns()[0].dtype, SemanticType::Decimal(10, 3));
    // stored at scale 3, still the same number
    assert_eq!(back.rows()[0][0], dec(1500, 3));
    assert_eq!(back.rows()[0][0], dec(15, 1));
}

#[test]
fn test_per_column_spec_with_fallback_to_inference() {
    let dataset = Dataset::new(
        "invoice",
        vec![
            Column::new("net", SemanticType::Decimal(0, 0)),
            Column::new("rate", SemanticType::Decimal(0, 0)),
        ],
        vec![vec![dec(10050, 2), dec(19, 2)]],
    )
    .unwrap();

    let mut per_column = HashMap::new();
    per_column.insert("net".to_string(), (12u8, 4i8));

    let back = roundtrip_with(
        &dataset,
        &WriteOptions {
            precision: PrecisionSpec::PerColumn(per_column),
            ..Default::default()
        },
        &ReadOptions::default(),
    );

    assert_eq!(back.columns()[0].dtype, SemanticType::Decimal(12, 4));
    // not listed: inferred from its values
    assert_eq!(back.columns()[1].dtype, SemanticType::Decimal(2, 2));
    assert_eq!(back.rows()[0][0], dec(10050, 2));
    assert_eq!(back.rows()[0][1], dec(19, 2));
}

#[test]
fn test_declared_precision_is_validated() {
    let dataset = Dataset::new(
        "ledger",
        vec![Column::new("amount", SemanticType::Decimal(4, 1))],
        vec![vec![dec(12345, 1)]], // 1234.5 needs precision 5
    )
    .unwrap();

    let err = write_bytes(&dataset, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, CodecError::PrecisionExceeded { .. }));
}

#[test]
fn test_invalid_precision_spec_is_rejected_before_writing() {
    let dataset = amounts(vec![dec(1, 0)]);
    for spec in [
        PrecisionSpec::Uniform(0, 0),
        PrecisionSpec::Uniform(80, 2),
        PrecisionSpec::Uniform(10, -1),
        PrecisionSpec::Uniform(5, 6),
    ] {
        let err = write_bytes(
            &dataset,
            &WriteOptions {
                precision: spec,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::InvalidArgument(_)));
    }
}

#[test]
fn test_wide_decimals_use_256_bit_storage() {
    // 45 significant digits forces the wide representation
    let wide = BigInt::parse_bytes(b"123456789012345678901234567890123456789012345", 10).unwrap();
    let dataset = amounts(vec![
        CellValue::Decimal {
            unscaled: wide.clone(),
            scale: 5,
        },
        dec(-1, 5),
    ]);

    let back = roundtrip(&dataset);
    assert_eq!(back.columns()[0].dtype, SemanticType::Decimal(45, 5));
    assert_eq!(
        back.rows()[0][0],
        CellValue::Decimal {
            unscaled: wide,
            scale: 5
        }
    );
    assert_eq!(back.rows()[1][0], dec(-1, 5));
}

#[test]
fn test_negative_decimals_roundtrip() {
    let dataset = amounts(vec![dec(-12345, 2), dec(-5, 2), dec(0, 2)]);
    let back = roundtrip(&dataset);
    assert_eq!(back.rows()[0][0], dec(-12345, 2));
    assert_eq!(back.rows()[1][0], dec(-5, 2));
    assert_eq!(back.rows()[2][0], dec(0, 2));
}

#[test]
fn test_integer_cells_in_decimal_columns() {
    let dataset = Dataset::new(
        "ledger",
        vec![Column::new("amount", SemanticType::Decimal(10, 2))],
        vec![vec![CellValue::Int64(7)], vec![dec(125, 1)]],
    )
    .unwrap();

    let back = roundtrip(&dataset);
    assert_eq!(back.rows()[0][0], dec(700, 2));
    assert_eq!(back.rows()[1][0], dec(1250, 2));
}
