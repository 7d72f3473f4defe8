//! Test utilities shared by the unit test modules.

#[cfg(test)]
pub mod test {
    use crate::{CellValue, Column, Dataset, SemanticType};
    use ordered_float::OrderedFloat;
    use std::sync::Arc;

    /// Shorthand string cell
    pub fn s(value: &str) -> CellValue {
        CellValue::String(Arc::from(value))
    }

    /// Shorthand decimal cell
    pub fn dec(unscaled: i64, scale: i8) -> CellValue {
        CellValue::decimal(unscaled, scale)
    }

    /// A small dataset covering the common primitive types.
    pub fn people_dataset() -> Dataset {
        Dataset::new(
            "people",
            vec![
                Column::new("id", SemanticType::Int64),
                Column::new("name", SemanticType::String),
                Column::new("age", SemanticType::Int32),
                Column::new("salary", SemanticType::Float64),
            ],
            vec![
                vec![
                    CellValue::Int64(1),
                    s("Alice"),
                    CellValue::Int32(30),
                    CellValue::Float64(OrderedFloat(75000.0)),
                ],
                vec![
                    CellValue::Int64(2),
                    CellValue::Null,
                    CellValue::Int32(25),
                    CellValue::Null,
                ],
            ],
        )
        .unwrap()
    }
}

#[cfg(test)]
mod test_utils_tests {
    use super::test::*;
    use crate::{CellValue, DataSource};

    #[test]
    fn test_people_dataset_shape() {
        let ds = people_dataset();
        assert_eq!(ds.column_count(), 4);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_name(1), "name");
        assert_eq!(ds.value(0, 1), s("Alice"));
        assert!(ds.value(1, 1).is_null());
        assert_eq!(dec(150, 2), CellValue::decimal(150, 2));
    }
}
