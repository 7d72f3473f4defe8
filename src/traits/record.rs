use crate::CellValue;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Capability interface for bean-like values stored in cells.
///
/// Implementing this trait lets an arbitrary carrier type be flattened into an
/// ordered field list when a column (or a nested list/map element) holds
/// structured values. The field order returned by [`field_names`] is the order
/// the flattened Parquet group uses, so it must be stable for a given shape.
///
/// Shapes are described at most once per process through the descriptor cache,
/// keyed on [`shape_id`]; implementations should return `TypeId::of::<Self>()`.
///
/// [`field_names`]: RecordLike::field_names
/// [`shape_id`]: RecordLike::shape_id
pub trait RecordLike: Send + Sync {
    /// Stable identity of the concrete shape, used as the cache key.
    fn shape_id(&self) -> TypeId;

    /// Name recorded in the file annotations so a reader can resolve the
    /// shape again through the shape registry.
    fn type_name(&self) -> &str;

    /// Field names in declaration order.
    fn field_names(&self) -> Vec<Arc<str>>;

    /// Value of the named field; `CellValue::Null` for unknown names.
    fn get(&self, field: &str) -> CellValue;
}

impl fmt::Debug for dyn RecordLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name())
    }
}
