//! Memoized shape description for bean-like values.
//!
//! Describing a [`RecordLike`] shape walks its field list once; the result is
//! cached per shape identity for the lifetime of the process and shared across
//! all writer and reader calls. Entries are immutable once published and the
//! cache never evicts, which is acceptable because the number of distinct
//! shapes a process sees is small and stable.

use crate::traits::RecordLike;
use crate::CellValue;
use indexmap::IndexMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Ordered field list of one concrete shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub type_name: String,
    pub fields: Vec<Arc<str>>,
}

/// Thread-safe memoized `shape -> descriptor` lookup.
///
/// If two threads race to describe the same shape either result may be
/// published, but both observe the same stored descriptor and no torn entry
/// is ever visible.
#[derive(Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, Arc<FieldDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for the value's shape, computing it at most once per shape.
    pub fn describe(&self, value: &dyn RecordLike) -> Arc<FieldDescriptor> {
        let key = value.shape_id();
        if let Some(descriptor) = self
            .entries
            .read()
            .expect("descriptor cache poisoned")
            .get(&key)
        {
            return descriptor.clone();
        }

        let computed = Arc::new(FieldDescriptor {
            type_name: value.type_name().to_string(),
            fields: value.field_names(),
        });
        let mut entries = self.entries.write().expect("descriptor cache poisoned");
        entries.entry(key).or_insert(computed).clone()
    }

    /// Number of distinct shapes described so far.
    pub fn len(&self) -> usize {
        self.entries.read().expect("descriptor cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide descriptor cache shared by all writer and reader calls.
pub fn descriptors() -> &'static DescriptorCache {
    static CACHE: OnceLock<DescriptorCache> = OnceLock::new();
    CACHE.get_or_init(DescriptorCache::new)
}

/// Rebuilds a concrete value from the generic ordered-field form.
pub type ShapeBuilder =
    Arc<dyn Fn(&IndexMap<Arc<str>, CellValue>) -> CellValue + Send + Sync>;

/// Thread-safe `type name -> builder` registry used while reading.
///
/// Struct columns whose annotations carry a recorded shape name are rebuilt
/// through the registered builder; unregistered names materialize as generic
/// records. Registration follows the same publish-once discipline as the
/// descriptor cache.
#[derive(Default)]
pub struct ShapeRegistry {
    builders: RwLock<HashMap<String, ShapeBuilder>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for a recorded shape name. The first registration
    /// for a name wins; later ones are ignored.
    pub fn register<F>(&self, type_name: impl Into<String>, builder: F)
    where
        F: Fn(&IndexMap<Arc<str>, CellValue>) -> CellValue + Send + Sync + 'static,
    {
        let mut builders = self.builders.write().expect("shape registry poisoned");
        builders
            .entry(type_name.into())
            .or_insert_with(|| Arc::new(builder));
    }

    /// Resolve a recorded shape name to its builder.
    pub fn resolve(&self, type_name: &str) -> Option<ShapeBuilder> {
        self.builders
            .read()
            .expect("shape registry poisoned")
            .get(type_name)
            .cloned()
    }
}

/// Process-wide shape registry consulted by the reader.
pub fn shapes() -> &'static ShapeRegistry {
    static REGISTRY: OnceLock<ShapeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ShapeRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Point {
        x: i32,
        y: i32,
    }

    impl RecordLike for Point {
        fn shape_id(&self) -> TypeId {
            TypeId::of::<Point>()
        }

        fn type_name(&self) -> &str {
            "Point"
        }

        fn field_names(&self) -> Vec<Arc<str>> {
            vec![Arc::from("x"), Arc::from("y")]
        }

        fn get(&self, field: &str) -> CellValue {
            match field {
                "x" => CellValue::Int32(self.x),
                "y" => CellValue::Int32(self.y),
                _ => CellValue::Null,
            }
        }
    }

    struct Probe;

    static PROBE_WALKS: AtomicUsize = AtomicUsize::new(0);

    impl RecordLike for Probe {
        fn shape_id(&self) -> TypeId {
            TypeId::of::<Probe>()
        }

        fn type_name(&self) -> &str {
            "Probe"
        }

        fn field_names(&self) -> Vec<Arc<str>> {
            PROBE_WALKS.fetch_add(1, Ordering::SeqCst);
            vec![Arc::from("value")]
        }

        fn get(&self, _field: &str) -> CellValue {
            CellValue::Null
        }
    }

    #[test]
    fn test_describe_is_memoized_and_shared() {
        let cache = DescriptorCache::new();

        let first = cache.describe(&Probe);
        let walks_after_first = PROBE_WALKS.load(Ordering::SeqCst);
        let second = cache.describe(&Probe);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(PROBE_WALKS.load(Ordering::SeqCst), walks_after_first);
        assert_eq!(cache.len(), 1);
        assert_eq!(first.type_name, "Probe");
        assert_eq!(first.fields, vec![Arc::<str>::from("value")]);
    }

    #[test]
    fn test_concurrent_describe_publishes_one_entry() {
        let cache = Arc::new(DescriptorCache::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                cache.describe(&Point { x: i, y: i })
            }));
        }
        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 1);
        for d in &descriptors[1..] {
            assert!(Arc::ptr_eq(&descriptors[0], d));
        }
    }

    #[test]
    fn test_shape_registry_first_registration_wins() {
        let registry = ShapeRegistry::new();
        registry.register("Point", |fields| CellValue::Record(fields.clone()));
        registry.register("Point", |_| CellValue::Null);

        let builder = registry.resolve("Point").unwrap();
        let mut fields = IndexMap::new();
        fields.insert(Arc::from("x"), CellValue::Int32(1));
        assert_eq!(
            builder(&fields),
            CellValue::Record(fields.clone())
        );
        assert!(registry.resolve("Unknown").is_none());
    }
}
