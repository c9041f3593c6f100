//! Record types, field writers, and the memoized setter cache.
//!
//! A [`Record`] exposes its declared fields and a writer per field name; the
//! [`impl_record!`] macro generates both for plain structs. The
//! [`SetterCache`] memoizes writer resolution per (record type, field name)
//! so parsing many lines against one type pays the lookup cost once.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::trace;
use uuid::Uuid;

use crate::value::{FieldType, Value};

/// A bound write operation for one field of a record type.
pub type FieldWriter<T> = fn(&mut T, Value) -> std::result::Result<(), WriteError>;

/// One declared field of a record type: name and target type, in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

/// A default-constructible type the engine can populate field by field.
pub trait Record: Default + 'static {
    /// Declared fields in declaration-stable order, used to derive a schema
    /// with positions equal to enumeration indices.
    fn fields() -> &'static [FieldSpec];

    /// Resolve the writer for a named field, or `None` when the type has no
    /// writable field of that name.
    fn writer(name: &str) -> Option<FieldWriter<Self>>
    where
        Self: Sized;
}

/// Failure while resolving or invoking a field writer.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("record type `{record_type}` has no writable field `{field}`")]
    NoSuchField {
        record_type: &'static str,
        field: String,
    },

    #[error("a {actual} value is not assignable to a {expected} field")]
    Incompatible {
        expected: FieldType,
        actual: &'static str,
    },
}

impl WriteError {
    pub fn no_such_field(record_type: &'static str, field: impl Into<String>) -> Self {
        Self::NoSuchField {
            record_type,
            field: field.into(),
        }
    }

    pub fn incompatible(expected: FieldType, actual: &'static str) -> Self {
        Self::Incompatible { expected, actual }
    }
}

/// A Rust type that can receive a converted [`Value`].
///
/// Implemented for the primitive targets of the builtin converter table and
/// for `Option<_>` of each, which maps the nullable form of the type.
pub trait FieldValue: Sized {
    const TYPE: FieldType;

    fn from_value(value: Value) -> std::result::Result<Self, WriteError>;
}

macro_rules! impl_field_value {
    ($rust:ty, $variant:ident, $ty:expr) => {
        impl FieldValue for $rust {
            const TYPE: FieldType = $ty;

            fn from_value(value: Value) -> std::result::Result<Self, WriteError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(WriteError::incompatible(Self::TYPE, other.kind_name())),
                }
            }
        }
    };
}

impl_field_value!(String, String, FieldType::STRING);
impl_field_value!(u8, U8, FieldType::U8);
impl_field_value!(i32, I32, FieldType::I32);
impl_field_value!(i64, I64, FieldType::I64);
impl_field_value!(f32, F32, FieldType::F32);
impl_field_value!(f64, F64, FieldType::F64);
impl_field_value!(bool, Bool, FieldType::BOOL);
impl_field_value!(NaiveDateTime, DateTime, FieldType::DATETIME);
impl_field_value!(Uuid, Uuid, FieldType::UUID);

impl<T: FieldValue> FieldValue for Option<T> {
    const TYPE: FieldType = T::TYPE.into_nullable();

    fn from_value(value: Value) -> std::result::Result<Self, WriteError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Memoizing cache of field writers, keyed by (record type, field name).
///
/// Entries are created on first use, grow monotonically, and are never
/// evicted. The map is concurrency-safe so independent parse calls on one
/// parser instance may run from different threads.
#[derive(Default)]
pub struct SetterCache {
    entries: Mutex<HashMap<TypeId, HashMap<String, Box<dyn Any + Send + Sync>>>>,
}

impl SetterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the writer for `field` on `T`, memoizing the result.
    pub fn writer<T: Record>(&self, field: &str) -> std::result::Result<FieldWriter<T>, WriteError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let per_type = entries.entry(TypeId::of::<T>()).or_default();

        if let Some(cached) = per_type
            .get(field)
            .and_then(|boxed| boxed.downcast_ref::<FieldWriter<T>>())
        {
            return Ok(*cached);
        }

        trace!("resolving writer for {}::{}", type_name::<T>(), field);
        let writer = T::writer(field)
            .ok_or_else(|| WriteError::no_such_field(type_name::<T>(), field))?;
        per_type.insert(field.to_string(), Box::new(writer));
        Ok(writer)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|per_type| per_type.len())
            .sum()
    }
}

impl fmt::Debug for SetterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len();
        f.debug_struct("SetterCache").field("types", &types).finish()
    }
}

/// Implement [`Record`] for a plain struct, declaring the struct itself.
///
/// Every field type must implement [`FieldValue`]; `Option<_>` fields map
/// onto the nullable form of their type.
///
/// ```
/// linerec::impl_record! {
///     pub struct Person {
///         pub name: String,
///         pub age: i32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq)]
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field : $field_ty, )*
        }

        impl $crate::record::Record for $name {
            fn fields() -> &'static [$crate::record::FieldSpec] {
                static FIELDS: &[$crate::record::FieldSpec] = &[
                    $(
                        $crate::record::FieldSpec {
                            name: stringify!($field),
                            ty: <$field_ty as $crate::record::FieldValue>::TYPE,
                        },
                    )*
                ];
                FIELDS
            }

            fn writer(name: &str) -> Option<$crate::record::FieldWriter<Self>> {
                match name {
                    $(
                        stringify!($field) => Some(|record: &mut Self, value: $crate::Value| {
                            record.$field =
                                <$field_ty as $crate::record::FieldValue>::from_value(value)?;
                            Ok(())
                        }),
                    )*
                    _ => None,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeKind;

    crate::impl_record! {
        struct Probe {
            label: String,
            count: i32,
            ratio: Option<f64>,
        }
    }

    #[test]
    fn test_fields_preserve_declaration_order_and_nullability() {
        let fields = Probe::fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "label");
        assert_eq!(fields[0].ty, FieldType::STRING);
        assert_eq!(fields[1].ty.kind, TypeKind::I32);
        assert!(fields[2].ty.nullable);
    }

    #[test]
    fn test_writer_assigns_matching_values() {
        let mut probe = Probe::default();

        let writer = Probe::writer("count").unwrap();
        writer(&mut probe, Value::I32(7)).unwrap();
        assert_eq!(probe.count, 7);

        let writer = Probe::writer("ratio").unwrap();
        writer(&mut probe, Value::Null).unwrap();
        assert_eq!(probe.ratio, None);
        writer(&mut probe, Value::F64(0.5)).unwrap();
        assert_eq!(probe.ratio, Some(0.5));
    }

    #[test]
    fn test_writer_rejects_incompatible_kind() {
        let mut probe = Probe::default();
        let writer = Probe::writer("count").unwrap();
        let err = writer(&mut probe, Value::Bool(true)).unwrap_err();
        assert!(matches!(
            err,
            WriteError::Incompatible {
                expected: FieldType::I32,
                actual: "bool"
            }
        ));
    }

    #[test]
    fn test_unknown_field_has_no_writer() {
        assert!(Probe::writer("missing").is_none());
    }

    #[test]
    fn test_setter_cache_memoizes_per_type_and_field() {
        let cache = SetterCache::new();
        assert_eq!(cache.len(), 0);

        cache.writer::<Probe>("label").unwrap();
        cache.writer::<Probe>("label").unwrap();
        assert_eq!(cache.len(), 1);

        cache.writer::<Probe>("count").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_setter_cache_reports_missing_field() {
        let cache = SetterCache::new();
        let err = cache.writer::<Probe>("missing").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("Probe"));
    }
}
