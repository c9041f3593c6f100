//! Value model for converted field data.
//!
//! Defines the semantic type tags a schema field can declare and the
//! dynamically-typed [`Value`] a converter produces before it is written
//! into a record.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Semantic type tags supported by the builtin converter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    String,
    U8,
    I32,
    I64,
    F32,
    F64,
    Bool,
    DateTime,
    Uuid,
    /// An application-defined type with no builtin converter. Tokens of a
    /// custom kind are handled by a user-registered converter or by the
    /// unknown-type fallback.
    Custom(&'static str),
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::String => write!(f, "string"),
            TypeKind::U8 => write!(f, "u8"),
            TypeKind::I32 => write!(f, "i32"),
            TypeKind::I64 => write!(f, "i64"),
            TypeKind::F32 => write!(f, "f32"),
            TypeKind::F64 => write!(f, "f64"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::DateTime => write!(f, "datetime"),
            TypeKind::Uuid => write!(f, "uuid"),
            TypeKind::Custom(name) => write!(f, "custom({name})"),
        }
    }
}

/// A field's target type: a kind plus nullability.
///
/// The nullable form of a type accepts the null marker produced by the
/// null-value detector and maps onto `Option<_>` record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: TypeKind,
    pub nullable: bool,
}

impl FieldType {
    pub const STRING: FieldType = FieldType::new(TypeKind::String);
    pub const U8: FieldType = FieldType::new(TypeKind::U8);
    pub const I32: FieldType = FieldType::new(TypeKind::I32);
    pub const I64: FieldType = FieldType::new(TypeKind::I64);
    pub const F32: FieldType = FieldType::new(TypeKind::F32);
    pub const F64: FieldType = FieldType::new(TypeKind::F64);
    pub const BOOL: FieldType = FieldType::new(TypeKind::Bool);
    pub const DATETIME: FieldType = FieldType::new(TypeKind::DateTime);
    pub const UUID: FieldType = FieldType::new(TypeKind::Uuid);

    /// Create a non-nullable field type for the given kind.
    pub const fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// Create a non-nullable application-defined type tag.
    pub const fn custom(name: &'static str) -> Self {
        Self::new(TypeKind::Custom(name))
    }

    /// The nullable form of this type.
    pub const fn into_nullable(self) -> Self {
        Self {
            kind: self.kind,
            nullable: true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// A converted field value, ready to be written into a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit absent marker for nullable targets.
    Null,
    String(String),
    U8(u8),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl Value {
    /// Name of the runtime kind carried by this value, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::U8(_) => "u8",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
        }
    }

    /// The default value substituted when a token is detected as null.
    ///
    /// Nullable types get the explicit [`Value::Null`] marker; value-like
    /// types get their zero value. Custom kinds have no known zero value
    /// and fall back to `Null` as well.
    pub fn default_for(ty: FieldType) -> Value {
        if ty.nullable {
            return Value::Null;
        }
        match ty.kind {
            TypeKind::String => Value::String(String::new()),
            TypeKind::U8 => Value::U8(0),
            TypeKind::I32 => Value::I32(0),
            TypeKind::I64 => Value::I64(0),
            TypeKind::F32 => Value::F32(0.0),
            TypeKind::F64 => Value::F64(0.0),
            TypeKind::Bool => Value::Bool(false),
            TypeKind::DateTime => Value::DateTime(DateTime::<Utc>::UNIX_EPOCH.naive_utc()),
            TypeKind::Uuid => Value::Uuid(Uuid::nil()),
            TypeKind::Custom(_) => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_for_value_types_is_zero() {
        assert_eq!(Value::default_for(FieldType::I32), Value::I32(0));
        assert_eq!(Value::default_for(FieldType::F64), Value::F64(0.0));
        assert_eq!(Value::default_for(FieldType::BOOL), Value::Bool(false));
        assert_eq!(
            Value::default_for(FieldType::STRING),
            Value::String(String::new())
        );
        assert_eq!(Value::default_for(FieldType::UUID), Value::Uuid(Uuid::nil()));
    }

    #[test]
    fn test_default_for_nullable_types_is_null() {
        assert_eq!(
            Value::default_for(FieldType::I32.into_nullable()),
            Value::Null
        );
        assert_eq!(
            Value::default_for(FieldType::DATETIME.into_nullable()),
            Value::Null
        );
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::I32.to_string(), "i32");
        assert_eq!(FieldType::I32.into_nullable().to_string(), "i32?");
        assert_eq!(FieldType::custom("money").to_string(), "custom(money)");
    }

    #[test]
    fn test_kind_name_matches_variant() {
        assert_eq!(Value::I64(7).kind_name(), "i64");
        assert_eq!(Value::Null.kind_name(), "null");
    }
}
