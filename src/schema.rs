//! Schema management: the ordered mapping from token positions to
//! named, typed record fields.
//!
//! Field descriptors are validated when they are built, not when the first
//! line is parsed, so a malformed schema surfaces immediately at the call
//! site that created it.

use crate::record::Record;
use crate::value::FieldType;
use crate::{Error, Result};

/// One field descriptor: which token position feeds which named field.
///
/// Immutable once constructed. Positions are zero-based token indices;
/// using `usize` makes a negative position unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    name: String,
    position: usize,
    ty: FieldType,
}

impl SchemaField {
    /// Build a field descriptor, failing fast on an empty name.
    pub fn new(name: impl Into<String>, position: usize, ty: FieldType) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::schema(format!(
                "field at position {position} has an empty name"
            )));
        }
        Ok(Self { name, position, ty })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn ty(&self) -> FieldType {
        self.ty
    }
}

/// Ordered, immutable sequence of field descriptors.
///
/// Uniqueness of field names is the caller's responsibility; the engine
/// processes fields strictly in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Derive a schema from a record type's declared fields, assigning each
    /// field a position equal to its declaration index.
    pub fn from_record<T: Record>() -> Self {
        let fields = T::fields()
            .iter()
            .enumerate()
            .map(|(position, spec)| SchemaField {
                name: spec.name.to_string(),
                position,
                ty: spec.ty,
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Minimum token count an admitted line must supply, `max(position) + 1`.
    ///
    /// `None` for an empty schema, which the parser rejects before producing
    /// any record.
    pub fn max_required_tokens(&self) -> Option<usize> {
        self.fields.iter().map(|f| f.position + 1).max()
    }
}
