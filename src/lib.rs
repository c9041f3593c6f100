//! linerec
//!
//! A schema-driven parser that maps delimited text lines onto
//! strongly-typed records.
//!
//! This library provides tools for:
//! - Declaring an ordered schema of named, typed token positions
//! - Converting tokens to values with builtin, overridable, and fallback
//!   converters
//! - Skipping blank/comment lines and discarding an optional header line
//! - Writing converted values into records through a memoized setter cache
//! - Precise per-line error attribution with preserved causes
//!
//! ```
//! use linerec::{FieldType, LineParser, ParserOptions, Schema, SchemaField};
//!
//! linerec::impl_record! {
//!     pub struct Person {
//!         pub name: String,
//!         pub age: i32,
//!     }
//! }
//!
//! # fn main() -> linerec::Result<()> {
//! let parser = LineParser::with_schema(
//!     ParserOptions::new(),
//!     Schema::new(vec![
//!         SchemaField::new("name", 0, FieldType::STRING)?,
//!         SchemaField::new("age", 1, FieldType::I32)?,
//!     ]),
//! );
//!
//! for person in parser.parse::<Person, _>(["Adam;38"])? {
//!     let person = person?;
//!     assert_eq!(person.age, 38);
//! }
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod convert;
pub mod options;
pub mod parser;
pub mod record;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use convert::BoxError;
pub use options::ParserOptions;
pub use parser::{LineParser, Records};
pub use record::{FieldSpec, FieldValue, FieldWriter, Record, WriteError};
pub use schema::{Schema, SchemaField};
pub use value::{FieldType, TypeKind, Value};

/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for schema construction and line parsing.
///
/// Every error raised while processing a line carries that line's 1-based
/// number; underlying causes are chained, never swallowed.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Parser misconfigured: schema missing or empty before the first parse
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Invalid field descriptor, raised at schema-build time
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A line supplied fewer tokens than the schema requires
    #[error("line {line}: '{raw}' contains too few fields (actual: {actual}, expected: {expected})")]
    TooFewFields {
        line: usize,
        raw: String,
        actual: usize,
        expected: usize,
    },

    /// A converter rejected the token for a field
    #[error("line {line}: failed to convert field `{field}` of type {ty} from token '{token}'")]
    FieldConversion {
        line: usize,
        field: String,
        ty: FieldType,
        token: String,
        #[source]
        source: BoxError,
    },

    /// A field writer could not be resolved or rejected the value
    #[error(
        "line {line}: failed to assign field `{field}` of type {ty} the value '{value}' ({value_kind})"
    )]
    FieldAssignment {
        line: usize,
        field: String,
        ty: FieldType,
        value: String,
        value_kind: &'static str,
        #[source]
        source: BoxError,
    },

    /// Reading from a line source failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a schema construction error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a line-level "too few fields" error
    pub fn too_few_fields(line: usize, raw: impl Into<String>, actual: usize, expected: usize) -> Self {
        Self::TooFewFields {
            line,
            raw: raw.into(),
            actual,
            expected,
        }
    }

    /// Create a field conversion error with its cause
    pub fn field_conversion(
        line: usize,
        field: impl Into<String>,
        ty: FieldType,
        token: impl Into<String>,
        source: BoxError,
    ) -> Self {
        Self::FieldConversion {
            line,
            field: field.into(),
            ty,
            token: token.into(),
            source,
        }
    }

    /// Create a field assignment error carrying the converted value and its
    /// runtime kind
    pub fn field_assignment(
        line: usize,
        field: impl Into<String>,
        ty: FieldType,
        value: &Value,
        source: BoxError,
    ) -> Self {
        Self::FieldAssignment {
            line,
            field: field.into(),
            ty,
            value: value.to_string(),
            value_kind: value.kind_name(),
            source,
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// The 1-based input line this error is attributed to, when it arose
    /// while processing a line.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::TooFewFields { line, .. }
            | Self::FieldConversion { line, .. }
            | Self::FieldAssignment { line, .. } => Some(*line),
            Self::Configuration { .. } | Self::Schema { .. } | Self::Io { .. } => None,
        }
    }
}
