//! Builtin string-to-value converters and the conversion lookup order.
//!
//! The builtin table is built once, before first use, and shared read-only
//! by every parser instance. Numeric and date parsing is locale-invariant;
//! float parsing additionally accepts `,` as a decimal separator and
//! boolean parsing accepts `1`/`0`.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tracing::trace;
use uuid::Uuid;

use crate::options::{ConverterFn, EffectiveOptions};
use crate::value::{FieldType, TypeKind, Value};

/// Boxed cause carried by conversion failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Token rejected by a builtin converter.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("'{0}' is not a recognized boolean (expected true/false/1/0)")]
    Bool(String),

    #[error("'{0}' does not match any supported date/time format")]
    DateTime(String),
}

static BUILTIN_CONVERTERS: LazyLock<HashMap<FieldType, ConverterFn>> =
    LazyLock::new(builtin_table);

/// Register one converter under both the plain and nullable form of a kind.
fn register(table: &mut HashMap<FieldType, ConverterFn>, kind: TypeKind, converter: ConverterFn) {
    table.insert(FieldType::new(kind), Arc::clone(&converter));
    table.insert(FieldType::new(kind).into_nullable(), converter);
}

fn builtin_table() -> HashMap<FieldType, ConverterFn> {
    let mut table = HashMap::new();
    register(
        &mut table,
        TypeKind::String,
        Arc::new(|token| Ok(Value::String(token.trim().to_string()))),
    );
    register(
        &mut table,
        TypeKind::U8,
        Arc::new(|token| Ok(Value::U8(token.trim().parse()?))),
    );
    register(
        &mut table,
        TypeKind::I32,
        Arc::new(|token| Ok(Value::I32(token.trim().parse()?))),
    );
    register(
        &mut table,
        TypeKind::I64,
        Arc::new(|token| Ok(Value::I64(token.trim().parse()?))),
    );
    register(
        &mut table,
        TypeKind::F32,
        Arc::new(|token| Ok(Value::F32(normalize_decimal(token).parse()?))),
    );
    register(
        &mut table,
        TypeKind::F64,
        Arc::new(|token| Ok(Value::F64(normalize_decimal(token).parse()?))),
    );
    register(
        &mut table,
        TypeKind::Bool,
        Arc::new(|token| Ok(Value::Bool(parse_bool(token)?))),
    );
    register(
        &mut table,
        TypeKind::DateTime,
        Arc::new(|token| Ok(Value::DateTime(parse_datetime(token)?))),
    );
    register(
        &mut table,
        TypeKind::Uuid,
        Arc::new(|token| Ok(Value::Uuid(Uuid::parse_str(token.trim())?))),
    );
    table
}

/// Convert one raw token into a value for the given target type.
///
/// Lookup order: null detection, user-registered converter, builtin
/// converter, unknown-type fallback. Converters see only their single
/// token; any failure propagates with its cause preserved for the engine
/// to wrap with line and field context.
pub fn convert_field(
    raw: &str,
    ty: FieldType,
    options: &EffectiveOptions,
) -> std::result::Result<Value, BoxError> {
    if (options.null_value_detector)(raw, ty) {
        trace!("token '{}' detected as null for type {}", raw, ty);
        return Ok(Value::default_for(ty));
    }
    if let Some(converter) = options.converters.get(&ty) {
        return converter(raw);
    }
    if let Some(converter) = BUILTIN_CONVERTERS.get(&ty) {
        return converter(raw);
    }
    (options.unknown_type_converter)(raw, ty)
}

/// Normalize a decimal token: trim and accept `,` as the decimal separator.
pub fn normalize_decimal(token: &str) -> String {
    token.trim().replace(',', ".")
}

/// Parse a boolean token: case-insensitive `true`/`false` plus `1`/`0`.
pub fn parse_bool(token: &str) -> std::result::Result<bool, TokenError> {
    let trimmed = token.trim();
    if trimmed == "1" || trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed == "0" || trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(TokenError::Bool(trimmed.to_string()))
    }
}

/// Parse a date/time token, trying the supported invariant formats in order:
/// `YYYY-MM-DD HH:MM:SS`, RFC 3339, `YYYY-MM-DD`, and dotted day-first
/// `DD.MM.YYYY`. Date-only forms resolve to midnight.
pub fn parse_datetime(token: &str) -> std::result::Result<NaiveDateTime, TokenError> {
    let trimmed = token.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }
    Err(TokenError::DateTime(trimmed.to_string()))
}
