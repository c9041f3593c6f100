//! Parser configuration and the merge-with-defaults rule.
//!
//! [`ParserOptions`] holds the caller-facing knobs; unset function-valued
//! fields inherit process defaults when the options are merged, once, at
//! parser construction. The merged [`EffectiveOptions`] is immutable for
//! the lifetime of the parser instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::convert::BoxError;
use crate::value::{FieldType, Value};

/// Splits one raw line into ordered tokens. Must be total over all inputs.
pub type TokenizerFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Decides whether a token should be treated as null for a target type.
pub type NullDetectorFn = Arc<dyn Fn(&str, FieldType) -> bool + Send + Sync>;

/// Fallback conversion for types with no registered converter.
pub type UnknownTypeFn =
    Arc<dyn Fn(&str, FieldType) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Decides whether a raw line is skipped without further processing.
pub type SkipLineFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Converts one token into a value for a single target type.
pub type ConverterFn = Arc<dyn Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Caller-facing parser configuration.
///
/// Every function-valued field is optional; `None` means "use the process
/// default". Per-type converters registered here are consulted before the
/// builtin table.
#[derive(Clone, Default)]
pub struct ParserOptions {
    pub has_header: bool,
    pub tokenizer: Option<TokenizerFn>,
    pub null_value_detector: Option<NullDetectorFn>,
    pub unknown_type_converter: Option<UnknownTypeFn>,
    pub skip_line_predicate: Option<SkipLineFn>,
    pub converters: HashMap<FieldType, ConverterFn>,
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_tokenizer(
        mut self,
        tokenizer: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.tokenizer = Some(Arc::new(tokenizer));
        self
    }

    pub fn with_null_value_detector(
        mut self,
        detector: impl Fn(&str, FieldType) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.null_value_detector = Some(Arc::new(detector));
        self
    }

    pub fn with_unknown_type_converter(
        mut self,
        converter: impl Fn(&str, FieldType) -> std::result::Result<Value, BoxError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.unknown_type_converter = Some(Arc::new(converter));
        self
    }

    pub fn with_skip_line_predicate(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.skip_line_predicate = Some(Arc::new(predicate));
        self
    }

    /// Register an override converter for one target type, consulted before
    /// the builtin table.
    pub fn with_converter(
        mut self,
        ty: FieldType,
        converter: impl Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.converters.insert(ty, Arc::new(converter));
        self
    }

    /// Resolve unset fields against the process defaults. Caller-supplied
    /// values win; the result never changes afterwards.
    pub(crate) fn merge(self) -> EffectiveOptions {
        EffectiveOptions {
            has_header: self.has_header,
            tokenizer: self.tokenizer.unwrap_or_else(|| Arc::new(default_tokenizer)),
            null_value_detector: self
                .null_value_detector
                .unwrap_or_else(|| Arc::new(default_null_detector)),
            unknown_type_converter: self
                .unknown_type_converter
                .unwrap_or_else(|| Arc::new(default_unknown_type_converter)),
            skip_line_predicate: self
                .skip_line_predicate
                .unwrap_or_else(|| Arc::new(default_skip_line)),
            converters: self.converters,
        }
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserOptions")
            .field("has_header", &self.has_header)
            .field("tokenizer", &self.tokenizer.is_some())
            .field("null_value_detector", &self.null_value_detector.is_some())
            .field(
                "unknown_type_converter",
                &self.unknown_type_converter.is_some(),
            )
            .field("skip_line_predicate", &self.skip_line_predicate.is_some())
            .field("converters", &self.converters.len())
            .finish()
    }
}

/// Effective configuration after the merge: every policy resolved, no
/// optional fields left.
#[derive(Clone)]
pub struct EffectiveOptions {
    pub has_header: bool,
    pub tokenizer: TokenizerFn,
    pub null_value_detector: NullDetectorFn,
    pub unknown_type_converter: UnknownTypeFn,
    pub skip_line_predicate: SkipLineFn,
    pub converters: HashMap<FieldType, ConverterFn>,
}

impl fmt::Debug for EffectiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveOptions")
            .field("has_header", &self.has_header)
            .field("converters", &self.converters.len())
            .finish()
    }
}

/// Default tokenizer: trim the line, cut one trailing `;`, split on `;`.
///
/// No quoting or escaping semantics.
pub fn default_tokenizer(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let cut = trimmed.strip_suffix(';').unwrap_or(trimmed);
    cut.split(';').map(str::to_string).collect()
}

/// Default null detection: the token is empty or whitespace-only.
pub fn default_null_detector(token: &str, _ty: FieldType) -> bool {
    token.trim().is_empty()
}

/// Default skip predicate: blank lines and `#` comment lines.
pub fn default_skip_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Default fallback for types with no registered converter: textual
/// coercion, yielding the trimmed token as a string value.
pub fn default_unknown_type_converter(
    token: &str,
    _ty: FieldType,
) -> std::result::Result<Value, BoxError> {
    Ok(Value::String(token.trim().to_string()))
}
