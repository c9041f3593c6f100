//! The line-parsing engine.
//!
//! [`LineParser`] orchestrates per-line processing: admission, tokenization,
//! per-field conversion, and field assignment through the setter cache. Its
//! output is a lazy, forward-only sequence of records; any failure aborts
//! the sequence at the failing line with full line and field context.

use std::io::BufRead;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::admission::{Admission, LineClass};
use crate::convert::convert_field;
use crate::options::{EffectiveOptions, ParserOptions};
use crate::record::{Record, SetterCache};
use crate::schema::Schema;
use crate::{Error, Result};

/// Schema-driven parser turning delimited text lines into typed records.
///
/// Options are merged with the process defaults once, at construction, and
/// are immutable afterwards. The schema is set once, explicitly or derived
/// from a record type, before the first parse call.
#[derive(Debug)]
pub struct LineParser {
    schema: Option<Schema>,
    options: EffectiveOptions,
    setters: SetterCache,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl LineParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            schema: None,
            options: options.merge(),
            setters: SetterCache::new(),
        }
    }

    /// Construct a parser with its schema in one step.
    pub fn with_schema(options: ParserOptions, schema: Schema) -> Self {
        let mut parser = Self::new(options);
        parser.set_schema(schema);
        parser
    }

    /// Construct a parser whose schema is derived from a record type's
    /// declared fields.
    pub fn with_schema_from<T: Record>(options: ParserOptions) -> Self {
        Self::with_schema(options, Schema::from_record::<T>())
    }

    pub fn set_schema(&mut self, schema: Schema) {
        debug!("schema attached with {} fields", schema.len());
        self.schema = Some(schema);
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Parse an in-memory sequence of lines into a lazy sequence of records.
    ///
    /// Schema presence is validated eagerly; the returned iterator yields
    /// `Ok` records until the input is exhausted or a line fails, after
    /// which it yields the error once and then fuses.
    pub fn parse<T, I>(&self, lines: I) -> Result<Records<'_, T, IterLines<I::IntoIter>>>
    where
        T: Record,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let required_tokens = self.ensure_schema()?;
        Ok(Records::new(
            self,
            required_tokens,
            IterLines {
                inner: lines.into_iter(),
            },
        ))
    }

    /// Parse lines pulled from a buffered reader.
    pub fn parse_reader<T, R>(&self, reader: R) -> Result<Records<'_, T, ReaderLines<R>>>
    where
        T: Record,
        R: BufRead,
    {
        let required_tokens = self.ensure_schema()?;
        Ok(Records::new(
            self,
            required_tokens,
            ReaderLines {
                inner: reader.lines(),
            },
        ))
    }

    /// Fail fast when no non-empty schema is attached; returns the minimum
    /// token count a line must supply.
    fn ensure_schema(&self) -> Result<usize> {
        self.schema
            .as_ref()
            .and_then(Schema::max_required_tokens)
            .ok_or_else(|| Error::configuration("schema is not set"))
    }

    fn parse_line<T: Record>(&self, line_number: usize, raw: &str, required: usize) -> Result<T> {
        let tokens = (self.options.tokenizer)(raw);
        if tokens.len() < required {
            return Err(Error::too_few_fields(line_number, raw, tokens.len(), required));
        }

        let mut record = T::default();
        // ensure_schema guarantees the schema is present here.
        let fields = self.schema.iter().flat_map(Schema::fields);
        for field in fields {
            let token = &tokens[field.position()];
            let value = convert_field(token, field.ty(), &self.options).map_err(|source| {
                Error::field_conversion(line_number, field.name(), field.ty(), token, source)
            })?;

            let writer = self.setters.writer::<T>(field.name()).map_err(|source| {
                Error::field_assignment(
                    line_number,
                    field.name(),
                    field.ty(),
                    &value,
                    Box::new(source),
                )
            })?;
            writer(&mut record, value.clone()).map_err(|source| {
                Error::field_assignment(
                    line_number,
                    field.name(),
                    field.ty(),
                    &value,
                    Box::new(source),
                )
            })?;
        }
        Ok(record)
    }
}

/// Pull-based source of raw lines.
pub trait LineSource {
    fn next_line(&mut self) -> Option<Result<String>>;
}

/// Line source over an in-memory iterator of strings.
pub struct IterLines<I> {
    inner: I,
}

impl<I> LineSource for IterLines<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn next_line(&mut self) -> Option<Result<String>> {
        self.inner.next().map(|line| Ok(line.as_ref().to_string()))
    }
}

/// Line source over a buffered reader.
pub struct ReaderLines<R> {
    inner: std::io::Lines<R>,
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_line(&mut self) -> Option<Result<String>> {
        self.inner
            .next()
            .map(|line| line.map_err(|e| Error::io("failed to read line from input", e)))
    }
}

/// Lazy, forward-only, single-pass sequence of parsed records.
///
/// Per-invocation state (line counter, header flag) lives here, never on
/// the parser, so independent parse calls on one parser do not interfere.
/// After the first error the iterator fuses and yields `None` forever.
pub struct Records<'p, T, S> {
    parser: &'p LineParser,
    source: S,
    admission: Admission,
    required_tokens: usize,
    line_number: usize,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<'p, T: Record, S: LineSource> Records<'p, T, S> {
    fn new(parser: &'p LineParser, required_tokens: usize, source: S) -> Self {
        Self {
            parser,
            source,
            admission: Admission::new(),
            required_tokens,
            line_number: 0,
            done: false,
            _record: PhantomData,
        }
    }
}

impl<T: Record, S: LineSource> Iterator for Records<'_, T, S> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let raw = match self.source.next_line()? {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            self.line_number += 1;

            match self.admission.classify(&raw, &self.parser.options) {
                LineClass::Skip => {
                    trace!("line {} skipped", self.line_number);
                }
                LineClass::Header => {
                    debug!("line {} consumed as header", self.line_number);
                }
                LineClass::Data => {
                    let parsed =
                        self.parser
                            .parse_line::<T>(self.line_number, &raw, self.required_tokens);
                    if let Err(e) = &parsed {
                        debug!("line {} failed: {}", self.line_number, e);
                        self.done = true;
                    }
                    return Some(parsed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldType, Value};
    use crate::{Schema, SchemaField, impl_record};

    impl_record! {
        struct Pair {
            left: String,
            right: i32,
        }
    }

    fn pair_schema() -> Schema {
        Schema::new(vec![
            SchemaField::new("left", 0, FieldType::STRING).unwrap(),
            SchemaField::new("right", 1, FieldType::I32).unwrap(),
        ])
    }

    #[test]
    fn test_missing_schema_is_a_configuration_error() {
        let parser = LineParser::new(ParserOptions::new());
        let err = parser.parse::<Pair, _>(["a;1"]).err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_empty_schema_is_a_configuration_error() {
        let parser = LineParser::with_schema(ParserOptions::new(), Schema::default());
        assert!(parser.parse::<Pair, _>(["a;1"]).is_err());
    }

    #[test]
    fn test_parses_admitted_lines_in_order() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());
        let records: Vec<Pair> = parser
            .parse(["a;1", "b;2"])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].left, "a");
        assert_eq!(records[1].right, 2);
    }

    #[test]
    fn test_too_few_fields_reports_line_and_counts() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());
        let results: Vec<_> = parser.parse::<Pair, _>(["a;1", "only-one"]).unwrap().collect();

        assert!(results[0].is_ok());
        match results[1].as_ref().unwrap_err() {
            Error::TooFewFields {
                line,
                raw,
                actual,
                expected,
            } => {
                assert_eq!(*line, 2);
                assert_eq!(raw, "only-one");
                assert_eq!(*actual, 1);
                assert_eq!(*expected, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_sequence_fuses_after_first_error() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());
        let mut records = parser.parse::<Pair, _>(["bad", "a;1"]).unwrap();

        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_conversion_failure_carries_field_context() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());
        let err = parser
            .parse::<Pair, _>(["a;not-a-number"])
            .unwrap()
            .next()
            .unwrap()
            .unwrap_err();

        match &err {
            Error::FieldConversion {
                line,
                field,
                ty,
                token,
                ..
            } => {
                assert_eq!(*line, 1);
                assert_eq!(field, "right");
                assert_eq!(*ty, FieldType::I32);
                assert_eq!(token, "not-a-number");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.line_number(), Some(1));
    }

    #[test]
    fn test_assignment_failure_names_value_and_kind() {
        // Mismatched schema: declares the second column as bool while the
        // record field is i32, so conversion succeeds but assignment fails.
        let schema = Schema::new(vec![
            SchemaField::new("left", 0, FieldType::STRING).unwrap(),
            SchemaField::new("right", 1, FieldType::BOOL).unwrap(),
        ]);
        let parser = LineParser::with_schema(ParserOptions::new(), schema);
        let err = parser
            .parse::<Pair, _>(["a;true"])
            .unwrap()
            .next()
            .unwrap()
            .unwrap_err();

        match &err {
            Error::FieldAssignment {
                line,
                field,
                value,
                value_kind,
                ..
            } => {
                assert_eq!(*line, 1);
                assert_eq!(field, "right");
                assert_eq!(value, "true");
                assert_eq!(*value_kind, "bool");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_schema_field_is_an_assignment_error() {
        let schema = Schema::new(vec![
            SchemaField::new("nope", 0, FieldType::STRING).unwrap(),
        ]);
        let parser = LineParser::with_schema(ParserOptions::new(), schema);
        let err = parser
            .parse::<Pair, _>(["a"])
            .unwrap()
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, Error::FieldAssignment { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_reparsing_same_input_yields_identical_records() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());
        let input = ["a;1", "b;2", "c;3"];

        let first: Vec<Pair> = parser
            .parse(input)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let second: Vec<Pair> = parser
            .parse(input)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_discarded_even_when_malformed() {
        let parser = LineParser::with_schema(
            ParserOptions::new().with_header(true),
            pair_schema(),
        );
        // The header is not well-formed data; it must still be discarded
        // without raising an error.
        let records: Vec<Pair> = parser
            .parse(["garbage header", "a;1"])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].left, "a");
    }

    #[test]
    fn test_custom_converter_override_is_used() {
        let options = ParserOptions::new()
            .with_converter(FieldType::I32, |token| {
                Ok(Value::I32(token.trim().parse::<i32>()? * 10))
            });
        let parser = LineParser::with_schema(options, pair_schema());
        let records: Vec<Pair> = parser
            .parse(["a;4"])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[0].right, 40);
    }

    #[test]
    fn test_laziness_stops_with_consumer() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());
        let mut records = parser.parse::<Pair, _>(["a;1", "bad", "b;2"]).unwrap();

        // Only the first element is requested; the bad line is never reached.
        assert!(records.next().unwrap().is_ok());
    }

    #[test]
    fn test_independent_parse_calls_from_threads() {
        let parser = LineParser::with_schema(ParserOptions::new(), pair_schema());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let records: Vec<Pair> = parser
                        .parse(["a;1", "b;2"])
                        .unwrap()
                        .collect::<Result<_>>()
                        .unwrap();
                    assert_eq!(records.len(), 2);
                });
            }
        });
    }

    #[test]
    fn test_schema_derived_from_record_type() {
        let parser = LineParser::with_schema_from::<Pair>(ParserOptions::new());
        let schema = parser.schema().unwrap();
        assert_eq!(schema.fields()[0].name(), "left");
        assert_eq!(schema.fields()[0].position(), 0);
        assert_eq!(schema.fields()[1].name(), "right");
        assert_eq!(schema.fields()[1].position(), 1);

        let records: Vec<Pair> = parser
            .parse(["x;9"])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[0], Pair { left: "x".to_string(), right: 9 });
    }
}
