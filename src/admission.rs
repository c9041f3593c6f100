//! Line admission: the skip / header / data classification applied to each
//! raw line before tokenization.

use crate::options::EffectiveOptions;

/// Classification of one raw input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Blank or comment line; contributes to neither header consumption nor
    /// output.
    Skip,
    /// The discarded header line, consumed at most once per invocation.
    Header,
    /// A data line, admitted for tokenization.
    Data,
}

/// Per-invocation admission state.
///
/// The header-pending flag is cleared by the first non-skipped line,
/// regardless of whether that line was consumed as a header or admitted as
/// data.
#[derive(Debug)]
pub struct Admission {
    header_pending: bool,
}

impl Admission {
    pub fn new() -> Self {
        Self {
            header_pending: true,
        }
    }

    pub fn classify(&mut self, line: &str, options: &EffectiveOptions) -> LineClass {
        if (options.skip_line_predicate)(line) {
            return LineClass::Skip;
        }
        if self.header_pending {
            self.header_pending = false;
            if options.has_header {
                return LineClass::Header;
            }
        }
        LineClass::Data
    }
}

impl Default for Admission {
    fn default() -> Self {
        Self::new()
    }
}
