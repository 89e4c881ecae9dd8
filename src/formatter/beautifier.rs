//! Beautifier
//!
//! The public formatting operation. A script that cannot be parsed is
//! returned untouched together with the parse error; a partially formatted
//! script is never produced.

use tracing::{debug, warn};

use crate::formatter::directives::extract_regions;
use crate::formatter::style::FormatOptions;
use crate::formatter::visitor::Formatter;
use crate::parser::{parse, ParseException};

/// Result of formatting one script
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOutcome {
    /// Formatted text, or the original source when parsing failed
    pub output: String,
    pub error: Option<ParseException>,
}

impl FormatOutcome {
    pub fn had_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Formats Bash scripts with a fixed set of options.
///
/// A `Beautifier` holds no per-script state, so one instance can be shared
/// between threads; every call builds its own tree and visitor.
#[derive(Debug, Clone, Default)]
pub struct Beautifier {
    options: FormatOptions,
}

impl Beautifier {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    /// Format `source`. `path` only labels diagnostics.
    pub fn format(&self, source: &str, path: &str) -> FormatOutcome {
        let (prepared, regions) = extract_regions(source);
        if !regions.is_empty() {
            debug!(path, regions = regions.len(), "extracted verbatim regions");
        }

        let script = match parse(&prepared) {
            Ok(script) => script,
            Err(mut error) => {
                error.line = regions.original_line(error.line);
                warn!(path, line = error.line, column = error.column, "{}", error.message);
                return FormatOutcome {
                    output: source.to_string(),
                    error: Some(error),
                };
            }
        };

        let formatted = Formatter::new(&self.options).format_script(&script);
        let mut output = regions.restore(&formatted);
        if source.ends_with('\n') {
            output.push('\n');
        }
        debug!(path, changed = output != source, "formatted script");

        FormatOutcome {
            output,
            error: None,
        }
    }
}
