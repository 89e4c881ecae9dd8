//! beautysh - A Bash beautifier
//!
//! This library parses Bash scripts with a hand-written PEG grammar into a
//! typed AST and prints them back with consistent indentation and layout.
//!
//! ```
//! use beautysh::{Beautifier, FormatOptions};
//!
//! let outcome = Beautifier::new(FormatOptions::default()).format("if true;then\necho hi\nfi\n", "demo.sh");
//! assert_eq!(outcome.output, "if true; then\n    echo hi\nfi\n");
//! ```

pub mod ast;
pub mod parser;
pub mod formatter;
pub mod config;
pub mod diff;

pub use ast::types::*;
pub use config::{ConfigError, ConfigLayer, Settings};
pub use formatter::{Beautifier, FormatOptions, FormatOutcome, StyleError, VariableStyle};
pub use parser::{parse, Parser, ParseException};
