//! Formatter module
//!
//! Turns a parsed script back into text:
//!
//!   source ─▶ directives ─▶ parser ─▶ visitor ─▶ restore regions ─▶ output

pub mod style;
pub mod directives;
pub mod visitor;
pub mod beautifier;

// Re-exports
pub use beautifier::{Beautifier, FormatOutcome};
pub use style::{FormatOptions, FunctionStyle, StyleError, VariableStyle};
