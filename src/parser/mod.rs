//! Parser module for bash scripts
//!
//! This module contains the PEG engine, the Bash grammar, the heredoc
//! preprocessor and the builder that turns parse trees into AST nodes.

pub mod types;
pub mod peg;
pub mod grammar;
pub mod heredoc;
pub mod builder;
pub mod parser;

// Re-exports
pub use types::ParseException;
pub use parser::{parse, Parser};
