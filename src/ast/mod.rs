//! Abstract Syntax Tree (AST) Types for Bash
//!
//! This module defines the typed tree produced by the parser and consumed
//! by the formatter.
//!
//! Architecture:
//!   Source → Directives → Heredocs → Grammar → Builder → AST → Formatter → Output

pub mod types;
