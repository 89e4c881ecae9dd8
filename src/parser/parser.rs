//! Bash Script Parser
//!
//! Entry point tying the stages together:
//!
//!   source ─▶ heredoc extraction ─▶ grammar match ─▶ AST build
//!
//! Any failure in any stage fails the whole parse; there is no partial tree.

use tracing::debug;

use crate::ast::types::ScriptNode;
use crate::parser::builder::AstBuilder;
use crate::parser::grammar::{Rule, BASH_GRAMMAR};
use crate::parser::heredoc::extract_heredocs;
use crate::parser::types::{LineIndex, ParseException, MAX_INPUT_SIZE};

/// Main parser struct
pub struct Parser {
    input: String,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Parser {
            input: String::new(),
        }
    }

    /// Get the raw input string being parsed.
    pub fn get_input(&self) -> &str {
        &self.input
    }

    /// Parse a bash script string
    pub fn parse(&mut self, input: &str) -> Result<ScriptNode, ParseException> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(ParseException::new(
                format!(
                    "Input too large: {} bytes exceeds limit of {}",
                    input.len(),
                    MAX_INPUT_SIZE
                ),
                1,
                1,
            ));
        }
        self.input = input.to_string();

        let pre = extract_heredocs(input);
        debug!(heredocs = pre.bodies.len(), "extracted here-documents");

        let root = BASH_GRAMMAR.parse(Rule::Script, &pre.source).map_err(|e| {
            let (line, column) = LineIndex::new(&pre.source).position(e.offset);
            ParseException::new(e.message, pre.original_line(line), column)
        })?;

        let script = AstBuilder::new(&pre).build(&root)?;
        debug!(statements = script.statements.len(), "parsed script");
        Ok(script)
    }
}

/// Convenience function to parse a bash script
pub fn parse(input: &str) -> Result<ScriptNode, ParseException> {
    let mut parser = Parser::new();
    parser.parse(input)
}
