//! Style Policies
//!
//! Formatting options and the two rewrite policies: function declaration
//! style and variable reference style.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use crate::ast::types::FunctionStyle;

/// Variable reference style. Only forced braces is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStyle {
    /// `$NAME` becomes `${NAME}`
    Braces,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("invalid function style '{0}' (expected fnpar, fnonly or paronly)")]
    Function(String),
    #[error("invalid variable style '{0}' (expected braces)")]
    Variable(String),
}

impl FunctionStyle {
    pub const ALL: [FunctionStyle; 3] = [
        FunctionStyle::KeywordParens,
        FunctionStyle::KeywordOnly,
        FunctionStyle::ParensOnly,
    ];

    /// Configuration name of the style
    pub fn name(&self) -> &'static str {
        match self {
            Self::KeywordParens => "fnpar",
            Self::KeywordOnly => "fnonly",
            Self::ParensOnly => "paronly",
        }
    }

    /// What a declaration looks like in this style
    pub fn example(&self) -> &'static str {
        match self {
            Self::KeywordParens => "function foo() { ... }",
            Self::KeywordOnly => "function foo { ... }",
            Self::ParensOnly => "foo() { ... }",
        }
    }
}

impl fmt::Display for FunctionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FunctionStyle {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fnpar" | "0" => Ok(Self::KeywordParens),
            "fnonly" | "1" => Ok(Self::KeywordOnly),
            "paronly" | "2" => Ok(Self::ParensOnly),
            _ => Err(StyleError::Function(s.to_string())),
        }
    }
}

impl fmt::Display for VariableStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Braces => f.write_str("braces"),
        }
    }
}

impl FromStr for VariableStyle {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "braces" => Ok(Self::Braces),
            _ => Err(StyleError::Variable(s.to_string())),
        }
    }
}

/// Options for one formatting run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Spaces per indentation level; ignored with tabs
    pub indent_size: usize,
    /// Indent with one tab per level
    pub use_tabs: bool,
    /// Rewrite every function header to this style; None keeps each as written
    pub function_style: Option<FunctionStyle>,
    pub variable_style: Option<VariableStyle>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            use_tabs: false,
            function_style: None,
            variable_style: None,
        }
    }
}

impl FormatOptions {
    /// Indentation for `depth` levels
    pub fn indent(&self, depth: usize) -> String {
        if self.use_tabs {
            "\t".repeat(depth)
        } else {
            " ".repeat(depth * self.indent_size)
        }
    }
}

/// Brace every `$NAME` reference in raw text, leaving `$1`, `$?`, `${...}`,
/// `$$` and backslash-escaped dollars alone. Used for unquoted heredoc
/// bodies, which are not parsed into words.
pub fn brace_simple_params(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some((_, next)) = chars.next() {
                    out.push(next);
                }
            }
            '$' => match chars.peek() {
                Some(&(_, '$')) => {
                    out.push_str("$$");
                    chars.next();
                }
                Some(&(start, n)) if n.is_ascii_alphabetic() || n == '_' => {
                    let mut end = start;
                    while let Some(&(j, ch)) = chars.peek() {
                        if ch.is_ascii_alphanumeric() || ch == '_' {
                            end = j + ch.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push_str("${");
                    out.push_str(&text[start..end]);
                    out.push('}');
                }
                _ => out.push('$'),
            },
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_style_names() {
        assert_eq!("fnpar".parse::<FunctionStyle>(), Ok(FunctionStyle::KeywordParens));
        assert_eq!("FnOnly".parse::<FunctionStyle>(), Ok(FunctionStyle::KeywordOnly));
        assert_eq!("paronly".parse::<FunctionStyle>(), Ok(FunctionStyle::ParensOnly));
        assert_eq!("0".parse::<FunctionStyle>(), Ok(FunctionStyle::KeywordParens));
        assert_eq!("2".parse::<FunctionStyle>(), Ok(FunctionStyle::ParensOnly));
        assert!("3".parse::<FunctionStyle>().is_err());
        for style in FunctionStyle::ALL {
            assert_eq!(style.name().parse::<FunctionStyle>(), Ok(style));
        }
    }

    #[test]
    fn test_variable_style_names() {
        assert_eq!("braces".parse::<VariableStyle>(), Ok(VariableStyle::Braces));
        assert_eq!(
            "parens".parse::<VariableStyle>(),
            Err(StyleError::Variable("parens".to_string()))
        );
    }

    #[test]
    fn test_indent() {
        let spaces = FormatOptions {
            indent_size: 2,
            ..Default::default()
        };
        assert_eq!(spaces.indent(2), "    ");
        let tabs = FormatOptions {
            use_tabs: true,
            ..Default::default()
        };
        assert_eq!(tabs.indent(2), "\t\t");
    }

    #[test]
    fn test_brace_simple_params() {
        assert_eq!(brace_simple_params("Hello $USER!"), "Hello ${USER}!");
        assert_eq!(brace_simple_params("$a$b_c x"), "${a}${b_c} x");
        assert_eq!(brace_simple_params("$1 $? $@ $$ ${x}"), "$1 $? $@ $$ ${x}");
        assert_eq!(brace_simple_params("cost \\$PRICE"), "cost \\$PRICE");
        assert_eq!(brace_simple_params("$$HOME"), "$$HOME");
        assert_eq!(brace_simple_params("trailing $"), "trailing $");
    }
}
