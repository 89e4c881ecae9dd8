//! Here-Document Extraction
//!
//! Heredoc bodies are not part of the grammar. Before parsing, the source is
//! scanned once with a small context stack (quotes, comments, arithmetic,
//! substitutions); every `<<DELIM` marker found in code context registers a
//! pending body, and at the end of that line the pending bodies are cut out
//! of the text in marker order. The grammar then sees only the marker, and
//! the AST builder hands out the stored bodies in the same order.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::parser::grammar::HEREDOC_DELIMITER;

lazy_static! {
    static ref DELIMITER_AT: Regex = Regex::new(&format!("^(?:{})", HEREDOC_DELIMITER)).unwrap();
}

/// One extracted heredoc body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HereDocBody {
    pub delimiter: String,
    /// Body lines, each terminated by `\n`
    pub body: String,
    /// The terminator line exactly as written, `None` if the input ended first
    pub terminator: Option<String>,
}

/// Source with heredoc bodies removed
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub source: String,
    pub bodies: Vec<HereDocBody>,
    /// (line in stripped source, lines removed after it)
    shifts: Vec<(usize, usize)>,
}

impl Preprocessed {
    /// Map a 1-based line of the stripped source back to the input
    pub fn original_line(&self, line: usize) -> usize {
        line + self
            .shifts
            .iter()
            .filter(|(after, _)| *after < line)
            .map(|(_, removed)| removed)
            .sum::<usize>()
    }
}

/// Split a raw delimiter token into its word and quoting character
pub fn split_delimiter(raw: &str) -> (String, Option<char>) {
    let mut chars = raw.chars();
    match chars.next() {
        Some(q @ ('\'' | '"')) if raw.len() >= 2 && raw.ends_with(q) => {
            (raw[1..raw.len() - 1].to_string(), Some(q))
        }
        Some('\\') => (chars.as_str().to_string(), Some('\\')),
        _ => (raw.to_string(), None),
    }
}

#[derive(Debug, Clone, Copy)]
enum Context {
    Code { parens: usize },
    DoubleQuote,
    Arith { depth: usize },
    /// `$[ ... ]`
    ArithBracket { depth: usize },
    Param { depth: usize },
}

struct Pending {
    delimiter: String,
    strip_tabs: bool,
}

/// Remove heredoc bodies from `source`, returning them in marker order
pub fn extract_heredocs(source: &str) -> Preprocessed {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut stack = vec![Context::Code { parens: 0 }];
    let mut pending: Vec<Pending> = Vec::new();
    let mut result = Preprocessed::default();
    let mut copy_from = 0;
    let mut out_lines = 0;
    let mut i = 0;

    while i < len {
        let c = bytes[i];
        let top = stack.len() - 1;
        let context = stack[top];
        match context {
            Context::Code { parens } => match c {
                b'\\' => i += 2,
                b'\'' => i = skip_single_quoted(bytes, i + 1),
                b'"' => {
                    stack.push(Context::DoubleQuote);
                    i += 1;
                }
                b'`' => i = skip_backtick(bytes, i + 1),
                b'#' if i == 0 || b" \t\n;&|()".contains(&bytes[i - 1]) => {
                    while i < len && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                b'$' => i = enter_dollar(source, i, &mut stack, true),
                b'(' if source[i..].starts_with("((") => {
                    stack.push(Context::Arith { depth: 0 });
                    i += 2;
                }
                b'(' => {
                    stack[top] = Context::Code { parens: parens + 1 };
                    i += 1;
                }
                b')' => {
                    if parens > 0 {
                        stack[top] = Context::Code { parens: parens - 1 };
                    } else if stack.len() > 1 {
                        stack.pop();
                    }
                    i += 1;
                }
                b'<' | b'>' if bytes.get(i + 1) == Some(&b'(') => {
                    stack.push(Context::Code { parens: 0 });
                    i += 2;
                }
                b'<' if source[i..].starts_with("<<<") => i += 3,
                b'<' if source[i..].starts_with("<<") => {
                    i = match heredoc_marker(source, i) {
                        Some((marker, next)) => {
                            pending.push(marker);
                            next
                        }
                        None => i + 2,
                    };
                }
                b'\n' => {
                    i += 1;
                    if !pending.is_empty() {
                        let chunk = &source[copy_from..i];
                        out_lines += chunk.matches('\n').count();
                        result.source.push_str(chunk);

                        let (next, removed) =
                            take_bodies(source, i, pending.drain(..), &mut result.bodies);
                        if removed > 0 {
                            result.shifts.push((out_lines, removed));
                        }
                        i = next;
                        copy_from = i;
                    }
                }
                _ => i += 1,
            },
            Context::DoubleQuote => match c {
                b'\\' => i += 2,
                b'"' => {
                    stack.pop();
                    i += 1;
                }
                b'`' => i = skip_backtick(bytes, i + 1),
                b'$' => i = enter_dollar(source, i, &mut stack, false),
                _ => i += 1,
            },
            Context::Arith { depth } => match c {
                b'(' => {
                    stack[top] = Context::Arith { depth: depth + 1 };
                    i += 1;
                }
                b')' if depth > 0 => {
                    stack[top] = Context::Arith { depth: depth - 1 };
                    i += 1;
                }
                b')' => {
                    stack.pop();
                    i += if bytes.get(i + 1) == Some(&b')') { 2 } else { 1 };
                }
                _ => i += 1,
            },
            Context::ArithBracket { depth } => match c {
                b'[' => {
                    stack[top] = Context::ArithBracket { depth: depth + 1 };
                    i += 1;
                }
                b']' if depth > 0 => {
                    stack[top] = Context::ArithBracket { depth: depth - 1 };
                    i += 1;
                }
                b']' => {
                    stack.pop();
                    i += 1;
                }
                _ => i += 1,
            },
            Context::Param { depth } => match c {
                b'\\' => i += 2,
                b'\'' => i = skip_single_quoted(bytes, i + 1),
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack[top] = Context::Param { depth: depth + 1 };
                    i += 2;
                }
                b'}' if depth > 0 => {
                    stack[top] = Context::Param { depth: depth - 1 };
                    i += 1;
                }
                b'}' => {
                    stack.pop();
                    i += 1;
                }
                _ => i += 1,
            },
        }
    }

    // Markers on the last line with no newline after them have empty bodies
    for marker in pending {
        result.bodies.push(HereDocBody {
            delimiter: marker.delimiter,
            body: String::new(),
            terminator: None,
        });
    }

    if copy_from < len {
        result.source.push_str(&source[copy_from..]);
    }
    result
}

/// Handle a `$` in code or double-quote context, returning the next index
fn enter_dollar(source: &str, i: usize, stack: &mut Vec<Context>, in_code: bool) -> usize {
    let rest = &source[i..];
    if rest.starts_with("$((") {
        stack.push(Context::Arith { depth: 0 });
        i + 3
    } else if rest.starts_with("$[") {
        stack.push(Context::ArithBracket { depth: 0 });
        i + 2
    } else if rest.starts_with("$(") {
        stack.push(Context::Code { parens: 0 });
        i + 2
    } else if rest.starts_with("${") {
        stack.push(Context::Param { depth: 0 });
        i + 2
    } else if in_code && rest.starts_with("$'") {
        skip_ansi_quoted(source.as_bytes(), i + 2)
    } else {
        i + 1
    }
}

/// Parse `<<DELIM` / `<<-DELIM` at `i`; the caller has checked for `<<`
fn heredoc_marker(source: &str, i: usize) -> Option<(Pending, usize)> {
    let bytes = source.as_bytes();
    if i > 0 {
        let prev = bytes[i - 1];
        if !matches!(prev, b' ' | b'\t' | b'\n') && !prev.is_ascii_digit() {
            return None;
        }
    }

    let mut j = i + 2;
    let strip_tabs = bytes.get(j) == Some(&b'-');
    if strip_tabs {
        j += 1;
    }
    while j < bytes.len() && matches!(bytes[j], b' ' | b'\t') {
        j += 1;
    }

    let raw = DELIMITER_AT.find(&source[j..])?.as_str();
    let (delimiter, _) = split_delimiter(raw);
    Some((
        Pending {
            delimiter,
            strip_tabs,
        },
        j + raw.len(),
    ))
}

/// Consume one body per pending marker starting at line start `i`.
/// Returns the index after the consumed lines and how many lines went.
fn take_bodies(
    source: &str,
    mut i: usize,
    pending: impl Iterator<Item = Pending>,
    bodies: &mut Vec<HereDocBody>,
) -> (usize, usize) {
    let len = source.len();
    let mut removed = 0;

    for marker in pending {
        let mut body = String::new();
        let mut terminator = None;

        while i < len {
            let line_end = source[i..].find('\n').map_or(len, |p| i + p);
            let line = &source[i..line_end];
            i = (line_end + 1).min(len);
            removed += 1;

            let candidate = if marker.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            if candidate == marker.delimiter {
                terminator = Some(line.to_string());
                break;
            }
            body.push_str(line);
            body.push('\n');
        }

        bodies.push(HereDocBody {
            delimiter: marker.delimiter,
            body,
            terminator,
        });
    }

    (i, removed)
}

fn skip_single_quoted(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\'' {
        i += 1;
    }
    (i + 1).min(bytes.len())
}

fn skip_ansi_quoted(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\'' {
        if bytes[i] == b'\\' {
            i += 1;
        }
        i += 1;
    }
    (i + 1).min(bytes.len())
}

fn skip_backtick(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'`' {
        if bytes[i] == b'\\' {
            i += 1;
        }
        i += 1;
    }
    (i + 1).min(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_body_and_terminator() {
        let pre = extract_heredocs("cat <<EOF\nhello\n  world\nEOF\necho done\n");
        assert_eq!(pre.source, "cat <<EOF\necho done\n");
        assert_eq!(pre.bodies.len(), 1);
        assert_eq!(pre.bodies[0].delimiter, "EOF");
        assert_eq!(pre.bodies[0].body, "hello\n  world\n");
        assert_eq!(pre.bodies[0].terminator.as_deref(), Some("EOF"));
    }

    #[test]
    fn test_strip_tabs_keeps_raw_terminator() {
        let pre = extract_heredocs("cat <<-END\n\tbody\n\tEND\n");
        assert_eq!(pre.bodies[0].body, "\tbody\n");
        assert_eq!(pre.bodies[0].terminator.as_deref(), Some("\tEND"));
    }

    #[test]
    fn test_tab_indented_terminator_needs_dash() {
        let pre = extract_heredocs("cat <<END\n\tEND\nEND\n");
        assert_eq!(pre.bodies[0].body, "\tEND\n");
        assert_eq!(pre.bodies[0].terminator.as_deref(), Some("END"));
    }

    #[test]
    fn test_quoted_delimiters() {
        let pre = extract_heredocs("cat <<'EOF'\n$HOME\nEOF\ncat <<\"X\"\na\nX\n");
        assert_eq!(pre.source, "cat <<'EOF'\ncat <<\"X\"\n");
        assert_eq!(pre.bodies[0].delimiter, "EOF");
        assert_eq!(pre.bodies[0].body, "$HOME\n");
        assert_eq!(pre.bodies[1].delimiter, "X");
    }

    #[test]
    fn test_multiple_markers_on_one_line() {
        let pre = extract_heredocs("paste <<A <<B\none\nA\ntwo\nB\n");
        assert_eq!(pre.source, "paste <<A <<B\n");
        assert_eq!(pre.bodies[0].body, "one\n");
        assert_eq!(pre.bodies[1].body, "two\n");
    }

    #[test]
    fn test_unterminated_runs_to_end() {
        let pre = extract_heredocs("cat <<EOF\nline one\nline two");
        assert_eq!(pre.source, "cat <<EOF\n");
        assert_eq!(pre.bodies[0].body, "line one\nline two\n");
        assert_eq!(pre.bodies[0].terminator, None);
    }

    #[test]
    fn test_non_heredoc_contexts_are_ignored() {
        for src in [
            "grep x <<<\"$v\"\n",
            "echo $((1<<2))\n",
            "(( x = 1 << 3 ))\n",
            "echo \"<<EOF\"\n",
            "echo '<<EOF'\n",
            "# cat <<EOF\n",
            "echo a<<b\n",
            "echo $[ 1 << 2 ]\n",
            "echo \"$[ a[0] << 1 ]\"\n",
        ] {
            let pre = extract_heredocs(src);
            assert!(pre.bodies.is_empty(), "{:?}", src);
            assert_eq!(pre.source, src);
        }
    }

    #[test]
    fn test_marker_after_bracket_arithmetic() {
        let pre = extract_heredocs("echo $[ 1 << 2 ] <<EOF\nx\nEOF\n");
        assert_eq!(pre.source, "echo $[ 1 << 2 ] <<EOF\n");
        assert_eq!(pre.bodies.len(), 1);
        assert_eq!(pre.bodies[0].body, "x\n");
    }

    #[test]
    fn test_heredoc_inside_command_substitution() {
        let pre = extract_heredocs("x=\"$(cat <<EOF\nhi\nEOF\n)\"\n");
        assert_eq!(pre.source, "x=\"$(cat <<EOF\n)\"\n");
        assert_eq!(pre.bodies[0].body, "hi\n");
    }

    #[test]
    fn test_digit_prefixed_marker() {
        let pre = extract_heredocs("cmd 3<<EOF\nx\nEOF\n");
        assert_eq!(pre.bodies.len(), 1);
    }

    #[test]
    fn test_original_line_mapping() {
        let pre = extract_heredocs("cat <<A\n1\n2\nA\necho\ncat <<B\n3\nB\nbad\n");
        assert_eq!(pre.source, "cat <<A\necho\ncat <<B\nbad\n");
        assert_eq!(pre.original_line(1), 1);
        assert_eq!(pre.original_line(2), 5);
        assert_eq!(pre.original_line(3), 6);
        assert_eq!(pre.original_line(4), 9);
    }

    #[test]
    fn test_split_delimiter() {
        assert_eq!(split_delimiter("EOF"), ("EOF".to_string(), None));
        assert_eq!(split_delimiter("'EOF'"), ("EOF".to_string(), Some('\'')));
        assert_eq!(split_delimiter("\"EOF\""), ("EOF".to_string(), Some('"')));
        assert_eq!(split_delimiter("\\EOF"), ("EOF".to_string(), Some('\\')));
    }
}
