//! Unified diff between a script and its formatted version, for `--check`

use similar::{ChangeTag, TextDiff};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Color unless `NO_COLOR` is set
pub fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Unified diff with 3 context lines; empty when the texts are equal
pub fn unified_diff(original: &str, formatted: &str, color: bool) -> String {
    if original == formatted {
        return String::new();
    }
    let diff = TextDiff::from_lines(original, formatted);
    let mut output = String::new();

    push_line(&mut output, "--- original", None);
    push_line(&mut output, "+++ formatted", None);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        let header = hunk.header().to_string();
        push_line(&mut output, &header, color.then_some(CYAN));

        for change in hunk.iter_changes() {
            let (sign, paint) = match change.tag() {
                ChangeTag::Delete => ("-", RED),
                ChangeTag::Insert => ("+", GREEN),
                ChangeTag::Equal => (" ", ""),
            };
            let text = change.value().strip_suffix('\n').unwrap_or(change.value());
            let line = format!("{}{}", sign, text);
            let paint = (color && !paint.is_empty()).then_some(paint);
            push_line(&mut output, &line, paint);
        }
    }

    output
}

fn push_line(output: &mut String, line: &str, color: Option<&str>) {
    match color {
        Some(code) => {
            output.push_str(code);
            output.push_str(line);
            output.push_str(RESET);
        }
        None => output.push_str(line),
    }
    output.push('\n');
}
