//! Formatter Visitor
//!
//! Walks the AST and produces the formatted text. Each `render_*` method
//! returns the text of one node at a given depth; the only mutable state
//! is the queue of heredoc bodies waiting for the next line break.
//!
//! Heredoc bodies cannot be written where their marker is. They are queued
//! when the redirection is rendered and flushed by `newline()`, which every
//! line break in the output goes through.

use crate::ast::types::*;
use crate::formatter::style::{brace_simple_params, FormatOptions, VariableStyle};

pub struct Formatter<'a> {
    options: &'a FormatOptions,
    /// Heredoc texts (body plus terminator line) not yet written
    pending: Vec<String>,
}

impl<'a> Formatter<'a> {
    pub fn new(options: &'a FormatOptions) -> Self {
        Self {
            options,
            pending: Vec::new(),
        }
    }

    /// Format a whole script. The result carries no trailing newline unless
    /// the script ends in a heredoc or blank lines.
    pub fn format_script(&mut self, script: &ScriptNode) -> String {
        let mut out = self.render_statements(&script.statements, 0);
        out.push_str(&self.finish());
        out
    }

    // ===========================================================================
    // LINE BREAKS
    // ===========================================================================

    fn indent(&self, depth: usize) -> String {
        self.options.indent(depth)
    }

    /// A line break, followed by every heredoc body queued since the last one
    fn newline(&mut self) -> String {
        let mut out = String::from("\n");
        for text in self.pending.drain(..) {
            out.push_str(&text);
        }
        out
    }

    /// Heredocs still queued at the end of the output
    fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let mut out = self.newline();
        out.pop();
        out
    }

    // ===========================================================================
    // LISTS & STATEMENTS
    // ===========================================================================

    fn render_statements(&mut self, statements: &[StatementNode], depth: usize) -> String {
        let mut out = String::new();
        for (i, statement) in statements.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.newline());
            }
            out.push_str(&self.render_statement(statement, depth));
        }
        out
    }

    fn render_list(&mut self, list: &CompoundListNode, depth: usize) -> String {
        self.render_statements(&list.statements, depth)
    }

    fn render_statement(&mut self, statement: &StatementNode, depth: usize) -> String {
        let mut line = match &statement.command {
            CommandNode::BlankLine(_) => match &statement.comment {
                Some(comment) => render_comment(comment),
                None => return String::new(),
            },
            CommandNode::Comment(comment) => render_comment(comment),
            command => {
                let mut text = self.render_command(command, depth);
                if statement.background {
                    text.push_str(" &");
                }
                if let Some(comment) = &statement.comment {
                    text.push(' ');
                    text.push_str(&render_comment(comment));
                }
                text
            }
        };
        line.insert_str(0, &self.indent(depth));
        line
    }

    /// Render a list on one line (`a; b; c`), or None when it cannot be:
    /// it holds comments or blank lines, a statement spans several lines,
    /// or a heredoc would need a line break that is not there. With
    /// `continuations`, statements broken only after `\`, `|`, `&&` or `||`
    /// still count as one line.
    fn try_inline(
        &mut self,
        list: &CompoundListNode,
        depth: usize,
        continuations: bool,
    ) -> Option<String> {
        if list.is_empty() {
            return None;
        }
        // Heredocs queued before the trial must wait for the first real line
        // break, so a header that breaks cannot be inline while they wait
        let continuations = continuations && self.pending.is_empty();
        let queued = std::mem::take(&mut self.pending);
        let inline = self.inline_statements(list, depth, continuations);
        self.pending = queued;
        inline
    }

    fn inline_statements(
        &mut self,
        list: &CompoundListNode,
        depth: usize,
        continuations: bool,
    ) -> Option<String> {
        let mut out = String::new();
        let mut after_background = false;

        for (i, statement) in list.statements.iter().enumerate() {
            if statement.command.is_trivia() || statement.comment.is_some() {
                return None;
            }
            let text = self.render_command(&statement.command, depth);
            if !self.pending.is_empty() {
                return None;
            }
            let breaks = text.matches('\n').count();
            if breaks > 0
                && !(continuations && continuation_breaks(&statement.command) == Some(breaks))
            {
                return None;
            }
            if i > 0 {
                out.push_str(if after_background { " " } else { "; " });
            }
            out.push_str(&text);
            if statement.background {
                out.push_str(" &");
            }
            after_background = statement.background;
        }
        Some(out)
    }

    /// `if COND; then` on one line when possible, otherwise the condition
    /// indented between `if` and `then`
    fn render_header(
        &mut self,
        keyword: &str,
        condition: &CompoundListNode,
        closer: &str,
        depth: usize,
    ) -> String {
        let ends_in_background = condition.statements.last().map_or(false, |s| s.background);
        if !ends_in_background {
            if let Some(inline) = self.try_inline(condition, depth, true) {
                return format!("{} {}; {}", keyword, inline, closer);
            }
        }
        let mut out = keyword.to_string();
        out.push_str(&self.newline());
        out.push_str(&self.render_list(condition, depth + 1));
        out.push_str(&self.newline());
        out.push_str(&self.indent(depth));
        out.push_str(closer);
        out
    }

    /// Body one level deeper, then the closing keyword back at `depth`
    fn render_body(&mut self, body: &CompoundListNode, closer: &str, depth: usize) -> String {
        let mut out = self.newline();
        out.push_str(&self.render_list(body, depth + 1));
        out.push_str(&self.newline());
        out.push_str(&self.indent(depth));
        out.push_str(closer);
        out
    }

    // ===========================================================================
    // COMMANDS
    // ===========================================================================

    fn render_command(&mut self, command: &CommandNode, depth: usize) -> String {
        match command {
            CommandNode::Simple(simple) => self.render_simple(simple, depth),
            CommandNode::Pipeline(pipeline) => self.render_pipeline(pipeline, depth),
            CommandNode::AndOr(list) => self.render_and_or(list, depth),
            CommandNode::Compound(compound) => self.render_compound(compound, depth),
            CommandNode::FunctionDef(function) => self.render_function(function, depth),
            CommandNode::Comment(comment) => render_comment(comment),
            CommandNode::BlankLine(_) => String::new(),
        }
    }

    fn render_pipeline(&mut self, pipeline: &PipelineNode, depth: usize) -> String {
        let mut out = String::new();
        if pipeline.negated {
            out.push_str("! ");
        }
        // Commands after a broken line sit one level deeper
        let mut inner = depth;
        for (i, command) in pipeline.commands.iter().enumerate() {
            if i > 0 {
                let connector = pipeline.connectors.get(i - 1).copied().unwrap_or_default();
                out.push_str(if connector.stderr { " |&" } else { " |" });
                if connector.line_break {
                    inner = depth + 1;
                    out.push_str(&self.newline());
                    out.push_str(&self.indent(inner));
                } else {
                    out.push(' ');
                }
            }
            out.push_str(&self.render_command(command, inner));
        }
        out
    }

    fn render_and_or(&mut self, list: &AndOrListNode, depth: usize) -> String {
        let mut out = self.render_command(&list.first, depth);
        let mut inner = depth;
        for part in &list.rest {
            out.push(' ');
            out.push_str(&part.operator.to_string());
            if part.line_break {
                inner = depth + 1;
                out.push_str(&self.newline());
                out.push_str(&self.indent(inner));
            } else {
                out.push(' ');
            }
            out.push_str(&self.render_command(&part.command, inner));
        }
        out
    }

    fn render_simple(&mut self, command: &SimpleCommandNode, depth: usize) -> String {
        let mut words: Vec<String> = command
            .assignments
            .iter()
            .map(|a| self.render_assignment(a, depth))
            .collect();
        if let Some(name) = &command.name {
            words.push(self.render_word(name, depth));
        }
        let mut out = words.join(" ");

        for arg in &command.args {
            let text = match &arg.value {
                ArgumentValue::Word(word) => self.render_word(word, depth),
                ArgumentValue::Assignment(assignment) => self.render_assignment(assignment, depth),
            };
            if arg.continued {
                out.push_str(" \\\n");
                out.push_str(&self.indent(depth + 1));
            } else if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&text);
        }

        for redirect in &command.redirections {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&self.render_redirect(redirect, depth));
        }
        out
    }

    fn render_assignment(&mut self, assignment: &AssignmentNode, depth: usize) -> String {
        let mut out = assignment.name.clone();
        out.push_str(if assignment.append { "+=" } else { "=" });
        match &assignment.value {
            Some(AssignmentValue::Word(word)) => out.push_str(&self.render_word(word, depth)),
            Some(AssignmentValue::Array(array)) => {
                let elements: Vec<String> = array
                    .elements
                    .iter()
                    .map(|w| self.render_word(w, depth))
                    .collect();
                out.push('(');
                out.push_str(&elements.join(" "));
                out.push(')');
            }
            None => {}
        }
        out
    }

    // ===========================================================================
    // REDIRECTIONS
    // ===========================================================================

    fn render_redirects(&mut self, redirects: &[RedirectionNode], depth: usize) -> String {
        let mut out = String::new();
        for redirect in redirects {
            out.push(' ');
            out.push_str(&self.render_redirect(redirect, depth));
        }
        out
    }

    fn render_redirect(&mut self, redirect: &RedirectionNode, depth: usize) -> String {
        let mut out = redirect.fd.map(|fd| fd.to_string()).unwrap_or_default();
        match &redirect.target {
            RedirectionTarget::Word(word) => {
                out.push_str(&redirect.operator.to_string());
                if !redirect.operator.is_duplication() {
                    out.push(' ');
                }
                out.push_str(&self.render_word(word, depth));
            }
            RedirectionTarget::HereString(here) => {
                out.push_str("<<< ");
                out.push_str(&self.render_word(&here.word, depth));
            }
            RedirectionTarget::HereDoc(doc) => {
                out.push_str(&redirect.operator.to_string());
                out.push_str(&quote_delimiter(doc));
                let text = self.heredoc_text(doc);
                self.pending.push(text);
            }
        }
        out
    }

    /// Body as written, then the terminator line when the source had one
    fn heredoc_text(&self, doc: &HereDocNode) -> String {
        let mut text = match self.options.variable_style {
            Some(VariableStyle::Braces) if !doc.quoted => brace_simple_params(&doc.body),
            _ => doc.body.clone(),
        };
        if let Some(terminator) = &doc.terminator {
            text.push_str(terminator);
            text.push('\n');
        }
        text
    }

    // ===========================================================================
    // COMPOUND COMMANDS
    // ===========================================================================

    fn render_compound(&mut self, compound: &CompoundCommandNode, depth: usize) -> String {
        let mut out = match compound {
            CompoundCommandNode::If(node) => self.render_if(node, depth),
            CompoundCommandNode::For(node) => {
                let header = match &node.words {
                    None => format!("{} {}; do", node.keyword, node.variable),
                    Some(words) => {
                        let mut header = format!("{} {} in", node.keyword, node.variable);
                        for word in words {
                            header.push(' ');
                            header.push_str(&self.render_word(word, depth));
                        }
                        header.push_str("; do");
                        header
                    }
                };
                header + &self.render_body(&node.body, "done", depth)
            }
            CompoundCommandNode::ArithFor(node) => {
                format!("for (({})); do", node.expression)
                    + &self.render_body(&node.body, "done", depth)
            }
            CompoundCommandNode::While(node) => {
                self.render_header("while", &node.condition, "do", depth)
                    + &self.render_body(&node.body, "done", depth)
            }
            CompoundCommandNode::Until(node) => {
                self.render_header("until", &node.condition, "do", depth)
                    + &self.render_body(&node.body, "done", depth)
            }
            CompoundCommandNode::Case(node) => self.render_case(node, depth),
            CompoundCommandNode::Subshell(node) => {
                "(".to_string() + &self.render_body(&node.body, ")", depth)
            }
            CompoundCommandNode::Group(node) => {
                "{".to_string() + &self.render_body(&node.body, "}", depth)
            }
            CompoundCommandNode::Arithmetic(node) => format!("(({}))", node.expression),
            CompoundCommandNode::Conditional(node) => format!("[[ {} ]]", node.expression),
        };
        out.push_str(&self.render_redirects(compound.redirections(), depth));
        out
    }

    fn render_if(&mut self, node: &IfNode, depth: usize) -> String {
        let mut out = self.render_header("if", &node.condition, "then", depth);
        out.push_str(&self.newline());
        out.push_str(&self.render_list(&node.then_body, depth + 1));

        for clause in &node.elif_clauses {
            out.push_str(&self.newline());
            out.push_str(&self.indent(depth));
            out.push_str(&self.render_header("elif", &clause.condition, "then", depth));
            out.push_str(&self.newline());
            out.push_str(&self.render_list(&clause.body, depth + 1));
        }

        if let Some(else_body) = &node.else_body {
            out.push_str(&self.newline());
            out.push_str(&self.indent(depth));
            out.push_str("else");
            out.push_str(&self.render_body(else_body, "fi", depth));
        } else {
            out.push_str(&self.newline());
            out.push_str(&self.indent(depth));
            out.push_str("fi");
        }
        out
    }

    fn render_case(&mut self, node: &CaseNode, depth: usize) -> String {
        let mut out = format!("case {} in", self.render_word(&node.word, depth));
        let item_depth = depth + 1;

        for entry in &node.entries {
            out.push_str(&self.newline());
            match entry {
                CaseEntry::BlankLine(_) => {}
                CaseEntry::Comment(comment) => {
                    out.push_str(&self.indent(item_depth));
                    out.push_str(&render_comment(comment));
                }
                CaseEntry::Item(item) => {
                    out.push_str(&self.indent(item_depth));
                    out.push_str(&self.render_case_item(item, item_depth));
                }
            }
        }

        out.push_str(&self.newline());
        out.push_str(&self.indent(depth));
        out.push_str("esac");
        out
    }

    fn render_case_item(&mut self, item: &CaseItemNode, depth: usize) -> String {
        let patterns: Vec<String> = item
            .patterns
            .iter()
            .map(|p| self.render_word(p, depth))
            .collect();
        let mut out = patterns.join(" | ");
        out.push(')');

        match &item.body {
            Some(body) if !body.is_empty() => {
                out.push_str(&self.newline());
                out.push_str(&self.render_list(body, depth + 1));
                out.push_str(&self.newline());
                out.push_str(&self.indent(depth + 1));
            }
            _ => out.push(' '),
        }
        out.push_str(&item.terminator.to_string());
        out
    }

    // ===========================================================================
    // FUNCTIONS
    // ===========================================================================

    fn render_function(&mut self, function: &FunctionDefNode, depth: usize) -> String {
        let requested = self.options.function_style.unwrap_or(function.style);
        // Only a brace group may follow `name()`, and `function name` cannot
        // be followed by an opening parenthesis
        let style = match (requested, function.body.as_ref()) {
            (FunctionStyle::ParensOnly, CompoundCommandNode::Group(_)) => requested,
            (FunctionStyle::ParensOnly, _)
            | (
                FunctionStyle::KeywordOnly,
                CompoundCommandNode::Subshell(_) | CompoundCommandNode::Arithmetic(_),
            ) => FunctionStyle::KeywordParens,
            _ => requested,
        };

        let mut out = match style {
            FunctionStyle::KeywordParens => format!("function {}()", function.name),
            FunctionStyle::KeywordOnly => format!("function {}", function.name),
            FunctionStyle::ParensOnly => format!("{}()", function.name),
        };
        out.push(' ');
        out.push_str(&self.render_compound(&function.body, depth));
        out.push_str(&self.render_redirects(&function.redirections, depth));
        out
    }

    // ===========================================================================
    // WORDS
    // ===========================================================================

    fn render_word(&mut self, word: &WordNode, depth: usize) -> String {
        match word {
            WordNode::Literal(lit) => lit.value.clone(),
            WordNode::SingleQuoted(sq) => {
                let prefix = if sq.ansi_c { "$" } else { "" };
                format!("{}'{}'", prefix, sq.value)
            }
            WordNode::DoubleQuoted(dq) => {
                let mut out = String::from(if dq.locale { "$\"" } else { "\"" });
                for part in &dq.parts {
                    out.push_str(&self.render_word(part, depth));
                }
                out.push('"');
                out
            }
            WordNode::Parameter(param) => self.render_parameter(param),
            WordNode::CommandSubstitution(sub) => match &sub.body {
                SubstitutionBody::Verbatim(text) => format!("`{}`", text),
                SubstitutionBody::Parsed(list) => self.render_substitution("$(", list, depth),
            },
            WordNode::Arithmetic(arith) => format!("$(({}))", arith.expression),
            WordNode::ProcessSubstitution(sub) => {
                let open = match sub.direction {
                    ProcessDirection::Input => "<(",
                    ProcessDirection::Output => ">(",
                };
                self.render_substitution(open, &sub.body, depth)
            }
            WordNode::Concatenated(concat) => concat
                .parts
                .iter()
                .map(|p| self.render_word(p, depth))
                .collect(),
        }
    }

    fn render_parameter(&self, param: &ParameterExpansion) -> String {
        if !param.braced {
            return match self.options.variable_style {
                Some(VariableStyle::Braces) if !param.is_special() => format!("${{{}}}", param.name),
                _ => format!("${}", param.name),
            };
        }
        let mut out = String::from("${");
        if let Some(prefix) = param.prefix {
            out.push(prefix);
        }
        out.push_str(&param.name);
        if let Some(operator) = &param.operator {
            out.push_str(operator);
        }
        if let Some(argument) = &param.argument {
            out.push_str(argument);
        }
        out.push('}');
        out
    }

    /// `$(...)`, `<(...)` and `>(...)`. The body gets its own heredoc queue,
    /// since its heredocs must close before the closing parenthesis.
    fn render_substitution(&mut self, open: &str, list: &CompoundListNode, depth: usize) -> String {
        if list.is_empty() {
            return format!("{})", open);
        }
        let mut inner = Formatter::new(self.options);
        if let Some(inline) = inner.try_inline(list, depth, false) {
            // `$( (x) )` must not turn into `$((x))`
            let gap = if inline.starts_with('(') { " " } else { "" };
            return format!("{}{}{})", open, gap, inline);
        }

        let mut out = String::from(open);
        out.push('\n');
        out.push_str(&inner.render_list(list, depth + 1));
        out.push_str(&inner.newline());
        out.push_str(&self.indent(depth));
        out.push(')');
        out
    }
}

/// Line breaks in a rendered command that come only from `\`, `|`, `&&`
/// and `||` continuations; None when the command could break elsewhere
fn continuation_breaks(command: &CommandNode) -> Option<usize> {
    match command {
        CommandNode::Simple(simple) => Some(simple.args.iter().filter(|a| a.continued).count()),
        CommandNode::Pipeline(pipeline) => {
            let mut breaks = pipeline.connectors.iter().filter(|c| c.line_break).count();
            for command in &pipeline.commands {
                breaks += continuation_breaks(command)?;
            }
            Some(breaks)
        }
        CommandNode::AndOr(list) => {
            let mut breaks = continuation_breaks(&list.first)?;
            for part in &list.rest {
                breaks += usize::from(part.line_break) + continuation_breaks(&part.command)?;
            }
            Some(breaks)
        }
        _ => None,
    }
}

fn render_comment(comment: &CommentNode) -> String {
    format!("#{}", comment.text.trim_end())
}

/// The delimiter with its original quoting
fn quote_delimiter(doc: &HereDocNode) -> String {
    match doc.quote_char {
        Some('\\') => format!("\\{}", doc.delimiter),
        Some(quote) => format!("{}{}{}", quote, doc.delimiter, quote),
        None => doc.delimiter.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::style::FunctionStyle;
    use crate::parser::parse;

    fn render_with(src: &str, options: &FormatOptions) -> String {
        let script = parse(src).unwrap();
        Formatter::new(options).format_script(&script)
    }

    fn render(src: &str) -> String {
        render_with(src, &FormatOptions::default())
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(render("echo   hello    world"), "echo hello world");
        assert_eq!(render("  FOO=1   BAR=2 cmd"), "FOO=1 BAR=2 cmd");
        assert_eq!(render("x+=(a   b)"), "x+=(a b)");
        assert_eq!(render("local -a xs=(1 2)"), "local -a xs=(1 2)");
    }

    #[test]
    fn test_redirections_follow_arguments() {
        assert_eq!(render(">out echo hi"), "echo hi > out");
        assert_eq!(render("cmd 2>&1 >/dev/null"), "cmd 2>&1 > /dev/null");
        assert_eq!(render("echo x >&2"), "echo x >&2");
        assert_eq!(render("cat <<<\"$x\""), "cat <<< \"$x\"");
        assert_eq!(render("cmd &>>log"), "cmd &>> log");
    }

    #[test]
    fn test_separators_become_lines() {
        assert_eq!(render("a; b;c"), "a\nb\nc");
        assert_eq!(render("sleep 1 & wait"), "sleep 1 &\nwait");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        assert_eq!(render("#!/bin/bash\n\n# note   \necho"), "#!/bin/bash\n\n# note\necho");
        assert_eq!(render("echo hi   # trailing"), "echo hi # trailing");
        assert_eq!(render("run &  # bg"), "run & # bg");
    }

    #[test]
    fn test_pipelines_and_lists() {
        assert_eq!(render("a|b |& c"), "a | b |& c");
        assert_eq!(render("! grep -q x f"), "! grep -q x f");
        assert_eq!(render("a&&b||c"), "a && b || c");
        assert_eq!(render("a |\nb |\nc"), "a |\n    b |\n    c");
        assert_eq!(render("a &&\nb |\nc"), "a &&\n    b |\n        c");
        assert_eq!(render("a &&\n  b"), "a &&\n    b");
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(
            render("cmd --one \\\n      --two"),
            "cmd --one \\\n    --two"
        );
    }

    #[test]
    fn test_if_statement() {
        assert_eq!(
            render("if true;then\necho yes\nelif false; then\necho no\nelse\necho maybe\nfi"),
            "if true; then\n    echo yes\nelif false; then\n    echo no\nelse\n    echo maybe\nfi"
        );
        assert_eq!(render("if a; b; then c; fi"), "if a; b; then\n    c\nfi");
    }

    #[test]
    fn test_if_condition_with_comment_is_a_block() {
        assert_eq!(
            render("if a # why\nthen\nb\nfi"),
            "if\n    a # why\nthen\n    b\nfi"
        );
    }

    #[test]
    fn test_if_condition_with_continuations_stays_inline() {
        assert_eq!(
            render("if [ a ] &&\n  [ b ]; then\nc\nfi"),
            "if [ a ] &&\n    [ b ]; then\n    c\nfi"
        );
        assert_eq!(
            render("while read -r x |\ngrep y; do :; done"),
            "while read -r x |\n    grep y; do\n    :\ndone"
        );
        assert_eq!(
            render("if test \\\n-f x; then :; fi"),
            "if test \\\n    -f x; then\n    :\nfi"
        );
    }

    #[test]
    fn test_heredoc_before_block_header_is_kept() {
        assert_eq!(
            render("cat <<EOF && if { true; }; then echo y; fi\nbody\nEOF\n"),
            "cat <<EOF && if\nbody\nEOF\n    {\n        true\n    }\nthen\n    echo y\nfi"
        );
        assert_eq!(
            render("cat <<EOF && if a &&\nbody\nEOF\nb; then :; fi\n"),
            "cat <<EOF && if\nbody\nEOF\n    a &&\n        b\nthen\n    :\nfi"
        );
        assert_eq!(
            render("cat <<EOF && if true; then :; fi\nbody\nEOF\n"),
            "cat <<EOF && if true; then\nbody\nEOF\n    :\nfi"
        );
    }

    #[test]
    fn test_hash_after_assignment_is_a_value() {
        assert_eq!(render("color=#fff\necho \"$color\""), "color=#fff\necho \"$color\"");
        assert_eq!(render("echo x=#1"), "echo x=#1");
        assert_eq!(render("x= #note"), "x= #note");
    }

    #[test]
    fn test_bracket_arithmetic_is_verbatim() {
        assert_eq!(render("echo $[ 1 << 2 ]"), "echo $[ 1 << 2 ]");
        assert_eq!(render("echo   \"$[x+1]\""), "echo \"$[x+1]\"");
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            render("for i in a b c; do echo $i; done"),
            "for i in a b c; do\n    echo $i\ndone"
        );
        assert_eq!(render("for arg\ndo :; done"), "for arg; do\n    :\ndone");
        assert_eq!(
            render("for ((i=0; i<3; i++)); do :; done"),
            "for ((i=0; i<3; i++)); do\n    :\ndone"
        );
        assert_eq!(
            render("while read -r line; do echo \"$line\"; done < file"),
            "while read -r line; do\n    echo \"$line\"\ndone < file"
        );
        assert_eq!(render("until false; do :; done"), "until false; do\n    :\ndone");
        assert_eq!(
            render("select x in a b; do break; done"),
            "select x in a b; do\n    break\ndone"
        );
    }

    #[test]
    fn test_case_statement() {
        let src = "case $x in\na|b) echo ab;;\n# other\n*)\n;;\nesac";
        assert_eq!(
            render(src),
            "case $x in\n    a | b)\n        echo ab\n        ;;\n    # other\n    *) ;;\nesac"
        );
        assert_eq!(
            render("case x in\n(a) echo a;&\nb) echo b\nesac"),
            "case x in\n    a)\n        echo a\n        ;&\n    b)\n        echo b\n        ;;\nesac"
        );
    }

    #[test]
    fn test_groups_and_subshells() {
        assert_eq!(render("{ echo a; echo b; }"), "{\n    echo a\n    echo b\n}");
        assert_eq!(render("(cd /tmp; ls) > out"), "(\n    cd /tmp\n    ls\n) > out");
        assert_eq!(render("((x = 1 + 2))"), "((x = 1 + 2))");
        assert_eq!(render("[[  -f $f  ]] && echo ok"), "[[ -f $f ]] && echo ok");
    }

    #[test]
    fn test_function_styles() {
        assert_eq!(render("foo() { :; }"), "foo() {\n    :\n}");
        assert_eq!(render("function foo { :; }"), "function foo {\n    :\n}");

        let fnonly = FormatOptions {
            function_style: Some(FunctionStyle::KeywordOnly),
            ..Default::default()
        };
        assert_eq!(render_with("foo() { :; }", &fnonly), "function foo {\n    :\n}");
        assert_eq!(
            render_with("function foo() ( :; )", &fnonly),
            "function foo() (\n    :\n)"
        );

        let paronly = FormatOptions {
            function_style: Some(FunctionStyle::ParensOnly),
            ..Default::default()
        };
        assert_eq!(render_with("function foo { :; }", &paronly), "foo() {\n    :\n}");
        assert_eq!(
            render_with("function foo() ( :; )", &paronly),
            "function foo() (\n    :\n)"
        );
    }

    #[test]
    fn test_function_redirections() {
        assert_eq!(render("f() { :; } > log"), "f() {\n    :\n} > log");
    }

    #[test]
    fn test_nested_indentation() {
        let src = "f() {\nif a; then\nfor x in 1; do\necho $x\ndone\nfi\n}";
        assert_eq!(
            render(src),
            "f() {\n    if a; then\n        for x in 1; do\n            echo $x\n        done\n    fi\n}"
        );
    }

    #[test]
    fn test_tabs() {
        let tabs = FormatOptions {
            use_tabs: true,
            ..Default::default()
        };
        assert_eq!(render_with("if a; then\nb\nfi", &tabs), "if a; then\n\tb\nfi");
    }

    #[test]
    fn test_words_keep_quoting() {
        assert_eq!(render("echo 'a  b' \"c  $d\" $'e\\n' $\"f\""), "echo 'a  b' \"c  $d\" $'e\\n' $\"f\"");
        assert_eq!(render("echo pre\"$x\"post"), "echo pre\"$x\"post");
        assert_eq!(render("echo ${x:-default} ${#arr[@]} $((1 + 2))"), "echo ${x:-default} ${#arr[@]} $((1 + 2))");
        assert_eq!(render("echo `date  +%s`"), "echo `date  +%s`");
        assert_eq!(render("diff <(sort a) <(sort b)"), "diff <(sort a) <(sort b)");
    }

    #[test]
    fn test_command_substitution() {
        assert_eq!(render("x=$(  date   +%s )"), "x=$(date +%s)");
        assert_eq!(render("x=$(a | b)"), "x=$(a | b)");
        assert_eq!(render("x=$()"), "x=$()");
        assert_eq!(render("x=$( (cd /; ls) )"), "x=$(\n    (\n        cd /\n        ls\n    )\n)");
        assert_eq!(
            render("x=$(\n# note\ndate\n)"),
            "x=$(\n    # note\n    date\n)"
        );
    }

    #[test]
    fn test_variable_braces() {
        let braces = FormatOptions {
            variable_style: Some(VariableStyle::Braces),
            ..Default::default()
        };
        assert_eq!(render_with("echo \"$HOME\" $x", &braces), "echo \"${HOME}\" ${x}");
        assert_eq!(
            render_with("echo \"$?\" \"$1\" \"$@\" \"$$\"", &braces),
            "echo \"$?\" \"$1\" \"$@\" \"$$\""
        );
        assert_eq!(render_with("echo ${x:-$y}", &braces), "echo ${x:-$y}");
    }

    #[test]
    fn test_heredoc_follows_its_line() {
        assert_eq!(
            render("cat <<EOF\n  keep\n\tthis\nEOF\necho after"),
            "cat <<EOF\n  keep\n\tthis\nEOF\necho after"
        );
        assert_eq!(
            render("cat <<'EOF' | grep x\n$HOME\nEOF"),
            "cat <<'EOF' | grep x\n$HOME\nEOF"
        );
    }

    #[test]
    fn test_heredoc_inside_indented_block() {
        assert_eq!(
            render("if a; then\ncat <<-EOF\n\tbody\n\tEOF\nfi"),
            "if a; then\n    cat <<-EOF\n\tbody\n\tEOF\nfi"
        );
    }

    #[test]
    fn test_heredoc_forces_block_header() {
        assert_eq!(
            render("while read l <<EOF; do :; done\nx\nEOF"),
            "while\n    read l <<EOF\nx\nEOF\ndo\n    :\ndone"
        );
    }

    #[test]
    fn test_heredoc_in_substitution() {
        assert_eq!(
            render("x=$(cat <<EOF\nhi\nEOF\n)"),
            "x=$(\n    cat <<EOF\nhi\nEOF\n)"
        );
    }

    #[test]
    fn test_heredoc_variable_braces() {
        let braces = FormatOptions {
            variable_style: Some(VariableStyle::Braces),
            ..Default::default()
        };
        assert_eq!(
            render_with("cat <<EOF\n$USER $1\nEOF", &braces),
            "cat <<EOF\n${USER} $1\nEOF"
        );
        assert_eq!(
            render_with("cat <<\"EOF\"\n$USER\nEOF", &braces),
            "cat <<\"EOF\"\n$USER\nEOF"
        );
    }

    #[test]
    fn test_unterminated_heredoc() {
        assert_eq!(render("cat <<EOF\nno end\n"), "cat <<EOF\nno end");
    }
}
