//! Bash Grammar
//!
//! The grammar is written against the PEG engine in `peg.rs` and built once
//! into an immutable static table. Outline:
//!
//! ```text
//! script        ::= list_element* ws? EOF
//! list_element  ::= blank_line | comment_line | command_line
//! command_line  ::= ws? !closing_word and_or command_tail
//! and_or        ::= pipeline (('&&' | '||') linebreak pipeline)*
//! pipeline      ::= ['!'] command ('|' linebreak command)*
//! command       ::= compound_command redirect* | function_def | simple_command
//! compound_list ::= list_element+
//! ```
//!
//! Reserved words are recognised only where a command may start, so
//! `echo done` is an ordinary command while `done` on its own closes a loop.

use lazy_static::lazy_static;

use crate::parser::peg::{
    and, choice, eof, lit, not, one_or_more, optional, pattern, rule, scan, seq, zero_or_more,
    Expr, Grammar,
};

/// Every named rule of the grammar. Only rules registered with `define`
/// show up in parse trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    // structure
    Script,
    ListElement,
    BlankLine,
    CommentLine,
    Comment,
    CommandLine,
    CommandTail,
    SeparatorOp,
    CompoundList,
    AndOrList,
    AndOrOp,
    Pipeline,
    Bang,
    Pipe,
    Command,
    SimpleCommand,
    SimpleRest,
    ArgSpace,
    // assignments
    Assignment,
    AssignName,
    AssignOp,
    AssignValue,
    ArrayValue,
    // words
    Word,
    WordPart,
    LiteralText,
    SingleQuoted,
    AnsiCQuoted,
    DoubleQuoted,
    LocaleQuoted,
    DqPart,
    DqText,
    Expansion,
    ParamSimple,
    ParamBraced,
    ParamBody,
    CommandSub,
    Backtick,
    BacktickBody,
    ArithExpansion,
    ArithBody,
    ArithBracket,
    ProcessSub,
    // redirections
    RedirectList,
    IoRedirect,
    IoNumber,
    RedirectOp,
    HereString,
    HereDoc,
    HereDocOp,
    HereDocDelimiter,
    // compound commands
    CompoundCommand,
    BraceGroup,
    Subshell,
    ArithCommand,
    CondCommand,
    CondBody,
    IfClause,
    ElifClause,
    ElseClause,
    ForClause,
    ArithFor,
    SelectClause,
    InClause,
    Name,
    DoGroup,
    WhileClause,
    UntilClause,
    CaseClause,
    CaseEntry,
    CaseItem,
    CaseTerminator,
    // functions
    FunctionDef,
    FnKeywordParens,
    FnKeywordOnly,
    FnParensOnly,
    FunctionName,
    // lexical helpers
    Ws,
    LineGap,
    KwBreak,
    LineEnd,
    SeqSep,
    WordBoundary,
    ClosingWord,
    Keyword,
    Closer,
}

/// Delimiter after `<<`: quoted, backslash-escaped or bare
pub const HEREDOC_DELIMITER: &str =
    r#"'[^'\n]+'|"[^"\n]+"|\\[A-Za-z0-9_.-]+|[A-Za-z0-9_][A-Za-z0-9_.-]*"#;

lazy_static! {
    pub static ref BASH_GRAMMAR: Grammar<Rule> = build_grammar();
}

/// A reserved word, only when not glued to further word characters
fn kw(word: &'static str) -> Expr<Rule> {
    seq(vec![lit(word), rule(Rule::WordBoundary)])
}

fn ws() -> Expr<Rule> {
    rule(Rule::Ws)
}

fn opt_ws() -> Expr<Rule> {
    optional(rule(Rule::Ws))
}

fn build_grammar() -> Grammar<Rule> {
    let mut g = Grammar::new();
    use Rule::*;

    // =========================================================================
    // LEXICAL HELPERS
    // =========================================================================

    g.silent(Ws, pattern(r"(?:[ \t]|\\\n)+"));
    g.define(ArgSpace, pattern(r"(?:[ \t]|\\\n)+"));
    g.silent(LineGap, pattern(r"(?:[ \t\n]|\\\n)*"));
    g.silent(KwBreak, seq(vec![opt_ws(), optional(lit("\n"))]));
    g.silent(LineEnd, choice(vec![lit("\n"), eof()]));
    g.silent(SeqSep, seq(vec![opt_ws(), choice(vec![lit(";"), lit("\n")])]));
    g.silent(WordBoundary, not(pattern(r"[^\s;&|()<>]")));
    g.silent(
        ClosingWord,
        choice(vec![
            kw("then"),
            kw("else"),
            kw("elif"),
            kw("fi"),
            kw("done"),
            kw("do"),
            kw("esac"),
            kw("}"),
        ]),
    );
    g.silent(
        Keyword,
        choice(vec![
            rule(ClosingWord),
            kw("if"),
            kw("case"),
            kw("while"),
            kw("until"),
            kw("for"),
            kw("select"),
            kw("function"),
            kw("{"),
        ]),
    );
    g.silent(
        Closer,
        choice(vec![lit(")"), lit(";;"), lit(";&"), rule(ClosingWord)]),
    );

    // =========================================================================
    // SCRIPT & LISTS
    // =========================================================================

    g.define(
        Script,
        seq(vec![zero_or_more(rule(ListElement)), opt_ws(), eof()]),
    );
    g.silent(
        ListElement,
        choice(vec![rule(BlankLine), rule(CommentLine), rule(CommandLine)]),
    );
    g.define(BlankLine, seq(vec![opt_ws(), lit("\n")]));
    g.define(CommentLine, seq(vec![opt_ws(), rule(Comment), rule(LineEnd)]));
    g.define(Comment, pattern(r"#[^\n]*"));
    g.define(
        CommandLine,
        seq(vec![
            opt_ws(),
            not(rule(ClosingWord)),
            rule(AndOrList),
            rule(CommandTail),
        ]),
    );
    g.silent(
        CommandTail,
        seq(vec![
            opt_ws(),
            choice(vec![
                seq(vec![
                    rule(SeparatorOp),
                    opt_ws(),
                    optional(rule(Comment)),
                    optional(rule(LineEnd)),
                ]),
                seq(vec![rule(Comment), rule(LineEnd)]),
                rule(LineEnd),
                and(rule(Closer)),
            ]),
        ]),
    );
    g.define(
        SeparatorOp,
        seq(vec![
            choice(vec![lit(";"), lit("&")]),
            not(choice(vec![lit(";"), lit("&")])),
        ]),
    );
    g.define(CompoundList, one_or_more(rule(ListElement)));

    g.define(
        AndOrList,
        seq(vec![
            rule(Pipeline),
            zero_or_more(seq(vec![rule(AndOrOp), rule(Pipeline)])),
        ]),
    );
    g.define(
        AndOrOp,
        seq(vec![
            opt_ws(),
            choice(vec![lit("&&"), lit("||")]),
            rule(LineGap),
        ]),
    );
    g.define(
        Pipeline,
        seq(vec![
            optional(rule(Bang)),
            rule(Command),
            zero_or_more(seq(vec![rule(Pipe), rule(Command)])),
        ]),
    );
    g.define(Bang, seq(vec![lit("!"), ws()]));
    g.define(
        Pipe,
        seq(vec![
            opt_ws(),
            choice(vec![lit("|&"), seq(vec![lit("|"), not(lit("|"))])]),
            rule(LineGap),
        ]),
    );
    g.define(
        Command,
        choice(vec![
            seq(vec![rule(CompoundCommand), optional(rule(RedirectList))]),
            rule(FunctionDef),
            rule(SimpleCommand),
        ]),
    );

    // =========================================================================
    // SIMPLE COMMANDS
    // =========================================================================

    g.define(
        SimpleCommand,
        seq(vec![
            choice(vec![
                rule(Assignment),
                rule(IoRedirect),
                seq(vec![not(rule(Keyword)), rule(Word)]),
            ]),
            zero_or_more(rule(SimpleRest)),
        ]),
    );
    g.silent(
        SimpleRest,
        choice(vec![
            seq(vec![optional(rule(ArgSpace)), rule(IoRedirect)]),
            seq(vec![
                rule(ArgSpace),
                choice(vec![rule(Assignment), rule(Word)]),
            ]),
        ]),
    );
    g.define(
        Assignment,
        seq(vec![
            rule(AssignName),
            rule(AssignOp),
            optional(choice(vec![rule(ArrayValue), rule(AssignValue)])),
        ]),
    );
    g.define(
        AssignName,
        pattern(r"[A-Za-z_][A-Za-z0-9_]*(?:\[[^\]\n]*\])?"),
    );
    g.define(AssignOp, choice(vec![lit("+="), lit("=")]));
    // `x=#fff`: a `#` right after `=` does not start a comment
    g.define(AssignValue, one_or_more(rule(WordPart)));
    g.define(
        ArrayValue,
        seq(vec![
            lit("("),
            rule(LineGap),
            zero_or_more(seq(vec![rule(Word), rule(LineGap)])),
            lit(")"),
        ]),
    );

    // =========================================================================
    // WORDS
    // =========================================================================

    g.define(Word, seq(vec![not(lit("#")), one_or_more(rule(WordPart))]));
    g.silent(
        WordPart,
        choice(vec![
            rule(SingleQuoted),
            rule(AnsiCQuoted),
            rule(LocaleQuoted),
            rule(DoubleQuoted),
            rule(Expansion),
            rule(ProcessSub),
            rule(LiteralText),
        ]),
    );
    g.define(
        LiteralText,
        choice(vec![
            pattern(r"\\[\s\S]"),
            pattern(r#"[^\s|&;()<>\\"'$`]+"#),
            lit("$"),
        ]),
    );
    g.define(SingleQuoted, pattern(r"'[^']*'"));
    g.define(AnsiCQuoted, pattern(r"\$'(?:[^'\\]|\\[\s\S])*'"));
    g.define(
        LocaleQuoted,
        seq(vec![lit("$\""), zero_or_more(rule(DqPart)), lit("\"")]),
    );
    g.define(
        DoubleQuoted,
        seq(vec![lit("\""), zero_or_more(rule(DqPart)), lit("\"")]),
    );
    g.silent(DqPart, choice(vec![rule(Expansion), rule(DqText)]));
    g.define(
        DqText,
        choice(vec![
            pattern(r"\\[\s\S]"),
            pattern(r#"[^$`"\\]+"#),
            lit("$"),
        ]),
    );

    g.silent(
        Expansion,
        choice(vec![
            rule(ArithExpansion),
            rule(ArithBracket),
            rule(CommandSub),
            rule(Backtick),
            rule(ParamBraced),
            rule(ParamSimple),
        ]),
    );
    g.define(
        ParamSimple,
        pattern(r"\$(?:[A-Za-z_][A-Za-z0-9_]*|[0-9]|[@*#?$!-])"),
    );
    g.define(
        ParamBraced,
        seq(vec![lit("${"), rule(ParamBody), lit("}")]),
    );
    g.define(ParamBody, scan(scan_param_body));
    g.define(
        ArithExpansion,
        seq(vec![lit("$(("), rule(ArithBody), lit("))")]),
    );
    g.define(ArithBody, scan(scan_arith_body));
    g.define(ArithBracket, scan(scan_arith_bracket));
    g.define(
        CommandSub,
        seq(vec![
            lit("$("),
            rule(LineGap),
            optional(rule(CompoundList)),
            rule(LineGap),
            lit(")"),
        ]),
    );
    g.define(
        Backtick,
        seq(vec![lit("`"), rule(BacktickBody), lit("`")]),
    );
    g.define(BacktickBody, pattern(r"(?:[^`\\]|\\[\s\S])*"));
    g.define(
        ProcessSub,
        seq(vec![
            choice(vec![lit("<("), lit(">(")]),
            rule(LineGap),
            optional(rule(CompoundList)),
            rule(LineGap),
            lit(")"),
        ]),
    );

    // =========================================================================
    // REDIRECTIONS
    // =========================================================================

    g.define(
        RedirectList,
        one_or_more(seq(vec![opt_ws(), rule(IoRedirect)])),
    );
    g.define(
        IoRedirect,
        seq(vec![
            optional(rule(IoNumber)),
            choice(vec![
                rule(HereString),
                rule(HereDoc),
                seq(vec![rule(RedirectOp), opt_ws(), rule(Word)]),
            ]),
        ]),
    );
    g.define(IoNumber, seq(vec![pattern("[0-9]+"), and(pattern("[<>]"))]));
    g.define(
        RedirectOp,
        choice(vec![
            lit("&>>"),
            lit("&>"),
            lit(">>"),
            lit("<>"),
            lit("<&"),
            lit(">&"),
            lit(">|"),
            lit("<"),
            lit(">"),
        ]),
    );
    g.define(HereString, seq(vec![lit("<<<"), opt_ws(), rule(Word)]));
    g.define(
        HereDoc,
        seq(vec![rule(HereDocOp), opt_ws(), rule(HereDocDelimiter)]),
    );
    g.define(HereDocOp, scan(scan_heredoc_op));
    g.define(HereDocDelimiter, pattern(HEREDOC_DELIMITER));

    // =========================================================================
    // COMPOUND COMMANDS
    // =========================================================================

    g.silent(
        CompoundCommand,
        choice(vec![
            rule(BraceGroup),
            rule(ArithCommand),
            rule(Subshell),
            rule(CondCommand),
            rule(IfClause),
            rule(ArithFor),
            rule(ForClause),
            rule(SelectClause),
            rule(WhileClause),
            rule(UntilClause),
            rule(CaseClause),
        ]),
    );
    g.define(
        BraceGroup,
        seq(vec![
            lit("{"),
            and(pattern(r"[ \t\n]")),
            rule(KwBreak),
            rule(CompoundList),
            opt_ws(),
            lit("}"),
        ]),
    );
    g.define(
        Subshell,
        seq(vec![
            lit("("),
            rule(KwBreak),
            rule(CompoundList),
            opt_ws(),
            lit(")"),
        ]),
    );
    g.define(
        ArithCommand,
        seq(vec![lit("(("), rule(ArithBody), lit("))")]),
    );
    g.define(
        CondCommand,
        seq(vec![lit("[["), rule(CondBody), lit("]]")]),
    );
    g.define(CondBody, scan(scan_cond_body));

    g.define(
        IfClause,
        seq(vec![
            kw("if"),
            rule(KwBreak),
            rule(CompoundList),
            opt_ws(),
            kw("then"),
            rule(KwBreak),
            rule(CompoundList),
            zero_or_more(rule(ElifClause)),
            optional(rule(ElseClause)),
            opt_ws(),
            kw("fi"),
        ]),
    );
    g.define(
        ElifClause,
        seq(vec![
            opt_ws(),
            kw("elif"),
            rule(KwBreak),
            rule(CompoundList),
            opt_ws(),
            kw("then"),
            rule(KwBreak),
            rule(CompoundList),
        ]),
    );
    g.define(
        ElseClause,
        seq(vec![opt_ws(), kw("else"), rule(KwBreak), rule(CompoundList)]),
    );

    g.define(
        ForClause,
        seq(vec![
            kw("for"),
            ws(),
            rule(Name),
            opt_ws(),
            optional(choice(vec![rule(InClause), rule(SeqSep)])),
            rule(LineGap),
            rule(DoGroup),
        ]),
    );
    g.define(
        ArithFor,
        seq(vec![
            kw("for"),
            opt_ws(),
            lit("(("),
            rule(ArithBody),
            lit("))"),
            optional(rule(SeqSep)),
            rule(LineGap),
            rule(DoGroup),
        ]),
    );
    g.define(
        SelectClause,
        seq(vec![
            kw("select"),
            ws(),
            rule(Name),
            opt_ws(),
            optional(choice(vec![rule(InClause), rule(SeqSep)])),
            rule(LineGap),
            rule(DoGroup),
        ]),
    );
    g.define(
        InClause,
        seq(vec![
            rule(LineGap),
            kw("in"),
            zero_or_more(seq(vec![ws(), rule(Word)])),
            rule(SeqSep),
        ]),
    );
    g.define(Name, pattern(r"[A-Za-z_][A-Za-z0-9_]*"));
    g.define(
        DoGroup,
        seq(vec![
            opt_ws(),
            kw("do"),
            rule(KwBreak),
            rule(CompoundList),
            opt_ws(),
            kw("done"),
        ]),
    );
    g.define(
        WhileClause,
        seq(vec![kw("while"), rule(KwBreak), rule(CompoundList), rule(DoGroup)]),
    );
    g.define(
        UntilClause,
        seq(vec![kw("until"), rule(KwBreak), rule(CompoundList), rule(DoGroup)]),
    );

    g.define(
        CaseClause,
        seq(vec![
            kw("case"),
            ws(),
            rule(Word),
            rule(LineGap),
            kw("in"),
            rule(KwBreak),
            zero_or_more(rule(CaseEntry)),
            opt_ws(),
            kw("esac"),
        ]),
    );
    g.silent(
        CaseEntry,
        choice(vec![rule(BlankLine), rule(CommentLine), rule(CaseItem)]),
    );
    g.define(
        CaseItem,
        seq(vec![
            opt_ws(),
            not(kw("esac")),
            optional(lit("(")),
            opt_ws(),
            rule(Word),
            zero_or_more(seq(vec![opt_ws(), lit("|"), opt_ws(), rule(Word)])),
            opt_ws(),
            lit(")"),
            rule(KwBreak),
            optional(rule(CompoundList)),
            opt_ws(),
            optional(rule(CaseTerminator)),
            opt_ws(),
            optional(lit("\n")),
        ]),
    );
    g.define(
        CaseTerminator,
        choice(vec![lit(";;&"), lit(";;"), lit(";&")]),
    );

    // =========================================================================
    // FUNCTIONS
    // =========================================================================

    // Order matters: the parens-only form must not swallow plain commands,
    // so it is tried last and demands a brace group.
    g.silent(
        FunctionDef,
        choice(vec![
            rule(FnKeywordParens),
            rule(FnKeywordOnly),
            rule(FnParensOnly),
        ]),
    );
    g.define(
        FnKeywordParens,
        seq(vec![
            kw("function"),
            ws(),
            rule(FunctionName),
            opt_ws(),
            lit("("),
            opt_ws(),
            lit(")"),
            rule(LineGap),
            rule(CompoundCommand),
            optional(rule(RedirectList)),
        ]),
    );
    g.define(
        FnKeywordOnly,
        seq(vec![
            kw("function"),
            ws(),
            rule(FunctionName),
            not(seq(vec![opt_ws(), lit("(")])),
            rule(LineGap),
            rule(CompoundCommand),
            optional(rule(RedirectList)),
        ]),
    );
    g.define(
        FnParensOnly,
        seq(vec![
            not(rule(Keyword)),
            rule(FunctionName),
            opt_ws(),
            lit("("),
            opt_ws(),
            lit(")"),
            rule(LineGap),
            rule(BraceGroup),
            optional(rule(RedirectList)),
        ]),
    );
    g.define(FunctionName, pattern(r"[A-Za-z_][A-Za-z0-9_:@.-]*"));

    g
}

// =============================================================================
// SCANNERS
// =============================================================================

/// `<<` or `<<-`, not part of `<<<`, and only after whitespace, a digit
/// or the start of a line
fn scan_heredoc_op(input: &str, pos: usize) -> Option<usize> {
    let rest = &input[pos..];
    if !rest.starts_with("<<") || rest.starts_with("<<<") {
        return None;
    }
    if pos > 0 {
        let prev = input.as_bytes()[pos - 1];
        if !matches!(prev, b' ' | b'\t' | b'\n') && !prev.is_ascii_digit() {
            return None;
        }
    }
    if rest.starts_with("<<-") {
        Some(pos + 3)
    } else {
        Some(pos + 2)
    }
}

/// Body of `$((...))` / `((...))`: up to the `))` that closes at depth zero
fn scan_arith_body(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' if depth > 0 => depth -= 1,
            b')' => {
                return if bytes.get(i + 1) == Some(&b')') {
                    Some(i)
                } else {
                    None
                };
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Deprecated `$[...]` arithmetic, brackets balanced, kept as written
fn scan_arith_bracket(input: &str, pos: usize) -> Option<usize> {
    if !input[pos..].starts_with("$[") {
        return None;
    }
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut i = pos + 2;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' if depth > 0 => depth -= 1,
            b']' => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Body of `${...}`: up to the matching `}`, honoring nesting, quotes and
/// escapes. Empty bodies are rejected.
fn scan_param_body(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\'' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'\'' {
                    i += 1;
                }
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 1;
            }
            b'}' if depth > 0 => depth -= 1,
            b'}' => return if i > pos { Some(i) } else { None },
            _ => {}
        }
        i += 1;
    }
    None
}

/// Body of `[[ ... ]]`: whitespace-led, up to a `]]` that stands as its own word
fn scan_cond_body(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if !matches!(bytes.get(pos), Some(b' ' | b'\t' | b'\n')) {
        return None;
    }
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\'' | b'"' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if quote == b'"' && bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b']' if bytes.get(i + 1) == Some(&b']')
                && matches!(bytes[i - 1], b' ' | b'\t' | b'\n') =>
            {
                let after = bytes.get(i + 2);
                let boundary = match after {
                    None => true,
                    Some(c) => c.is_ascii_whitespace() || b";&|()<>".contains(c),
                };
                if boundary {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(src: &str) -> bool {
        BASH_GRAMMAR.parse(Rule::Script, src).is_ok()
    }

    #[test]
    fn test_simple_commands() {
        assert!(accepts("echo hello world"));
        assert!(accepts("echo hello\n"));
        assert!(accepts("FOO=bar BAZ=1 env"));
        assert!(accepts("x=1"));
        assert!(accepts("ls -la | grep foo | wc -l"));
        assert!(accepts("a && b || c"));
        assert!(accepts("echo a; echo b & echo c"));
        assert!(accepts("! grep -q x file"));
        assert!(accepts("echo a#b"));
        assert!(accepts("find . -exec rm {} \\;"));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        assert!(accepts("#!/bin/bash\n\n# comment\necho hi # trailing\n"));
        assert!(accepts("# only a comment"));
        assert!(accepts("\n\n\n"));
        assert!(accepts(""));
    }

    #[test]
    fn test_quoting_and_expansions() {
        assert!(accepts("echo 'single' \"double $HOME ${USER:-x}\""));
        assert!(accepts("echo $'ansi\\n' $\"locale\""));
        assert!(accepts("echo $(date +%s) `uname`"));
        assert!(accepts("x=$(( (a + b) * 2 ))"));
        assert!(accepts("echo ${a:-${b}}"));
        assert!(accepts("diff <(sort a) <(sort b)"));
        assert!(accepts("echo \"cost: $\""));
        assert!(accepts("echo \"$(echo \"nested\")\""));
    }

    #[test]
    fn test_redirections() {
        assert!(accepts("cmd > out 2>&1"));
        assert!(accepts("cmd &>/dev/null"));
        assert!(accepts("cmd >>log <in"));
        assert!(accepts("cat <<EOF"));
        assert!(accepts("cat <<-'EOF'"));
        assert!(accepts("grep x <<<\"$v\""));
        assert!(accepts("echo hi>out"));
    }

    #[test]
    fn test_compound_commands() {
        assert!(accepts("if true; then\n  echo yes\nelif false; then\n  echo no\nelse\n  echo maybe\nfi"));
        assert!(accepts("if true;then echo x; fi"));
        assert!(accepts("for i in 1 2 3; do echo $i; done"));
        assert!(accepts("for i; do echo; done"));
        assert!(accepts("for ((i = 0; i < 3; i++)); do echo; done"));
        assert!(accepts("while read -r line; do\n  echo \"$line\"\ndone < file"));
        assert!(accepts("until false; do :; done"));
        assert!(accepts("select x in a b; do break; done"));
        assert!(accepts("case $x in\n  a|b) echo ab ;;\n  *) echo other ;;\nesac"));
        assert!(accepts("{ echo a; echo b; }"));
        assert!(accepts("(cd /tmp && ls)"));
        assert!(accepts("(( i++ ))"));
        assert!(accepts("[[ -f $file && $x =~ ^(a|b)$ ]]"));
    }

    #[test]
    fn test_function_definitions() {
        assert!(accepts("function foo() {\n  echo\n}"));
        assert!(accepts("function foo {\n  echo\n}"));
        assert!(accepts("foo() {\n  echo\n}"));
        assert!(accepts("foo ()\n{\n  echo\n}"));
    }

    #[test]
    fn test_rejects_broken_scripts() {
        assert!(!accepts("if true; then\necho test"));
        assert!(!accepts("for i in 1 2; do echo"));
        assert!(!accepts("echo \"unterminated"));
        assert!(!accepts("case x in a) echo"));
        assert!(!accepts("{ echo a }"));
        assert!(!accepts("fi"));
        assert!(!accepts("(a) b"));
    }

    #[test]
    fn test_reserved_words_as_arguments() {
        assert!(accepts("echo done fi then"));
        assert!(accepts("iffy=1; fiddle"));
    }

    #[test]
    fn test_heredoc_op_scanner() {
        assert_eq!(scan_heredoc_op("cat <<EOF", 4), Some(6));
        assert_eq!(scan_heredoc_op("cat <<-EOF", 4), Some(7));
        assert_eq!(scan_heredoc_op("cat 2<<EOF", 5), Some(7));
        assert_eq!(scan_heredoc_op("<<EOF", 0), Some(2));
        assert_eq!(scan_heredoc_op("cat <<<x", 4), None);
        assert_eq!(scan_heredoc_op("cat<<EOF", 3), None);
    }

    #[test]
    fn test_arith_body_scanner() {
        let src = "$(( (a+b)*2 ))";
        assert_eq!(scan_arith_body(src, 3), Some(12));
        assert_eq!(scan_arith_body("$((a)|b)", 3), None);
        assert_eq!(scan_arith_body("$(( 1", 3), None);
    }

    #[test]
    fn test_param_body_scanner() {
        let src = "${a:-${b}}";
        assert_eq!(scan_param_body(src, 2), Some(9));
        assert_eq!(scan_param_body("${}", 2), None);
        assert_eq!(scan_param_body("${a:-'}'}", 2), Some(8));
    }

    #[test]
    fn test_cond_body_scanner() {
        let src = "[[ $a == \"]]\" ]]";
        assert_eq!(scan_cond_body(src, 2), Some(14));
        assert_eq!(scan_cond_body("[[x ]]", 2), None);
    }
}
