//! Abstract Syntax Tree (AST) Types for Bash
//!
//! This module defines the typed tree the formatter walks. Every construct
//! that has to survive a round trip (comments, blank lines, heredoc bodies,
//! raw arithmetic) has a node of its own.

use std::fmt;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Location of a node in the parsed (preprocessed) source, for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete script
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    pub statements: Vec<StatementNode>,
}

/// One entry of a command list, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    pub command: CommandNode,
    /// Terminated by `&`
    pub background: bool,
    /// Comment trailing the command on the same line
    pub comment: Option<CommentNode>,
    pub location: Option<SourceLocation>,
}

/// Ordered statements forming the body of a compound construct
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundListNode {
    pub statements: Vec<StatementNode>,
}

impl CompoundListNode {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Union of all statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    Simple(SimpleCommandNode),
    Pipeline(PipelineNode),
    AndOr(AndOrListNode),
    Compound(CompoundCommandNode),
    FunctionDef(FunctionDefNode),
    Comment(CommentNode),
    BlankLine(BlankLineNode),
}

impl CommandNode {
    /// Comments and blank lines carry no command
    pub fn is_trivia(&self) -> bool {
        matches!(self, CommandNode::Comment(_) | CommandNode::BlankLine(_))
    }
}

// =============================================================================
// PIPELINES & LISTS
// =============================================================================

/// A pipeline: cmd1 | cmd2 | cmd3
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub commands: Vec<CommandNode>,
    /// Negate exit status with !
    pub negated: bool,
    /// One connector between each pair of commands
    pub connectors: Vec<PipeConnector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipeConnector {
    /// `|&` pipes stderr too
    pub stderr: bool,
    /// The source broke the line after the pipe
    pub line_break: bool,
}

/// cmd1 && cmd2 || cmd3
#[derive(Debug, Clone, PartialEq)]
pub struct AndOrListNode {
    pub first: Box<CommandNode>,
    pub rest: Vec<AndOrPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AndOrPart {
    pub operator: AndOrOperator,
    pub line_break: bool,
    pub command: CommandNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndOrOperator {
    And,    // &&
    Or,     // ||
}

impl fmt::Display for AndOrOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}

// =============================================================================
// SIMPLE COMMANDS
// =============================================================================

/// Simple command: VAR=x name args... with optional redirections
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommandNode {
    /// Variable assignments before command: VAR=value cmd
    pub assignments: Vec<AssignmentNode>,
    /// Command name (may be None for assignment-only)
    pub name: Option<WordNode>,
    pub args: Vec<ArgumentNode>,
    /// I/O redirections, in source order
    pub redirections: Vec<RedirectionNode>,
    pub location: Option<SourceLocation>,
}

/// A command argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentNode {
    pub value: ArgumentValue,
    /// Preceded by a backslash-newline continuation
    pub continued: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Word(WordNode),
    /// `local x=1`, `declare -a xs=(1 2)`
    Assignment(AssignmentNode),
}

// =============================================================================
// COMPOUND COMMANDS
// =============================================================================

/// Compound commands: control structures
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundCommandNode {
    If(IfNode),
    For(ForNode),
    ArithFor(ArithForNode),
    While(WhileNode),
    Until(UntilNode),
    Case(CaseNode),
    Subshell(SubshellNode),
    Group(GroupNode),
    Arithmetic(ArithmeticCommandNode),
    Conditional(ConditionalCommandNode),
}

impl CompoundCommandNode {
    pub fn redirections(&self) -> &[RedirectionNode] {
        match self {
            Self::If(n) => &n.redirections,
            Self::For(n) => &n.redirections,
            Self::ArithFor(n) => &n.redirections,
            Self::While(n) => &n.redirections,
            Self::Until(n) => &n.redirections,
            Self::Case(n) => &n.redirections,
            Self::Subshell(n) => &n.redirections,
            Self::Group(n) => &n.redirections,
            Self::Arithmetic(n) => &n.redirections,
            Self::Conditional(n) => &n.redirections,
        }
    }

    pub fn redirections_mut(&mut self) -> &mut Vec<RedirectionNode> {
        match self {
            Self::If(n) => &mut n.redirections,
            Self::For(n) => &mut n.redirections,
            Self::ArithFor(n) => &mut n.redirections,
            Self::While(n) => &mut n.redirections,
            Self::Until(n) => &mut n.redirections,
            Self::Case(n) => &mut n.redirections,
            Self::Subshell(n) => &mut n.redirections,
            Self::Group(n) => &mut n.redirections,
            Self::Arithmetic(n) => &mut n.redirections,
            Self::Conditional(n) => &mut n.redirections,
        }
    }
}

/// if statement
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: CompoundListNode,
    pub then_body: CompoundListNode,
    pub elif_clauses: Vec<ElifClause>,
    pub else_body: Option<CompoundListNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifClause {
    pub condition: CompoundListNode,
    pub body: CompoundListNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKeyword {
    For,
    Select,
}

impl fmt::Display for LoopKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::For => write!(f, "for"),
            Self::Select => write!(f, "select"),
        }
    }
}

/// for/select loop: for VAR in WORDS; do ...; done
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub keyword: LoopKeyword,
    pub variable: String,
    /// Words to iterate over (None = "$@")
    pub words: Option<Vec<WordNode>>,
    pub body: CompoundListNode,
    pub redirections: Vec<RedirectionNode>,
}

/// C-style for loop: for ((init; cond; step)); do ...; done
#[derive(Debug, Clone, PartialEq)]
pub struct ArithForNode {
    /// Raw text between the double parentheses
    pub expression: String,
    pub body: CompoundListNode,
    pub redirections: Vec<RedirectionNode>,
}

/// while loop
#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: CompoundListNode,
    pub body: CompoundListNode,
    pub redirections: Vec<RedirectionNode>,
}

/// until loop
#[derive(Debug, Clone, PartialEq)]
pub struct UntilNode {
    pub condition: CompoundListNode,
    pub body: CompoundListNode,
    pub redirections: Vec<RedirectionNode>,
}

/// case statement
#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub word: WordNode,
    pub entries: Vec<CaseEntry>,
    pub redirections: Vec<RedirectionNode>,
}

/// Entries between `in` and `esac`
#[derive(Debug, Clone, PartialEq)]
pub enum CaseEntry {
    Item(CaseItemNode),
    Comment(CommentNode),
    BlankLine(BlankLineNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItemNode {
    /// Never empty
    pub patterns: Vec<WordNode>,
    pub body: Option<CompoundListNode>,
    pub terminator: CaseTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    DoubleSemi,     // ;;
    SemiAnd,        // ;&
    SemiSemiAnd,    // ;;&
}

impl fmt::Display for CaseTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleSemi => write!(f, ";;"),
            Self::SemiAnd => write!(f, ";&"),
            Self::SemiSemiAnd => write!(f, ";;&"),
        }
    }
}

/// Subshell: ( ... )
#[derive(Debug, Clone, PartialEq)]
pub struct SubshellNode {
    pub body: CompoundListNode,
    pub redirections: Vec<RedirectionNode>,
}

/// Command group: { ...; }
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub body: CompoundListNode,
    pub redirections: Vec<RedirectionNode>,
}

/// Arithmetic command: (( expr ))
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticCommandNode {
    pub expression: String,
    pub redirections: Vec<RedirectionNode>,
}

/// Conditional command: [[ expr ]], kept as raw text
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalCommandNode {
    pub expression: String,
    pub redirections: Vec<RedirectionNode>,
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// The three ways bash lets you declare a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionStyle {
    /// function foo()
    KeywordParens,
    /// function foo
    KeywordOnly,
    /// foo()
    ParensOnly,
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefNode {
    pub name: String,
    pub body: Box<CompoundCommandNode>,
    /// Declaration style found in the source
    pub style: FunctionStyle,
    pub redirections: Vec<RedirectionNode>,
    pub location: Option<SourceLocation>,
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// Variable assignment: VAR=value or VAR+=value
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    /// Variable name, including any `[subscript]`
    pub name: String,
    pub value: Option<AssignmentValue>,
    /// Append mode: VAR+=value
    pub append: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentValue {
    Word(WordNode),
    Array(ArrayValueNode),
}

/// Array literal: (a b c)
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValueNode {
    pub elements: Vec<WordNode>,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

/// I/O redirection
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectionNode {
    pub fd: Option<u32>,
    pub operator: RedirectionOperator,
    pub target: RedirectionTarget,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectionTarget {
    Word(WordNode),
    HereDoc(HereDocNode),
    HereString(HereStringNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionOperator {
    Less,           // <
    Great,          // >
    DGreat,         // >>
    GreatAnd,       // >&
    LessAnd,        // <&
    LessGreat,      // <>
    Clobber,        // >|
    AndGreat,       // &>
    AndDGreat,      // &>>
    TLess,          // <<<
    DLess,          // <<
    DLessDash,      // <<-
}

impl RedirectionOperator {
    pub fn from_symbol(op: &str) -> Option<Self> {
        Some(match op {
            "<" => Self::Less,
            ">" => Self::Great,
            ">>" => Self::DGreat,
            ">&" => Self::GreatAnd,
            "<&" => Self::LessAnd,
            "<>" => Self::LessGreat,
            ">|" => Self::Clobber,
            "&>" => Self::AndGreat,
            "&>>" => Self::AndDGreat,
            "<<<" => Self::TLess,
            "<<" => Self::DLess,
            "<<-" => Self::DLessDash,
            _ => return None,
        })
    }

    /// Descriptor duplication operators take their target without a space
    pub fn is_duplication(&self) -> bool {
        matches!(self, Self::GreatAnd | Self::LessAnd)
    }
}

impl fmt::Display for RedirectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Less => write!(f, "<"),
            Self::Great => write!(f, ">"),
            Self::DGreat => write!(f, ">>"),
            Self::GreatAnd => write!(f, ">&"),
            Self::LessAnd => write!(f, "<&"),
            Self::LessGreat => write!(f, "<>"),
            Self::Clobber => write!(f, ">|"),
            Self::AndGreat => write!(f, "&>"),
            Self::AndDGreat => write!(f, "&>>"),
            Self::TLess => write!(f, "<<<"),
            Self::DLess => write!(f, "<<"),
            Self::DLessDash => write!(f, "<<-"),
        }
    }
}

/// Here document
#[derive(Debug, Clone, PartialEq)]
pub struct HereDocNode {
    /// Delimiter with its quoting removed
    pub delimiter: String,
    /// Body text, every line newline-terminated; filled after the build pass
    pub body: String,
    /// Strip leading tabs (<<- vs <<)
    pub strip_tabs: bool,
    /// Quoted delimiter means no expansion
    pub quoted: bool,
    /// `'`, `"` or `\`
    pub quote_char: Option<char>,
    /// The line that closed the body, verbatim; None when the file ended first
    pub terminator: Option<String>,
    pub location: Option<SourceLocation>,
}

/// Here string: <<< word
#[derive(Debug, Clone, PartialEq)]
pub struct HereStringNode {
    pub word: WordNode,
}

// =============================================================================
// COMMENTS & LAYOUT
// =============================================================================

/// `# text`; the text excludes the leading hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub text: String,
    pub location: Option<SourceLocation>,
}

/// An empty source line, kept so vertical spacing survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlankLineNode;

// =============================================================================
// WORDS
// =============================================================================

/// A shell word, or one part of a concatenated word
#[derive(Debug, Clone, PartialEq)]
pub enum WordNode {
    Literal(LiteralWord),
    SingleQuoted(SingleQuotedWord),
    DoubleQuoted(DoubleQuotedWord),
    Parameter(ParameterExpansion),
    CommandSubstitution(CommandSubstitution),
    Arithmetic(ArithmeticExpansion),
    ProcessSubstitution(ProcessSubstitution),
    Concatenated(ConcatenatedWord),
}

/// Unquoted text, escapes included verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralWord {
    pub value: String,
}

/// 'literal' or $'ansi-c'
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleQuotedWord {
    pub value: String,
    pub ansi_c: bool,
}

/// "with $expansion" or $"locale"
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleQuotedWord {
    pub parts: Vec<WordNode>,
    pub locale: bool,
}

/// $VAR or ${VAR...}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterExpansion {
    /// `#` (length) or `!` (indirection) before the name
    pub prefix: Option<char>,
    /// Parameter name including any subscript; the raw inner text when
    /// the expansion could not be split
    pub name: String,
    pub braced: bool,
    pub operator: Option<String>,
    pub argument: Option<String>,
}

impl ParameterExpansion {
    /// Special parameters and positionals keep their short form
    pub fn is_special(&self) -> bool {
        let mut chars = self.name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if "?@*#$!-".contains(c) => true,
            (Some(_), _) => self.name.chars().all(|c| c.is_ascii_digit()),
            (None, _) => true,
        }
    }
}

/// $(cmd) or `cmd`
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSubstitution {
    pub body: SubstitutionBody,
    /// Legacy backtick syntax
    pub backtick: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubstitutionBody {
    Parsed(CompoundListNode),
    /// Backtick bodies are reproduced as written
    Verbatim(String),
}

/// $((expr)), kept as raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithmeticExpansion {
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDirection {
    Input,  // <(...)
    Output, // >(...)
}

/// <(cmd) or >(cmd)
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSubstitution {
    pub direction: ProcessDirection,
    pub body: CompoundListNode,
}

/// Adjacent parts forming one token: pre"$x"post
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatenatedWord {
    pub parts: Vec<WordNode>,
}

// =============================================================================
// FACTORY FUNCTIONS (AST builders)
// =============================================================================

/// AST factory for building nodes
pub struct AST;

impl AST {
    pub fn script(statements: Vec<StatementNode>) -> ScriptNode {
        ScriptNode { statements }
    }

    pub fn statement(command: CommandNode) -> StatementNode {
        StatementNode {
            command,
            background: false,
            comment: None,
            location: None,
        }
    }

    pub fn compound_list(statements: Vec<StatementNode>) -> CompoundListNode {
        CompoundListNode { statements }
    }

    pub fn literal(value: impl Into<String>) -> WordNode {
        WordNode::Literal(LiteralWord {
            value: value.into(),
        })
    }

    pub fn single_quoted(value: impl Into<String>, ansi_c: bool) -> WordNode {
        WordNode::SingleQuoted(SingleQuotedWord {
            value: value.into(),
            ansi_c,
        })
    }

    pub fn double_quoted(parts: Vec<WordNode>, locale: bool) -> WordNode {
        WordNode::DoubleQuoted(DoubleQuotedWord { parts, locale })
    }

    pub fn parameter(name: impl Into<String>, braced: bool) -> WordNode {
        WordNode::Parameter(ParameterExpansion {
            prefix: None,
            name: name.into(),
            braced,
            operator: None,
            argument: None,
        })
    }

    pub fn arithmetic(expression: impl Into<String>) -> WordNode {
        WordNode::Arithmetic(ArithmeticExpansion {
            expression: expression.into(),
        })
    }

    /// Collapses a single part to itself; two or more become a concatenation
    pub fn word(mut parts: Vec<WordNode>) -> WordNode {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            WordNode::Concatenated(ConcatenatedWord { parts })
        }
    }

    pub fn assignment(
        name: impl Into<String>,
        value: Option<AssignmentValue>,
        append: bool,
    ) -> AssignmentNode {
        AssignmentNode {
            name: name.into(),
            value,
            append,
        }
    }

    pub fn here_doc(
        delimiter: impl Into<String>,
        strip_tabs: bool,
        quote_char: Option<char>,
    ) -> HereDocNode {
        HereDocNode {
            delimiter: delimiter.into(),
            body: String::new(),
            strip_tabs,
            quoted: quote_char.is_some(),
            quote_char,
            terminator: None,
            location: None,
        }
    }

    pub fn group(body: CompoundListNode) -> CompoundCommandNode {
        CompoundCommandNode::Group(GroupNode {
            body,
            redirections: Vec::new(),
        })
    }

    pub fn function_def(
        name: impl Into<String>,
        body: CompoundCommandNode,
        style: FunctionStyle,
    ) -> FunctionDefNode {
        FunctionDefNode {
            name: name.into(),
            body: Box::new(body),
            style,
            redirections: Vec::new(),
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_parameters() {
        for name in ["?", "@", "*", "#", "$", "!", "-", "0", "1", "12"] {
            let param = ParameterExpansion {
                prefix: None,
                name: name.to_string(),
                braced: false,
                operator: None,
                argument: None,
            };
            assert!(param.is_special(), "{} should be special", name);
        }
        let home = AST::parameter("HOME", false);
        if let WordNode::Parameter(p) = home {
            assert!(!p.is_special());
        } else {
            panic!("expected parameter");
        }
    }

    #[test]
    fn test_word_collapses_single_part() {
        let word = AST::word(vec![AST::literal("echo")]);
        assert_eq!(word, AST::literal("echo"));

        let concat = AST::word(vec![AST::literal("a"), AST::parameter("b", false)]);
        assert!(matches!(concat, WordNode::Concatenated(ref c) if c.parts.len() == 2));
    }

    #[test]
    fn test_redirection_operator_round_trip() {
        for op in ["<", ">", ">>", ">&", "<&", "<>", ">|", "&>", "&>>", "<<<", "<<", "<<-"] {
            let parsed = RedirectionOperator::from_symbol(op).unwrap();
            assert_eq!(parsed.to_string(), op);
        }
        assert!(RedirectionOperator::from_symbol("<<<<").is_none());
    }

    #[test]
    fn test_case_terminator_display() {
        assert_eq!(CaseTerminator::DoubleSemi.to_string(), ";;");
        assert_eq!(CaseTerminator::SemiAnd.to_string(), ";&");
        assert_eq!(CaseTerminator::SemiSemiAnd.to_string(), ";;&");
    }
}
