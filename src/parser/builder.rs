//! AST Builder
//!
//! Turns the generic parse tree into typed AST nodes. The grammar has
//! already validated the shape of the input, so the builder never fails on
//! structure: odd sub-constructs degrade to the closest plain node.
//! Heredoc bodies extracted by the preprocessor are handed out in the order
//! the `HereDoc` nodes are met, which is source order.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::ast::types::{
    AndOrListNode, AndOrOperator, AndOrPart, ArgumentNode, ArgumentValue, ArithForNode,
    ArithmeticCommandNode, ArrayValueNode, AssignmentNode, AssignmentValue, BlankLineNode,
    CaseEntry, CaseItemNode, CaseNode, CaseTerminator, CommandNode, CommandSubstitution,
    CommentNode, CompoundCommandNode, CompoundListNode, ConditionalCommandNode, ElifClause,
    ForNode, FunctionDefNode, FunctionStyle, HereStringNode, IfNode, LoopKeyword, ParameterExpansion,
    PipeConnector, PipelineNode, ProcessDirection, ProcessSubstitution, RedirectionNode,
    RedirectionOperator, RedirectionTarget, ScriptNode, SimpleCommandNode, SourceLocation,
    StatementNode, SubshellNode, SubstitutionBody, UntilNode, WhileNode, WordNode, AST,
};
use crate::parser::grammar::Rule;
use crate::parser::heredoc::{split_delimiter, HereDocBody, Preprocessed};
use crate::parser::peg::ParseNode;
use crate::parser::types::{LineIndex, ParseException};

type Node = ParseNode<Rule>;

lazy_static! {
    static ref PARAM_NAME: Regex =
        Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*(?:\[[^\]]*\])?|[0-9]+|[@*#?$!-])").unwrap();
    static ref PARAM_OPERATOR: Regex =
        Regex::new(r"^(?::-|:=|:\?|:\+|-|=|\?|\+|##|#|%%|%|//|/#|/%|/|\^\^|\^|,,|,|:|@)").unwrap();
}

/// Builds one `ScriptNode` from one successful parse
pub struct AstBuilder<'a> {
    input: &'a str,
    index: LineIndex,
    pre: &'a Preprocessed,
    next_heredoc: usize,
}

impl<'a> AstBuilder<'a> {
    pub fn new(pre: &'a Preprocessed) -> Self {
        Self {
            input: &pre.source,
            index: LineIndex::new(&pre.source),
            pre,
            next_heredoc: 0,
        }
    }

    /// Build the script and check every extracted heredoc body found its node
    pub fn build(mut self, root: &Node) -> Result<ScriptNode, ParseException> {
        let script = AST::script(self.build_elements(root));
        if self.next_heredoc != self.pre.bodies.len() {
            return Err(ParseException::new(
                format!(
                    "found {} here-document bodies but {} markers",
                    self.pre.bodies.len(),
                    self.next_heredoc
                ),
                1,
                1,
            ));
        }
        Ok(script)
    }

    fn text(&self, node: &Node) -> &'a str {
        node.text(self.input)
    }

    fn location(&self, node: &Node) -> Option<SourceLocation> {
        let (line, column) = self.index.position(node.start);
        Some(SourceLocation {
            line: self.pre.original_line(line),
            column,
            offset: node.start,
            length: node.end - node.start,
        })
    }

    // ===========================================================================
    // LISTS & STATEMENTS
    // ===========================================================================

    fn build_elements(&mut self, node: &Node) -> Vec<StatementNode> {
        let mut statements = Vec::new();
        for child in &node.children {
            let statement = match child.rule {
                Rule::BlankLine => AST::statement(CommandNode::BlankLine(BlankLineNode)),
                Rule::CommentLine => match child.child(Rule::Comment) {
                    Some(comment) => {
                        AST::statement(CommandNode::Comment(self.build_comment(comment)))
                    }
                    None => continue,
                },
                Rule::CommandLine => self.build_command_line(child),
                _ => continue,
            };
            statements.push(statement);
        }
        statements
    }

    fn build_compound_list(&mut self, node: Option<&Node>) -> CompoundListNode {
        match node {
            Some(list) => AST::compound_list(self.build_elements(list)),
            None => AST::compound_list(Vec::new()),
        }
    }

    fn build_comment(&self, node: &Node) -> CommentNode {
        let text = self.text(node);
        CommentNode {
            text: text.strip_prefix('#').unwrap_or(text).to_string(),
            location: self.location(node),
        }
    }

    fn build_command_line(&mut self, node: &Node) -> StatementNode {
        let command = match node.child(Rule::AndOrList) {
            Some(list) => self.build_and_or(list),
            None => CommandNode::BlankLine(BlankLineNode),
        };
        let background = node
            .child(Rule::SeparatorOp)
            .map_or(false, |op| self.text(op) == "&");
        let comment = node.child(Rule::Comment).map(|c| self.build_comment(c));

        StatementNode {
            command,
            background,
            comment,
            location: self.location(node),
        }
    }

    fn build_and_or(&mut self, node: &Node) -> CommandNode {
        let mut first = None;
        let mut rest = Vec::new();
        let mut pending_op: Option<(AndOrOperator, bool)> = None;

        for child in &node.children {
            match child.rule {
                Rule::AndOrOp => {
                    let text = self.text(child);
                    let operator = if text.contains("&&") {
                        AndOrOperator::And
                    } else {
                        AndOrOperator::Or
                    };
                    pending_op = Some((operator, text.contains('\n')));
                }
                Rule::Pipeline => {
                    let command = self.build_pipeline(child);
                    match pending_op.take() {
                        Some((operator, line_break)) => rest.push(AndOrPart {
                            operator,
                            line_break,
                            command,
                        }),
                        None => first = Some(command),
                    }
                }
                _ => {}
            }
        }

        let first = first.unwrap_or(CommandNode::BlankLine(BlankLineNode));
        if rest.is_empty() {
            first
        } else {
            CommandNode::AndOr(AndOrListNode {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn build_pipeline(&mut self, node: &Node) -> CommandNode {
        let negated = node.child(Rule::Bang).is_some();
        let mut commands = Vec::new();
        let mut connectors = Vec::new();

        for child in &node.children {
            match child.rule {
                Rule::Command => commands.push(self.build_command(child)),
                Rule::Pipe => {
                    let text = self.text(child);
                    connectors.push(PipeConnector {
                        stderr: text.contains("|&"),
                        line_break: text.contains('\n'),
                    });
                }
                _ => {}
            }
        }

        if !negated && commands.len() == 1 {
            return commands.remove(0);
        }
        CommandNode::Pipeline(PipelineNode {
            commands,
            negated,
            connectors,
        })
    }

    fn build_command(&mut self, node: &Node) -> CommandNode {
        let Some(first) = node.children.first() else {
            return CommandNode::BlankLine(BlankLineNode);
        };
        match first.rule {
            Rule::SimpleCommand => CommandNode::Simple(self.build_simple_command(first)),
            Rule::FnKeywordParens | Rule::FnKeywordOnly | Rule::FnParensOnly => {
                CommandNode::FunctionDef(self.build_function(first))
            }
            _ => {
                let mut compound = self.build_compound(first);
                if let Some(list) = node.child(Rule::RedirectList) {
                    let redirections = self.build_redirect_list(list);
                    compound.redirections_mut().extend(redirections);
                }
                CommandNode::Compound(compound)
            }
        }
    }

    // ===========================================================================
    // SIMPLE COMMANDS
    // ===========================================================================

    fn build_simple_command(&mut self, node: &Node) -> SimpleCommandNode {
        let mut assignments = Vec::new();
        let mut name = None;
        let mut args = Vec::new();
        let mut redirections = Vec::new();
        let mut continued = false;

        for child in &node.children {
            match child.rule {
                Rule::ArgSpace => {
                    continued = self.text(child).contains("\\\n");
                }
                Rule::Assignment => {
                    let assignment = self.build_assignment(child);
                    if name.is_none() {
                        assignments.push(assignment);
                    } else {
                        args.push(ArgumentNode {
                            value: ArgumentValue::Assignment(assignment),
                            continued,
                        });
                    }
                    continued = false;
                }
                Rule::Word => {
                    let word = self.build_word(child);
                    if name.is_none() {
                        name = Some(word);
                    } else {
                        args.push(ArgumentNode {
                            value: ArgumentValue::Word(word),
                            continued,
                        });
                    }
                    continued = false;
                }
                Rule::IoRedirect => {
                    redirections.push(self.build_redirect(child));
                    continued = false;
                }
                _ => {}
            }
        }

        SimpleCommandNode {
            assignments,
            name,
            args,
            redirections,
            location: self.location(node),
        }
    }

    fn build_assignment(&mut self, node: &Node) -> AssignmentNode {
        let name = node.child(Rule::AssignName).map_or("", |n| self.text(n));
        let append = node
            .child(Rule::AssignOp)
            .map_or(false, |op| self.text(op) == "+=");

        let value = if let Some(array) = node.child(Rule::ArrayValue) {
            let elements = array
                .children_of(Rule::Word)
                .map(|w| self.build_word(w))
                .collect();
            Some(AssignmentValue::Array(ArrayValueNode { elements }))
        } else {
            node.child(Rule::AssignValue)
                .map(|w| AssignmentValue::Word(self.build_word(w)))
        };

        AST::assignment(name, value, append)
    }

    // ===========================================================================
    // WORDS
    // ===========================================================================

    fn build_word(&mut self, node: &Node) -> WordNode {
        let parts = self.build_parts(node);
        AST::word(parts)
    }

    /// Build the parts under `node`, merging adjacent literal runs
    fn build_parts(&mut self, node: &Node) -> Vec<WordNode> {
        let mut parts: Vec<WordNode> = Vec::new();
        for child in &node.children {
            let part = self.build_word_part(child);
            if let (Some(WordNode::Literal(prev)), WordNode::Literal(next)) =
                (parts.last_mut(), &part)
            {
                prev.value.push_str(&next.value);
                continue;
            }
            parts.push(part);
        }
        parts
    }

    fn build_word_part(&mut self, node: &Node) -> WordNode {
        let text = self.text(node);
        match node.rule {
            Rule::SingleQuoted => AST::single_quoted(&text[1..text.len() - 1], false),
            Rule::AnsiCQuoted => AST::single_quoted(&text[2..text.len() - 1], true),
            Rule::DoubleQuoted => {
                let parts = self.build_parts(node);
                AST::double_quoted(parts, false)
            }
            Rule::LocaleQuoted => {
                let parts = self.build_parts(node);
                AST::double_quoted(parts, true)
            }
            Rule::ParamSimple => AST::parameter(&text[1..], false),
            Rule::ParamBraced => {
                let body = node.child(Rule::ParamBody).map_or("", |b| self.text(b));
                WordNode::Parameter(split_parameter(body))
            }
            Rule::ArithExpansion => {
                let body = node.child(Rule::ArithBody).map_or("", |b| self.text(b));
                AST::arithmetic(body)
            }
            Rule::CommandSub => {
                let body = self.build_compound_list(node.child(Rule::CompoundList));
                WordNode::CommandSubstitution(CommandSubstitution {
                    body: SubstitutionBody::Parsed(body),
                    backtick: false,
                })
            }
            Rule::Backtick => {
                let body = node.child(Rule::BacktickBody).map_or("", |b| self.text(b));
                WordNode::CommandSubstitution(CommandSubstitution {
                    body: SubstitutionBody::Verbatim(body.to_string()),
                    backtick: true,
                })
            }
            Rule::ProcessSub => {
                let direction = if text.starts_with('>') {
                    ProcessDirection::Output
                } else {
                    ProcessDirection::Input
                };
                let body = self.build_compound_list(node.child(Rule::CompoundList));
                WordNode::ProcessSubstitution(ProcessSubstitution { direction, body })
            }
            // LiteralText, DqText and anything unexpected stay literal
            _ => AST::literal(text),
        }
    }

    // ===========================================================================
    // REDIRECTIONS
    // ===========================================================================

    fn build_redirect_list(&mut self, node: &Node) -> Vec<RedirectionNode> {
        node.children_of(Rule::IoRedirect)
            .map(|r| self.build_redirect(r))
            .collect()
    }

    fn build_redirect(&mut self, node: &Node) -> RedirectionNode {
        let fd = node
            .child(Rule::IoNumber)
            .and_then(|n| self.text(n).parse::<u32>().ok());

        let (operator, target) = if let Some(here_string) = node.child(Rule::HereString) {
            let word = here_string
                .child(Rule::Word)
                .map_or_else(|| AST::literal(""), |w| self.build_word(w));
            (
                RedirectionOperator::TLess,
                RedirectionTarget::HereString(HereStringNode { word }),
            )
        } else if let Some(here_doc) = node.child(Rule::HereDoc) {
            let strip_tabs = here_doc
                .child(Rule::HereDocOp)
                .map_or(false, |op| self.text(op) == "<<-");
            let raw = here_doc
                .child(Rule::HereDocDelimiter)
                .map_or("", |d| self.text(d));
            let (delimiter, quote_char) = split_delimiter(raw);

            let mut doc = AST::here_doc(delimiter, strip_tabs, quote_char);
            doc.location = self.location(here_doc);
            if let Some(HereDocBody {
                body, terminator, ..
            }) = self.pre.bodies.get(self.next_heredoc)
            {
                doc.body = body.clone();
                doc.terminator = terminator.clone();
            }
            self.next_heredoc += 1;

            let operator = if strip_tabs {
                RedirectionOperator::DLessDash
            } else {
                RedirectionOperator::DLess
            };
            (operator, RedirectionTarget::HereDoc(doc))
        } else {
            let operator = node
                .child(Rule::RedirectOp)
                .and_then(|op| RedirectionOperator::from_symbol(self.text(op)))
                .unwrap_or(RedirectionOperator::Great);
            let word = node
                .child(Rule::Word)
                .map_or_else(|| AST::literal(""), |w| self.build_word(w));
            (operator, RedirectionTarget::Word(word))
        };

        RedirectionNode {
            fd,
            operator,
            target,
            location: self.location(node),
        }
    }

    // ===========================================================================
    // COMPOUND COMMANDS
    // ===========================================================================

    fn build_compound(&mut self, node: &Node) -> CompoundCommandNode {
        match node.rule {
            Rule::BraceGroup => AST::group(self.build_compound_list(node.child(Rule::CompoundList))),
            Rule::Subshell => CompoundCommandNode::Subshell(SubshellNode {
                body: self.build_compound_list(node.child(Rule::CompoundList)),
                redirections: Vec::new(),
            }),
            Rule::ArithCommand => CompoundCommandNode::Arithmetic(ArithmeticCommandNode {
                expression: node
                    .child(Rule::ArithBody)
                    .map_or("", |b| self.text(b))
                    .to_string(),
                redirections: Vec::new(),
            }),
            Rule::CondCommand => CompoundCommandNode::Conditional(ConditionalCommandNode {
                expression: node
                    .child(Rule::CondBody)
                    .map_or("", |b| self.text(b))
                    .trim()
                    .to_string(),
                redirections: Vec::new(),
            }),
            Rule::IfClause => CompoundCommandNode::If(self.build_if(node)),
            Rule::ForClause => CompoundCommandNode::For(self.build_for(node, LoopKeyword::For)),
            Rule::SelectClause => {
                CompoundCommandNode::For(self.build_for(node, LoopKeyword::Select))
            }
            Rule::ArithFor => CompoundCommandNode::ArithFor(ArithForNode {
                expression: node
                    .child(Rule::ArithBody)
                    .map_or("", |b| self.text(b))
                    .to_string(),
                body: self.build_do_group(node),
                redirections: Vec::new(),
            }),
            Rule::WhileClause => CompoundCommandNode::While(WhileNode {
                condition: self.build_compound_list(node.child(Rule::CompoundList)),
                body: self.build_do_group(node),
                redirections: Vec::new(),
            }),
            Rule::UntilClause => CompoundCommandNode::Until(UntilNode {
                condition: self.build_compound_list(node.child(Rule::CompoundList)),
                body: self.build_do_group(node),
                redirections: Vec::new(),
            }),
            Rule::CaseClause => CompoundCommandNode::Case(self.build_case(node)),
            _ => AST::group(AST::compound_list(Vec::new())),
        }
    }

    fn build_do_group(&mut self, node: &Node) -> CompoundListNode {
        let list = node
            .child(Rule::DoGroup)
            .and_then(|group| group.child(Rule::CompoundList));
        self.build_compound_list(list)
    }

    fn build_if(&mut self, node: &Node) -> IfNode {
        let mut lists = node.children_of(Rule::CompoundList);
        let condition_node = lists.next();
        let then_node = lists.next();

        let condition = self.build_compound_list(condition_node);
        let then_body = self.build_compound_list(then_node);

        let mut elif_clauses = Vec::new();
        for clause in node.children_of(Rule::ElifClause) {
            let mut lists = clause.children_of(Rule::CompoundList);
            let (cond, body) = (lists.next(), lists.next());
            elif_clauses.push(ElifClause {
                condition: self.build_compound_list(cond),
                body: self.build_compound_list(body),
            });
        }

        let else_body = node
            .child(Rule::ElseClause)
            .map(|clause| self.build_compound_list(clause.child(Rule::CompoundList)));

        IfNode {
            condition,
            then_body,
            elif_clauses,
            else_body,
            redirections: Vec::new(),
        }
    }

    fn build_for(&mut self, node: &Node, keyword: LoopKeyword) -> ForNode {
        let variable = node.child(Rule::Name).map_or("", |n| self.text(n)).to_string();
        let words = node.child(Rule::InClause).map(|clause| {
            clause
                .children_of(Rule::Word)
                .map(|w| self.build_word(w))
                .collect()
        });

        ForNode {
            keyword,
            variable,
            words,
            body: self.build_do_group(node),
            redirections: Vec::new(),
        }
    }

    fn build_case(&mut self, node: &Node) -> CaseNode {
        let word = node
            .child(Rule::Word)
            .map_or_else(|| AST::literal(""), |w| self.build_word(w));

        let mut entries = Vec::new();
        for child in &node.children {
            match child.rule {
                Rule::BlankLine => entries.push(CaseEntry::BlankLine(BlankLineNode)),
                Rule::CommentLine => {
                    if let Some(comment) = child.child(Rule::Comment) {
                        entries.push(CaseEntry::Comment(self.build_comment(comment)));
                    }
                }
                Rule::CaseItem => entries.push(CaseEntry::Item(self.build_case_item(child))),
                _ => {}
            }
        }

        CaseNode {
            word,
            entries,
            redirections: Vec::new(),
        }
    }

    fn build_case_item(&mut self, node: &Node) -> CaseItemNode {
        let patterns = node
            .children_of(Rule::Word)
            .map(|w| self.build_word(w))
            .collect();
        let body = node
            .child(Rule::CompoundList)
            .map(|list| AST::compound_list(self.build_elements(list)));
        let terminator = match node.child(Rule::CaseTerminator).map(|t| self.text(t)) {
            Some(";&") => CaseTerminator::SemiAnd,
            Some(";;&") => CaseTerminator::SemiSemiAnd,
            _ => CaseTerminator::DoubleSemi,
        };

        CaseItemNode {
            patterns,
            body,
            terminator,
        }
    }

    // ===========================================================================
    // FUNCTIONS
    // ===========================================================================

    fn build_function(&mut self, node: &Node) -> FunctionDefNode {
        let name = node
            .child(Rule::FunctionName)
            .map_or("", |n| self.text(n));
        let style = match node.rule {
            Rule::FnKeywordParens => FunctionStyle::KeywordParens,
            Rule::FnKeywordOnly => FunctionStyle::KeywordOnly,
            _ => FunctionStyle::ParensOnly,
        };

        let body = node
            .children
            .iter()
            .find(|c| is_compound_rule(c.rule))
            .map(|c| self.build_compound(c))
            .unwrap_or_else(|| AST::group(AST::compound_list(Vec::new())));

        let mut function = AST::function_def(name, body, style);
        if let Some(list) = node.child(Rule::RedirectList) {
            function.redirections = self.build_redirect_list(list);
        }
        function.location = self.location(node);
        function
    }
}

fn is_compound_rule(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::BraceGroup
            | Rule::Subshell
            | Rule::ArithCommand
            | Rule::CondCommand
            | Rule::IfClause
            | Rule::ForClause
            | Rule::SelectClause
            | Rule::ArithFor
            | Rule::WhileClause
            | Rule::UntilClause
            | Rule::CaseClause
    )
}

/// Split the inside of `${...}` into prefix, name, operator and argument.
/// Anything that does not fit keeps the whole text as the name.
fn split_parameter(body: &str) -> ParameterExpansion {
    let whole = ParameterExpansion {
        prefix: None,
        name: body.to_string(),
        braced: true,
        operator: None,
        argument: None,
    };

    let (prefix, rest) = match body.chars().next() {
        Some(c @ ('#' | '!')) if body.len() > 1 => (Some(c), &body[1..]),
        _ => (None, body),
    };

    let Some(name) = PARAM_NAME.find(rest).map(|m| m.as_str()) else {
        return whole;
    };
    let tail = &rest[name.len()..];
    if tail.is_empty() {
        return ParameterExpansion {
            prefix,
            name: name.to_string(),
            braced: true,
            operator: None,
            argument: None,
        };
    }

    let Some(operator) = PARAM_OPERATOR.find(tail).map(|m| m.as_str()) else {
        return whole;
    };
    ParameterExpansion {
        prefix,
        name: name.to_string(),
        braced: true,
        operator: Some(operator.to_string()),
        argument: Some(tail[operator.len()..].to_string()),
    }
}
