//! PEG Engine
//!
//! A small packrat engine for parsing expression grammars. A grammar maps
//! rule identifiers to expressions built from the combinators below:
//!
//! - `lit` / `pattern` / `scan` - leaves (exact text, anchored regex, scanner fn)
//! - `seq` / `choice` - sequence and ordered choice
//! - `zero_or_more` / `one_or_more` / `optional` - repetition
//! - `not` / `and` - negative and positive lookahead
//! - `rule` / `eof` - rule reference and end of input
//!
//! Matching produces a tree of `ParseNode`s holding only the rules defined
//! with `Grammar::define`. Rules registered with `Grammar::silent` splice
//! their children into the parent, which keeps repetition and helper rules
//! out of the tree.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use regex_lite::Regex;

use crate::parser::types::MAX_PARSER_DEPTH;

/// Custom leaf: given the input and a start offset, return the end offset
pub type Scanner = fn(&str, usize) -> Option<usize>;

pub enum Expr<R> {
    Literal(&'static str),
    Pattern(Regex),
    Scan(Scanner),
    Seq(Vec<Expr<R>>),
    Choice(Vec<Expr<R>>),
    Repeat(Box<Expr<R>>, usize),
    Optional(Box<Expr<R>>),
    Not(Box<Expr<R>>),
    And(Box<Expr<R>>),
    Rule(R),
    Eof,
}

pub fn lit<R>(text: &'static str) -> Expr<R> {
    Expr::Literal(text)
}

/// Regex leaf, anchored at the current position
pub fn pattern<R>(re: &str) -> Expr<R> {
    Expr::Pattern(Regex::new(&format!("^(?:{})", re)).unwrap())
}

pub fn scan<R>(scanner: Scanner) -> Expr<R> {
    Expr::Scan(scanner)
}

pub fn seq<R>(items: Vec<Expr<R>>) -> Expr<R> {
    Expr::Seq(items)
}

pub fn choice<R>(alternatives: Vec<Expr<R>>) -> Expr<R> {
    Expr::Choice(alternatives)
}

pub fn zero_or_more<R>(expr: Expr<R>) -> Expr<R> {
    Expr::Repeat(Box::new(expr), 0)
}

pub fn one_or_more<R>(expr: Expr<R>) -> Expr<R> {
    Expr::Repeat(Box::new(expr), 1)
}

pub fn optional<R>(expr: Expr<R>) -> Expr<R> {
    Expr::Optional(Box::new(expr))
}

pub fn not<R>(expr: Expr<R>) -> Expr<R> {
    Expr::Not(Box::new(expr))
}

pub fn and<R>(expr: Expr<R>) -> Expr<R> {
    Expr::And(Box::new(expr))
}

pub fn rule<R>(id: R) -> Expr<R> {
    Expr::Rule(id)
}

pub fn eof<R>() -> Expr<R> {
    Expr::Eof
}

/// A matched rule and the rules matched beneath it
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode<R> {
    pub rule: R,
    pub start: usize,
    pub end: usize,
    pub children: Vec<Rc<ParseNode<R>>>,
}

impl<R: Copy + PartialEq> ParseNode<R> {
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }

    pub fn child(&self, rule: R) -> Option<&ParseNode<R>> {
        self.children.iter().map(|c| c.as_ref()).find(|c| c.rule == rule)
    }

    pub fn children_of(&self, rule: R) -> impl Iterator<Item = &ParseNode<R>> {
        self.children
            .iter()
            .map(|c| c.as_ref())
            .filter(move |c| c.rule == rule)
    }
}

/// Why a parse failed, as a byte offset into the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegError {
    pub offset: usize,
    pub message: String,
}

struct RuleDef<R> {
    expr: Expr<R>,
    keep: bool,
}

pub struct Grammar<R> {
    rules: HashMap<R, RuleDef<R>>,
}

impl<R: Copy + Eq + Hash + Debug> Default for Grammar<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Copy + Eq + Hash + Debug> Grammar<R> {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Define a rule that appears in the parse tree
    pub fn define(&mut self, id: R, expr: Expr<R>) {
        self.rules.insert(id, RuleDef { expr, keep: true });
    }

    /// Define a rule whose children are spliced into its parent
    pub fn silent(&mut self, id: R, expr: Expr<R>) {
        self.rules.insert(id, RuleDef { expr, keep: false });
    }

    /// Match `start` against the whole input
    pub fn parse(&self, start: R, input: &str) -> Result<ParseNode<R>, PegError> {
        let mut state = MatchState {
            grammar: self,
            input,
            memo: HashMap::new(),
            depth: 0,
            farthest: 0,
            too_deep: false,
        };
        let mut out = Vec::new();
        let matched = state.eval_rule(start, 0, &mut out);

        match matched {
            Some(end) if end == input.len() && out.len() == 1 => {
                let root = out.remove(0);
                Ok(Rc::try_unwrap(root).unwrap_or_else(|rc| (*rc).clone()))
            }
            _ => Err(state.error()),
        }
    }
}

struct MatchState<'g, 'i, R> {
    grammar: &'g Grammar<R>,
    input: &'i str,
    memo: HashMap<(R, usize), Option<(usize, Vec<Rc<ParseNode<R>>>)>>,
    depth: usize,
    farthest: usize,
    too_deep: bool,
}

impl<'g, 'i, R: Copy + Eq + Hash + Debug> MatchState<'g, 'i, R> {
    fn fail(&mut self, pos: usize) -> Option<usize> {
        if pos > self.farthest {
            self.farthest = pos;
        }
        None
    }

    fn error(&self) -> PegError {
        let message = if self.too_deep {
            "nesting too deep".to_string()
        } else {
            match self.input[self.farthest..].chars().next() {
                None => "unexpected end of input".to_string(),
                Some('\n') => "unexpected end of line".to_string(),
                Some(c) => format!("unexpected {:?}", c),
            }
        };
        PegError {
            offset: self.farthest,
            message,
        }
    }

    fn eval_rule(&mut self, id: R, pos: usize, out: &mut Vec<Rc<ParseNode<R>>>) -> Option<usize> {
        if let Some(entry) = self.memo.get(&(id, pos)) {
            return entry.as_ref().map(|(end, nodes)| {
                out.extend(nodes.iter().cloned());
                *end
            });
        }

        let grammar = self.grammar;
        let def = grammar.rules.get(&id)?;
        if self.depth >= MAX_PARSER_DEPTH {
            self.too_deep = true;
            return None;
        }

        self.depth += 1;
        let mut children = Vec::new();
        let matched = self.eval(&def.expr, pos, &mut children);
        self.depth -= 1;

        let entry = matched.map(|end| {
            let nodes = if def.keep {
                vec![Rc::new(ParseNode {
                    rule: id,
                    start: pos,
                    end,
                    children,
                })]
            } else {
                children
            };
            (end, nodes)
        });
        if let Some((_, nodes)) = &entry {
            out.extend(nodes.iter().cloned());
        }
        self.memo.insert((id, pos), entry);
        matched
    }

    fn eval(&mut self, expr: &'g Expr<R>, pos: usize, out: &mut Vec<Rc<ParseNode<R>>>) -> Option<usize> {
        match expr {
            Expr::Literal(text) => {
                if self.input[pos..].starts_with(text) {
                    Some(pos + text.len())
                } else {
                    self.fail(pos)
                }
            }
            Expr::Pattern(re) => match re.find(&self.input[pos..]) {
                Some(m) => Some(pos + m.end()),
                None => self.fail(pos),
            },
            Expr::Scan(scanner) => match scanner(self.input, pos) {
                Some(end) => Some(end),
                None => self.fail(pos),
            },
            Expr::Seq(items) => {
                let mark = out.len();
                let mut cur = pos;
                for item in items {
                    match self.eval(item, cur, out) {
                        Some(next) => cur = next,
                        None => {
                            out.truncate(mark);
                            return None;
                        }
                    }
                }
                Some(cur)
            }
            Expr::Choice(alternatives) => {
                let mark = out.len();
                for alternative in alternatives {
                    if let Some(next) = self.eval(alternative, pos, out) {
                        return Some(next);
                    }
                    out.truncate(mark);
                }
                None
            }
            Expr::Repeat(inner, min) => {
                let mark = out.len();
                let mut cur = pos;
                let mut count = 0;
                loop {
                    let inner_mark = out.len();
                    match self.eval(inner, cur, out) {
                        Some(next) if next > cur => {
                            cur = next;
                            count += 1;
                        }
                        Some(_) => {
                            // zero-width match: stop before looping forever
                            count += 1;
                            break;
                        }
                        None => {
                            out.truncate(inner_mark);
                            break;
                        }
                    }
                }
                if count >= *min {
                    Some(cur)
                } else {
                    out.truncate(mark);
                    None
                }
            }
            Expr::Optional(inner) => {
                let mark = out.len();
                match self.eval(inner, pos, out) {
                    Some(next) => Some(next),
                    None => {
                        out.truncate(mark);
                        Some(pos)
                    }
                }
            }
            Expr::Not(inner) => {
                let farthest = self.farthest;
                let mut scratch = Vec::new();
                let matched = self.eval(inner, pos, &mut scratch);
                self.farthest = farthest;
                match matched {
                    Some(_) => None,
                    None => Some(pos),
                }
            }
            Expr::And(inner) => {
                let farthest = self.farthest;
                let mut scratch = Vec::new();
                let matched = self.eval(inner, pos, &mut scratch);
                self.farthest = farthest;
                matched.map(|_| pos)
            }
            Expr::Rule(id) => self.eval_rule(*id, pos, out),
            Expr::Eof => {
                if pos == self.input.len() {
                    Some(pos)
                } else {
                    self.fail(pos)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Toy {
        List,
        Item,
        Number,
        Sep,
        Nested,
    }

    // list = item (sep item)* eof ; item = number / nested
    fn toy_grammar() -> Grammar<Toy> {
        let mut g = Grammar::new();
        g.define(
            Toy::List,
            seq(vec![
                rule(Toy::Item),
                zero_or_more(seq(vec![rule(Toy::Sep), rule(Toy::Item)])),
                eof(),
            ]),
        );
        g.silent(Toy::Item, choice(vec![rule(Toy::Number), rule(Toy::Nested)]));
        g.define(Toy::Number, pattern("[0-9]+"));
        g.silent(Toy::Sep, seq(vec![lit(","), optional(pattern(" +"))]));
        g.define(
            Toy::Nested,
            seq(vec![
                lit("["),
                optional(seq(vec![
                    rule(Toy::Item),
                    zero_or_more(seq(vec![rule(Toy::Sep), rule(Toy::Item)])),
                ])),
                lit("]"),
            ]),
        );
        g
    }

    #[test]
    fn test_flat_list() {
        let g = toy_grammar();
        let input = "1, 22,333";
        let tree = g.parse(Toy::List, input).unwrap();
        assert_eq!(tree.rule, Toy::List);
        let numbers: Vec<&str> = tree.children_of(Toy::Number).map(|n| n.text(input)).collect();
        assert_eq!(numbers, vec!["1", "22", "333"]);
    }

    #[test]
    fn test_silent_rules_are_spliced() {
        let g = toy_grammar();
        let tree = g.parse(Toy::List, "1,2").unwrap();
        assert!(tree.child(Toy::Sep).is_none());
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_nested_structure() {
        let g = toy_grammar();
        let input = "[1,[2]],3";
        let tree = g.parse(Toy::List, input).unwrap();
        let nested = tree.child(Toy::Nested).unwrap();
        assert_eq!(nested.text(input), "[1,[2]]");
        assert_eq!(nested.children.len(), 2);
        assert_eq!(nested.children[1].rule, Toy::Nested);
    }

    #[test]
    fn test_failure_reports_farthest_offset() {
        let g = toy_grammar();
        let err = g.parse(Toy::List, "1,2,x").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.message, "unexpected 'x'");

        let err = g.parse(Toy::List, "[1,2").unwrap_err();
        assert_eq!(err.message, "unexpected end of input");
    }

    #[test]
    fn test_lookahead_does_not_consume() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        enum Kw {
            Start,
            Word,
        }
        let mut g = Grammar::new();
        // a keyword "if" only when not followed by a word character
        g.define(
            Kw::Start,
            seq(vec![
                choice(vec![
                    seq(vec![lit("if"), not(pattern("[a-z]")), rule(Kw::Word)]),
                    rule(Kw::Word),
                ]),
                eof(),
            ]),
        );
        g.define(Kw::Word, pattern("[a-z ]+"));

        let tree = g.parse(Kw::Start, "iffy").unwrap();
        assert_eq!(tree.child(Kw::Word).unwrap().text("iffy"), "iffy");

        let tree = g.parse(Kw::Start, "if x").unwrap();
        assert_eq!(tree.child(Kw::Word).unwrap().text("if x"), " x");

        let mut g2: Grammar<Kw> = Grammar::new();
        g2.define(Kw::Start, seq(vec![and(lit("a")), rule(Kw::Word), eof()]));
        g2.define(Kw::Word, pattern("[a-z]+"));
        assert!(g2.parse(Kw::Start, "abc").is_ok());
        assert!(g2.parse(Kw::Start, "bc").is_err());
    }

    #[test]
    fn test_scanner_leaf() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        enum S {
            Start,
            Body,
        }
        fn until_bang(input: &str, pos: usize) -> Option<usize> {
            input[pos..].find('!').map(|i| pos + i)
        }
        let mut g = Grammar::new();
        g.define(S::Start, seq(vec![rule(S::Body), lit("!"), eof()]));
        g.define(S::Body, scan(until_bang));
        let tree = g.parse(S::Start, "hello!").unwrap();
        assert_eq!(tree.child(S::Body).unwrap().text("hello!"), "hello");
        assert!(g.parse(S::Start, "hello").is_err());
    }

    #[test]
    fn test_repetition_stops_on_zero_width_match() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        enum Z {
            Start,
        }
        let mut g = Grammar::new();
        g.define(Z::Start, seq(vec![zero_or_more(optional(lit("a"))), eof()]));
        assert!(g.parse(Z::Start, "aaa").is_ok());
        assert!(g.parse(Z::Start, "").is_ok());
    }
}
