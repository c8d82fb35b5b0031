//! Recursive descent parser for filter expressions.

mod property;
mod values;

use tracing::{debug, warn};

use super::ast::{fold, FilterNode, LogicalOperator};
use super::error::{FilterResult, ParseError, ParseResult};
use super::lexer::{Lexer, PositionedToken, Token};
use crate::config::CompilerConfig;
use crate::hierarchy::Hierarchy;

/// Deepest parenthesis nesting accepted.
const MAX_NESTING: usize = 64;

/// Compiles filter and sort expressions into ASTs.
///
/// A compiler holds only its collaborators and configuration; all per-call
/// state (lexer, stacks, the explicit-selection flag) lives in a transient
/// parser created by each [`parse`](Self::parse) call, so one compiler can be
/// reused for any number of calls. Filters attached to collections are
/// compiled by a fresh child compiler, never by re-entering this one.
///
/// # Grammar
///
/// ```text
/// expr       ::= term
/// term       ::= factor (logical_op term)?
/// factor     ::= "(" expr ")" | comparison
/// comparison ::= property_path operator operand
/// logical_op ::= "&" | "|" | "and" | "or"
/// ```
///
/// `&` and `|` have the same precedence. Using both at one nesting level
/// without parentheses is an error.
///
/// # Example
///
/// ```
/// use calfilter::filter::{FilterCompiler, FilterNode};
/// use calfilter::hierarchy::MemoryHierarchy;
///
/// let hierarchy = MemoryHierarchy::new();
/// let compiler = FilterCompiler::new(&hierarchy);
///
/// let result = compiler.parse(r#"entity_type="event" & owner="abcd""#, false, "example");
/// assert!(result.ok);
/// assert!(matches!(result.filter, Some(FilterNode::And { .. })));
///
/// let result = compiler.parse(r#"owner="a" & owner="b" | owner="c""#, false, "example");
/// assert!(!result.ok);
/// ```
pub struct FilterCompiler<'h> {
    pub(super) hierarchy: &'h dyn Hierarchy,
    pub(super) config: CompilerConfig,
    /// How many attached filters enclose this compiler.
    pub(super) depth: usize,
    /// Virtual paths being resolved by enclosing compilers.
    pub(super) resolving: Vec<String>,
}

impl<'h> FilterCompiler<'h> {
    /// Creates a compiler with the default configuration.
    pub fn new(hierarchy: &'h dyn Hierarchy) -> Self {
        Self::with_config(hierarchy, CompilerConfig::default())
    }

    /// Creates a compiler with the given configuration.
    pub fn with_config(hierarchy: &'h dyn Hierarchy, config: CompilerConfig) -> Self {
        Self {
            hierarchy,
            config,
            depth: 0,
            resolving: Vec::new(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a filter expression.
    ///
    /// # Arguments
    ///
    /// * `expr` - The filter expression to compile
    /// * `explicit_selection` - True when the caller selected collections
    ///   explicitly; hidden collections are then included when folders are
    ///   expanded
    /// * `source` - Label prefixed to any diagnostic, e.g. the path of the
    ///   collection the expression came from
    ///
    /// Never panics or returns an error: failures come back as a
    /// `ParseResult` with `ok == false` and a message.
    pub fn parse(&self, expr: &str, explicit_selection: bool, source: &str) -> ParseResult {
        debug!(source, expr, depth = self.depth, "compiling filter");
        match self.compile(expr, explicit_selection) {
            Ok(filter) => {
                debug!(source, filter = %filter, "compiled filter");
                ParseResult::filter(filter)
            }
            Err(e) => {
                warn!(source, error = %e, "filter did not compile");
                ParseResult::failed(source, e)
            }
        }
    }

    pub(super) fn compile(&self, expr: &str, explicit_selection: bool) -> FilterResult<FilterNode> {
        self.check_length(expr)?;
        Parser::new(self, expr, explicit_selection).parse_filter()
    }

    pub(super) fn check_length(&self, expr: &str) -> FilterResult<()> {
        let limit = self.config.max_expression_length;
        if expr.len() > limit {
            return Err(ParseError::TooLong {
                length: expr.len(),
                limit,
            });
        }
        Ok(())
    }

    /// A compiler for a filter found while resolving `vpath`.
    pub(super) fn nested(&self, vpath: &str) -> FilterResult<FilterCompiler<'h>> {
        if self.depth >= self.config.max_alias_depth {
            return Err(ParseError::AliasDepthExceeded(self.config.max_alias_depth));
        }
        let mut resolving = self.resolving.clone();
        resolving.push(vpath.to_string());
        Ok(FilterCompiler {
            hierarchy: self.hierarchy,
            config: self.config.clone(),
            depth: self.depth + 1,
            resolving,
        })
    }
}

/// Entries of the operator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackOp {
    /// Start of a nesting level (the whole expression, or a parenthesis),
    /// with the logical operator chosen at that level so far.
    Level { chosen: Option<LogicalOperator> },
    /// A logical operator waiting for its right operand.
    Pending(LogicalOperator),
}

/// Per-call parsing state.
pub(super) struct Parser<'c, 'h, 'a> {
    pub(super) compiler: &'c FilterCompiler<'h>,
    pub(super) lexer: Lexer<'a>,
    pub(super) explicit_selection: bool,
    ops: Vec<StackOp>,
    filters: Vec<FilterNode>,
    nesting: usize,
}

impl<'c, 'h, 'a> Parser<'c, 'h, 'a> {
    pub(super) fn new(
        compiler: &'c FilterCompiler<'h>,
        input: &'a str,
        explicit_selection: bool,
    ) -> Self {
        Self {
            compiler,
            lexer: Lexer::new(input),
            explicit_selection,
            ops: Vec::new(),
            filters: Vec::new(),
            nesting: 0,
        }
    }

    /// Parses the whole input as one filter expression.
    fn parse_filter(mut self) -> FilterResult<FilterNode> {
        self.ops.push(StackOp::Level { chosen: None });
        self.do_expr()?;

        let trailing = self.lexer.next_token()?;
        match trailing.token {
            Token::Eof => {}
            Token::Symbol(')') => return Err(ParseError::UnbalancedParentheses),
            other => {
                return Err(ParseError::unexpected(
                    other.to_string(),
                    "'&', '|' or end of expression",
                    trailing.position,
                ))
            }
        }

        if self.ops.len() != 1 || self.filters.len() != 1 {
            return Err(ParseError::InvalidExpression);
        }
        self.filters.pop().ok_or(ParseError::InvalidExpression)
    }

    fn do_expr(&mut self) -> FilterResult<()> {
        self.do_term()
    }

    /// Parses `factor (logical_op term)?`.
    ///
    /// The right-recursive `term` is unrolled into a loop; each factor folds
    /// the operator before it as soon as it is parsed.
    fn do_term(&mut self) -> FilterResult<()> {
        loop {
            self.do_factor()?;

            let next = self.lexer.next_token()?;
            match logical_operator(&next.token) {
                Some(op) => {
                    self.choose_operator(op)?;
                    self.ops.push(StackOp::Pending(op));
                }
                None => {
                    self.lexer.push_back(next);
                    return self.fold_pending();
                }
            }
        }
    }

    fn do_factor(&mut self) -> FilterResult<()> {
        let first = self.lexer.next_token()?;

        match first.token {
            Token::Symbol('(') => {
                if self.nesting >= MAX_NESTING {
                    return Err(ParseError::NestingTooDeep(MAX_NESTING));
                }
                self.nesting += 1;
                self.ops.push(StackOp::Level { chosen: None });

                self.do_expr()?;

                let close = self.lexer.next_token()?;
                match close.token {
                    Token::Symbol(')') => {}
                    Token::Eof => return Err(ParseError::UnbalancedParentheses),
                    other => {
                        return Err(ParseError::unexpected(
                            other.to_string(),
                            "'&', '|' or ')'",
                            close.position,
                        ))
                    }
                }
                match self.ops.pop() {
                    Some(StackOp::Level { .. }) => {}
                    _ => return Err(ParseError::InvalidExpression),
                }
                self.nesting -= 1;
            }
            _ => {
                let filter = self.property_comparison(first)?;
                self.filters.push(filter);
            }
        }

        self.fold_pending()
    }

    /// Records `op` as the operator of the innermost nesting level.
    fn choose_operator(&mut self, op: LogicalOperator) -> FilterResult<()> {
        let chosen = self.ops.iter_mut().rev().find_map(|entry| match entry {
            StackOp::Level { chosen } => Some(chosen),
            StackOp::Pending(_) => None,
        });

        match chosen {
            Some(chosen) => match *chosen {
                None => {
                    *chosen = Some(op);
                    Ok(())
                }
                Some(previous) if previous == op => Ok(()),
                Some(_) => Err(ParseError::MixedLogicalOperators),
            },
            None => Err(ParseError::InvalidExpression),
        }
    }

    /// Folds the two newest filters if a logical operator is waiting.
    fn fold_pending(&mut self) -> FilterResult<()> {
        let Some(&StackOp::Pending(op)) = self.ops.last() else {
            return Ok(());
        };
        self.ops.pop();

        let right = self.filters.pop().ok_or(ParseError::InvalidExpression)?;
        let left = self.filters.pop().ok_or(ParseError::InvalidExpression)?;
        self.filters.push(fold(left, right, op));
        Ok(())
    }

    /// Describes an unexpected token, using `UnexpectedEnd` at end of input.
    pub(super) fn unexpected(&self, token: &PositionedToken, expected: &'static str) -> ParseError {
        match token.token {
            Token::Eof => ParseError::UnexpectedEnd { expected },
            ref other => ParseError::unexpected(other.to_string(), expected, token.position),
        }
    }
}

fn logical_operator(token: &Token) -> Option<LogicalOperator> {
    if token.is_symbol('&') || token.is_keyword("and") {
        Some(LogicalOperator::And)
    } else if token.is_symbol('|') || token.is_keyword("or") {
        Some(LogicalOperator::Or)
    } else {
        None
    }
}
