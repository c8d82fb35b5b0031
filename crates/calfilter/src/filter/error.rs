//! Error types for the filter compiler.

use serde::Serialize;
use thiserror::Error;

use super::ast::{FilterNode, SortTerm};
use crate::hierarchy::LookupError;

/// A specialized Result type for compiler internals.
pub type FilterResult<T> = Result<T, ParseError>;

/// Errors that can occur while compiling a filter or sort expression.
///
/// Every failure unwinds to the public entry point through `?` and is turned
/// into a [`ParseResult`] there.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The expression is longer than the configured limit.
    #[error("expression is {length} bytes, limit is {limit}")]
    TooLong {
        /// Length of the rejected expression.
        length: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A quoted string was never closed.
    #[error("unterminated quoted string starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },

    /// An unexpected token was encountered.
    #[error("unexpected {found} at position {position}, expected {expected}")]
    UnexpectedToken {
        /// Description of what was found.
        found: String,
        /// Description of what the parser wanted.
        expected: &'static str,
        /// Byte offset of the token.
        position: usize,
    },

    /// The input ended in the middle of an expression.
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd {
        /// Description of what the parser wanted.
        expected: &'static str,
    },

    /// Parentheses do not balance.
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    /// `&` and `|` used at the same nesting level without parentheses.
    #[error("mixed logical operators: use parentheses to combine '&' and '|'")]
    MixedLogicalOperators,

    /// Parentheses nested beyond the parser's limit.
    #[error("expression nested more than {0} parentheses deep")]
    NestingTooDeep(usize),

    /// The operator/filter stacks did not reduce to a single filter.
    #[error("invalid expression")]
    InvalidExpression,

    /// A property name is not in the property table.
    #[error("{}", unknown_property_message(name, suggestion.as_deref()))]
    UnknownProperty {
        /// The unrecognized name.
        name: String,
        /// A close match, if any.
        suggestion: Option<String>,
    },

    /// A property path is deeper than its first property allows.
    #[error("property path '{path}' is too deep (at most {allowed} segment(s) allowed)")]
    PathTooDeep {
        /// The offending path.
        path: String,
        /// Maximum depth allowed.
        allowed: usize,
    },

    /// A sub-property used without a parent property.
    #[error("property '{0}' can only follow another property, as in 'dtstart.{0}'")]
    NotTopLevel(String),

    /// An index was applied to a segment other than the first.
    #[error("only the first segment of a property path may be indexed")]
    IndexNotAllowed,

    /// The operator cannot be used with the property.
    #[error("operator '{operator}' is not supported for property '{property}'")]
    UnsupportedOperator {
        /// Operator syntax.
        operator: &'static str,
        /// Property path.
        property: String,
    },

    /// Invalid entity type name.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// A time-range bound could not be parsed.
    #[error("invalid date-time '{0}' in time range")]
    BadDateTime(String),

    /// A time range with neither bound.
    #[error("time range must have a start or an end")]
    EmptyTimeRange,

    /// A word list was malformed or empty.
    #[error("malformed word list: {0}")]
    BadWordList(&'static str),

    /// A category uid did not resolve.
    #[error("filter references missing category with uid '{0}'")]
    MissingCategory(String),

    /// A category name did not resolve.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// A view name did not resolve.
    #[error("unknown view '{0}'")]
    UnknownView(String),

    /// A view without member collections.
    #[error("view '{0}' has no collections")]
    EmptyView(String),

    /// A virtual path that reaches no calendar collection or folder.
    #[error("bad vpath '{0}': no calendar collection")]
    BadVpath(String),

    /// A virtual path was revisited while resolving.
    #[error("alias cycle detected at '{0}'")]
    AliasCycle(String),

    /// Nested alias filters went deeper than the configured limit.
    #[error("alias filters nested more than {0} levels deep")]
    AliasDepthExceeded(usize),

    /// A filter attached to a collection failed to compile.
    #[error("in filter attached to '{source_label}': {inner}")]
    Nested {
        /// Path of the collection owning the filter.
        source_label: String,
        /// The inner failure.
        #[source]
        inner: Box<ParseError>,
    },

    /// A collaborator lookup failed.
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

fn unknown_property_message(name: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("unknown property '{name}'. Did you mean '{s}'?"),
        None => format!("unknown property '{name}'"),
    }
}

impl ParseError {
    /// Creates an unexpected token error.
    pub fn unexpected(found: impl Into<String>, expected: &'static str, position: usize) -> Self {
        ParseError::UnexpectedToken {
            found: found.into(),
            expected,
            position,
        }
    }

    /// Creates an unsupported operator error.
    pub fn unsupported(operator: &'static str, property: impl ToString) -> Self {
        ParseError::UnsupportedOperator {
            operator,
            property: property.to_string(),
        }
    }
}

/// Outcome of a compile call.
///
/// The compiler never fails across its public boundary; callers must check
/// [`ok`](Self::ok). On success exactly one of `filter` or `sort_terms` is set,
/// depending on the entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_terms: Option<Vec<SortTerm>>,
    #[serde(skip)]
    pub cause: Option<ParseError>,
}

impl ParseResult {
    /// A successful filter compile.
    pub fn filter(filter: FilterNode) -> Self {
        Self {
            ok: true,
            message: None,
            filter: Some(filter),
            sort_terms: None,
            cause: None,
        }
    }

    /// A successful sort compile.
    pub fn sort(terms: Vec<SortTerm>) -> Self {
        Self {
            ok: true,
            message: None,
            filter: None,
            sort_terms: Some(terms),
            cause: None,
        }
    }

    /// A failed compile. The message is prefixed with the source label.
    pub fn failed(source: &str, cause: ParseError) -> Self {
        let message = if source.is_empty() {
            cause.to_string()
        } else {
            format!("{source}: {cause}")
        };
        Self {
            ok: false,
            message: Some(message),
            filter: None,
            sort_terms: None,
            cause: Some(cause),
        }
    }

    /// Converts into a `Result`, yielding the filter on success.
    pub fn into_filter(self) -> FilterResult<FilterNode> {
        match (self.filter, self.cause) {
            (Some(filter), _) => Ok(filter),
            (None, Some(cause)) => Err(cause),
            (None, None) => Err(ParseError::InvalidExpression),
        }
    }

    /// Converts into a `Result`, yielding the sort terms on success.
    pub fn into_sort_terms(self) -> FilterResult<Vec<SortTerm>> {
        match (self.sort_terms, self.cause) {
            (Some(terms), _) => Ok(terms),
            (None, Some(cause)) => Err(cause),
            (None, None) => Err(ParseError::InvalidExpression),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_prefixes_source() {
        let result = ParseResult::failed("/user/cal", ParseError::MixedLogicalOperators);
        assert!(!result.ok);
        assert!(result.filter.is_none());
        assert!(result
            .message
            .as_deref()
            .unwrap()
            .starts_with("/user/cal: mixed logical operators"));
        assert_eq!(result.cause, Some(ParseError::MixedLogicalOperators));
    }

    #[test]
    fn test_unknown_property_message_with_suggestion() {
        let err = ParseError::UnknownProperty {
            name: "sumary".to_string(),
            suggestion: Some("summary".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown property 'sumary'. Did you mean 'summary'?"
        );
    }

    #[test]
    fn test_into_filter_propagates_cause() {
        let result = ParseResult::failed("", ParseError::UnbalancedParentheses);
        assert_eq!(
            result.into_filter(),
            Err(ParseError::UnbalancedParentheses)
        );
    }
}
