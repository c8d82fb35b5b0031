//! Filter expression compiler for calendar queries.
//!
//! Compiles a compact boolean expression language into a [`FilterNode`] tree
//! for a search backend, and sort expressions into [`SortTerm`]s.
//!
//! # Supported Syntax
//!
//! ## Comparisons
//! - `summary = "standup"` - Exact, case-sensitive match
//! - `summary != "standup"` - Negated exact match
//! - `location ~ "room"` - Case-insensitive substring match (`!~` negates)
//! - `summary startswith "Weekly"` - Prefix match
//! - `priority > 3`, `<`, `>=`, `<=` - Ordering comparisons
//! - `x-prop["X-COLOR"] indexed "red"` - Indexed lookup
//!
//! ## Presence and time ranges
//! - `description isdefined`, `due notdefined`
//! - `dtstart in "20240101T000000Z" to "20240201T000000Z"` - Either bound may
//!   be left out for an open range
//!
//! ## Selection
//! - `entity_type = "event"` - Kind of entity
//! - `categories = "music"` - Category by name (or by href if it starts with `/`)
//! - `catuid = ("u1", "u2")` - Categories by uid; every uid must exist
//! - `colpath = "/public/cal"` - Entities in a collection
//! - `vpath = "/user/alice/sport"` - Entities reachable through a virtual path,
//!   narrowed by filters attached along the way
//! - `view = "work"` - Entities in a named view
//!
//! ## Boolean Operators
//! - `&` or `and` - AND
//! - `|` or `or` - OR
//! - `()` - Grouping
//!
//! `&` and `|` have equal precedence and cannot be mixed at one level
//! without parentheses.
//!
//! # Example
//!
//! ```
//! use calfilter::filter::FilterCompiler;
//! use calfilter::hierarchy::MemoryHierarchy;
//!
//! let hierarchy = MemoryHierarchy::new();
//! let compiler = FilterCompiler::new(&hierarchy);
//!
//! let filter = compiler
//!     .parse(r#"summary ~ "standup" & (priority = 1 | priority = 2)"#, false, "")
//!     .into_filter()
//!     .unwrap();
//! assert_eq!(
//!     filter.to_string(),
//!     r#"summary ~ "standup" & (priority = 1 | priority = 2)"#
//! );
//!
//! let terms = compiler.parse_sort("dtstart:asc").into_sort_terms().unwrap();
//! assert!(terms[0].ascending);
//! ```

mod ast;
mod error;
mod lexer;
mod parser;
mod property;
mod sort;
mod vpath;

pub use ast::{
    fold, ComparisonOperator, EntityKind, FilterNode, LogicalOperator, PropertyPath,
    PropertySegment, SortTerm, Value, UTC_FORMAT,
};
pub use error::{FilterResult, ParseError, ParseResult};
pub use lexer::{Lexer, PositionedToken, Token};
pub use parser::FilterCompiler;
pub use property::PropertyId;
