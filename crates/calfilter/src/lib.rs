//! Filter query compiler for calendar collections.
//!
//! This crate turns textual filter expressions such as
//! `entity_type="event" & (categories="music" | vpath="/user/alice/sport")`
//! into a [`FilterNode`] tree for a search backend, resolving virtual paths,
//! views, and categories against a read-only [`Hierarchy`].
//!
//! - [`filter`] - lexer, parser, virtual path resolver, sort parser
//! - [`hierarchy`] - the lookups the compiler needs, plus an in-memory implementation
//! - [`config`] - compiler limits and defaults

pub mod config;
pub mod filter;
pub mod hierarchy;

pub use config::{CompilerConfig, ConfigError};
pub use filter::{FilterCompiler, FilterNode, ParseError, ParseResult, SortTerm};
pub use hierarchy::{Hierarchy, MemoryHierarchy};
