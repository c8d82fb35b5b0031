//! Read-only view of the collection hierarchy consulted while compiling.
//!
//! The compiler never owns collections, categories, or views. It asks a
//! [`Hierarchy`] for them during a single compile and drops what it got when
//! the call returns. [`MemoryHierarchy`] is an in-memory implementation that
//! loads from TOML, used by the CLI and the tests.

mod memory;

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::FilterNode;

pub use memory::{HierarchyError, MemoryHierarchy};

/// Errors reported by a [`Hierarchy`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The backing store failed.
    #[error("hierarchy backend error: {0}")]
    Backend(String),

    /// An alias chain loops back on itself.
    #[error("alias cycle through '{0}'")]
    AliasCycle(String),

    /// A path that cannot name a collection.
    #[error("invalid collection path '{0}'")]
    InvalidPath(String),
}

/// What a collection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Holds other collections.
    Folder,
    /// Holds calendar entities.
    Calendar,
    /// Points at another collection.
    Alias,
}

/// A collection as seen by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionNode {
    /// Absolute path, e.g. `/public/calendars/sport`.
    pub path: String,

    pub kind: CollectionKind,

    /// Filter expression imposed on everything reached through this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// For aliases, the path of the collection aliased.
    #[serde(default, rename = "target", skip_serializing_if = "Option::is_none")]
    pub alias_target: Option<String>,

    /// Set on a collection reached through an alias: the user-visible alias path.
    #[serde(skip)]
    pub alias_origin: Option<String>,

    /// Hidden collections are skipped when expanding folders, unless the
    /// selection is explicit.
    #[serde(default = "default_display")]
    pub display: bool,
}

fn default_display() -> bool {
    true
}

impl CollectionNode {
    /// Creates a visible collection of the given kind.
    pub fn new(path: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            path: path.into(),
            kind,
            filter: None,
            alias_target: None,
            alias_origin: None,
            display: true,
        }
    }

    /// Creates a calendar collection.
    pub fn calendar(path: impl Into<String>) -> Self {
        Self::new(path, CollectionKind::Calendar)
    }

    /// Creates a folder.
    pub fn folder(path: impl Into<String>) -> Self {
        Self::new(path, CollectionKind::Folder)
    }

    /// Creates an alias pointing at `target`.
    pub fn alias(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            alias_target: Some(target.into()),
            ..Self::new(path, CollectionKind::Alias)
        }
    }

    /// Attaches a filter expression.
    pub fn with_filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }

    /// Hides the collection from non-explicit folder expansion.
    pub fn hidden(mut self) -> Self {
        self.display = false;
        self
    }

    pub fn is_alias(&self) -> bool {
        self.kind == CollectionKind::Alias
    }
}

/// One step of a decomposed virtual path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpathElement {
    pub node: CollectionNode,
    /// The physical collection named by the final path segment.
    pub terminal: bool,
}

/// A category definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Result of looking a category up by uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryLookup {
    Found(Category),
    NotFound,
}

/// A named set of collections.
///
/// The filter derived from a view is stored back on it the first time it is
/// computed, so repeated references resolve to the same tree.
#[derive(Debug, Default)]
pub struct View {
    pub name: String,
    /// Collection paths (real or virtual) that make up the view.
    pub collections: Vec<String>,
    filter: OnceLock<FilterNode>,
}

impl View {
    pub fn new(name: impl Into<String>, collections: Vec<String>) -> Self {
        Self {
            name: name.into(),
            collections,
            filter: OnceLock::new(),
        }
    }

    /// The memoized filter, if one has been computed.
    pub fn cached_filter(&self) -> Option<&FilterNode> {
        self.filter.get()
    }

    /// Memoizes `filter` and returns the stored value.
    ///
    /// If another filter was stored first, that one wins.
    pub fn cache_filter(&self, filter: FilterNode) -> &FilterNode {
        self.filter.get_or_init(|| filter)
    }
}

/// Lookups the compiler needs from the enclosing server.
///
/// All methods are read-only. Implementations needing snapshot consistency
/// across a compile must provide it themselves.
pub trait Hierarchy {
    /// Returns the collection at `path`, if any.
    fn collection(&self, path: &str) -> Result<Option<CollectionNode>, LookupError>;

    /// Returns the direct children of the collection at `path`.
    fn children(&self, path: &str) -> Result<Vec<CollectionNode>, LookupError>;

    /// Looks up a category by display name.
    fn category_by_name(&self, name: &str) -> Result<Option<Category>, LookupError>;

    /// Looks up a category by uid.
    fn category_by_uid(&self, uid: &str) -> Result<CategoryLookup, LookupError>;

    /// Looks up a view by name or path.
    fn view(&self, name: &str) -> Result<Option<Arc<View>>, LookupError>;

    /// Splits a virtual path into the chain of collections it passes through.
    ///
    /// Each segment is looked up under the physical parent reached so far.
    /// Aliases are followed to their targets, and every alias traversed is
    /// part of the chain, so filters attached to any hop are visible to the
    /// caller. The collection named by the last segment is flagged
    /// `terminal`. A segment that does not resolve, or an alias with a
    /// missing target, ends the chain early without a terminal element.
    fn decompose_vpath(&self, vpath: &str) -> Result<Vec<VpathElement>, LookupError> {
        if !vpath.starts_with('/') {
            return Err(LookupError::InvalidPath(vpath.to_string()));
        }

        let segments: Vec<&str> = vpath.split('/').filter(|s| !s.is_empty()).collect();
        let mut chain = Vec::new();

        if let Some(root) = self.collection("/")? {
            chain.push(VpathElement {
                node: root,
                terminal: segments.is_empty(),
            });
        }

        let mut parent = String::from("/");
        for (i, segment) in segments.iter().enumerate() {
            let apparent = join_path(&parent, segment);
            let Some(mut node) = self.collection(&apparent)? else {
                return Ok(chain);
            };

            let mut visited = HashSet::new();
            let mut origin: Option<String> = None;
            while node.is_alias() {
                if !visited.insert(node.path.clone()) {
                    return Err(LookupError::AliasCycle(node.path));
                }
                let alias_path = node.path.clone();
                let target = node.alias_target.clone();
                chain.push(VpathElement {
                    node,
                    terminal: false,
                });

                let Some(target) = target else {
                    return Ok(chain);
                };
                let Some(next) = self.collection(&target)? else {
                    return Ok(chain);
                };
                origin.get_or_insert(alias_path);
                node = next;
            }

            if origin.is_some() {
                node.alias_origin = origin;
            }
            parent = node.path.clone();
            chain.push(VpathElement {
                node,
                terminal: i + 1 == segments.len(),
            });
        }

        Ok(chain)
    }
}

/// Joins a parent path and a child name with a single `/`.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the parent of an absolute path, or `None` for the root.
pub(crate) fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&trimmed[..i]),
        None => None,
    }
}
