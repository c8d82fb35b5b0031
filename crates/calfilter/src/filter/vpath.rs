//! Virtual path resolution.
//!
//! A virtual path names a collection as the user sees it, possibly through
//! aliases. Resolving it yields the filter selecting that collection's
//! entities, narrowed by every filter attached to a collection along the way.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use super::ast::FilterNode;
use super::error::{FilterResult, ParseError};
use super::parser::FilterCompiler;
use crate::hierarchy::{CollectionKind, CollectionNode, LookupError};

/// State carried while expanding a target into concrete collections.
struct Expansion {
    explicit_selection: bool,
    apply_filters: bool,
    /// Collections currently being expanded, outermost first.
    trail: Vec<String>,
}

impl FilterCompiler<'_> {
    /// Resolves a virtual path to
    /// `And { name, children: [f1, .., fk, target] }`, where `f1..fk` are the
    /// filters attached to collections on the path.
    pub(super) fn resolve_vpath(
        &self,
        vpath: &str,
        explicit_selection: bool,
    ) -> FilterResult<FilterNode> {
        self.resolve(vpath, explicit_selection, true)
    }

    /// Resolves a collection path ignoring attached filters.
    pub(super) fn resolve_collection_path(
        &self,
        path: &str,
        explicit_selection: bool,
    ) -> FilterResult<FilterNode> {
        self.resolve(path, explicit_selection, false)
    }

    fn resolve(
        &self,
        vpath: &str,
        explicit_selection: bool,
        apply_filters: bool,
    ) -> FilterResult<FilterNode> {
        if self.resolving.iter().any(|p| p == vpath) {
            return Err(ParseError::AliasCycle(vpath.to_string()));
        }

        let chain = self.hierarchy.decompose_vpath(vpath).map_err(cycle_or_lookup)?;
        debug!(vpath, elements = chain.len(), "decomposed vpath");

        let mut filters = Vec::new();
        let mut seen = HashSet::new();
        let mut target = None;

        for element in chain {
            trace!(path = %element.node.path, terminal = element.terminal, "vpath element");
            if !seen.insert(element.node.path.clone()) {
                return Err(ParseError::AliasCycle(element.node.path));
            }

            if apply_filters {
                if let Some(ref expr) = element.node.filter {
                    filters.push(self.compile_attached(
                        vpath,
                        &element.node.path,
                        expr,
                        explicit_selection,
                    )?);
                }
            }

            if element.terminal && !element.node.is_alias() {
                target = Some(element.node);
                break;
            }
        }

        let target = target.ok_or_else(|| ParseError::BadVpath(vpath.to_string()))?;

        let mut expansion = Expansion {
            explicit_selection,
            apply_filters,
            trail: Vec::new(),
        };
        let name = target
            .alias_origin
            .clone()
            .unwrap_or_else(|| target.path.clone());
        let target_filter = self
            .resolve_member(target, &mut expansion)?
            .ok_or_else(|| ParseError::BadVpath(vpath.to_string()))?;

        if !apply_filters {
            return Ok(target_filter);
        }

        filters.push(target_filter);
        Ok(FilterNode::And {
            name: Some(name),
            children: filters,
        })
    }

    /// Expands one collection, guarding against revisiting any collection
    /// already being expanded above it.
    fn resolve_member(
        &self,
        node: CollectionNode,
        expansion: &mut Expansion,
    ) -> FilterResult<Option<FilterNode>> {
        if expansion.trail.contains(&node.path) {
            return Err(ParseError::AliasCycle(node.path));
        }

        expansion.trail.push(node.path.clone());
        let result = self.resolve_target(node, expansion);
        expansion.trail.pop();
        result
    }

    /// Calendar: the collection itself. Folder: any displayable child, or the
    /// folder itself when it has none. Alias: its target, narrowed by the
    /// alias's own filter. A dangling alias yields nothing.
    fn resolve_target(
        &self,
        node: CollectionNode,
        expansion: &mut Expansion,
    ) -> FilterResult<Option<FilterNode>> {
        match node.kind {
            CollectionKind::Calendar => Ok(Some(FilterNode::in_collection(node.path))),

            CollectionKind::Folder => {
                let mut filters = Vec::new();
                for child in self.hierarchy.children(&node.path)? {
                    if !child.display && !expansion.explicit_selection {
                        trace!(path = %child.path, "skipping hidden collection");
                        continue;
                    }
                    if let Some(filter) = self.resolve_member(child, expansion)? {
                        filters.push(filter);
                    }
                }
                Ok(Some(
                    FilterNode::any(filters)
                        .unwrap_or_else(|| FilterNode::in_collection(node.path)),
                ))
            }

            CollectionKind::Alias => {
                let attached = match node.filter {
                    Some(ref expr) if expansion.apply_filters => Some(self.compile_attached(
                        &node.path,
                        &node.path,
                        expr,
                        expansion.explicit_selection,
                    )?),
                    _ => None,
                };

                let Some(ref target_path) = node.alias_target else {
                    warn!(alias = %node.path, "alias has no target");
                    return Ok(None);
                };
                let Some(target) = self.hierarchy.collection(target_path)? else {
                    warn!(alias = %node.path, target = %target_path, "alias target not found");
                    return Ok(None);
                };

                let Some(inner) = self.resolve_member(target, expansion)? else {
                    return Ok(None);
                };
                Ok(Some(match attached {
                    Some(filter) => FilterNode::And {
                        name: Some(node.path),
                        children: vec![filter, inner],
                    },
                    None => inner,
                }))
            }
        }
    }

    /// Compiles the filter attached to the collection at `owner` with a fresh
    /// compiler one level deeper.
    fn compile_attached(
        &self,
        vpath: &str,
        owner: &str,
        expr: &str,
        explicit_selection: bool,
    ) -> FilterResult<FilterNode> {
        debug!(vpath, owner, depth = self.depth + 1, "compiling attached filter");
        self.nested(vpath)?
            .compile(expr, explicit_selection)
            .map_err(|inner| ParseError::Nested {
                source_label: owner.to_string(),
                inner: Box::new(inner),
            })
    }
}

fn cycle_or_lookup(err: LookupError) -> ParseError {
    match err {
        LookupError::AliasCycle(path) => ParseError::AliasCycle(path),
        other => ParseError::Lookup(other),
    }
}
