//! In-memory hierarchy loaded from a TOML document.
//!
//! ```toml
//! [[collections]]
//! path = "/public/lectures"
//! kind = "calendar"
//!
//! [[collections]]
//! path = "/user/alice/music"
//! kind = "alias"
//! target = "/public/events"
//! filter = 'categories="music"'
//!
//! [[categories]]
//! uid = "cat-music"
//! name = "music"
//!
//! [[views]]
//! name = "everything"
//! collections = ["/public/lectures", "/user/alice/music"]
//! ```
//!
//! The root `/` is an implicit folder, and a collection's children are the
//! collections whose parent path is its path.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{
    parent_path, Category, CategoryLookup, CollectionKind, CollectionNode, Hierarchy, LookupError,
    View,
};

/// Errors that can occur while loading a [`MemoryHierarchy`].
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// I/O error during file read.
    #[error("failed to read hierarchy file '{path}': {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The document is not valid TOML for a hierarchy.
    #[error("failed to parse hierarchy: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but describes an inconsistent hierarchy.
    #[error("invalid hierarchy: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
struct HierarchyDocument {
    #[serde(default)]
    collections: Vec<CollectionNode>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    views: Vec<ViewEntry>,
}

#[derive(Debug, Deserialize)]
struct ViewEntry {
    name: String,
    #[serde(default)]
    collections: Vec<String>,
}

/// A [`Hierarchy`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryHierarchy {
    collections: BTreeMap<String, CollectionNode>,
    categories: Vec<Category>,
    views: Vec<Arc<View>>,
}

impl MemoryHierarchy {
    /// Creates an empty hierarchy containing only the root folder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a hierarchy from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, HierarchyError> {
        let doc: HierarchyDocument = toml::from_str(text)?;
        let mut hierarchy = Self::new();

        for node in doc.collections {
            hierarchy.add_collection(node)?;
        }
        hierarchy.categories = doc.categories;
        hierarchy.views = doc
            .views
            .into_iter()
            .map(|v| Arc::new(View::new(v.name, v.collections)))
            .collect();

        debug!(
            collections = hierarchy.collections.len(),
            categories = hierarchy.categories.len(),
            views = hierarchy.views.len(),
            "loaded hierarchy"
        );
        Ok(hierarchy)
    }

    /// Reads and parses a hierarchy file.
    pub fn load(path: &Path) -> Result<Self, HierarchyError> {
        let text = fs::read_to_string(path).map_err(|source| HierarchyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Adds a collection, builder style, for fixtures known to be valid.
    #[cfg(test)]
    pub(crate) fn with_collection(mut self, node: CollectionNode) -> Self {
        self.add_collection(node).expect("fixture collection should be valid");
        self
    }

    /// Adds a category, builder style.
    pub fn with_category(
        mut self,
        uid: impl Into<String>,
        name: impl Into<String>,
        href: Option<&str>,
    ) -> Self {
        self.categories.push(Category {
            uid: uid.into(),
            name: name.into(),
            href: href.map(str::to_string),
        });
        self
    }

    /// Adds a view, builder style.
    pub fn with_view(mut self, name: impl Into<String>, collections: &[&str]) -> Self {
        let collections = collections.iter().map(|c| c.to_string()).collect();
        self.views.push(Arc::new(View::new(name, collections)));
        self
    }

    /// Adds a collection.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Invalid`] if the path is not absolute, the
    /// path is already taken, or an alias has no target.
    pub fn add_collection(&mut self, mut node: CollectionNode) -> Result<(), HierarchyError> {
        if !node.path.starts_with('/') {
            return Err(HierarchyError::Invalid(format!(
                "collection path '{}' is not absolute",
                node.path
            )));
        }
        if node.path.len() > 1 {
            node.path = node.path.trim_end_matches('/').to_string();
        }
        if node.kind == CollectionKind::Alias && node.alias_target.is_none() {
            return Err(HierarchyError::Invalid(format!(
                "alias '{}' has no target",
                node.path
            )));
        }
        if self.collections.contains_key(&node.path) {
            return Err(HierarchyError::Invalid(format!(
                "duplicate collection '{}'",
                node.path
            )));
        }
        self.collections.insert(node.path.clone(), node);
        Ok(())
    }
}

impl Hierarchy for MemoryHierarchy {
    fn collection(&self, path: &str) -> Result<Option<CollectionNode>, LookupError> {
        let key = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match self.collections.get(key) {
            Some(node) => Ok(Some(node.clone())),
            None if key == "/" => Ok(Some(CollectionNode::folder("/"))),
            None => Ok(None),
        }
    }

    fn children(&self, path: &str) -> Result<Vec<CollectionNode>, LookupError> {
        let key = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        Ok(self
            .collections
            .values()
            .filter(|node| parent_path(&node.path) == Some(key))
            .cloned()
            .collect())
    }

    fn category_by_name(&self, name: &str) -> Result<Option<Category>, LookupError> {
        Ok(self
            .categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn category_by_uid(&self, uid: &str) -> Result<CategoryLookup, LookupError> {
        Ok(match self.categories.iter().find(|c| c.uid == uid) {
            Some(category) => CategoryLookup::Found(category.clone()),
            None => CategoryLookup::NotFound,
        })
    }

    fn view(&self, name: &str) -> Result<Option<Arc<View>>, LookupError> {
        Ok(self.views.iter().find(|v| v.name == name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
[[collections]]
path = "/public"
kind = "folder"

[[collections]]
path = "/public/lectures"
kind = "calendar"

[[collections]]
path = "/public/hidden"
kind = "calendar"
display = false

[[collections]]
path = "/user/alice/music/"
kind = "alias"
target = "/public/lectures"
filter = 'categories="music"'

[[categories]]
uid = "cat-music"
name = "Music"

[[views]]
name = "all"
collections = ["/public"]
"#;

    #[test]
    fn test_from_toml_str() {
        let h = MemoryHierarchy::from_toml_str(DOC).unwrap();

        let alias = h.collection("/user/alice/music").unwrap().unwrap();
        assert_eq!(alias.kind, CollectionKind::Alias);
        assert_eq!(alias.alias_target.as_deref(), Some("/public/lectures"));
        assert_eq!(alias.filter.as_deref(), Some(r#"categories="music""#));

        let hidden = h.collection("/public/hidden").unwrap().unwrap();
        assert!(!hidden.display);
    }

    #[test]
    fn test_root_is_implicit_folder() {
        let h = MemoryHierarchy::new();
        let root = h.collection("/").unwrap().unwrap();
        assert_eq!(root.kind, CollectionKind::Folder);
    }

    #[test]
    fn test_children() {
        let h = MemoryHierarchy::from_toml_str(DOC).unwrap();
        let children: Vec<String> = h
            .children("/public")
            .unwrap()
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(children, vec!["/public/hidden", "/public/lectures"]);
    }

    #[test]
    fn test_category_lookups() {
        let h = MemoryHierarchy::from_toml_str(DOC).unwrap();
        assert_eq!(
            h.category_by_name("music").unwrap().map(|c| c.uid),
            Some("cat-music".to_string())
        );
        assert!(matches!(
            h.category_by_uid("cat-music").unwrap(),
            CategoryLookup::Found(_)
        ));
        assert_eq!(h.category_by_uid("nope").unwrap(), CategoryLookup::NotFound);
    }

    #[test]
    fn test_view_lookup() {
        let h = MemoryHierarchy::from_toml_str(DOC).unwrap();
        let view = h.view("all").unwrap().unwrap();
        assert_eq!(view.collections, vec!["/public"]);
        assert!(h.view("none").unwrap().is_none());
    }

    #[test]
    fn test_alias_without_target_is_rejected() {
        let doc = r#"
[[collections]]
path = "/a"
kind = "alias"
"#;
        let err = MemoryHierarchy::from_toml_str(doc).unwrap_err();
        assert!(matches!(err, HierarchyError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_path_is_rejected() {
        let doc = r#"
[[collections]]
path = "/a"
kind = "folder"

[[collections]]
path = "/a/"
kind = "calendar"
"#;
        assert!(MemoryHierarchy::from_toml_str(doc).is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hierarchy.toml");
        fs::write(&path, DOC).unwrap();

        let h = MemoryHierarchy::load(&path).unwrap();
        assert!(h.collection("/public/lectures").unwrap().is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = MemoryHierarchy::load(Path::new("/nonexistent/hierarchy.toml")).unwrap_err();
        assert!(matches!(err, HierarchyError::Read { .. }));
    }

    #[test]
    fn test_decompose_stops_at_missing_segment() {
        let h = MemoryHierarchy::from_toml_str(DOC).unwrap();
        let chain = h.decompose_vpath("/user/alice/music").unwrap();
        let paths: Vec<&str> = chain.iter().map(|e| e.node.path.as_str()).collect();

        // /user and /user/alice are not defined, so the walk stops at root.
        assert_eq!(paths, vec!["/"]);
        assert!(chain.iter().all(|e| !e.terminal));
    }

    #[test]
    fn test_decompose_alias_chain() {
        let h = MemoryHierarchy::new()
            .with_collection(CollectionNode::folder("/user"))
            .with_collection(CollectionNode::alias("/user/cal", "/public/cal"))
            .with_collection(CollectionNode::folder("/public"))
            .with_collection(CollectionNode::calendar("/public/cal"));

        let chain = h.decompose_vpath("/user/cal").unwrap();
        let paths: Vec<&str> = chain.iter().map(|e| e.node.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/user", "/user/cal", "/public/cal"]);

        let last = chain.last().unwrap();
        assert!(last.terminal);
        assert_eq!(last.node.alias_origin.as_deref(), Some("/user/cal"));
    }

    #[test]
    fn test_decompose_detects_alias_cycle() {
        let h = MemoryHierarchy::new()
            .with_collection(CollectionNode::alias("/a", "/b"))
            .with_collection(CollectionNode::alias("/b", "/a"));

        let err = h.decompose_vpath("/a").unwrap_err();
        assert_eq!(err, LookupError::AliasCycle("/a".to_string()));
    }

    #[test]
    fn test_add_collection_rejects_invalid_nodes() {
        let mut h = MemoryHierarchy::new();
        h.add_collection(CollectionNode::calendar("/public/cal/")).unwrap();
        assert!(h.collection("/public/cal").unwrap().is_some());

        for node in [
            CollectionNode::calendar("relative/cal"),
            CollectionNode::calendar("/public/cal"),
            CollectionNode::new("/dangling", CollectionKind::Alias),
        ] {
            assert!(matches!(h.add_collection(node), Err(HierarchyError::Invalid(_))));
        }
    }

    #[test]
    fn test_decompose_rejects_relative_path() {
        let h = MemoryHierarchy::new();
        assert!(matches!(
            h.decompose_vpath("public/cal"),
            Err(LookupError::InvalidPath(_))
        ));
    }
}
