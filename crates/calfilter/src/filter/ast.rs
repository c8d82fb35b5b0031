//! Abstract Syntax Tree (AST) for compiled filter expressions.
//!
//! Every node implements [`Display`](std::fmt::Display) as the canonical
//! expression text, which parses back to an equal tree.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::property::PropertyId;

// ==================== Property paths ====================

/// One `.`-separated element of a property path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySegment {
    /// The property this segment names.
    pub property: PropertyId,
    /// Numeric index, as in `attendee[2]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_index: Option<i64>,
    /// Keyed index, as in `x-prop["X-COLOR"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub str_index: Option<String>,
}

impl PropertySegment {
    /// Creates an unindexed segment.
    pub fn new(property: PropertyId) -> Self {
        Self {
            property,
            int_index: None,
            str_index: None,
        }
    }
}

/// A non-empty, ordered sequence of property segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyPath(Vec<PropertySegment>);

impl PropertyPath {
    /// Builds a path from segments. Returns `None` for an empty list.
    pub fn new(segments: Vec<PropertySegment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    /// Builds an unindexed path from property identifiers.
    ///
    /// # Panics
    ///
    /// Panics if `ids` is empty.
    pub fn of(ids: &[PropertyId]) -> Self {
        assert!(!ids.is_empty(), "property path must not be empty");
        Self(ids.iter().copied().map(PropertySegment::new).collect())
    }

    /// The first segment's property, which decides how a comparison compiles.
    pub fn first(&self) -> PropertyId {
        self.0[0].property
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The segments in order.
    pub fn segments(&self) -> &[PropertySegment] {
        &self.0
    }

    /// True if the path is exactly the given properties, ignoring indexes.
    pub fn is(&self, ids: &[PropertyId]) -> bool {
        self.0.len() == ids.len() && self.0.iter().zip(ids).all(|(s, id)| s.property == *id)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            f.write_str(segment.property.name())?;
            if let Some(index) = segment.int_index {
                write!(f, "[{index}]")?;
            } else if let Some(ref key) = segment.str_index {
                write!(f, "[{}]", Quoted(key))?;
            }
        }
        Ok(())
    }
}

// ==================== Operators ====================

/// Operator applied between a property path and its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    IsDefined,
    NotDefined,
    Equal,
    NotEqual,
    Like,
    NotLike,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    InTimeRange,
    StartsWith,
    Indexed,
}

impl ComparisonOperator {
    /// True for operators that invert the match.
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            ComparisonOperator::NotEqual | ComparisonOperator::NotLike
        )
    }

    /// Expression syntax for the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::IsDefined => "isdefined",
            ComparisonOperator::NotDefined => "notdefined",
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::Like => "~",
            ComparisonOperator::NotLike => "!~",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::InTimeRange => "in",
            ComparisonOperator::StartsWith => "startswith",
            ComparisonOperator::Indexed => "indexed",
        }
    }
}

/// Operator joining two filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Expression syntax for the operator.
    pub fn symbol(self) -> char {
        match self {
            LogicalOperator::And => '&',
            LogicalOperator::Or => '|',
        }
    }
}

// ==================== Operands ====================

/// Literal operand of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(i64),
}

impl Value {
    /// Returns the text of a string operand.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", Quoted(s)),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The kinds of calendar entity a filter can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Todo,
    Journal,
    Freebusy,
    Vavailability,
    Available,
    Vpoll,
    Note,
}

impl EntityKind {
    /// Parses an entity name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "event" => EntityKind::Event,
            "todo" | "task" => EntityKind::Todo,
            "journal" => EntityKind::Journal,
            "freebusy" => EntityKind::Freebusy,
            "vavailability" => EntityKind::Vavailability,
            "available" => EntityKind::Available,
            "vpoll" => EntityKind::Vpoll,
            "note" => EntityKind::Note,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::Todo => "todo",
            EntityKind::Journal => "journal",
            EntityKind::Freebusy => "freebusy",
            EntityKind::Vavailability => "vavailability",
            EntityKind::Available => "available",
            EntityKind::Vpoll => "vpoll",
            EntityKind::Note => "note",
        }
    }
}

/// Format used to render time-range bounds.
pub const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

// ==================== Filter tree ====================

/// A compiled filter expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterNode {
    /// All children must match. `name` labels groups produced by virtual
    /// path resolution; named groups are never merged into a parent `And`.
    And {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        children: Vec<FilterNode>,
    },

    /// Any child must match.
    Or { children: Vec<FilterNode> },

    /// Compares a property against a literal.
    Compare {
        path: PropertyPath,
        operator: ComparisonOperator,
        value: Value,
        /// Exact (equality) match rather than substring.
        exact: bool,
        negate: bool,
        caseless: bool,
        prefix_match: bool,
    },

    /// Tests whether a property is present.
    Presence { path: PropertyPath, is_present: bool },

    /// Restricts the kind of entity.
    EntityType { name: EntityKind },

    /// Property value falls within `[start, end)`. A missing bound is open.
    TimeRange {
        path: PropertyPath,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },

    /// A named view with its resolved filter.
    View { name: String, filter: Box<FilterNode> },
}

impl FilterNode {
    /// Creates an unnamed AND group.
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::And {
            name: None,
            children,
        }
    }

    /// Creates an OR group.
    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Or { children }
    }

    /// Combines filters with AND. A single filter is returned as is.
    ///
    /// Returns `None` for an empty list.
    pub fn all(mut filters: Vec<FilterNode>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(filters.into_iter().fold(FilterNode::and(Vec::new()), |acc, f| {
                fold(acc, f, LogicalOperator::And)
            })),
        }
    }

    /// Combines filters with OR. A single filter is returned as is.
    ///
    /// Returns `None` for an empty list.
    pub fn any(mut filters: Vec<FilterNode>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(
                filters
                    .into_iter()
                    .fold(FilterNode::or(Vec::new()), |acc, f| {
                        fold(acc, f, LogicalOperator::Or)
                    }),
            ),
        }
    }

    /// Creates an exact, case-sensitive equality comparison.
    pub fn equals(path: PropertyPath, value: impl Into<String>) -> Self {
        FilterNode::Compare {
            path,
            operator: ComparisonOperator::Equal,
            value: Value::Text(value.into()),
            exact: true,
            negate: false,
            caseless: false,
            prefix_match: false,
        }
    }

    /// Creates an equality comparison against the entity's collection.
    pub fn in_collection(path: impl Into<String>) -> Self {
        Self::equals(PropertyPath::of(&[PropertyId::Collection]), path)
    }

    fn is_group(&self) -> bool {
        matches!(self, FilterNode::And { .. } | FilterNode::Or { .. })
    }
}

/// Folds two filters into one group using `op`.
///
/// Unnamed groups of the same operator are flattened, so `a & b` folded with
/// `c` gives a three-child `And` rather than a nested one.
pub fn fold(left: FilterNode, right: FilterNode, op: LogicalOperator) -> FilterNode {
    let mut children = Vec::new();
    extend_flat(&mut children, left, op);
    extend_flat(&mut children, right, op);

    match op {
        LogicalOperator::And => FilterNode::and(children),
        LogicalOperator::Or => FilterNode::or(children),
    }
}

fn extend_flat(children: &mut Vec<FilterNode>, node: FilterNode, op: LogicalOperator) {
    match (node, op) {
        (
            FilterNode::And {
                name: None,
                children: inner,
            },
            LogicalOperator::And,
        )
        | (FilterNode::Or { children: inner }, LogicalOperator::Or) => children.extend(inner),
        (node, _) => children.push(node),
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::And { children, .. } => write_group(f, children, LogicalOperator::And),
            FilterNode::Or { children } => write_group(f, children, LogicalOperator::Or),
            FilterNode::Compare {
                path,
                operator,
                value,
                ..
            } => write!(f, "{path} {} {value}", operator.symbol()),
            FilterNode::Presence { path, is_present } => {
                let word = if *is_present {
                    ComparisonOperator::IsDefined
                } else {
                    ComparisonOperator::NotDefined
                };
                write!(f, "{path} {}", word.symbol())
            }
            FilterNode::EntityType { name } => {
                write!(f, "{}={}", PropertyId::EntityType, Quoted(name.name()))
            }
            FilterNode::TimeRange { path, start, end } => {
                write!(f, "{path} in")?;
                if let Some(start) = start {
                    write!(f, " \"{}\"", start.format(UTC_FORMAT))?;
                }
                f.write_str(" to")?;
                if let Some(end) = end {
                    write!(f, " \"{}\"", end.format(UTC_FORMAT))?;
                }
                Ok(())
            }
            FilterNode::View { name, .. } => write!(f, "{}={}", PropertyId::View, Quoted(name)),
        }
    }
}

fn write_group(
    f: &mut fmt::Formatter<'_>,
    children: &[FilterNode],
    op: LogicalOperator,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op.symbol())?;
        }
        if child.is_group() {
            write!(f, "({child})")?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}

/// Renders a string as a double-quoted literal.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            if c == '"' || c == '\\' {
                f.write_char('\\')?;
            }
            f.write_char(c)?;
        }
        f.write_char('"')
    }
}

// ==================== Sorting ====================

/// One ordering key of a sort expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortTerm {
    pub path: PropertyPath,
    pub ascending: bool,
}

impl fmt::Display for SortTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.ascending { "asc" } else { "desc" };
        write!(f, "{}:{direction}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(value: &str) -> FilterNode {
        FilterNode::equals(PropertyPath::of(&[PropertyId::Summary]), value)
    }

    #[test]
    fn test_fold_two_leaves() {
        let folded = fold(leaf("a"), leaf("b"), LogicalOperator::And);
        assert_eq!(folded, FilterNode::and(vec![leaf("a"), leaf("b")]));
    }

    #[test]
    fn test_fold_appends_to_existing_group() {
        let ab = fold(leaf("a"), leaf("b"), LogicalOperator::Or);
        let abc = fold(ab, leaf("c"), LogicalOperator::Or);
        assert_eq!(abc, FilterNode::or(vec![leaf("a"), leaf("b"), leaf("c")]));
    }

    #[test]
    fn test_fold_keeps_other_operator_nested() {
        let ab = fold(leaf("a"), leaf("b"), LogicalOperator::Or);
        let folded = fold(leaf("c"), ab.clone(), LogicalOperator::And);
        assert_eq!(folded, FilterNode::and(vec![leaf("c"), ab]));
    }

    #[test]
    fn test_fold_keeps_named_group_intact() {
        let named = FilterNode::And {
            name: Some("/user/cal".to_string()),
            children: vec![leaf("a"), leaf("b")],
        };
        let folded = fold(named.clone(), leaf("c"), LogicalOperator::And);
        assert_eq!(folded, FilterNode::and(vec![named, leaf("c")]));
    }

    #[test]
    fn test_all_and_any() {
        assert_eq!(FilterNode::all(vec![]), None);
        assert_eq!(FilterNode::all(vec![leaf("a")]), Some(leaf("a")));
        assert_eq!(
            FilterNode::any(vec![leaf("a"), leaf("b")]),
            Some(FilterNode::or(vec![leaf("a"), leaf("b")]))
        );
    }

    #[test]
    fn test_display_nested_groups() {
        let inner = FilterNode::or(vec![leaf("b"), leaf("c")]);
        let node = FilterNode::and(vec![leaf("a"), inner]);
        assert_eq!(
            node.to_string(),
            r#"summary = "a" & (summary = "b" | summary = "c")"#
        );
    }

    #[test]
    fn test_display_escapes_quotes() {
        assert_eq!(leaf(r#"say "hi""#).to_string(), r#"summary = "say \"hi\"""#);
    }

    #[test]
    fn test_display_indexed_path() {
        let path = PropertyPath::new(vec![PropertySegment {
            property: PropertyId::XProp,
            int_index: None,
            str_index: Some("X-COLOR".to_string()),
        }])
        .unwrap();
        assert_eq!(path.to_string(), r#"x-prop["X-COLOR"]"#);
    }

    #[test]
    fn test_display_open_time_range() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let node = FilterNode::TimeRange {
            path: PropertyPath::of(&[PropertyId::Dtstart]),
            start: Some(start),
            end: None,
        };
        assert_eq!(node.to_string(), r#"dtstart in "20240101T000000Z" to"#);
    }

    #[test]
    fn test_sort_term_display() {
        let term = SortTerm {
            path: PropertyPath::of(&[PropertyId::Dtstart]),
            ascending: true,
        };
        assert_eq!(term.to_string(), "dtstart:asc");
    }
}
