//! Static table of the property names a filter expression may reference.

use std::fmt;

use serde::Serialize;
use strsim::levenshtein;

/// Identifier of a known calendar property or sub-property.
///
/// The name table is a compiled `match`, so lookups never allocate and there
/// is no mutable global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyId {
    // ==================== Selection ====================
    /// Kind of calendar entity (event, todo, ...).
    EntityType,
    /// Collection the entity lives in.
    Collection,
    /// A named view of collections.
    View,
    /// A virtual path through the collection hierarchy.
    Vpath,

    // ==================== Entity properties ====================
    Owner,
    Creator,
    Summary,
    Description,
    Location,
    Categories,
    Uid,
    Href,
    Dtstart,
    Dtend,
    Due,
    Created,
    LastModified,
    Status,
    Class,
    Priority,
    Url,
    Organizer,
    Attendee,
    /// Non-standard `X-` properties, indexed by name.
    XProp,

    // ==================== Sub-properties ====================
    Utc,
    Local,
    Tzid,
    Cn,
    Value,
    Name,
}

/// Maximum Levenshtein distance for an unknown name to get a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Names accepted in expressions, paired with their property.
///
/// The first name listed for a property is its canonical spelling.
const NAMES: &[(&str, PropertyId)] = &[
    ("entity_type", PropertyId::EntityType),
    ("colpath", PropertyId::Collection),
    ("collection", PropertyId::Collection),
    ("view", PropertyId::View),
    ("vpath", PropertyId::Vpath),
    ("owner", PropertyId::Owner),
    ("creator", PropertyId::Creator),
    ("summary", PropertyId::Summary),
    ("description", PropertyId::Description),
    ("location", PropertyId::Location),
    ("categories", PropertyId::Categories),
    ("category", PropertyId::Categories),
    ("uid", PropertyId::Uid),
    ("href", PropertyId::Href),
    ("dtstart", PropertyId::Dtstart),
    ("start", PropertyId::Dtstart),
    ("dtend", PropertyId::Dtend),
    ("end", PropertyId::Dtend),
    ("due", PropertyId::Due),
    ("created", PropertyId::Created),
    ("lastmod", PropertyId::LastModified),
    ("last_modified", PropertyId::LastModified),
    ("status", PropertyId::Status),
    ("class", PropertyId::Class),
    ("priority", PropertyId::Priority),
    ("url", PropertyId::Url),
    ("organizer", PropertyId::Organizer),
    ("attendee", PropertyId::Attendee),
    ("x-prop", PropertyId::XProp),
    ("xprop", PropertyId::XProp),
    ("utc", PropertyId::Utc),
    ("local", PropertyId::Local),
    ("tzid", PropertyId::Tzid),
    ("cn", PropertyId::Cn),
    ("value", PropertyId::Value),
    ("name", PropertyId::Name),
];

impl PropertyId {
    /// Looks up a property by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }

    /// Canonical spelling used when rendering expressions.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, id)| *id == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// All accepted names, used for "did you mean" suggestions.
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMES.iter().map(|(n, _)| *n)
    }

    /// Returns the known name closest to `name`, if any is close enough.
    pub fn suggest(name: &str) -> Option<&'static str> {
        let query = name.to_ascii_lowercase();

        let (best, distance) = Self::names()
            .map(|candidate| (candidate, levenshtein(&query, candidate)))
            .min_by_key(|(_, d)| *d)?;

        if distance > 0 && distance <= MAX_SUGGESTION_DISTANCE {
            Some(best)
        } else {
            None
        }
    }

    /// Deepest path allowed when this property is the first segment.
    pub fn max_depth(self) -> usize {
        match self {
            PropertyId::Location
            | PropertyId::Categories
            | PropertyId::Dtstart
            | PropertyId::Dtend
            | PropertyId::Due
            | PropertyId::Organizer
            | PropertyId::Attendee => 2,
            _ => 1,
        }
    }

    /// True for properties that only make sense as a sub-property.
    pub fn is_sub_property(self) -> bool {
        matches!(
            self,
            PropertyId::Utc
                | PropertyId::Local
                | PropertyId::Tzid
                | PropertyId::Cn
                | PropertyId::Value
                | PropertyId::Name
        )
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(PropertyId::from_name("SUMMARY"), Some(PropertyId::Summary));
        assert_eq!(PropertyId::from_name("Summary"), Some(PropertyId::Summary));
    }

    #[test]
    fn test_aliases_share_canonical_name() {
        assert_eq!(PropertyId::from_name("category"), Some(PropertyId::Categories));
        assert_eq!(PropertyId::from_name("start"), Some(PropertyId::Dtstart));
        assert_eq!(PropertyId::Categories.name(), "categories");
        assert_eq!(PropertyId::Collection.name(), "colpath");
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(PropertyId::from_name("nonsense"), None);
        assert_eq!(PropertyId::from_name(""), None);
    }

    #[test]
    fn test_suggest_close_name() {
        assert_eq!(PropertyId::suggest("sumary"), Some("summary"));
        assert_eq!(PropertyId::suggest("DTSTRAT"), Some("dtstart"));
    }

    #[test]
    fn test_suggest_nothing_for_distant_name() {
        assert_eq!(PropertyId::suggest("completely-unrelated"), None);
    }

    #[test]
    fn test_max_depth() {
        assert_eq!(PropertyId::EntityType.max_depth(), 1);
        assert_eq!(PropertyId::Categories.max_depth(), 2);
        assert_eq!(PropertyId::Summary.max_depth(), 1);
    }

    #[test]
    fn test_every_property_round_trips_through_its_name() {
        for name in PropertyId::names() {
            let id = PropertyId::from_name(name).unwrap();
            assert_eq!(PropertyId::from_name(id.name()), Some(id));
        }
    }
}
