//! Output formatting for compiled filters and sort terms.

use calfilter::{FilterNode, ParseResult, SortTerm};
use owo_colors::OwoColorize;
use serde::Serialize;

/// JSON output structure for the sort command.
#[derive(Serialize)]
pub struct SortTermsOutput<'a> {
    pub terms: Vec<SortTermOutput<'a>>,
}

/// JSON output structure for a single sort term.
#[derive(Serialize)]
pub struct SortTermOutput<'a> {
    pub property: String,
    pub direction: &'a str,
}

/// Formats a compile result as JSON.
pub fn format_result_json(result: &ParseResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

/// Formats a compiled filter as its canonical expression.
pub fn format_filter_text(filter: &FilterNode, use_colors: bool) -> String {
    let text = filter.to_string();
    if use_colors {
        format!("{}", text.cyan())
    } else {
        text
    }
}

/// Formats sort terms as JSON.
pub fn format_sort_terms_json(terms: &[SortTerm]) -> Result<String, serde_json::Error> {
    let output = SortTermsOutput {
        terms: terms
            .iter()
            .map(|t| SortTermOutput {
                property: t.path.to_string(),
                direction: if t.ascending { "asc" } else { "desc" },
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output)
}

/// Formats sort terms one per line as `property:direction`.
pub fn format_sort_terms_table(terms: &[SortTerm], use_colors: bool) -> String {
    if terms.is_empty() {
        return if use_colors {
            format!("{}\n", "No sort terms".dimmed())
        } else {
            "No sort terms\n".to_string()
        };
    }

    let mut output = String::new();
    for term in terms {
        let direction = if term.ascending { "asc" } else { "desc" };
        if use_colors {
            output.push_str(&format!("{}:{}\n", term.path, direction.yellow()));
        } else {
            output.push_str(&format!("{}:{}\n", term.path, direction));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use calfilter::filter::{PropertyId, PropertyPath};

    fn term(id: PropertyId, ascending: bool) -> SortTerm {
        SortTerm {
            path: PropertyPath::of(&[id]),
            ascending,
        }
    }

    #[test]
    fn test_sort_terms_table() {
        let terms = vec![
            term(PropertyId::Dtstart, true),
            term(PropertyId::Summary, false),
        ];
        let output = format_sort_terms_table(&terms, false);
        assert_eq!(output, "dtstart:asc\nsummary:desc\n");
    }

    #[test]
    fn test_sort_terms_table_empty() {
        assert_eq!(format_sort_terms_table(&[], false), "No sort terms\n");
    }

    #[test]
    fn test_sort_terms_json() {
        let json = format_sort_terms_json(&[term(PropertyId::Due, false)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["terms"][0]["property"], "due");
        assert_eq!(value["terms"][0]["direction"], "desc");
    }

    #[test]
    fn test_filter_text_without_colors() {
        let filter = FilterNode::in_collection("/public/sport");
        assert_eq!(
            format_filter_text(&filter, false),
            filter.to_string()
        );
    }
}
