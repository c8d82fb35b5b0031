//! Comparison operators, operands, and the per-property filter builders.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use tracing::debug;

use super::Parser;
use crate::filter::ast::{
    ComparisonOperator, EntityKind, FilterNode, PropertyPath, Value, UTC_FORMAT,
};
use crate::filter::error::{FilterResult, ParseError};
use crate::filter::lexer::{PositionedToken, Token};
use crate::filter::property::PropertyId;
use crate::hierarchy::CategoryLookup;

/// Floating date-time, taken as UTC.
const FLOATING_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Date only, taken as midnight UTC.
const DATE_FORMAT: &str = "%Y%m%d";

impl Parser<'_, '_, '_> {
    /// Parses `property_path operator operand` starting at `first`.
    pub(super) fn property_comparison(
        &mut self,
        first: PositionedToken,
    ) -> FilterResult<FilterNode> {
        let path = self.get_property(first)?;
        let operator = self.read_comparison_operator()?;
        self.make_prop_filter(path, operator)
    }

    fn read_comparison_operator(&mut self) -> FilterResult<ComparisonOperator> {
        let token = self.lexer.next_token()?;

        let operator = match token.token {
            Token::Symbol('=') => ComparisonOperator::Equal,
            Token::Symbol('~') => ComparisonOperator::Like,
            Token::Symbol('!') => {
                let next = self.lexer.next_token()?;
                match next.token {
                    Token::Symbol('=') => ComparisonOperator::NotEqual,
                    Token::Symbol('~') => ComparisonOperator::NotLike,
                    _ => return Err(self.unexpected(&next, "'=' or '~' after '!'")),
                }
            }
            Token::Symbol('>') => self.or_equal(
                ComparisonOperator::GreaterThan,
                ComparisonOperator::GreaterThanOrEqual,
            )?,
            Token::Symbol('<') => self.or_equal(
                ComparisonOperator::LessThan,
                ComparisonOperator::LessThanOrEqual,
            )?,
            Token::Word(ref word) => match word.to_ascii_lowercase().as_str() {
                "isdefined" => ComparisonOperator::IsDefined,
                "notdefined" => ComparisonOperator::NotDefined,
                "in" => ComparisonOperator::InTimeRange,
                "startswith" => ComparisonOperator::StartsWith,
                "indexed" => ComparisonOperator::Indexed,
                _ => return Err(self.unexpected(&token, "comparison operator")),
            },
            _ => return Err(self.unexpected(&token, "comparison operator")),
        };
        Ok(operator)
    }

    /// Consumes a following `=` if present.
    fn or_equal(
        &mut self,
        plain: ComparisonOperator,
        with_equal: ComparisonOperator,
    ) -> FilterResult<ComparisonOperator> {
        if self.lexer.peek()?.token.is_symbol('=') {
            self.lexer.next_token()?;
            Ok(with_equal)
        } else {
            Ok(plain)
        }
    }

    /// Builds the filter for `path operator ...`, reading the operand in the
    /// form the property expects.
    fn make_prop_filter(
        &mut self,
        path: PropertyPath,
        operator: ComparisonOperator,
    ) -> FilterResult<FilterNode> {
        let first = path.first();

        match operator {
            ComparisonOperator::IsDefined | ComparisonOperator::NotDefined => {
                return Ok(FilterNode::Presence {
                    path,
                    is_present: operator == ComparisonOperator::IsDefined,
                });
            }
            ComparisonOperator::InTimeRange => return self.time_range(path),
            _ => {}
        }

        if first == PropertyId::EntityType {
            require(operator, &[ComparisonOperator::Equal], &path)?;
            let name = self.read_quoted()?;
            let kind = EntityKind::from_name(&name).ok_or(ParseError::UnknownEntityType(name))?;
            return Ok(FilterNode::EntityType { name: kind });
        }

        if is_selection(first) {
            require(operator, &[ComparisonOperator::Equal], &path)?;
            let words = self.do_word_list()?;
            return match first {
                PropertyId::View => self.view_filter(&words),
                PropertyId::Vpath => self.vpath_filter(&words),
                _ => self.collection_filter(&words),
            };
        }

        if first == PropertyId::Categories {
            return self.categories_filter(path, operator);
        }

        let value = self.read_value()?;
        build_compare(path, operator, value)
    }

    /// Reads a single quoted string or a parenthesized, comma-separated list
    /// of them.
    pub(super) fn do_word_list(&mut self) -> FilterResult<Vec<String>> {
        let open = self.lexer.next_token()?;
        match open.token {
            Token::Quoted(word) => return Ok(vec![word]),
            Token::Symbol('(') => {}
            _ => return Err(self.unexpected(&open, "quoted string or '('")),
        }

        let mut words = Vec::new();
        loop {
            let token = self.lexer.next_token()?;
            match token.token {
                Token::Quoted(word) => words.push(word),
                Token::Symbol(')') if words.is_empty() => {
                    return Err(ParseError::BadWordList("empty list"))
                }
                Token::Eof => return Err(ParseError::BadWordList("missing ')'")),
                _ => return Err(self.unexpected(&token, "quoted string")),
            }

            let separator = self.lexer.next_token()?;
            match separator.token {
                Token::Symbol(',') => continue,
                Token::Symbol(')') => return Ok(words),
                Token::Eof => return Err(ParseError::BadWordList("missing ')'")),
                _ => return Err(self.unexpected(&separator, "',' or ')'")),
            }
        }
    }

    fn read_quoted(&mut self) -> FilterResult<String> {
        let token = self.lexer.next_token()?;
        match token.token {
            Token::Quoted(text) => Ok(text),
            _ => Err(self.unexpected(&token, "quoted string")),
        }
    }

    fn read_value(&mut self) -> FilterResult<Value> {
        let token = self.lexer.next_token()?;
        match token.token {
            Token::Quoted(text) => Ok(Value::Text(text)),
            Token::Number(n) => Ok(Value::Number(n)),
            _ => Err(self.unexpected(&token, "quoted string or number")),
        }
    }

    /// Reads `["start"] to ["end"]` after `in`.
    fn time_range(&mut self, path: PropertyPath) -> FilterResult<FilterNode> {
        let start = self.optional_bound()?;

        let to = self.lexer.next_token()?;
        if !to.token.is_keyword("to") {
            return Err(self.unexpected(&to, "'to'"));
        }

        let end = self.optional_bound()?;
        if start.is_none() && end.is_none() {
            return Err(ParseError::EmptyTimeRange);
        }
        Ok(FilterNode::TimeRange { path, start, end })
    }

    fn optional_bound(&mut self) -> FilterResult<Option<DateTime<Utc>>> {
        if !matches!(self.lexer.peek()?.token, Token::Quoted(_)) {
            return Ok(None);
        }
        match self.lexer.next_token()?.token {
            Token::Quoted(text) => parse_bound(&text),
            _ => Ok(None),
        }
    }

    fn categories_filter(
        &mut self,
        path: PropertyPath,
        operator: ComparisonOperator,
    ) -> FilterResult<FilterNode> {
        require(
            operator,
            &[ComparisonOperator::Equal, ComparisonOperator::NotEqual],
            &path,
        )?;
        let negate = operator == ComparisonOperator::NotEqual;

        if path.is(&[PropertyId::Categories, PropertyId::Uid]) {
            let mut filters = Vec::new();
            for uid in self.do_word_list()? {
                match self.compiler.hierarchy.category_by_uid(&uid)? {
                    CategoryLookup::Found(_) => {
                        filters.push(category_compare(path.clone(), uid, negate))
                    }
                    CategoryLookup::NotFound => return Err(ParseError::MissingCategory(uid)),
                }
            }
            return FilterNode::all(filters).ok_or(ParseError::BadWordList("empty list"));
        }

        if path.is(&[PropertyId::Categories, PropertyId::Href]) {
            let filters = self
                .do_word_list()?
                .into_iter()
                .map(|href| category_compare(path.clone(), href, negate))
                .collect();
            return FilterNode::all(filters).ok_or(ParseError::BadWordList("empty list"));
        }

        if path.depth() > 1 {
            return Err(ParseError::unsupported(operator.symbol(), &path));
        }

        let value = self.read_quoted()?;
        if value.starts_with('/') {
            let href = PropertyPath::of(&[PropertyId::Categories, PropertyId::Href]);
            return Ok(category_compare(href, value, negate));
        }

        match self.compiler.hierarchy.category_by_name(&value)? {
            Some(category) => {
                debug!(name = %value, uid = %category.uid, "resolved category name");
                let uid = PropertyPath::of(&[PropertyId::Categories, PropertyId::Uid]);
                Ok(category_compare(uid, category.uid, negate))
            }
            None => Err(ParseError::UnknownCategory(value)),
        }
    }

    /// `view = ("a", "b")`: each view's memoized filter, combined with AND.
    fn view_filter(&mut self, names: &[String]) -> FilterResult<FilterNode> {
        let mut filters = Vec::with_capacity(names.len());

        for name in names {
            let view = self
                .compiler
                .hierarchy
                .view(name)?
                .ok_or_else(|| ParseError::UnknownView(name.clone()))?;

            let filter = match view.cached_filter() {
                Some(filter) => filter.clone(),
                None => {
                    let mut members = Vec::with_capacity(view.collections.len());
                    for vpath in &view.collections {
                        members.push(self.compiler.resolve_vpath(vpath, self.explicit_selection)?);
                    }
                    let filter = FilterNode::all(members)
                        .ok_or_else(|| ParseError::EmptyView(view.name.clone()))?;
                    debug!(view = %view.name, "memoized view filter");
                    view.cache_filter(filter).clone()
                }
            };

            filters.push(FilterNode::View {
                name: view.name.clone(),
                filter: Box::new(filter),
            });
        }

        FilterNode::all(filters).ok_or(ParseError::BadWordList("empty list"))
    }

    fn vpath_filter(&mut self, vpaths: &[String]) -> FilterResult<FilterNode> {
        let mut filters = Vec::with_capacity(vpaths.len());
        for vpath in vpaths {
            filters.push(self.compiler.resolve_vpath(vpath, self.explicit_selection)?);
        }
        FilterNode::all(filters).ok_or(ParseError::BadWordList("empty list"))
    }

    /// `colpath = ("/a", "/b")`: each path's filter, combined with AND.
    fn collection_filter(&mut self, paths: &[String]) -> FilterResult<FilterNode> {
        let mut filters = Vec::with_capacity(paths.len());
        for path in paths {
            filters.push(self.compiler.resolve_collection_path(path, self.explicit_selection)?);
        }
        FilterNode::all(filters).ok_or(ParseError::BadWordList("empty list"))
    }
}

/// Properties whose operand selects collections rather than matching a value.
fn is_selection(property: PropertyId) -> bool {
    matches!(
        property,
        PropertyId::View | PropertyId::Vpath | PropertyId::Collection
    )
}

fn require(
    operator: ComparisonOperator,
    allowed: &[ComparisonOperator],
    path: &PropertyPath,
) -> FilterResult<()> {
    if allowed.contains(&operator) {
        Ok(())
    } else {
        Err(ParseError::unsupported(operator.symbol(), path))
    }
}

fn category_compare(path: PropertyPath, value: String, negate: bool) -> FilterNode {
    let operator = if negate {
        ComparisonOperator::NotEqual
    } else {
        ComparisonOperator::Equal
    };
    FilterNode::Compare {
        path,
        operator,
        value: Value::Text(value),
        exact: true,
        negate,
        caseless: false,
        prefix_match: false,
    }
}

/// Builds a plain comparison, deriving the match flags from the operator.
fn build_compare(
    path: PropertyPath,
    operator: ComparisonOperator,
    value: Value,
) -> FilterResult<FilterNode> {
    let (exact, caseless, prefix_match) = match operator {
        ComparisonOperator::Equal | ComparisonOperator::NotEqual | ComparisonOperator::Indexed => {
            (true, false, false)
        }
        ComparisonOperator::Like | ComparisonOperator::NotLike => (false, true, false),
        ComparisonOperator::StartsWith => (false, false, true),
        ComparisonOperator::GreaterThan
        | ComparisonOperator::LessThan
        | ComparisonOperator::GreaterThanOrEqual
        | ComparisonOperator::LessThanOrEqual => (false, false, false),
        ComparisonOperator::IsDefined
        | ComparisonOperator::NotDefined
        | ComparisonOperator::InTimeRange => {
            return Err(ParseError::unsupported(operator.symbol(), &path));
        }
    };

    if matches!(value, Value::Number(_)) && (caseless || prefix_match) {
        return Err(ParseError::unsupported(operator.symbol(), &path));
    }

    Ok(FilterNode::Compare {
        path,
        operator,
        value,
        exact,
        negate: operator.is_negated(),
        caseless,
        prefix_match,
    })
}

/// Parses a time-range bound. An empty string is an open bound.
///
/// Bounds keep whole seconds only, matching the canonical text form.
fn parse_bound(text: &str) -> FilterResult<Option<DateTime<Utc>>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, UTC_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, FLOATING_FORMAT))
    {
        return Ok(Some(dt.and_utc()));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight.and_utc()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(dt.with_timezone(&Utc).trunc_subsecs(0)));
    }

    Err(ParseError::BadDateTime(text.to_string()))
}
