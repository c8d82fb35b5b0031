//! Property path parsing: `name(.name)*` with an optional index on the first
//! segment.

use super::Parser;
use crate::filter::ast::{PropertyPath, PropertySegment};
use crate::filter::error::{FilterResult, ParseError};
use crate::filter::lexer::{PositionedToken, Token};
use crate::filter::property::PropertyId;

/// Shorthand for `categories.uid`, accepted only as a whole path.
const CATUID: &str = "catuid";

impl Parser<'_, '_, '_> {
    /// Reads a property path starting with `first`.
    pub(in crate::filter) fn get_property(
        &mut self,
        first: PositionedToken,
    ) -> FilterResult<PropertyPath> {
        let mut segments: Vec<PropertySegment> = Vec::new();
        let mut token = first;

        loop {
            let Token::Word(ref word) = token.token else {
                let expected = if segments.is_empty() {
                    "property name"
                } else {
                    "property name after '.'"
                };
                return Err(self.unexpected(&token, expected));
            };

            if segments.is_empty() && word.eq_ignore_ascii_case(CATUID) {
                segments.push(PropertySegment::new(PropertyId::Categories));
                segments.push(PropertySegment::new(PropertyId::Uid));
                if self.lexer.peek()?.token.is_symbol('.') {
                    return Err(ParseError::PathTooDeep {
                        path: CATUID.to_string(),
                        allowed: 1,
                    });
                }
                break;
            }

            let property = lookup(word)?;
            if segments.is_empty() && property.is_sub_property() {
                return Err(ParseError::NotTopLevel(property.name().to_string()));
            }
            if !segments.is_empty() && !is_child_property(property) {
                return Err(ParseError::unexpected(
                    format!("property '{word}'"),
                    "a sub-property such as 'utc', 'tzid' or 'cn'",
                    token.position,
                ));
            }

            let mut segment = PropertySegment::new(property);
            if self.lexer.peek()?.token.is_symbol('[') {
                if !segments.is_empty() {
                    return Err(ParseError::IndexNotAllowed);
                }
                self.lexer.next_token()?;
                self.read_index(&mut segment)?;
            }
            segments.push(segment);

            if !self.lexer.peek()?.token.is_symbol('.') {
                break;
            }
            self.lexer.next_token()?;
            token = self.lexer.next_token()?;
        }

        let path = PropertyPath::new(segments).ok_or(ParseError::InvalidExpression)?;
        let allowed = path.first().max_depth();
        if path.depth() > allowed {
            return Err(ParseError::PathTooDeep {
                path: path.to_string(),
                allowed,
            });
        }
        Ok(path)
    }

    /// Reads `number ]` or `"key" ]` after an opening bracket.
    fn read_index(&mut self, segment: &mut PropertySegment) -> FilterResult<()> {
        let index = self.lexer.next_token()?;
        match index.token {
            Token::Number(n) => segment.int_index = Some(n),
            Token::Quoted(key) => segment.str_index = Some(key),
            _ => return Err(self.unexpected(&index, "number or quoted key inside '[ ]'")),
        }

        let close = self.lexer.next_token()?;
        if !close.token.is_symbol(']') {
            return Err(self.unexpected(&close, "']'"));
        }
        Ok(())
    }
}

fn lookup(word: &str) -> FilterResult<PropertyId> {
    PropertyId::from_name(word).ok_or_else(|| ParseError::UnknownProperty {
        name: word.to_string(),
        suggestion: PropertyId::suggest(word).map(str::to_string),
    })
}

/// Properties allowed after the first segment.
fn is_child_property(property: PropertyId) -> bool {
    property.is_sub_property() || matches!(property, PropertyId::Uid | PropertyId::Href)
}
