//! Sort expressions: `term (',' term)*` where `term ::= property_path (':' ('asc' | 'desc'))?`.

use tracing::{debug, warn};

use super::ast::SortTerm;
use super::error::{FilterResult, ParseResult};
use super::lexer::Token;
use super::parser::{FilterCompiler, Parser};

impl FilterCompiler<'_> {
    /// Compiles a sort expression such as `dtstart:asc, summary`.
    ///
    /// Terms without a direction use the configured default (descending
    /// unless `default_sort_ascending` is set). Blank input yields no terms.
    pub fn parse_sort(&self, text: &str) -> ParseResult {
        debug!(text, "compiling sort");
        match self.compile_sort(text) {
            Ok(terms) => ParseResult::sort(terms),
            Err(e) => {
                warn!(error = %e, "sort did not compile");
                ParseResult::failed("", e)
            }
        }
    }

    fn compile_sort(&self, text: &str) -> FilterResult<Vec<SortTerm>> {
        self.check_length(text)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut parser = Parser::new(self, text, false);
        let mut terms = Vec::new();

        loop {
            let first = parser.lexer.next_token()?;
            let path = parser.get_property(first)?;

            let mut ascending = self.config.default_sort_ascending;
            if parser.lexer.peek()?.token.is_symbol(':') {
                parser.lexer.next_token()?;
                let direction = parser.lexer.next_token()?;
                ascending = if direction.token.is_keyword("asc") {
                    true
                } else if direction.token.is_keyword("desc") {
                    false
                } else {
                    return Err(parser.unexpected(&direction, "'asc' or 'desc'"));
                };
            }
            terms.push(SortTerm { path, ascending });

            let next = parser.lexer.next_token()?;
            match next.token {
                Token::Symbol(',') => continue,
                Token::Eof => return Ok(terms),
                _ => return Err(parser.unexpected(&next, "',' or end of sort expression")),
            }
        }
    }
}
