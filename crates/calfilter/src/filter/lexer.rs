//! Lexer (tokenizer) for filter and sort expressions.

use std::fmt;

use super::error::{FilterResult, ParseError};

/// A token in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An unquoted run of word characters.
    Word(String),

    /// A single- or double-quoted string, with escapes removed.
    Quoted(String),

    /// A word made only of decimal digits, optionally signed.
    Number(i64),

    /// One of the ordinary characters `. : ; , ~ = ! > < & | ( ) [ ]`.
    Symbol(char),

    /// End of input. Returned repeatedly once reached.
    Eof,
}

impl Token {
    /// True if this is the given symbol.
    pub fn is_symbol(&self, c: char) -> bool {
        matches!(self, Token::Symbol(s) if *s == c)
    }

    /// True if this is a word equal to `keyword`, ignoring ASCII case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "word '{w}'"),
            Token::Quoted(s) => write!(f, "string \"{s}\""),
            Token::Number(n) => write!(f, "number {n}"),
            Token::Symbol(c) => write!(f, "'{c}'"),
            Token::Eof => f.write_str("end of expression"),
        }
    }
}

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken {
    /// The token.
    pub token: Token,
    /// The byte position where the token starts (0-indexed).
    pub position: usize,
}

/// Characters that always form a token on their own.
fn is_ordinary(c: char) -> bool {
    matches!(
        c,
        '.' | ':' | ';' | ',' | '~' | '=' | '!' | '>' | '<' | '&' | '|' | '(' | ')' | '[' | ']'
    )
}

fn is_whitespace(c: char) -> bool {
    c <= ' '
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

fn is_word_char(c: char) -> bool {
    !is_whitespace(c) && !is_ordinary(c) && !is_quote(c)
}

/// Lexer over an in-memory expression.
///
/// Holds a byte index into the input plus a one-token buffer, so the parser
/// can look one token ahead and push a token back.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    pushed_back: Option<PositionedToken>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            pushed_back: None,
        }
    }

    /// Returns the next token, consuming it.
    pub fn next_token(&mut self) -> FilterResult<PositionedToken> {
        if let Some(token) = self.pushed_back.take() {
            return Ok(token);
        }
        self.scan()
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> FilterResult<&PositionedToken> {
        let token = match self.pushed_back.take() {
            Some(token) => token,
            None => self.scan()?,
        };
        let token: &PositionedToken = self.pushed_back.insert(token);
        Ok(token)
    }

    /// Returns a token so the next call to [`next_token`](Self::next_token)
    /// yields it again. Only one token may be pushed back at a time.
    pub fn push_back(&mut self, token: PositionedToken) {
        debug_assert!(self.pushed_back.is_none(), "only one token of push-back");
        self.pushed_back = Some(token);
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        match self.pushed_back {
            Some(ref token) => token.position,
            None => self.position,
        }
    }

    fn current(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if is_whitespace(c) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn scan(&mut self) -> FilterResult<PositionedToken> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.current() else {
            return Ok(PositionedToken {
                token: Token::Eof,
                position: start,
            });
        };

        let token = if is_ordinary(c) {
            self.bump();
            Token::Symbol(c)
        } else if is_quote(c) {
            Token::Quoted(self.read_quoted(c, start)?)
        } else {
            self.read_word()
        };

        Ok(PositionedToken {
            token,
            position: start,
        })
    }

    /// Reads a quoted string. A backslash escapes the following character;
    /// the other kind of quote is an ordinary character inside.
    fn read_quoted(&mut self, quote: char, start: usize) -> FilterResult<String> {
        self.bump();

        let mut result = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString { position: start }),
                Some(c) if c == quote => return Ok(result),
                Some('\\') => match self.bump() {
                    Some(escaped) => result.push(escaped),
                    None => return Err(ParseError::UnterminatedString { position: start }),
                },
                Some(c) => result.push(c),
            }
        }
    }

    fn read_word(&mut self) -> Token {
        let start = self.position;
        while let Some(c) = self.current() {
            if is_word_char(c) {
                self.bump();
            } else {
                break;
            }
        }

        let word = &self.input[start..self.position];
        match parse_number(word) {
            Some(n) => Token::Number(n),
            None => Token::Word(word.to_string()),
        }
    }

    /// Collects all remaining tokens, excluding the final `Eof`.
    #[cfg(test)]
    pub fn tokenize(mut self) -> FilterResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let positioned = self.next_token()?;
            if positioned.token == Token::Eof {
                return Ok(tokens);
            }
            tokens.push(positioned.token);
        }
    }
}

fn parse_number(word: &str) -> Option<i64> {
    let digits = word
        .strip_prefix('-')
        .or_else(|| word.strip_prefix('+'))
        .unwrap_or(word);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    word.parse().ok()
}
