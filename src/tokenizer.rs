//! Logic for breaking raw Jack source into a lazy stream of
//! classified tokens, with whitespace and both comment styles
//! (`// line` and `/* block */`) stripped along the way.

use std::str::FromStr;

use crate::error::{CompileError, FallableAction};

/// Byte range a token (or error) covers in the source text.
pub type Span = std::ops::Range<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum TokenKind {
    Keyword,
    Symbol,
    IntegerConstant,
    StringConstant,
    Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

/// Reserved words of the Jack grammar.
///
/// Any scanned word matching one of these is classified as a keyword,
/// even though it also matches the identifier pattern - the keyword
/// check always runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

/// The fixed Jack symbol set, including the two non-standard
/// shift operators (`^`, `#`).
const SYMBOLS: &[char] = &[
    '{', '}', '(', ')', '[', ']', '.', ',', ';', '+', '-', '*', '/', '&', '|', '<', '>', '=', '~',
    '^', '#',
];

#[derive(Debug)]
pub struct Tokenizer {
    source: String,
    position: usize,
    current: Option<Token>,
}

impl Tokenizer {
    /// Set up a tokenizer over the given source text, positioned at the
    /// first token. Initially there is no current token - the first
    /// [`advance`](Self::advance) loads it.
    pub fn new(source: &str) -> Result<Self, CompileError> {
        let mut tokenizer = Self {
            source: source.to_string(),
            position: 0,
            current: None,
        };
        tokenizer.skip_trivia()?;

        Ok(tokenizer)
    }

    /// Whether any tokens remain in the input past the current one.
    pub fn has_more_tokens(&self) -> bool {
        self.position < self.source.len()
    }

    /// Scan the next token from the input and make it the current token.
    pub fn advance(&mut self) -> FallableAction {
        if !self.has_more_tokens() {
            return Err(CompileError::OutOfTokens);
        }

        let token = self.scan_token()?;
        self.position = token.span.end;
        self.current = Some(token);

        // position `has_more_tokens` past any trailing trivia
        self.skip_trivia()
    }

    /// The token most recently loaded by [`advance`](Self::advance).
    pub fn current_token(&self) -> Result<&Token, CompileError> {
        self.current.as_ref().ok_or(CompileError::OutOfTokens)
    }

    // region: scanning

    fn scan_token(&self) -> Result<Token, CompileError> {
        let rest = &self.source[self.position..];
        let first = rest
            .chars()
            .next()
            .ok_or(CompileError::OutOfTokens)?;

        // fixed category order: string constant, integer constant,
        // symbol, keyword, identifier
        if first == '"' {
            self.scan_string_constant(rest)
        } else if first.is_ascii_digit() {
            Ok(self.scan_integer_constant(rest))
        } else if SYMBOLS.contains(&first) {
            Ok(self.token(TokenKind::Symbol, first.to_string(), first.len_utf8()))
        } else if first.is_ascii_alphabetic() || first == '_' {
            Ok(self.scan_word(rest))
        } else {
            Err(CompileError::UnrecognizedToken(
                self.position..self.position + first.len_utf8(),
            ))
        }
    }

    fn scan_string_constant(&self, rest: &str) -> Result<Token, CompileError> {
        let body = &rest[1..];

        let Some(closing) = body.find(['"', '\n']).filter(|&i| &body[i..=i] == "\"") else {
            return Err(CompileError::UnterminatedString(
                self.position..self.source.len(),
            ));
        };

        // quotes are part of the consumed source, but not of the lexeme
        Ok(self.token(
            TokenKind::StringConstant,
            body[..closing].to_string(),
            closing + 2,
        ))
    }

    fn scan_integer_constant(&self, rest: &str) -> Token {
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let length = digits.len();

        // note: no range validation here - that is the engine's concern
        self.token(TokenKind::IntegerConstant, digits, length)
    }

    fn scan_word(&self, rest: &str) -> Token {
        let word: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let length = word.len();

        let kind = if Keyword::from_str(&word).is_ok() {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };

        self.token(kind, word, length)
    }

    fn token(&self, kind: TokenKind, lexeme: String, consumed: usize) -> Token {
        Token {
            kind,
            lexeme,
            span: self.position..self.position + consumed,
        }
    }

    // endregion

    /// Skip a maximal run of whitespace and comments
    /// (both `// line` and `/* block, across lines */`).
    fn skip_trivia(&mut self) -> FallableAction {
        loop {
            let rest = &self.source[self.position..];

            if let Some(whitespace) = rest.find(|c: char| !c.is_whitespace()) {
                if whitespace > 0 {
                    self.position += whitespace;
                    continue;
                }
            } else {
                // all-whitespace remainder
                self.position = self.source.len();
                return Ok(());
            }

            if rest.starts_with("//") {
                match rest.find('\n') {
                    Some(line_end) => self.position += line_end + 1,
                    None => self.position = self.source.len(),
                }
            } else if rest.starts_with("/*") {
                let Some(comment_end) = rest[2..].find("*/") else {
                    return Err(CompileError::UnterminatedComment(
                        self.position..self.source.len(),
                    ));
                };

                self.position += comment_end + 4;
            } else {
                return Ok(());
            }
        }
    }
}
