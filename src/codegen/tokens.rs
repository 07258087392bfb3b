//! One-token-lookahead cursor helpers shared by the grammar routines.
//!
//! `expect_*` functions verify the current token and consume it;
//! `is_*` functions only probe it. Consuming the final token of the
//! input leaves it in place - nothing in the grammar reads past the
//! closing `}` of the class.

use crate::{
    error::{CompileError, FallableAction},
    tokenizer::{Keyword, Token, TokenKind, Tokenizer},
};

/// Advance past the current token, tolerating the end of input.
pub fn advance_or_end(tokenizer: &mut Tokenizer) -> FallableAction {
    if tokenizer.has_more_tokens() {
        tokenizer.advance()
    } else {
        Ok(())
    }
}

pub fn expect_keyword(tokenizer: &mut Tokenizer, keyword: Keyword) -> FallableAction {
    if !is_keyword(tokenizer, keyword) {
        return Err(unexpected(
            format!("keyword `{keyword}`"),
            tokenizer.current_token()?,
        ));
    }

    advance_or_end(tokenizer)
}

pub fn expect_symbol(tokenizer: &mut Tokenizer, symbol: char) -> FallableAction {
    if !is_symbol(tokenizer, symbol) {
        return Err(unexpected(
            format!("symbol `{symbol}`"),
            tokenizer.current_token()?,
        ));
    }

    advance_or_end(tokenizer)
}

/// Consume the current token, requiring it to be an identifier,
/// and return its lexeme.
pub fn expect_identifier(tokenizer: &mut Tokenizer) -> Result<String, CompileError> {
    let token = tokenizer.current_token()?;

    if token.kind != TokenKind::Identifier {
        return Err(unexpected("an identifier", token));
    }

    let lexeme = token.lexeme.clone();
    advance_or_end(tokenizer)?;

    Ok(lexeme)
}

/// Consume the current token, requiring it to name a type
/// (`int` | `char` | `boolean` | class name), and return its lexeme.
pub fn expect_type(tokenizer: &mut Tokenizer) -> Result<String, CompileError> {
    let token = tokenizer.current_token()?;

    let is_type = token.kind == TokenKind::Identifier
        || matches!(
            current_keyword(tokenizer),
            Some(Keyword::Int | Keyword::Char | Keyword::Boolean)
        );

    if !is_type {
        return Err(unexpected("a type name", tokenizer.current_token()?));
    }

    let lexeme = tokenizer.current_token()?.lexeme.clone();
    advance_or_end(tokenizer)?;

    Ok(lexeme)
}

pub fn is_keyword(tokenizer: &Tokenizer, keyword: Keyword) -> bool {
    tokenizer
        .current_token()
        .is_ok_and(|token| token.kind == TokenKind::Keyword && token.lexeme == keyword.as_ref())
}

pub fn is_symbol(tokenizer: &Tokenizer, symbol: char) -> bool {
    tokenizer
        .current_token()
        .is_ok_and(|token| token.kind == TokenKind::Symbol && token.lexeme.starts_with(symbol))
}

/// The current token parsed as a keyword, if it is one.
pub fn current_keyword(tokenizer: &Tokenizer) -> Option<Keyword> {
    use std::str::FromStr;

    let token = tokenizer.current_token().ok()?;

    if token.kind == TokenKind::Keyword {
        Keyword::from_str(&token.lexeme).ok()
    } else {
        None
    }
}

pub fn unexpected(expected: impl Into<String>, found: &Token) -> CompileError {
    CompileError::UnexpectedToken {
        expected: expected.into(),
        found: found.lexeme.clone(),
        span: found.span.clone(),
    }
}
