//! List of all errors that could possibly occur during compilation,
//! grouped by the stage that raises them (tokenization, identifier
//! resolution, grammar walk).

use crate::tokenizer::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    // lexical
    UnrecognizedToken(Span),
    UnterminatedComment(Span),
    UnterminatedString(Span),
    OutOfTokens,

    // scope
    VariableAlreadyInScope(String),
    VariableNotInScope(String),

    // structural
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    UnexpectedEndOfInput,
    IntegerOutOfRange {
        literal: String,
        span: Span,
    },
}

impl CompileError {
    /// Source span related to this error, if there is one
    /// (scope errors are detected past the offending token,
    /// so they carry only the identifier in question).
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnrecognizedToken(span)
            | Self::UnterminatedComment(span)
            | Self::UnterminatedString(span)
            | Self::UnexpectedToken { span, .. }
            | Self::IntegerOutOfRange { span, .. } => Some(span.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedToken(_) => write!(f, "no recognizable token at this position"),
            Self::UnterminatedComment(_) => write!(f, "block comment is never closed"),
            Self::UnterminatedString(_) => write!(f, "string constant is never closed"),
            Self::OutOfTokens => write!(f, "no tokens remaining in the input"),
            Self::VariableAlreadyInScope(name) => {
                write!(f, "`{name}` is already defined in this scope")
            }
            Self::VariableNotInScope(name) => write!(f, "`{name}` is not defined in any scope"),
            Self::UnexpectedToken {
                expected, found, ..
            } => write!(f, "expected {expected}, found `{found}`"),
            Self::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            Self::IntegerOutOfRange { literal, .. } => {
                write!(f, "integer constant `{literal}` is outside of the 0..=32767 range")
            }
        }
    }
}

impl std::error::Error for CompileError {}

pub type FallableAction = Result<(), CompileError>;
