//! Parser error types with error code mapping
//!
//! Parsing is fail-fast: the first grammar violation ends the parse and is
//! returned as a [`ParserError`] carrying the span of the offending token.

use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::utils::Span;

pub type ParseResult<T> = Result<T, ParserError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParserError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    // === ANNOTATION GRAMMAR ===
    #[error("Unknown annotation class '{name}'")]
    UnknownAnnotationClass { name: String, span: Span },

    #[error("Only the first parameter may be positional; use name=value")]
    NamedParameterRequired { span: Span },

    #[error("Invalid value for parameter '{key}'")]
    InvalidValueType { key: String, span: Span },

    #[error("Expected a string or number key, found {found}")]
    ExpectedLiteral { found: String, span: Span },

    #[error("Expected 'class' after '::', found {found}")]
    MalformedClassConstant { found: String, span: Span },

    #[error("Nesting deeper than {depth} levels")]
    MaxDepthExceeded { depth: usize, span: Span },

    #[error("Cannot construct '{name}': {message}")]
    ConstructionFailed {
        name: String,
        message: String,
        span: Span,
    },

    // === QUERY GRAMMAR ===
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Query has no retrieve statement")]
    MissingRetrieve { span: Span },

    #[error("Query has more than one retrieve statement")]
    DuplicateRetrieve { span: Span },

    #[error("Range '{name}' is declared twice")]
    DuplicateRange { name: String, span: Span },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    #[error("Invalid window: {message}")]
    InvalidWindow { message: String, span: Span },

    #[error("Identifier chain longer than {limit} segments")]
    IdentifierChainTooLong { limit: usize, span: Span },

    #[error("Expression tree deeper than {limit} levels")]
    ExpressionTooDeep { limit: usize, span: Span },
}

impl ParserError {
    pub fn unexpected_token(expected: &str, found: impl ToString, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Lexer(inner) => inner.error_code(),
            Self::UnknownAnnotationClass { .. } => codes::syntax::UNKNOWN_ANNOTATION_CLASS,
            Self::NamedParameterRequired { .. } => codes::syntax::NAMED_PARAMETER_REQUIRED,
            Self::InvalidValueType { .. } => codes::syntax::INVALID_VALUE_TYPE,
            Self::ExpectedLiteral { .. } => codes::syntax::EXPECTED_LITERAL,
            Self::MalformedClassConstant { .. } => codes::syntax::MALFORMED_CLASS_CONSTANT,
            Self::MaxDepthExceeded { .. } => codes::syntax::MAX_DEPTH_EXCEEDED,
            Self::ConstructionFailed { .. } => codes::syntax::CONSTRUCTION_FAILED,
            Self::UnexpectedToken { .. } => codes::query::UNEXPECTED_TOKEN,
            Self::MissingRetrieve { .. } => codes::query::MISSING_RETRIEVE,
            Self::DuplicateRetrieve { .. } => codes::query::DUPLICATE_RETRIEVE,
            Self::DuplicateRange { .. } => codes::query::DUPLICATE_RANGE,
            Self::UnknownFunction { .. } => codes::query::UNKNOWN_FUNCTION,
            Self::InvalidWindow { .. } => codes::query::INVALID_WINDOW,
            Self::IdentifierChainTooLong { .. } => codes::query::IDENTIFIER_CHAIN_TOO_LONG,
            Self::ExpressionTooDeep { .. } => codes::query::EXPRESSION_TOO_DEEP,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Lexer(inner) => inner.span(),
            Self::UnknownAnnotationClass { span, .. }
            | Self::NamedParameterRequired { span }
            | Self::InvalidValueType { span, .. }
            | Self::ExpectedLiteral { span, .. }
            | Self::MalformedClassConstant { span, .. }
            | Self::MaxDepthExceeded { span, .. }
            | Self::ConstructionFailed { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::MissingRetrieve { span }
            | Self::DuplicateRetrieve { span }
            | Self::DuplicateRange { span, .. }
            | Self::UnknownFunction { span, .. }
            | Self::InvalidWindow { span, .. }
            | Self::IdentifierChainTooLong { span, .. }
            | Self::ExpressionTooDeep { span, .. } => *span,
        }
    }

    /// Whether the failure came from the lexer rather than the grammar
    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::Lexer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{Position, Span};

    #[test]
    fn test_lexer_errors_keep_their_code() {
        let span = Span::point(Position::new(3, 1, 4));
        let error: ParserError = LexerError::UnterminatedString { span }.into();

        assert!(error.is_lexical());
        assert_eq!(error.error_code(), codes::lexical::UNTERMINATED_STRING);
        assert_eq!(error.span(), span);
        assert_eq!(error.to_string(), "Unterminated string literal");
    }

    #[test]
    fn test_grammar_error_codes() {
        let span = Span::dummy();
        assert_eq!(
            ParserError::NamedParameterRequired { span }.error_code(),
            codes::syntax::NAMED_PARAMETER_REQUIRED
        );
        assert_eq!(
            ParserError::unexpected_token("')'", "','", span).error_code(),
            codes::query::UNEXPECTED_TOKEN
        );
    }
}
