//! Lexical analysis
//!
//! [`Lexer`] is the pull-based interface the parser drives through its
//! single-token lookahead. [`tokenize`] drains a whole source into a vector,
//! which the CLI uses for `--tokens` output and the tests use to check
//! round-tripping.

pub mod lexer;

use crate::config::constants::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::logging::codes;
use crate::tokens::{SpannedToken, TokenKind};

pub use lexer::{Lexer, LexerError, LexerState};

/// Tokenize a whole source with default preferences. `Eof` is not included.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexerError> {
    tokenize_with_preferences(source, LexicalPreferences::default())
}

pub fn tokenize_with_preferences(
    source: &str,
    preferences: LexicalPreferences,
) -> Result<Vec<SpannedToken>, LexerError> {
    let collect_metrics = preferences.collect_metrics;
    let mut lexer = Lexer::with_preferences(source, preferences)?;
    let mut tokens = Vec::new();

    while !lexer.at_eof() {
        if tokens.len() >= MAX_TOKEN_COUNT {
            return Err(LexerError::TooManyTokens {
                span: lexer.peek_span(),
            });
        }
        tokens.push(lexer.get_spanned()?);
    }

    if collect_metrics {
        let counts = get_token_counts(&tokens);
        crate::log_success!(
            codes::success::TOKENIZATION_COMPLETE,
            "Tokenization completed",
            "total" => counts.total,
            "identifiers" => counts.identifiers,
            "literals" => counts.literals,
            "annotations" => counts.annotations,
            "operators" => counts.operators,
            "unknown" => counts.unknown
        );
    }

    Ok(tokens)
}

/// Token counts by category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCounts {
    pub total: usize,
    pub identifiers: usize,
    pub literals: usize,
    pub annotations: usize,
    pub operators: usize,
    pub unknown: usize,
}

pub fn get_token_counts(tokens: &[SpannedToken]) -> TokenCounts {
    let mut counts = TokenCounts::default();

    for token in tokens {
        counts.total += 1;
        match token.value.kind() {
            TokenKind::Parameter => counts.identifiers += 1,
            TokenKind::Annotation => counts.annotations += 1,
            TokenKind::None => counts.unknown += 1,
            TokenKind::Eof => counts.total -= 1,
            kind if kind.is_literal() => counts.literals += 1,
            _ => counts.operators += 1,
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::Token;

    fn tokens_of(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.into_inner())
            .collect()
    }

    #[test]
    fn test_reconstructed_source_lexes_identically() {
        let sources = [
            "@Orm\\Table(name=\"users\", indexes={@Index(columns={\"id\"})})",
            "range of c is App\\Entity\\Customer retrieve (c.name) where c.age >= 18 && c.id != :id",
            "x == 1.5 || y <> 'a b' -> z :: class << 2 >> 1 ? % ^ & | ! $ # [ ] ;",
        ];

        for source in sources {
            let original = tokens_of(source);
            let rebuilt: Vec<String> = original.iter().map(|t| t.to_source()).collect();
            let relexed = tokens_of(&rebuilt.join(" "));
            assert_eq!(original, relexed, "round trip of {:?}", source);
        }
    }

    #[test]
    fn test_token_counts() {
        let tokens = tokenize("@Foo(bar = 1, \"x\") €").unwrap();
        let counts = get_token_counts(&tokens);

        assert_eq!(counts.total, 9);
        assert_eq!(counts.annotations, 1);
        assert_eq!(counts.identifiers, 1);
        assert_eq!(counts.literals, 2);
        assert_eq!(counts.operators, 4);
        assert_eq!(counts.unknown, 1);
    }

    #[test]
    fn test_empty_source() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("/** */").unwrap().is_empty());
    }
}
