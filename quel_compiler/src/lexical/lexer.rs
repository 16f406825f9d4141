//! Single-lookahead lexer for docblock annotations and ObjectQuel queries
//!
//! The lexer always holds exactly one token of lookahead. Speculative
//! parsing snapshots `(position, lookahead)` as a [`LexerState`] and rewinds
//! to it, so a failed probe never costs more than the tokens it looked at.

use crate::config::constants::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::logging::codes;
use crate::tokens::{Literal, SpannedToken, Token, TokenKind};
use crate::utils::{Position, Span, Spanned};

/// Lexical errors. Each carries the span of the offending text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken {
        expected: TokenKind,
        found: String,
        span: Span,
    },

    #[error("Malformed number '{text}'")]
    MalformedNumber { text: String, span: Span },

    #[error("Unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("Newline inside string literal")]
    NewlineInString { span: Span },

    #[error("Source too large: {size} bytes (max {MAX_SOURCE_SIZE})")]
    SourceTooLarge { size: usize },

    #[error("String too large: {size} bytes (max {MAX_STRING_SIZE})")]
    StringTooLarge { size: usize, span: Span },

    #[error("Identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH})")]
    IdentifierTooLong { length: usize, span: Span },

    #[error("Too many tokens: more than {MAX_TOKEN_COUNT}")]
    TooManyTokens { span: Span },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            Self::UnexpectedToken { .. } => codes::lexical::UNEXPECTED_TOKEN,
            Self::MalformedNumber { .. } => codes::lexical::MALFORMED_NUMBER,
            Self::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            Self::NewlineInString { .. } => codes::lexical::NEWLINE_IN_STRING,
            Self::SourceTooLarge { .. } => codes::lexical::SOURCE_TOO_LARGE,
            Self::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            Self::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            Self::TooManyTokens { .. } => codes::lexical::TOKEN_LIMIT_EXCEEDED,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::MalformedNumber { span, .. }
            | Self::UnterminatedString { span }
            | Self::NewlineInString { span }
            | Self::StringTooLarge { span, .. }
            | Self::IdentifierTooLong { span, .. }
            | Self::TooManyTokens { span } => *span,
            Self::SourceTooLarge { .. } => Span::dummy(),
        }
    }
}

/// Snapshot for speculative parsing
#[derive(Debug, Clone, PartialEq)]
pub struct LexerState {
    position: Position,
    lookahead: SpannedToken,
}

impl LexerState {
    pub fn position(&self) -> Position {
        self.position
    }
}

#[derive(Debug)]
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    /// Where the next call to `next_token` starts scanning
    position: Position,
    lookahead: SpannedToken,
    preferences: LexicalPreferences,
}

impl<'src> Lexer<'src> {
    /// Create a lexer and prime the lookahead
    pub fn new(source: &'src str) -> Result<Self, LexerError> {
        Self::with_preferences(source, LexicalPreferences::default())
    }

    pub fn with_preferences(
        source: &'src str,
        preferences: LexicalPreferences,
    ) -> Result<Self, LexerError> {
        if source.len() > MAX_SOURCE_SIZE {
            return Err(LexerError::SourceTooLarge { size: source.len() });
        }

        let mut lexer = Self {
            source,
            bytes: source.as_bytes(),
            position: Position::start(),
            lookahead: Spanned::new(Token::new(TokenKind::Eof), Span::dummy()),
            preferences,
        };
        lexer.lookahead = lexer.next_token()?;
        Ok(lexer)
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    // ========================================================================
    // LOOKAHEAD API
    // ========================================================================

    /// Current lookahead, not consumed
    pub fn peek(&self) -> &Token {
        &self.lookahead.value
    }

    pub fn peek_span(&self) -> Span {
        self.lookahead.span
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.lookahead.value.kind()
    }

    pub fn at_eof(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    /// Consume and return the lookahead
    pub fn get(&mut self) -> Result<Token, LexerError> {
        self.get_spanned().map(Spanned::into_inner)
    }

    pub fn get_spanned(&mut self) -> Result<SpannedToken, LexerError> {
        let next = self.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    /// Consume the lookahead if it has `kind`, fail otherwise
    pub fn match_token(&mut self, kind: TokenKind) -> Result<Token, LexerError> {
        if self.peek_kind() != kind {
            return Err(LexerError::UnexpectedToken {
                expected: kind,
                found: self.peek().to_string(),
                span: self.peek_span(),
            });
        }
        self.get()
    }

    /// Consume the lookahead if it has `kind`; `None` leaves it in place
    pub fn optional_match(&mut self, kind: TokenKind) -> Result<Option<Token>, LexerError> {
        if self.peek_kind() == kind {
            self.get().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn save_state(&self) -> LexerState {
        LexerState {
            position: self.position,
            lookahead: self.lookahead.clone(),
        }
    }

    pub fn restore_state(&mut self, state: LexerState) {
        self.position = state.position;
        self.lookahead = state.lookahead;
    }

    /// Run `probe` and rewind afterwards whatever it returned.
    /// Lexer errors inside the probe count as "no match".
    pub fn speculate<F>(&mut self, probe: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<bool, LexerError>,
    {
        let state = self.save_state();
        let matched = probe(self).unwrap_or(false);
        self.restore_state(state);
        matched
    }

    // ========================================================================
    // SCANNING
    // ========================================================================

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.position.offset).copied()
    }

    fn byte_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.position.offset + ahead).copied()
    }

    /// Advance over ASCII bytes that are not newlines
    fn bump(&mut self, count: usize) {
        self.position = Position::new(
            self.position.offset + count,
            self.position.line,
            self.position.column + count as u32,
        );
    }

    fn bump_newline(&mut self) {
        self.position = self.position.advance('\n');
    }

    /// Skip whitespace and doc-block decoration
    fn skip_noise(&mut self) {
        let strip = self.preferences.strip_doc_decoration;
        let mut at_line_start = self.position.offset == 0;

        while let Some(byte) = self.current() {
            match byte {
                b' ' | b'\t' | b'\r' => self.bump(1),
                b'\n' => {
                    self.bump_newline();
                    at_line_start = true;
                }
                b'/' if strip && self.byte_at(1) == Some(b'*') => {
                    self.bump(1);
                    while self.current() == Some(b'*') {
                        self.bump(1);
                    }
                    at_line_start = false;
                }
                b'*' if strip && self.byte_at(1) == Some(b'/') => {
                    self.bump(2);
                    at_line_start = false;
                }
                b'*' if strip && at_line_start => {
                    self.bump(1);
                    at_line_start = false;
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, LexerError> {
        self.skip_noise();
        let start = self.position;

        let Some(byte) = self.current() else {
            return Ok(Spanned::new(Token::new(TokenKind::Eof), Span::point(start)));
        };

        let token = if let Some(kind) = self
            .byte_at(1)
            .and_then(|second| TokenKind::from_pair(byte, second))
        {
            self.bump(2);
            Token::new(kind)
        } else if byte.is_ascii_digit() {
            self.lex_number(start)?
        } else if let Some(kind) = TokenKind::from_byte(byte) {
            self.bump(1);
            Token::new(kind)
        } else if byte == b'"' || byte == b'\'' {
            self.lex_string(start, byte)?
        } else if byte == b'@' && self.byte_at(1).is_some_and(is_annotation_byte) {
            self.lex_annotation()
        } else if byte.is_ascii_alphabetic() {
            self.lex_word(start)?
        } else {
            self.lex_unknown()
        };

        Ok(Spanned::new(token, Span::new(start, self.position)))
    }

    /// Digits with at most one interior `.`; a `.` only joins the number
    /// when a digit follows it
    fn lex_number(&mut self, start: Position) -> Result<Token, LexerError> {
        let mut dots = 0;
        while let Some(byte) = self.current() {
            if byte.is_ascii_digit() {
                self.bump(1);
            } else if byte == b'.' && self.byte_at(1).is_some_and(|b| b.is_ascii_digit()) {
                dots += 1;
                self.bump(1);
            } else {
                break;
            }
        }

        let text = &self.source[start.offset..self.position.offset];
        let malformed = || LexerError::MalformedNumber {
            text: text.to_string(),
            span: Span::new(start, self.position),
        };

        match dots {
            0 => text
                .parse::<i64>()
                .map(|value| Token::with_value(TokenKind::Number, Literal::Int(value)))
                .map_err(|_| malformed()),
            1 => text
                .parse::<f64>()
                .map(|value| Token::with_value(TokenKind::Number, Literal::Float(value)))
                .map_err(|_| malformed()),
            _ => Err(malformed()),
        }
    }

    /// Raw content between matching quotes; no escape processing
    fn lex_string(&mut self, start: Position, quote: u8) -> Result<Token, LexerError> {
        let content_start = start.offset + 1;
        let mut end = content_start;

        loop {
            match self.bytes.get(end) {
                None => {
                    let eof = start.advance_str(&self.source[start.offset..]);
                    return Err(LexerError::UnterminatedString {
                        span: Span::new(start, eof),
                    });
                }
                Some(b'\n') | Some(b'\r') => {
                    let at_newline = start.advance_str(&self.source[start.offset..end]);
                    return Err(LexerError::NewlineInString {
                        span: Span::new(start, at_newline),
                    });
                }
                Some(&b) if b == quote => break,
                Some(_) => end += 1,
            }
        }

        let content = &self.source[content_start..end];
        if content.len() > MAX_STRING_SIZE {
            return Err(LexerError::StringTooLarge {
                size: content.len(),
                span: Span::new(start, start.advance_str(&self.source[start.offset..=end])),
            });
        }

        self.position = start.advance_str(&self.source[start.offset..=end]);
        Ok(Token::with_value(
            TokenKind::String,
            Literal::String(content.to_string()),
        ))
    }

    /// `@` followed by letters, digits and namespace separators
    fn lex_annotation(&mut self) -> Token {
        self.bump(1);
        let name_start = self.position.offset;
        while self.current().is_some_and(is_annotation_byte) {
            self.bump(1);
        }
        let name = &self.source[name_start..self.position.offset];
        Token::with_value(TokenKind::Annotation, Literal::String(name.to_string()))
    }

    /// Identifier, or a boolean literal for `true`/`false` in any case
    fn lex_word(&mut self, start: Position) -> Result<Token, LexerError> {
        while self
            .current()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            self.bump(1);
        }

        let word = &self.source[start.offset..self.position.offset];
        if word.len() > MAX_IDENTIFIER_LENGTH {
            return Err(LexerError::IdentifierTooLong {
                length: word.len(),
                span: Span::new(start, self.position),
            });
        }

        let token = if word.eq_ignore_ascii_case("true") {
            Token::with_value(TokenKind::True, Literal::Bool(true))
        } else if word.eq_ignore_ascii_case("false") {
            Token::with_value(TokenKind::False, Literal::Bool(false))
        } else {
            Token::with_value(TokenKind::Parameter, Literal::String(word.to_string()))
        };
        Ok(token)
    }

    /// Wrap one whole character, including multi-byte UTF-8 sequences
    fn lex_unknown(&mut self) -> Token {
        let ch = self.source[self.position.offset..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        self.position = self.position.advance(ch);

        crate::log_debug!("Unrecognized character",
            "char" => ch,
            "position" => self.position
        );

        Token::with_value(TokenKind::None, Literal::String(ch.to_string()))
    }
}

fn is_annotation_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'\\'
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source).unwrap();
        let mut kinds = Vec::new();
        while !lexer.at_eof() {
            kinds.push(lexer.get().unwrap().kind());
        }
        kinds
    }

    fn first_error(source: &str) -> LexerError {
        let mut lexer = match Lexer::new(source) {
            Ok(lexer) => lexer,
            Err(e) => return e,
        };
        loop {
            match lexer.get() {
                Ok(token) if token.is(TokenKind::Eof) => panic!("no error in {:?}", source),
                Ok(_) => {}
                Err(e) => return e,
            }
        }
    }

    #[test]
    fn test_two_char_operator_wins() {
        assert_eq!(kinds("=="), vec![TokenKind::Equal]);
        assert_eq!(kinds("="), vec![TokenKind::Equals]);
        assert_eq!(
            kinds("!= <> >= <= && || << >> -> ::"),
            vec![
                TokenKind::NotEqual,
                TokenKind::NotEqual,
                TokenKind::GreaterEqual,
                TokenKind::LessEqual,
                TokenKind::LogicalAnd,
                TokenKind::LogicalOr,
                TokenKind::ShiftLeft,
                TokenKind::ShiftRight,
                TokenKind::Arrow,
                TokenKind::DoubleColon,
            ]
        );
        assert_eq!(kinds("= ="), vec![TokenKind::Equals, TokenKind::Equals]);
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("12 1.2").unwrap();
        assert_eq!(lexer.get().unwrap().value(), Some(&Literal::Int(12)));
        assert_eq!(lexer.get().unwrap().value(), Some(&Literal::Float(1.2)));

        assert_matches!(
            first_error("1.2.3"),
            LexerError::MalformedNumber { ref text, .. } if text == "1.2.3"
        );
    }

    #[test]
    fn test_trailing_dot_is_separate_token() {
        assert_eq!(
            kinds("servers.0.name"),
            vec![
                TokenKind::Parameter,
                TokenKind::Dot,
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Parameter,
            ]
        );
    }

    #[test]
    fn test_integer_overflow_is_malformed() {
        assert_matches!(
            first_error("99999999999999999999"),
            LexerError::MalformedNumber { .. }
        );
    }

    #[test]
    fn test_string_errors() {
        assert_matches!(first_error("\"abc"), LexerError::UnterminatedString { .. });
        assert_matches!(first_error("\"ab\nc\""), LexerError::NewlineInString { .. });
        assert_matches!(first_error("'open"), LexerError::UnterminatedString { .. });
    }

    #[test]
    fn test_strings_are_raw() {
        let mut lexer = Lexer::new(r#""a\nb" 'c\'"#).unwrap();
        assert_eq!(lexer.get().unwrap().text(), Some(r"a\nb"));
        assert_eq!(lexer.get().unwrap().text(), Some("c\\"));
    }

    #[test]
    fn test_multibyte_string_content_preserved() {
        let mut lexer = Lexer::new("\"naïve café ✓\" x").unwrap();
        let token = lexer.get().unwrap();
        assert_eq!(token.text(), Some("naïve café ✓"));
        assert_eq!(lexer.peek().text(), Some("x"));
    }

    #[test]
    fn test_unknown_character_is_soft_error() {
        let mut lexer = Lexer::new("a € b").unwrap();
        lexer.get().unwrap();
        let unknown = lexer.get().unwrap();
        assert_eq!(unknown.kind(), TokenKind::None);
        assert_eq!(unknown.text(), Some("€"));
        assert_eq!(lexer.get().unwrap().text(), Some("b"));
    }

    #[test]
    fn test_booleans_case_insensitive() {
        assert_eq!(
            kinds("true FALSE True nulls"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::True,
                TokenKind::Parameter,
            ]
        );
    }

    #[test]
    fn test_identifier_continuation() {
        let mut lexer = Lexer::new("property-read window_size x9").unwrap();
        assert_eq!(lexer.get().unwrap().text(), Some("property-read"));
        assert_eq!(lexer.get().unwrap().text(), Some("window_size"));
        assert_eq!(lexer.get().unwrap().text(), Some("x9"));
    }

    #[test]
    fn test_annotation_tag() {
        let mut lexer = Lexer::new("@Orm\\Table(name=\"users\")").unwrap();
        let tag = lexer.get().unwrap();
        assert_eq!(tag.kind(), TokenKind::Annotation);
        assert_eq!(tag.text(), Some("Orm\\Table"));
        assert_eq!(lexer.peek_kind(), TokenKind::LeftParen);

        // A bare `@` is not a tag
        assert_eq!(kinds("@ x"), vec![TokenKind::None, TokenKind::Parameter]);
    }

    #[test]
    fn test_doc_decoration_stripped() {
        let doc = "/**\n * @Foo(1)\n *\n * @Bar\n */";
        assert_eq!(
            kinds(doc),
            vec![
                TokenKind::Annotation,
                TokenKind::LeftParen,
                TokenKind::Number,
                TokenKind::RightParen,
                TokenKind::Annotation,
            ]
        );
    }

    #[test]
    fn test_star_inside_line_is_operator() {
        assert_eq!(
            kinds("a * b"),
            vec![TokenKind::Parameter, TokenKind::Star, TokenKind::Parameter]
        );
    }

    #[test]
    fn test_decoration_can_be_disabled() {
        let preferences = LexicalPreferences {
            strip_doc_decoration: false,
            ..LexicalPreferences::default()
        };
        let mut lexer = Lexer::with_preferences("a\n* b", preferences).unwrap();
        let mut seen = Vec::new();
        while !lexer.at_eof() {
            seen.push(lexer.get().unwrap().kind());
        }
        assert_eq!(
            seen,
            vec![TokenKind::Parameter, TokenKind::Star, TokenKind::Parameter]
        );
    }

    #[test]
    fn test_match_and_optional_match() {
        let mut lexer = Lexer::new("( x").unwrap();
        assert!(lexer.optional_match(TokenKind::Comma).unwrap().is_none());
        assert!(lexer.optional_match(TokenKind::LeftParen).unwrap().is_some());

        let err = lexer.match_token(TokenKind::RightParen).unwrap_err();
        assert_matches!(
            err,
            LexerError::UnexpectedToken { expected: TokenKind::RightParen, ref found, .. } if found == "'x'"
        );
        assert_eq!(lexer.match_token(TokenKind::Parameter).unwrap().text(), Some("x"));
        assert!(lexer.at_eof());
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut lexer = Lexer::new("a . b :: class").unwrap();
        let state = lexer.save_state();
        lexer.get().unwrap();
        lexer.get().unwrap();
        assert_eq!(lexer.peek().text(), Some("b"));

        lexer.restore_state(state.clone());
        assert_eq!(lexer.save_state(), state);
        assert_eq!(lexer.peek().text(), Some("a"));
    }

    #[test]
    fn test_speculate_restores_after_error() {
        let mut lexer = Lexer::new("x 1.2.3").unwrap();
        let before = lexer.save_state();

        let matched = lexer.speculate(|lexer| {
            lexer.get()?;
            lexer.get()?;
            Ok(true)
        });

        assert!(!matched);
        assert_eq!(lexer.save_state(), before);
    }

    #[test]
    fn test_spans_track_lines() {
        let mut lexer = Lexer::new("range\n  of").unwrap();
        let first = lexer.get_spanned().unwrap();
        assert_eq!(first.span.start, Position::new(0, 1, 1));
        let second = lexer.get_spanned().unwrap();
        assert_eq!(second.span.start, Position::new(8, 2, 3));
        assert_eq!(second.span.end.column, 5);
    }

    #[test]
    fn test_source_size_limit() {
        let huge = " ".repeat(MAX_SOURCE_SIZE + 1);
        assert_matches!(Lexer::new(&huge), Err(LexerError::SourceTooLarge { .. }));
    }
}
