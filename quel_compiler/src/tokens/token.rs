//! Token kinds and literal payloads
//!
//! Every operator and punctuation mark has a dedicated kind. Words are never
//! classified here: apart from `true`/`false`, a bare word is a `Parameter`
//! and the parser decides whether it is a keyword, a name or a function.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // === PUNCTUATION ===
    Dot,          // .
    Comma,        // ,
    Colon,        // :
    Semicolon,    // ;
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Backslash,    // \

    // === SINGLE-CHARACTER OPERATORS ===
    Plus,        // +
    Minus,       // -
    Star,        // *
    Slash,       // /
    Percent,     // %
    Caret,       // ^
    Ampersand,   // &
    Pipe,        // |
    Bang,        // !
    Question,    // ?
    Dollar,      // $
    Hash,        // #
    LessThan,    // <
    GreaterThan, // >
    Equals,      // =

    // === TWO-CHARACTER OPERATORS ===
    Equal,        // ==
    NotEqual,     // != or <>
    GreaterEqual, // >=
    LessEqual,    // <=
    LogicalAnd,   // &&
    LogicalOr,    // ||
    ShiftLeft,    // <<
    ShiftRight,   // >>
    Arrow,        // ->
    DoubleColon,  // ::

    // === LITERALS ===
    Number,
    String,
    True,
    False,

    // === STRUCTURAL ===
    /// A bare identifier
    Parameter,
    /// An `@Name` tag; the value holds the name without `@`
    Annotation,

    Eof,
    /// Soft error: a character no rule accepts, carried as the token value
    None,
}

impl TokenKind {
    /// Human-readable form used in error messages
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Backslash => "\\",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Caret => "^",
            Self::Ampersand => "&",
            Self::Pipe => "|",
            Self::Bang => "!",
            Self::Question => "?",
            Self::Dollar => "$",
            Self::Hash => "#",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::Equals => "=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Arrow => "->",
            Self::DoubleColon => "::",
            Self::Number => "number",
            Self::String => "string",
            Self::True => "true",
            Self::False => "false",
            Self::Parameter => "identifier",
            Self::Annotation => "annotation",
            Self::Eof => "end of input",
            Self::None => "unknown character",
        }
    }

    /// Two-character operators; consulted before the single-character table
    pub fn from_pair(first: u8, second: u8) -> Option<Self> {
        match (first, second) {
            (b'=', b'=') => Some(Self::Equal),
            (b'!', b'=') | (b'<', b'>') => Some(Self::NotEqual),
            (b'>', b'=') => Some(Self::GreaterEqual),
            (b'<', b'=') => Some(Self::LessEqual),
            (b'&', b'&') => Some(Self::LogicalAnd),
            (b'|', b'|') => Some(Self::LogicalOr),
            (b'<', b'<') => Some(Self::ShiftLeft),
            (b'>', b'>') => Some(Self::ShiftRight),
            (b'-', b'>') => Some(Self::Arrow),
            (b':', b':') => Some(Self::DoubleColon),
            _ => None,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'.' => Some(Self::Dot),
            b',' => Some(Self::Comma),
            b':' => Some(Self::Colon),
            b';' => Some(Self::Semicolon),
            b'(' => Some(Self::LeftParen),
            b')' => Some(Self::RightParen),
            b'{' => Some(Self::LeftBrace),
            b'}' => Some(Self::RightBrace),
            b'[' => Some(Self::LeftBracket),
            b']' => Some(Self::RightBracket),
            b'\\' => Some(Self::Backslash),
            b'+' => Some(Self::Plus),
            b'-' => Some(Self::Minus),
            b'*' => Some(Self::Star),
            b'/' => Some(Self::Slash),
            b'%' => Some(Self::Percent),
            b'^' => Some(Self::Caret),
            b'&' => Some(Self::Ampersand),
            b'|' => Some(Self::Pipe),
            b'!' => Some(Self::Bang),
            b'?' => Some(Self::Question),
            b'$' => Some(Self::Dollar),
            b'#' => Some(Self::Hash),
            b'<' => Some(Self::LessThan),
            b'>' => Some(Self::GreaterThan),
            b'=' => Some(Self::Equals),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number | Self::String | Self::True | Self::False)
    }

    /// Kinds that compare two operands in a condition
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::GreaterThan
                | Self::LessEqual
                | Self::GreaterEqual
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal payload carried by a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One lexical unit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    kind: TokenKind,
    value: Option<Literal>,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Self { kind, value: None }
    }

    pub fn with_value(kind: TokenKind, value: Literal) -> Self {
        Self {
            kind,
            value: Some(value),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn value(&self) -> Option<&Literal> {
        self.value.as_ref()
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// String payload of Parameter, String, Annotation and None tokens
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Whether this is a bare word equal to `keyword`, ignoring ASCII case
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Parameter
            && self
                .text()
                .map(|word| word.eq_ignore_ascii_case(keyword))
                .unwrap_or(false)
    }

    /// Source-like rendering, used for error messages and re-serialization
    pub fn to_source(&self) -> String {
        match (self.kind, &self.value) {
            (TokenKind::String, Some(Literal::String(s))) => format!("\"{}\"", s),
            (TokenKind::Annotation, Some(Literal::String(s))) => format!("@{}", s),
            (TokenKind::Eof, _) => String::new(),
            (_, Some(value)) => value.to_string(),
            (kind, None) => kind.symbol().to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Parameter | TokenKind::Number | TokenKind::None => {
                write!(f, "'{}'", self.to_source())
            }
            _ => f.write_str(&self.to_source()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_table_covers_operators() {
        assert_eq!(TokenKind::from_pair(b'=', b'='), Some(TokenKind::Equal));
        assert_eq!(TokenKind::from_pair(b'<', b'>'), Some(TokenKind::NotEqual));
        assert_eq!(TokenKind::from_pair(b':', b':'), Some(TokenKind::DoubleColon));
        assert_eq!(TokenKind::from_pair(b'=', b'>'), None);
    }

    #[test]
    fn test_symbol_round_trips_through_tables() {
        for byte in b".,:;(){}[]\\+-*/%^&|!?$#<>=" {
            let kind = TokenKind::from_byte(*byte).unwrap();
            assert_eq!(kind.symbol().as_bytes(), &[*byte]);
        }
    }

    #[test]
    fn test_keyword_match_ignores_case() {
        let token = Token::with_value(TokenKind::Parameter, Literal::String("Retrieve".into()));
        assert!(token.is_keyword("retrieve"));
        assert!(!token.is_keyword("range"));

        let string = Token::with_value(TokenKind::String, Literal::String("retrieve".into()));
        assert!(!string.is_keyword("retrieve"));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Token::new(TokenKind::ShiftLeft).to_string(), "<<");
        assert_eq!(
            Token::with_value(TokenKind::Annotation, Literal::String("Orm\\Table".into())).to_string(),
            "@Orm\\Table"
        );
        assert_eq!(Token::with_value(TokenKind::Number, Literal::Int(12)).to_string(), "'12'");
        assert_eq!(Token::new(TokenKind::Eof).to_string(), "end of input");
    }
}
