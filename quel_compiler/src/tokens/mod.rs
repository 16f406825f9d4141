//! Token system for ObjectQuel and docblock annotation sources
//!
//! The lexer produces [`Token`] values carrying a [`TokenKind`] and an
//! optional [`Literal`]. Tokens are transient: the parser consumes them
//! one at a time through the lexer's single-token lookahead and never keeps
//! them past the parse.
//!
//! ## Kinds
//!
//! - punctuation and operators, two-character forms (`==`, `!=`, `<>`, `>=`,
//!   `<=`, `&&`, `||`, `<<`, `>>`, `->`, `::`) taking priority over their
//!   one-character prefixes
//! - literals: `Number` (integer or float payload), `String` (raw quoted
//!   content), `True`, `False`
//! - `Parameter` for bare words and `Annotation` for `@Name` tags
//! - `Eof`, and `None` for characters no rule accepts

pub mod token;

pub use token::{Literal, Token, TokenKind};

use crate::utils::Spanned;

/// Token with its source location
pub type SpannedToken = Spanned<Token>;
