//! Shared source-location types used by the lexer, parser and AST

pub mod span;

pub use span::{Position, SourceMap, Span, Spanned};
