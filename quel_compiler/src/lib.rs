pub mod batch;
pub mod config;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod syntax;
pub mod tokens;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults, ParsedSource, Source, SourceKind};
pub use grammar::{Ast, Node, NodeId, Visitor};
pub use lexical::{Lexer, LexerError};
pub use syntax::{
    parse_annotations, parse_condition, parse_query, AnnotationCollection, ParseContext,
    Parser, ParserError, SyntaxTree, TypeRegistry, TypeResolver, Value,
};
pub use tokens::{Token, TokenKind};
