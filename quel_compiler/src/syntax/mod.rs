//! Syntax analysis: source text to annotation values or query trees
//!
//! The free functions here are the main API. Each builds a [`Lexer`] and a
//! [`Parser`] for one source, runs one grammar entry point and reports the
//! outcome through the global logger.

pub mod error;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod values;

pub use error::{ParseResult, ParserError};
pub use parser::{is_ignored_tag, ParseContext, Parser};
pub use query::SyntaxTree;
pub use resolver::{ClassNameResolver, ImportTable, TypeRegistry, TypeResolver};
pub use values::{
    Annotation, AnnotationCollection, AnnotationEntry, Value, ValueKey, ValueMap, DEFAULT_KEY,
};

use crate::config::{LexicalPreferences, RuntimeConfig};
use crate::lexical::Lexer;
use crate::logging::{self, codes};
use crate::{log_debug, log_error, log_success};

fn build_parser<'src, R: TypeResolver>(
    source: &'src str,
    context: ParseContext,
    types: R,
    config: &RuntimeConfig,
    lexical: LexicalPreferences,
) -> ParseResult<Parser<'src, R>> {
    let lexer = Lexer::with_preferences(source, lexical)?;
    Ok(Parser::with_preferences(
        lexer,
        context,
        types,
        config.parser.clone(),
    ))
}

/// Query text is not a docblock, so a `*` at the start of a line stays an
/// operator.
fn query_lexical(config: &RuntimeConfig) -> LexicalPreferences {
    LexicalPreferences {
        strip_doc_decoration: false,
        ..config.lexical.clone()
    }
}

/// Logs the outcome of one parse. `detail` only runs when a global logger
/// is installed.
fn report<T>(
    result: &ParseResult<T>,
    what: &str,
    success: crate::logging::Code,
    detail: impl Fn(&T) -> String,
) {
    if !logging::is_initialized() {
        return;
    }
    match result {
        Ok(value) => {
            log_success!(success, &format!("{} parsed", what), "detail" => detail(value));
        }
        Err(error) => {
            log_error!(error.error_code(), &format!("{} parsing failed", what),
                span = error.span(),
                "error" => error
            );
        }
    }
}

/// Parse every annotation in a docblock with default preferences
pub fn parse_annotations<R: TypeResolver>(
    source: &str,
    context: ParseContext,
    types: R,
) -> ParseResult<AnnotationCollection> {
    parse_annotations_with_config(source, context, types, &RuntimeConfig::default())
}

pub fn parse_annotations_with_config<R: TypeResolver>(
    source: &str,
    context: ParseContext,
    types: R,
    config: &RuntimeConfig,
) -> ParseResult<AnnotationCollection> {
    log_debug!("Parsing annotations", "bytes" => source.len());

    let result = build_parser(source, context, types, config, config.lexical.clone())
        .and_then(|mut parser| parser.parse_annotations());
    report(&result, "Annotations", codes::success::ANNOTATIONS_PARSED, |annotations| {
        format!("{} annotations", annotations.len())
    });
    result
}

/// Parse a complete ObjectQuel query with default preferences.
///
/// Queries are lexed without doc-comment stripping, so a line that starts
/// with `*` keeps its multiplication.
pub fn parse_query<R: TypeResolver>(
    source: &str,
    context: ParseContext,
    types: R,
) -> ParseResult<SyntaxTree> {
    parse_query_with_config(source, context, types, &RuntimeConfig::default())
}

pub fn parse_query_with_config<R: TypeResolver>(
    source: &str,
    context: ParseContext,
    types: R,
    config: &RuntimeConfig,
) -> ParseResult<SyntaxTree> {
    log_debug!("Parsing query", "bytes" => source.len());

    let result = build_parser(source, context, types, config, query_lexical(config))
        .and_then(|mut parser| parser.parse_query());
    report(&result, "Query", codes::success::QUERY_PARSED, |tree| {
        format!("{} nodes", tree.ast.len())
    });
    result
}

/// Parse a standalone condition such as `o.total > 100 and o.paid = true`
pub fn parse_condition<R: TypeResolver>(
    source: &str,
    context: ParseContext,
    types: R,
) -> ParseResult<SyntaxTree> {
    parse_condition_with_config(source, context, types, &RuntimeConfig::default())
}

pub fn parse_condition_with_config<R: TypeResolver>(
    source: &str,
    context: ParseContext,
    types: R,
    config: &RuntimeConfig,
) -> ParseResult<SyntaxTree> {
    let result = build_parser(source, context, types, config, query_lexical(config))
        .and_then(|mut parser| parser.parse_condition());
    report(&result, "Condition", codes::success::CONDITION_PARSED, |tree| {
        format!("{} nodes", tree.ast.len())
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Node;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_annotations_entry_point() {
        let types = TypeRegistry::with_types(["App\\Mapping\\Column"]);
        let context = ParseContext::new().with_import("ORM", "App\\Mapping");

        let annotations = parse_annotations(
            "/**\n * Stores the name of the user.\n * @ORM\\Column(name=\"user_name\", length=64)\n * @var string\n */",
            context,
            &types,
        )
        .unwrap();

        assert_eq!(annotations.len(), 1);
        let column = annotations
            .first("App\\Mapping\\Column")
            .and_then(Value::as_annotation)
            .unwrap();
        assert_eq!(column.parameter("name").and_then(Value::as_str), Some("user_name"));
        assert_eq!(column.parameter("length").and_then(Value::as_i64), Some(64));
    }

    #[test]
    fn test_parse_query_entry_point() {
        let tree = parse_query(
            "range of p is Product retrieve (p.name) where p.price < 10",
            ParseContext::new().with_namespace("Shop"),
            TypeRegistry::with_types(["Shop\\Product"]),
        )
        .unwrap();

        let retrieve = tree.retrieve().unwrap();
        let Node::RangeDatabase { entity, .. } = tree.ast.node(retrieve.ranges[0]) else {
            panic!("expected a database range");
        };
        assert_matches!(tree.ast.node(*entity), Node::Entity { name, .. } if name == "Shop\\Product");
        assert_eq!(tree.to_json()["type"], "Retrieve");
    }

    #[test]
    fn test_config_limits_apply() {
        let mut config = RuntimeConfig::default();
        config.parser.max_nesting_depth = 2;

        let result = parse_condition_with_config("((a))", ParseContext::new(), TypeRegistry::new(), &config);
        assert_matches!(result, Err(ParserError::MaxDepthExceeded { depth: 2, .. }));

        assert!(parse_condition_with_config("(a)", ParseContext::new(), TypeRegistry::new(), &config).is_ok());
    }

    #[test]
    fn test_query_keeps_leading_star() {
        let tree = parse_condition("o.price\n * o.qty > 10", ParseContext::new(), TypeRegistry::new()).unwrap();
        assert_eq!(
            tree.describe(),
            "Expression(>, Factor(*, Identifier(o.price), Identifier(o.qty)), Number(10))"
        );
    }

    #[test]
    fn test_docblock_prose_with_apostrophe_fails() {
        let result = parse_annotations(
            "/**\n * It's the @Table(name=\"users\") entity\n * @Column\n */",
            ParseContext::new(),
            TypeRegistry::with_types(["Table", "Column"]),
        );
        assert_matches!(result, Err(error) if error.is_lexical());
    }

    #[test]
    fn test_long_condition_fails_cleanly() {
        let source = format!("a{}", " and a".repeat(10_000));
        let result = parse_condition(&source, ParseContext::new(), TypeRegistry::new());
        assert_matches!(result, Err(ParserError::ExpressionTooDeep { .. }));
    }

    #[test]
    fn test_lexer_errors_surface_as_parser_errors() {
        let result = parse_condition("name = 'open", ParseContext::new(), TypeRegistry::new());
        assert_matches!(result, Err(error) if error.is_lexical());
    }
}
