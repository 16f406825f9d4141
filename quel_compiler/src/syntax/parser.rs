//! Recursive-descent parser: shared token helpers and the annotation grammar
//!
//! One `Parser` consumes one source. The annotation grammar lives here; the
//! ObjectQuel query grammar is implemented on the same type in `query.rs`.

use super::error::{ParseResult, ParserError};
use super::resolver::{ClassNameResolver, ImportTable, TypeResolver};
use super::values::{AnnotationCollection, Value, ValueKey, ValueMap, DEFAULT_KEY};
use crate::config::constants::compile_time::syntax::MAX_NESTING_DEPTH;
use crate::config::{ConfigMap, ParserPreferences};
use crate::grammar::Ast;
use crate::lexical::{Lexer, LexerError};
use crate::tokens::{Literal, SpannedToken, Token, TokenKind};
use crate::utils::{Span, Spanned};
use crate::log_debug;

/// Doc tags that never denote annotation classes
const IGNORED_TAGS: &[&str] = &[
    "api",
    "author",
    "category",
    "copyright",
    "deprecated",
    "example",
    "filesource",
    "global",
    "ignore",
    "inheritdoc",
    "internal",
    "license",
    "link",
    "method",
    "package",
    "param",
    "property",
    "return",
    "see",
    "since",
    "source",
    "subpackage",
    "throws",
    "todo",
    "uses",
    "var",
    "version",
];

/// Swagger-style documentation namespace, skipped with its arguments
const IGNORED_PREFIX: &str = "oa\\";

pub fn is_ignored_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    IGNORED_TAGS.contains(&lower.as_str()) || lower.starts_with(IGNORED_PREFIX)
}

/// Data injected into a parse by the caller
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    /// Source of `${dotted.key}` placeholders
    pub config: ConfigMap,
    pub imports: ImportTable,
    pub namespace: Option<String>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    pub fn with_import(mut self, alias: impl Into<String>, fqn: impl Into<String>) -> Self {
        self.imports.insert(alias, fqn);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

pub struct Parser<'src, R: TypeResolver> {
    pub(super) lexer: Lexer<'src>,
    config: ConfigMap,
    names: ClassNameResolver,
    pub(super) types: R,
    preferences: ParserPreferences,
    depth: usize,
    /// Span of the most recently consumed token
    last_span: Span,
    pub(super) ast: Ast,
}

impl<'src, R: TypeResolver> Parser<'src, R> {
    pub fn new(lexer: Lexer<'src>, context: ParseContext, types: R) -> Self {
        Self::with_preferences(lexer, context, types, ParserPreferences::default())
    }

    pub fn with_preferences(
        lexer: Lexer<'src>,
        context: ParseContext,
        types: R,
        preferences: ParserPreferences,
    ) -> Self {
        let mut names = ClassNameResolver::new(context.imports, context.namespace);
        names.set_cache_enabled(preferences.enable_resolution_cache);

        Self {
            lexer,
            config: context.config,
            names,
            types,
            preferences,
            depth: 0,
            last_span: Span::dummy(),
            ast: Ast::new(),
        }
    }

    pub fn lexer(&self) -> &Lexer<'src> {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<'src> {
        &mut self.lexer
    }

    pub fn names(&self) -> &ClassNameResolver {
        &self.names
    }

    pub fn resolve_class_name(&mut self, name: &str) -> String {
        self.names.resolve(name, &self.types)
    }

    // ========================================================================
    // TOKEN HELPERS
    // ========================================================================

    pub(super) fn peek(&self) -> &Token {
        self.lexer.peek()
    }

    pub(super) fn peek_kind(&self) -> TokenKind {
        self.lexer.peek_kind()
    }

    pub(super) fn peek_span(&self) -> Span {
        self.lexer.peek_span()
    }

    pub(super) fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    pub(super) fn bump(&mut self) -> ParseResult<SpannedToken> {
        let token = self.lexer.get_spanned()?;
        self.last_span = token.span;
        Ok(token)
    }

    pub(super) fn expect(&mut self, kind: TokenKind) -> ParseResult<SpannedToken> {
        if self.peek_kind() != kind {
            return Err(LexerError::UnexpectedToken {
                expected: kind,
                found: self.peek().to_string(),
                span: self.peek_span(),
            }
            .into());
        }
        self.bump()
    }

    pub(super) fn eat(&mut self, kind: TokenKind) -> ParseResult<Option<SpannedToken>> {
        if self.peek_kind() == kind {
            self.bump().map(Some)
        } else {
            Ok(None)
        }
    }

    pub(super) fn eat_keyword(&mut self, keyword: &str) -> ParseResult<bool> {
        if self.at_keyword(keyword) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(super) fn expect_keyword(&mut self, keyword: &str) -> ParseResult<Span> {
        if !self.at_keyword(keyword) {
            return Err(ParserError::unexpected_token(
                &format!("'{}'", keyword),
                self.peek(),
                self.peek_span(),
            ));
        }
        Ok(self.bump()?.span)
    }

    /// A bare word
    pub(super) fn expect_name(&mut self, what: &str) -> ParseResult<Spanned<String>> {
        if self.peek_kind() != TokenKind::Parameter {
            return Err(ParserError::unexpected_token(what, self.peek(), self.peek_span()));
        }
        let token = self.bump()?;
        let name = token.value.text().unwrap_or_default().to_string();
        Ok(Spanned::new(name, token.span))
    }

    /// `start` widened to the last consumed token
    pub(super) fn span_from(&self, start: Span) -> Span {
        start.merge(self.last_span)
    }

    pub(super) fn max_depth(&self) -> usize {
        self.preferences.max_nesting_depth.clamp(1, MAX_NESTING_DEPTH)
    }

    /// Runs `f` one nesting level deeper
    pub(super) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let limit = self.max_depth();
        if self.depth >= limit {
            return Err(ParserError::MaxDepthExceeded {
                depth: limit,
                span: self.peek_span(),
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// `\`? NAME (`\` NAME)*
    pub(super) fn parse_qualified_name(&mut self) -> ParseResult<Spanned<String>> {
        let start = self.peek_span();
        let mut name = String::new();
        if self.eat(TokenKind::Backslash)?.is_some() {
            name.push('\\');
        }
        name.push_str(&self.expect_name("class name")?.value);
        while self.eat(TokenKind::Backslash)?.is_some() {
            name.push('\\');
            name.push_str(&self.expect_name("class name")?.value);
        }
        Ok(Spanned::new(name, self.span_from(start)))
    }

    // ========================================================================
    // SPECULATIVE PROBES
    // ========================================================================

    /// Whether a `Name::class` reference starts here. Never consumes input.
    pub fn is_class_constant(&mut self) -> bool {
        self.lexer.speculate(|lexer| {
            lexer.optional_match(TokenKind::Backslash)?;
            lexer.match_token(TokenKind::Parameter)?;
            while lexer.optional_match(TokenKind::Backslash)?.is_some() {
                lexer.match_token(TokenKind::Parameter)?;
            }
            Ok(lexer.peek_kind() == TokenKind::DoubleColon)
        })
    }

    /// Whether a `name=value` parameter starts here. Never consumes input.
    pub fn is_named_parameter(&mut self) -> bool {
        self.lexer.speculate(|lexer| {
            if lexer.peek_kind() != TokenKind::Parameter {
                return Ok(false);
            }
            lexer.get()?;
            Ok(lexer.peek_kind() == TokenKind::Equals)
        })
    }

    /// Whether a structure key (`key=`, `"key":`, `1:`) starts here
    fn is_structure_key(&mut self) -> bool {
        self.lexer.speculate(|lexer| {
            match lexer.peek_kind() {
                TokenKind::Parameter | TokenKind::String | TokenKind::Number => {
                    lexer.get()?;
                }
                _ => return Ok(false),
            }
            Ok(matches!(
                lexer.peek_kind(),
                TokenKind::Equals | TokenKind::Colon
            ))
        })
    }

    // ========================================================================
    // VALUES
    // ========================================================================

    /// One value, or `None` when nothing at the lookahead starts a value
    pub fn parse_value(&mut self) -> ParseResult<Option<Value>> {
        let value = match self.peek_kind() {
            TokenKind::Dollar => self.parse_placeholder()?,
            TokenKind::LeftBrace => Value::List(self.parse_json()?),
            TokenKind::Annotation => self.parse_annotation()?,
            TokenKind::String => {
                let token = self.bump()?;
                Value::String(token.value.text().unwrap_or_default().to_string())
            }
            TokenKind::Number => number_value(&self.bump()?.value),
            TokenKind::Minus => {
                self.bump()?;
                match number_value(&self.expect(TokenKind::Number)?.value) {
                    Value::Integer(i) => Value::Integer(-i),
                    Value::Float(x) => Value::Float(-x),
                    other => other,
                }
            }
            TokenKind::True => {
                self.bump()?;
                Value::Bool(true)
            }
            TokenKind::False => {
                self.bump()?;
                Value::Bool(false)
            }
            TokenKind::Parameter | TokenKind::Backslash if self.is_class_constant() => {
                self.parse_class_constant()?
            }
            TokenKind::Parameter if self.at_keyword("null") => {
                self.bump()?;
                Value::Null
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// `${a.b.c}` looked up in the configuration; missing keys give `""`
    fn parse_placeholder(&mut self) -> ParseResult<Value> {
        self.expect(TokenKind::Dollar)?;
        self.expect(TokenKind::LeftBrace)?;

        let mut segments = Vec::new();
        loop {
            let token = self.bump()?;
            match (token.value.kind(), token.value.value()) {
                (TokenKind::Parameter, Some(Literal::String(s))) => segments.push(s.clone()),
                (TokenKind::Number, Some(Literal::Int(i))) => segments.push(i.to_string()),
                _ => {
                    return Err(ParserError::ExpectedLiteral {
                        found: token.value.to_string(),
                        span: token.span,
                    })
                }
            }
            if self.eat(TokenKind::Dot)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;

        let resolved = self.config.lookup_segments(&segments);
        log_debug!("Resolved placeholder",
            "path" => segments.join("."),
            "found" => resolved.is_some()
        );
        Ok(resolved
            .map(Value::from_json)
            .unwrap_or_else(|| Value::String(String::new())))
    }

    /// `Name::class` evaluates to the resolved class name
    fn parse_class_constant(&mut self) -> ParseResult<Value> {
        let name = self.parse_qualified_name()?;
        self.expect(TokenKind::DoubleColon)?;

        let token = self.bump()?;
        if !token.value.is_keyword("class") {
            return Err(ParserError::MalformedClassConstant {
                found: token.value.to_string(),
                span: token.span,
            });
        }
        Ok(Value::String(self.resolve_class_name(&name.value)))
    }

    /// `{ entry (, entry)* }` where an entry is a nested annotation, a
    /// `key=value` / `key: value` pair or a positional value
    pub fn parse_json(&mut self) -> ParseResult<ValueMap> {
        self.expect(TokenKind::LeftBrace)?;

        let map = self.nested(|parser| {
            let mut map = ValueMap::new();
            while parser.peek_kind() != TokenKind::RightBrace {
                if parser.peek_kind() == TokenKind::Annotation {
                    let (class, value) = parser.parse_annotation_entry()?;
                    insert_annotation(&mut map, class, value);
                } else if parser.is_structure_key() {
                    let key = parser.parse_structure_key()?;
                    parser.bump()?;
                    match parser.parse_value()? {
                        Some(value) => map.insert(key, value),
                        None => {
                            return Err(ParserError::InvalidValueType {
                                key: key.to_string(),
                                span: parser.peek_span(),
                            })
                        }
                    }
                } else {
                    match parser.parse_value()? {
                        Some(value) => map.push(value),
                        None => {
                            return Err(ParserError::ExpectedLiteral {
                                found: parser.peek().to_string(),
                                span: parser.peek_span(),
                            })
                        }
                    }
                }

                if parser.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
            Ok(map)
        })?;

        self.expect(TokenKind::RightBrace)?;
        Ok(map)
    }

    fn parse_structure_key(&mut self) -> ParseResult<ValueKey> {
        let token = self.bump()?;
        match token.value.value() {
            Some(Literal::String(s)) => Ok(ValueKey::Name(s.clone())),
            Some(Literal::Int(i)) if *i >= 0 => Ok(ValueKey::Index(*i as usize)),
            Some(literal @ (Literal::Int(_) | Literal::Float(_))) => {
                Ok(ValueKey::Name(literal.to_string()))
            }
            _ => Err(ParserError::ExpectedLiteral {
                found: token.value.to_string(),
                span: token.span,
            }),
        }
    }

    // ========================================================================
    // ANNOTATIONS
    // ========================================================================

    /// `( [value] (, name=value)* )`: only the first parameter may be
    /// positional; it is stored under [`DEFAULT_KEY`]
    pub fn parse_parameters(&mut self) -> ParseResult<ValueMap> {
        self.expect(TokenKind::LeftParen)?;

        let parameters = self.nested(|parser| {
            let mut parameters = ValueMap::new();
            let mut first = true;

            while parser.peek_kind() != TokenKind::RightParen {
                if parser.is_named_parameter() {
                    let key = parser.expect_name("parameter name")?;
                    parser.expect(TokenKind::Equals)?;
                    let value = parser.parse_value()?.ok_or_else(|| {
                        ParserError::InvalidValueType {
                            key: key.value.clone(),
                            span: parser.peek_span(),
                        }
                    })?;
                    parameters.insert(ValueKey::Name(key.value), value);
                } else if first {
                    let span = parser.peek_span();
                    let value = parser.parse_value()?.ok_or_else(|| {
                        ParserError::InvalidValueType {
                            key: DEFAULT_KEY.to_string(),
                            span,
                        }
                    })?;
                    parameters.insert(DEFAULT_KEY.into(), value);
                } else {
                    return Err(ParserError::NamedParameterRequired {
                        span: parser.peek_span(),
                    });
                }

                first = false;
                if parser.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
            Ok(parameters)
        })?;

        self.expect(TokenKind::RightParen)?;
        Ok(parameters)
    }

    /// `@Name` or `@Name(...)`, constructed through the type resolver
    pub fn parse_annotation(&mut self) -> ParseResult<Value> {
        self.parse_annotation_entry().map(|(_, value)| value)
    }

    fn parse_annotation_entry(&mut self) -> ParseResult<(String, Value)> {
        let token = self.expect(TokenKind::Annotation)?;
        let tag = token.value.text().unwrap_or_default().to_string();
        let class = self.resolve_class_name(&tag);

        if !self.types.exists(&class) {
            return Err(ParserError::UnknownAnnotationClass {
                name: class,
                span: token.span,
            });
        }

        let parameters = if self.peek_kind() == TokenKind::LeftParen {
            self.parse_parameters()?
        } else {
            ValueMap::new()
        };

        let span = self.span_from(token.span);
        let mut value = self
            .types
            .construct(&class, parameters)
            .map_err(|message| ParserError::ConstructionFailed {
                name: class.clone(),
                message,
                span,
            })?;
        if let Value::Annotation(annotation) = &mut value {
            annotation.span = span;
        }
        Ok((class, value))
    }

    /// Every annotation of a docblock, in source order. Other text and
    /// ignored doc tags are skipped, but it must still lex: an unclosed
    /// quote in prose is a [`LexerError`].
    pub fn parse_annotations(&mut self) -> ParseResult<AnnotationCollection> {
        let mut collection = AnnotationCollection::new();

        while !self.lexer.at_eof() {
            if self.peek_kind() != TokenKind::Annotation {
                self.skip_token()?;
                continue;
            }

            let tag = self.peek().text().unwrap_or_default().to_string();
            if is_ignored_tag(&tag) {
                if self.preferences.log_ignored_tags {
                    log_debug!("Skipping doc tag", "tag" => tag);
                }
                self.skip_token()?;
                self.skip_arguments()?;
                continue;
            }

            let start = self.peek_span();
            let (class, value) = self.parse_annotation_entry()?;
            collection.push(class, value, self.span_from(start));
        }

        Ok(collection)
    }

    /// Consume one token of free docblock text. Text that does not lex
    /// fails the parse like anywhere else.
    fn skip_token(&mut self) -> ParseResult<()> {
        let token = self.lexer.get_spanned()?;
        self.last_span = token.span;
        Ok(())
    }

    /// Skip a balanced `( ... )` after an ignored tag
    fn skip_arguments(&mut self) -> ParseResult<()> {
        if self.peek_kind() != TokenKind::LeftParen {
            return Ok(());
        }
        let mut depth = 0usize;
        while !self.lexer.at_eof() {
            match self.peek_kind() {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.skip_token()?;
            if depth == 0 {
                break;
            }
        }
        Ok(())
    }
}

fn number_value(token: &Token) -> Value {
    match token.value() {
        Some(Literal::Int(i)) => Value::Integer(*i),
        Some(Literal::Float(x)) => Value::Float(*x),
        _ => Value::Null,
    }
}

/// Nested annotations are keyed by class; repeats collect into a list
fn insert_annotation(map: &mut ValueMap, class: String, value: Value) {
    match map.get_mut(&class) {
        Some(Value::List(list)) => list.push(value),
        Some(existing) => {
            let mut list = ValueMap::new();
            list.push(std::mem::replace(existing, Value::Null));
            list.push(value);
            *existing = Value::List(list);
        }
        None => map.insert(ValueKey::Name(class), value),
    }
}
