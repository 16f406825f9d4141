//! ObjectQuel query grammar
//!
//! ```text
//! query     := (range ';'?)* retrieve (range ';'?)* EOF
//! range     := 'range' 'of' NAME 'is' (json_source | entity ('via' expr)? 'required'?)
//! retrieve  := 'retrieve' 'unique'? '(' value (',' value)* ')'
//!              ('where' expr)? ('sort' 'by' item (',' item)*)?
//!              ('window' INT 'using' 'window_size' INT)?
//! ```
//!
//! Expressions bind, loosest first: `?:`, `OR`, `AND`, `NOT`, comparison,
//! `+ -`, `* / %`, unary `- !`.

use super::error::{ParseResult, ParserError};
use super::parser::Parser;
use super::resolver::TypeResolver;
use crate::config::constants::compile_time::syntax::{MAX_EXPRESSION_HEIGHT, MAX_IDENTIFIER_CHAIN};
use crate::grammar::ast::{
    accept, AggregateFunction, Ast, CompareOp, FactorOp, LogicalOp, Node, NodeId, Retrieve,
    SortDirection, SortItem, StringKind, TermOp, UnaryOp, Visitor, Window,
};
use crate::tokens::{Literal, TokenKind};
use crate::utils::Span;
use serde::Serialize;

const FUNCTIONS: &[&str] = &[
    "count",
    "countu",
    "sum",
    "avg",
    "min",
    "max",
    "exists",
    "is_numeric",
    "is_float",
    "is_integer",
    "is_empty",
    "concat",
    "search",
];

/// An arena together with the node a parse produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxTree {
    pub ast: Ast,
    pub root: NodeId,
}

impl SyntaxTree {
    pub fn root_node(&self) -> &Node {
        self.ast.node(self.root)
    }

    pub fn retrieve(&self) -> Option<&Retrieve> {
        match self.root_node() {
            Node::Retrieve(retrieve) => Some(retrieve),
            _ => None,
        }
    }

    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Break> {
        accept(&self.ast, self.root, visitor)
    }

    pub fn describe(&self) -> String {
        self.ast.describe(self.root)
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.ast.to_json(self.root)
    }
}

impl<'src, R: TypeResolver> Parser<'src, R> {
    // ========================================================================
    // ENTRY POINTS
    // ========================================================================

    /// A complete query: range declarations and exactly one retrieve
    pub fn parse_query(&mut self) -> ParseResult<SyntaxTree> {
        let start = self.peek_span();
        let mut ranges: Vec<NodeId> = Vec::new();
        let mut retrieve: Option<Retrieve> = None;

        loop {
            while self.eat(TokenKind::Semicolon)?.is_some() {}
            if self.lexer.at_eof() {
                break;
            }

            if self.at_keyword("range") {
                let range = self.parse_range()?;
                let name = self.ast.range_name(range).unwrap_or_default().to_string();
                if ranges
                    .iter()
                    .any(|existing| self.ast.range_name(*existing) == Some(name.as_str()))
                {
                    return Err(ParserError::DuplicateRange {
                        name,
                        span: self.ast.span(range),
                    });
                }
                ranges.push(range);
            } else if self.at_keyword("retrieve") {
                if retrieve.is_some() {
                    return Err(ParserError::DuplicateRetrieve {
                        span: self.peek_span(),
                    });
                }
                retrieve = Some(self.parse_retrieve()?);
            } else {
                return Err(ParserError::unexpected_token(
                    "'range' or 'retrieve'",
                    self.peek(),
                    self.peek_span(),
                ));
            }
        }

        let Some(mut retrieve) = retrieve else {
            return Err(ParserError::MissingRetrieve {
                span: self.peek_span(),
            });
        };
        retrieve.ranges = ranges;

        let root = self
            .ast
            .add_spanned(Node::Retrieve(retrieve), self.span_from(start));
        Ok(self.finish(root))
    }

    /// A standalone condition; the whole input must be consumed
    pub fn parse_condition(&mut self) -> ParseResult<SyntaxTree> {
        let root = self.parse_expression()?;
        if !self.lexer.at_eof() {
            return Err(ParserError::unexpected_token(
                "end of input",
                self.peek(),
                self.peek_span(),
            ));
        }
        Ok(self.finish(root))
    }

    /// One expression into the parser's arena
    pub fn parse_expression(&mut self) -> ParseResult<NodeId> {
        self.nested(|parser| parser.parse_ternary())
    }

    fn finish(&mut self, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            ast: std::mem::take(&mut self.ast),
            root,
        }
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    fn parse_range(&mut self) -> ParseResult<NodeId> {
        let start = self.expect_keyword("range")?;
        self.expect_keyword("of")?;
        let name = self.expect_name("range name")?.value;
        self.expect_keyword("is")?;

        if self.eat_keyword("json_source")? {
            self.expect(TokenKind::LeftParen)?;
            let path = self.expect_string("JSON file path")?;
            let expression = match self.eat(TokenKind::Comma)? {
                Some(_) => Some(self.expect_string("JSON path expression")?),
                None => None,
            };
            self.expect(TokenKind::RightParen)?;
            return Ok(self.ast.add_spanned(
                Node::RangeJsonSource {
                    name,
                    path,
                    expression,
                },
                self.span_from(start),
            ));
        }

        let entity_name = self.parse_qualified_name()?;
        let class = self.resolve_class_name(&entity_name.value);
        let entity = self.ast.add_spanned(
            Node::Entity {
                name: class,
                range: None,
                implicit: false,
            },
            entity_name.span,
        );

        let join = if self.eat_keyword("via")? {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let required = self.eat_keyword("required")? || join.is_none();

        Ok(self.ast.add_spanned(
            Node::RangeDatabase {
                name,
                entity,
                join,
                required,
            },
            self.span_from(start),
        ))
    }

    fn parse_retrieve(&mut self) -> ParseResult<Retrieve> {
        self.expect_keyword("retrieve")?;
        let mut retrieve = Retrieve {
            unique: self.eat_keyword("unique")?,
            ..Retrieve::default()
        };

        self.expect(TokenKind::LeftParen)?;
        loop {
            let value = self.parse_retrieve_value(&mut retrieve)?;
            retrieve.values.push(value);
            if self.eat(TokenKind::Comma)?.is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;

        if self.eat_keyword("where")? {
            retrieve.conditions = Some(self.parse_expression()?);
        }

        if self.eat_keyword("sort")? {
            self.expect_keyword("by")?;
            loop {
                let expression = self.parse_expression()?;
                let direction = if self.eat_keyword("desc")? {
                    SortDirection::Desc
                } else {
                    self.eat_keyword("asc")?;
                    SortDirection::Asc
                };
                retrieve.sort.push(SortItem {
                    expression,
                    direction,
                });
                if self.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
        }

        if self.eat_keyword("window")? {
            let offset = self.parse_window_number()?;
            self.expect_keyword("using")?;
            self.expect_keyword("window_size")?;
            let size_span = self.peek_span();
            let size = self.parse_window_number()?;
            if size == 0 {
                return Err(ParserError::InvalidWindow {
                    message: "window_size must be at least 1".to_string(),
                    span: size_span,
                });
            }
            retrieve.window = Some(Window { offset, size });
        }

        self.eat(TokenKind::Semicolon)?;
        Ok(retrieve)
    }

    /// `name = expr` declares a macro; a bare expression is named after itself
    fn parse_retrieve_value(&mut self, retrieve: &mut Retrieve) -> ParseResult<NodeId> {
        let start = self.peek_span();

        if self.is_named_parameter() {
            let name = self.expect_name("alias name")?.value;
            self.expect(TokenKind::Equals)?;
            let expression = self.parse_expression()?;
            let copy = self.ast.deep_copy(expression);
            retrieve.macros.push((name.clone(), copy));

            return Ok(self.ast.add_spanned(
                Node::Alias {
                    name,
                    expression,
                    visible_in_result: true,
                    pattern: None,
                },
                self.span_from(start),
            ));
        }

        let expression = self.parse_expression()?;
        let span = self.span_from(start);
        let (name, pattern) = match self.ast.complete_name(expression) {
            Some(name) => (name.clone(), Some(name)),
            None => (span.slice(self.lexer.source()).trim().to_string(), None),
        };

        Ok(self.ast.add_spanned(
            Node::Alias {
                name,
                expression,
                visible_in_result: true,
                pattern,
            },
            span,
        ))
    }

    fn parse_window_number(&mut self) -> ParseResult<u64> {
        let span = self.peek_span();
        let token = self.expect(TokenKind::Number)?;
        match token.value.value() {
            Some(Literal::Int(i)) if *i >= 0 => Ok(*i as u64),
            _ => Err(ParserError::InvalidWindow {
                message: format!("expected a whole number, found {}", token.value),
                span,
            }),
        }
    }

    fn expect_string(&mut self, what: &str) -> ParseResult<String> {
        if self.peek_kind() != TokenKind::String {
            return Err(ParserError::unexpected_token(what, self.peek(), self.peek_span()));
        }
        let token = self.bump()?;
        Ok(token.value.text().unwrap_or_default().to_string())
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    /// Adds `node`, spanning from its leftmost operand to the last token
    /// Adds an operator node spanning from `left` to the last token.
    /// Operator chains are parsed in loops, so the tree height is checked
    /// here rather than by the nesting guard.
    fn binary(&mut self, left: NodeId, node: Node) -> ParseResult<NodeId> {
        let span = self.span_from(self.ast.span(left));
        let id = self.ast.add_spanned(node, span);
        if self.ast.height(id) > MAX_EXPRESSION_HEIGHT {
            return Err(ParserError::ExpressionTooDeep {
                limit: MAX_EXPRESSION_HEIGHT,
                span,
            });
        }
        Ok(id)
    }

    fn parse_ternary(&mut self) -> ParseResult<NodeId> {
        let condition = self.parse_or()?;
        if self.eat(TokenKind::Question)?.is_none() {
            return Ok(condition);
        }

        let then_branch = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let else_branch = self.parse_expression()?;

        self.binary(
            condition,
            Node::Ternary {
                condition,
                then_branch,
                else_branch,
            },
        )
    }

    fn parse_or(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or")? || self.eat(TokenKind::LogicalOr)?.is_some() {
            let right = self.parse_and()?;
            left = self.binary(
                left,
                Node::BinaryOperator {
                    op: LogicalOp::Or,
                    left,
                    right,
                },
            )?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and")? || self.eat(TokenKind::LogicalAnd)?.is_some() {
            let right = self.parse_not()?;
            left = self.binary(
                left,
                Node::BinaryOperator {
                    op: LogicalOp::And,
                    left,
                    right,
                },
            )?;
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<NodeId> {
        if !self.at_keyword("not") {
            return self.parse_comparison();
        }

        let start = self.bump()?.span;
        let operand = self.nested(|parser| parser.parse_not())?;
        Ok(self.ast.add_spanned(
            Node::UnaryOperation {
                op: UnaryOp::Not,
                operand,
            },
            self.span_from(start),
        ))
    }

    fn parse_comparison(&mut self) -> ParseResult<NodeId> {
        let left = self.parse_additive()?;

        let op = match self.peek_kind() {
            TokenKind::Equals | TokenKind::Equal => Some(CompareOp::Equal),
            TokenKind::NotEqual => Some(CompareOp::NotEqual),
            TokenKind::LessThan => Some(CompareOp::Less),
            TokenKind::GreaterThan => Some(CompareOp::Greater),
            TokenKind::LessEqual => Some(CompareOp::LessEqual),
            TokenKind::GreaterEqual => Some(CompareOp::GreaterEqual),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let right = self.parse_additive()?;
            return self.binary(left, Node::Expression { op, left, right });
        }

        if self.eat_keyword("is")? {
            let negated = self.eat_keyword("not")?;
            self.expect_keyword("null")?;
            return self.binary(
                left,
                Node::CheckNull {
                    operand: left,
                    negated,
                },
            );
        }

        if self.eat_keyword("in")? {
            return self.parse_in_list(left, false);
        }
        if self.at_keyword("not") && self.next_is_keyword("in") {
            self.bump()?;
            self.bump()?;
            return self.parse_in_list(left, true);
        }

        Ok(left)
    }

    fn parse_in_list(&mut self, operand: NodeId, negated: bool) -> ParseResult<NodeId> {
        self.expect(TokenKind::LeftParen)?;
        let list = self.nested(|parser| parser.parse_arguments())?;
        if list.is_empty() {
            return Err(ParserError::unexpected_token(
                "at least one value",
                self.peek(),
                self.peek_span(),
            ));
        }
        self.expect(TokenKind::RightParen)?;

        self.binary(
            operand,
            Node::In {
                operand,
                list,
                negated,
            },
        )
    }

    fn parse_additive(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => TermOp::Add,
                TokenKind::Minus => TermOp::Subtract,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_multiplicative()?;
            left = self.binary(left, Node::Term { op, left, right })?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => FactorOp::Multiply,
                TokenKind::Slash => FactorOp::Divide,
                TokenKind::Percent => FactorOp::Modulo,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_unary()?;
            left = self.binary(left, Node::Factor { op, left, right })?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<NodeId> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        let start = self.bump()?.span;

        // A minus directly before a number folds into the literal
        if op == UnaryOp::Negate && self.peek_kind() == TokenKind::Number {
            let token = self.bump()?;
            let text = format!("-{}", token.span.slice(self.lexer.source()));
            return Ok(self
                .ast
                .add_spanned(Node::Number(text), self.span_from(start)));
        }

        let operand = self.nested(|parser| parser.parse_unary())?;
        Ok(self.ast.add_spanned(
            Node::UnaryOperation { op, operand },
            self.span_from(start),
        ))
    }

    fn parse_primary(&mut self) -> ParseResult<NodeId> {
        let span = self.peek_span();
        let node = match self.peek_kind() {
            TokenKind::Number => {
                let token = self.bump()?;
                Node::Number(token.span.slice(self.lexer.source()).to_string())
            }
            TokenKind::String => {
                let token = self.bump()?;
                let value = token.value.text().unwrap_or_default().to_string();
                let kind = if is_regex_literal(&value) {
                    StringKind::Regex
                } else {
                    StringKind::Plain
                };
                Node::String { value, kind }
            }
            TokenKind::True => {
                self.bump()?;
                Node::Bool(true)
            }
            TokenKind::False => {
                self.bump()?;
                Node::Bool(false)
            }
            TokenKind::Colon => {
                self.bump()?;
                Node::Parameter(self.expect_name("parameter name")?.value)
            }
            TokenKind::LeftParen => {
                self.bump()?;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                return Ok(inner);
            }
            TokenKind::Parameter if self.at_keyword("null") => {
                self.bump()?;
                Node::Null
            }
            TokenKind::Parameter if self.is_function_call() => return self.parse_function_call(),
            TokenKind::Parameter => return self.parse_identifier_chain(),
            _ => {
                return Err(ParserError::unexpected_token(
                    "expression",
                    self.peek(),
                    span,
                ))
            }
        };

        Ok(self.ast.add_spanned(node, self.span_from(span)))
    }

    /// `a.b.c` as a linked list of `Identifier` nodes, head returned
    fn parse_identifier_chain(&mut self) -> ParseResult<NodeId> {
        let mut segments = vec![self.expect_name("identifier")?];
        while self.peek_kind() == TokenKind::Dot {
            let dot = self.bump()?.span;
            if segments.len() >= MAX_IDENTIFIER_CHAIN {
                return Err(ParserError::IdentifierChainTooLong {
                    limit: MAX_IDENTIFIER_CHAIN,
                    span: dot,
                });
            }
            segments.push(self.expect_name("property name")?);
        }

        let mut head = None;
        for segment in segments.into_iter().rev() {
            head = Some(self.ast.add_spanned(
                Node::Identifier {
                    name: segment.value,
                    entity: None,
                    next: head,
                },
                segment.span,
            ));
        }
        head.ok_or_else(|| {
            ParserError::unexpected_token("identifier", self.peek(), self.peek_span())
        })
    }

    fn parse_function_call(&mut self) -> ParseResult<NodeId> {
        let name = self.expect_name("function name")?;
        let function = name.value.to_ascii_lowercase();
        if !FUNCTIONS.contains(&function.as_str()) {
            return Err(ParserError::UnknownFunction {
                name: name.value,
                span: name.span,
            });
        }

        self.expect(TokenKind::LeftParen)?;
        let mut args = self.nested(|parser| parser.parse_arguments())?;
        self.expect(TokenKind::RightParen)?;
        let span = self.span_from(name.span);

        let node = match function.as_str() {
            "count" | "countu" => Node::Count {
                operand: single_argument(&function, args, span)?,
                distinct: function == "countu",
            },
            "sum" | "avg" | "min" | "max" => Node::Aggregate {
                function: match function.as_str() {
                    "sum" => AggregateFunction::Sum,
                    "avg" => AggregateFunction::Avg,
                    "min" => AggregateFunction::Min,
                    _ => AggregateFunction::Max,
                },
                operand: single_argument(&function, args, span)?,
            },
            "exists" => Node::Exists {
                operand: single_argument(&function, args, span)?,
            },
            "is_numeric" => Node::IsNumeric {
                operand: single_argument(&function, args, span)?,
            },
            "is_float" => Node::IsFloat {
                operand: single_argument(&function, args, span)?,
            },
            "is_integer" => Node::IsInteger {
                operand: single_argument(&function, args, span)?,
            },
            "is_empty" => Node::CheckNull {
                operand: single_argument(&function, args, span)?,
                negated: false,
            },
            "concat" if !args.is_empty() => Node::Concat { parts: args },
            "search" if args.len() >= 2 => {
                let terms = args.remove(args.len() - 1);
                Node::Search {
                    fields: args,
                    terms,
                }
            }
            _ => {
                return Err(ParserError::unexpected_token(
                    &format!("more arguments to {}", function),
                    format!("{} arguments", args.len()),
                    span,
                ))
            }
        };

        Ok(self.ast.add_spanned(node, span))
    }

    /// Comma-separated expressions up to, not including, `)`
    fn parse_arguments(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut args = Vec::new();
        if self.peek_kind() == TokenKind::RightParen {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat(TokenKind::Comma)?.is_none() {
                break;
            }
        }
        Ok(args)
    }

    fn is_function_call(&mut self) -> bool {
        self.lexer.speculate(|lexer| {
            lexer.get()?;
            Ok(lexer.peek_kind() == TokenKind::LeftParen)
        })
    }

    fn next_is_keyword(&mut self, keyword: &str) -> bool {
        self.lexer.speculate(|lexer| {
            lexer.get()?;
            Ok(lexer.peek().is_keyword(keyword))
        })
    }
}

fn single_argument(function: &str, mut args: Vec<NodeId>, span: Span) -> ParseResult<NodeId> {
    if args.len() != 1 {
        return Err(ParserError::unexpected_token(
            &format!("exactly one argument to {}", function),
            format!("{} arguments", args.len()),
            span,
        ));
    }
    Ok(args.remove(0))
}

/// `/pattern/flags` with alphabetic flags
fn is_regex_literal(text: &str) -> bool {
    let Some(body) = text.strip_prefix('/') else {
        return false;
    };
    match body.rfind('/') {
        Some(end) => end > 0 && body[end + 1..].chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserPreferences;
    use crate::grammar::ast::{ContainsRange, NodeCollector, ReturnType};
    use crate::lexical::Lexer;
    use crate::syntax::parser::ParseContext;
    use crate::syntax::resolver::TypeRegistry;
    use assert_matches::assert_matches;

    fn parser<'a>(source: &'a str, context: ParseContext) -> Parser<'a, TypeRegistry> {
        Parser::new(Lexer::new(source).unwrap(), context, TypeRegistry::new())
    }

    fn condition(source: &str) -> ParseResult<SyntaxTree> {
        parser(source, ParseContext::new()).parse_condition()
    }

    fn query(source: &str) -> ParseResult<SyntaxTree> {
        let context = ParseContext::new()
            .with_import("Order", "App\\Entity\\Order")
            .with_import("Customer", "App\\Entity\\Customer");
        parser(source, context).parse_query()
    }

    #[test]
    fn test_end_to_end_condition() {
        let tree = condition("age > 18 AND active = true").unwrap();

        assert_eq!(
            tree.describe(),
            "BinaryOperator(AND, Expression(>, Identifier(age), Number(18)), \
             Expression(=, Identifier(active), Bool(true)))"
        );

        let Node::BinaryOperator { op, left, right } = tree.root_node() else {
            panic!("expected a binary operator");
        };
        assert_eq!(*op, LogicalOp::And);
        assert_matches!(
            tree.ast.node(*left),
            Node::Expression { op: CompareOp::Greater, .. }
        );
        assert_matches!(
            tree.ast.node(*right),
            Node::Expression { op: CompareOp::Equal, .. }
        );
        assert_eq!(tree.ast.parent(*left), Some(tree.root));
    }

    #[test]
    fn test_identifier_chain_round_trip() {
        let tree = condition("a.b.c").unwrap();
        assert_eq!(tree.ast.complete_name(tree.root).as_deref(), Some("a.b.c"));
        assert_eq!(tree.ast.len(), 3);
    }

    #[test]
    fn test_precedence() {
        let tree = condition("a + b * 2 >= 7 or not x and y").unwrap();
        assert_eq!(
            tree.describe(),
            "BinaryOperator(OR, Expression(>=, Term(+, Identifier(a), \
             Factor(*, Identifier(b), Number(2))), Number(7)), \
             BinaryOperator(AND, UnaryOperation(NOT, Identifier(x)), Identifier(y)))"
        );
    }

    #[test]
    fn test_operator_spellings() {
        let tree = condition("a <> 1 || b == 2 && c != 3").unwrap();
        assert_eq!(
            tree.describe(),
            "BinaryOperator(OR, Expression(!=, Identifier(a), Number(1)), \
             BinaryOperator(AND, Expression(=, Identifier(b), Number(2)), \
             Expression(!=, Identifier(c), Number(3))))"
        );
    }

    #[test]
    fn test_predicates() {
        assert_eq!(
            condition("x is not null").unwrap().describe(),
            "CheckNotNull(Identifier(x))"
        );
        assert_eq!(
            condition("x is null").unwrap().describe(),
            "CheckNull(Identifier(x))"
        );
        assert_eq!(
            condition("o.status not in ('a', 'b')").unwrap().describe(),
            "NotIn(Identifier(o.status), [String(\"a\"), String(\"b\")])"
        );
        assert_eq!(
            condition("o.id in (1)").unwrap().describe(),
            "In(Identifier(o.id), [Number(1)])"
        );
    }

    #[test]
    fn test_literals_and_parameters() {
        assert_eq!(condition("-5").unwrap().describe(), "Number(-5)");
        assert_eq!(condition("1.50").unwrap().describe(), "Number(1.50)");
        assert_eq!(
            condition("-x").unwrap().describe(),
            "UnaryOperation(-, Identifier(x))"
        );
        assert_eq!(
            condition("!x").unwrap().describe(),
            "UnaryOperation(NOT, Identifier(x))"
        );
        assert_eq!(
            condition("id = :id").unwrap().describe(),
            "Expression(=, Identifier(id), Parameter(:id))"
        );
        assert_eq!(condition("NULL").unwrap().describe(), "Null");
    }

    #[test]
    fn test_regex_strings() {
        assert_eq!(
            condition("name = '/^a.*/i'").unwrap().describe(),
            "Expression(=, Identifier(name), Regex(\"/^a.*/i\"))"
        );
        assert!(is_regex_literal("/x/"));
        assert!(!is_regex_literal("/path/to/1"));
        assert!(!is_regex_literal("//"));
        assert!(!is_regex_literal("plain"));
    }

    #[test]
    fn test_ternary() {
        let tree = condition("a ? 1 : b ? 2 : 3").unwrap();
        assert_eq!(
            tree.describe(),
            "Ternary(Identifier(a), Number(1), Ternary(Identifier(b), Number(2), Number(3)))"
        );
    }

    #[test]
    fn test_functions_and_return_types() {
        let tree = condition("count(o.id) > 1 and concat(a, b) = 'x'").unwrap();
        let mut collector = NodeCollector::default();
        tree.accept(&mut collector).unwrap();

        let count = collector
            .visited
            .iter()
            .copied()
            .find(|id| matches!(tree.ast.node(*id), Node::Count { .. }))
            .unwrap();
        assert_eq!(tree.ast.return_type(count), Some(ReturnType::Integer));

        let concat = collector
            .visited
            .iter()
            .copied()
            .find(|id| matches!(tree.ast.node(*id), Node::Concat { .. }))
            .unwrap();
        assert_eq!(tree.ast.return_type(concat), Some(ReturnType::String));

        assert_eq!(
            condition("search(p.title, p.body, 'rust')").unwrap().describe(),
            "Search([Identifier(p.title), Identifier(p.body)], String(\"rust\"))"
        );
        assert_eq!(
            condition("COUNTU(o.customer)").unwrap().describe(),
            "CountUnique(Identifier(o.customer))"
        );
        assert_eq!(
            condition("is_empty(x) or is_numeric(y)").unwrap().describe(),
            "BinaryOperator(OR, CheckNull(Identifier(x)), IsNumeric(Identifier(y)))"
        );
    }

    #[test]
    fn test_function_errors() {
        assert_matches!(
            condition("foo(x)"),
            Err(ParserError::UnknownFunction { name, .. }) if name == "foo"
        );
        assert_matches!(
            condition("count(a, b)"),
            Err(ParserError::UnexpectedToken { .. })
        );
        assert_matches!(
            condition("search(a)"),
            Err(ParserError::UnexpectedToken { .. })
        );
    }

    #[test]
    fn test_full_query() {
        let tree = query(
            "range of o is Order via o.customerId = c.id\n\
             range of c is Customer;\n\
             retrieve unique (c.name, total = sum(o.amount))\n\
             where o.amount > 100 and c.name in ('a', 'b')\n\
             sort by c.name desc, total\n\
             window 2 using window_size 10",
        )
        .unwrap();

        let retrieve = tree.retrieve().unwrap();
        assert!(retrieve.unique);
        assert_eq!(retrieve.ranges.len(), 2);
        assert_eq!(retrieve.values.len(), 2);
        assert_eq!(retrieve.window, Some(Window { offset: 2, size: 10 }));
        assert_eq!(retrieve.sort.len(), 2);
        assert_eq!(retrieve.sort[0].direction, SortDirection::Desc);
        assert_eq!(retrieve.sort[1].direction, SortDirection::Asc);

        let orders = retrieve.ranges[0];
        assert_matches!(
            tree.ast.node(orders),
            Node::RangeDatabase { name, required: false, join: Some(_), .. } if name == "o"
        );
        let Node::RangeDatabase { entity, .. } = tree.ast.node(retrieve.ranges[1]) else {
            panic!("expected a database range");
        };
        assert_matches!(
            tree.ast.node(*entity),
            Node::Entity { name, range: Some(r), .. }
                if name == "App\\Entity\\Customer" && *r == retrieve.ranges[1]
        );
        assert_matches!(
            tree.ast.node(retrieve.ranges[1]),
            Node::RangeDatabase { required: true, .. }
        );

        assert_matches!(
            tree.ast.node(retrieve.values[0]),
            Node::Alias { name, pattern: Some(_), .. } if name == "c.name"
        );
        let Node::Alias { name, expression, .. } = tree.ast.node(retrieve.values[1]) else {
            panic!("expected an alias");
        };
        assert_eq!(name, "total");
        let macro_id = retrieve.macro_named("total").unwrap();
        assert_ne!(macro_id, *expression);
        assert_eq!(tree.ast.describe(macro_id), tree.ast.describe(*expression));
        assert_eq!(tree.ast.parent(macro_id), Some(tree.root));

        let conditions = retrieve.conditions.unwrap();
        assert!(ContainsRange::check(&tree.ast, conditions, "c"));
        assert!(ContainsRange::check(&tree.ast, conditions, "o"));
        assert!(!ContainsRange::check(&tree.ast, conditions, "x"));
    }

    #[test]
    fn test_json_source_range() {
        let tree = query("range of j is json_source('data.json', '$.items') retrieve (j)").unwrap();
        let retrieve = tree.retrieve().unwrap();
        assert_matches!(
            tree.ast.node(retrieve.ranges[0]),
            Node::RangeJsonSource { name, path, expression: Some(e) }
                if name == "j" && path == "data.json" && e == "$.items"
        );
    }

    #[test]
    fn test_unnamed_expression_alias_uses_source_text() {
        let tree = query("range of o is Order retrieve (o.price * 2)").unwrap();
        let retrieve = tree.retrieve().unwrap();
        assert_matches!(
            tree.ast.node(retrieve.values[0]),
            Node::Alias { name, pattern: None, .. } if name == "o.price * 2"
        );
    }

    #[test]
    fn test_query_statement_errors() {
        assert_matches!(
            query("range of o is Order"),
            Err(ParserError::MissingRetrieve { .. })
        );
        assert_matches!(
            query("range of o is Order retrieve (o) retrieve (o)"),
            Err(ParserError::DuplicateRetrieve { .. })
        );
        assert_matches!(
            query("range of o is Order range of o is Customer retrieve (o)"),
            Err(ParserError::DuplicateRange { name, .. }) if name == "o"
        );
        assert_matches!(
            query("range of o is Order retrieve (o) window 0 using window_size 0"),
            Err(ParserError::InvalidWindow { .. })
        );
        assert_matches!(
            query("select * from orders"),
            Err(ParserError::UnexpectedToken { .. })
        );
    }

    #[test]
    fn test_identifier_chain_limit() {
        let long = vec!["a"; MAX_IDENTIFIER_CHAIN + 1].join(".");
        assert_matches!(
            condition(&long),
            Err(ParserError::IdentifierChainTooLong { .. })
        );
        let ok = vec!["a"; MAX_IDENTIFIER_CHAIN].join(".");
        assert!(condition(&ok).is_ok());
    }

    #[test]
    fn test_expression_depth_limit() {
        let preferences = ParserPreferences {
            max_nesting_depth: 3,
            ..ParserPreferences::default()
        };
        let mut p = Parser::with_preferences(
            Lexer::new("((((x))))").unwrap(),
            ParseContext::new(),
            TypeRegistry::new(),
            preferences,
        );
        assert_matches!(
            p.parse_condition(),
            Err(ParserError::MaxDepthExceeded { depth: 3, .. })
        );
    }

    #[test]
    fn test_long_operator_chain_rejected() {
        let source = format!("a{}", " and a".repeat(10_000));
        assert_matches!(
            condition(&source),
            Err(ParserError::ExpressionTooDeep { limit: MAX_EXPRESSION_HEIGHT, .. })
        );

        let sum = format!("o.a{}", " + o.a".repeat(2_000));
        let result = query(&format!("range of o is Order retrieve (t = {})", sum));
        assert_matches!(result, Err(ParserError::ExpressionTooDeep { .. }));
    }

    #[test]
    fn test_operator_chain_below_limit() {
        let source = format!("a{}", " and a".repeat(400));
        let tree = condition(&source).unwrap();

        assert_eq!(tree.ast.height(tree.root), 401);
        let mut collector = NodeCollector::default();
        tree.accept(&mut collector).unwrap();
        assert_eq!(collector.visited.len(), 801);
        assert!(tree.describe().starts_with("BinaryOperator(AND, BinaryOperator(AND,"));
        assert_eq!(tree.to_json()["type"], "BinaryOperator");
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert_matches!(
            condition("a = 1 )"),
            Err(ParserError::UnexpectedToken { expected, .. }) if expected == "end of input"
        );
    }
}
