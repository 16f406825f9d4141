//! Traversal protocol for the syntax tree
//!
//! `walk` visits a node, then each owned child subtree in source order.
//! Visitors stop a traversal early by returning `Err(Self::Break)`; the
//! error travels back out of `walk` untouched.

use super::nodes::{retrieve_children_without_ranges, Node, NodeId};
use super::Ast;
use std::convert::Infallible;

pub trait Visitor {
    /// Value carried out of an early exit
    type Break;

    fn visit_node(&mut self, ast: &Ast, id: NodeId) -> Result<(), Self::Break>;
}

/// Pre-order traversal of the subtree rooted at `id`
pub fn walk<V>(ast: &Ast, id: NodeId, visitor: &mut V) -> Result<(), V::Break>
where
    V: Visitor + ?Sized,
{
    visitor.visit_node(ast, id)?;
    for child in ast.children(id) {
        walk(ast, child, visitor)?;
    }
    Ok(())
}

/// Full traversal; a `Retrieve` visits its ranges before everything else
pub fn accept<V>(ast: &Ast, id: NodeId, visitor: &mut V) -> Result<(), V::Break>
where
    V: Visitor + ?Sized,
{
    walk(ast, id, visitor)
}

/// Like [`accept`], but a `Retrieve` root skips its ranges
pub fn accept_without_ranges<V>(ast: &Ast, id: NodeId, visitor: &mut V) -> Result<(), V::Break>
where
    V: Visitor + ?Sized,
{
    match ast.get(id) {
        Some(Node::Retrieve(retrieve)) => {
            visitor.visit_node(ast, id)?;
            for child in retrieve_children_without_ranges(retrieve) {
                walk(ast, child, visitor)?;
            }
            Ok(())
        }
        _ => walk(ast, id, visitor),
    }
}

// === STOCK VISITORS ===

/// Records node ids in visiting order
#[derive(Debug, Default)]
pub struct NodeCollector {
    pub visited: Vec<NodeId>,
}

impl Visitor for NodeCollector {
    type Break = Infallible;

    fn visit_node(&mut self, _ast: &Ast, id: NodeId) -> Result<(), Self::Break> {
        self.visited.push(id);
        Ok(())
    }
}

/// Searches a subtree for an identifier that refers to a range.
///
/// A chain refers to range `o` when its head segment is `o`, or when its
/// resolved entity is declared by a range named `o`.
#[derive(Debug)]
pub struct ContainsRange<'a> {
    range: &'a str,
}

impl<'a> ContainsRange<'a> {
    pub fn new(range: &'a str) -> Self {
        Self { range }
    }

    pub fn check(ast: &Ast, root: NodeId, range: &str) -> bool {
        walk(ast, root, &mut ContainsRange::new(range)).is_err()
    }

    fn is_chain_head(ast: &Ast, id: NodeId) -> bool {
        !matches!(
            ast.parent(id).and_then(|parent| ast.get(parent)),
            Some(Node::Identifier { next: Some(next), .. }) if *next == id
        )
    }
}

impl Visitor for ContainsRange<'_> {
    /// The identifier that matched
    type Break = NodeId;

    fn visit_node(&mut self, ast: &Ast, id: NodeId) -> Result<(), Self::Break> {
        let Some(Node::Identifier { name, entity, .. }) = ast.get(id) else {
            return Ok(());
        };

        if Self::is_chain_head(ast, id) && name == self.range {
            return Err(id);
        }

        let resolved = entity
            .and_then(|entity| match ast.get(entity) {
                Some(Node::Entity { range, .. }) => *range,
                _ => None,
            })
            .and_then(|range| ast.range_name(range));
        if resolved == Some(self.range) {
            return Err(id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ast::{CompareOp, LogicalOp, Retrieve, SortDirection, SortItem};

    fn ident(ast: &mut Ast, path: &str) -> NodeId {
        let mut next = None;
        for name in path.split('.').rev() {
            next = Some(ast.add(Node::Identifier {
                name: name.to_string(),
                entity: None,
                next,
            }));
        }
        next.unwrap()
    }

    #[test]
    fn test_binary_operator_visits_self_then_left_then_right() {
        let mut ast = Ast::new();
        let a_left = ident(&mut ast, "x.a");
        let a_right = ast.add(Node::Number("1".into()));
        let a = ast.add(Node::Expression {
            op: CompareOp::Equal,
            left: a_left,
            right: a_right,
        });
        let b = ast.add(Node::Bool(true));
        let and = ast.add(Node::BinaryOperator {
            op: LogicalOp::And,
            left: a,
            right: b,
        });

        let mut collector = NodeCollector::default();
        accept(&ast, and, &mut collector).unwrap();

        let a_tail = ast.children(a_left)[0];
        assert_eq!(
            collector.visited,
            vec![and, a, a_left, a_tail, a_right, b]
        );
    }

    #[test]
    fn test_retrieve_order_with_and_without_ranges() {
        let mut ast = Ast::new();
        let entity = ast.add(Node::Entity {
            name: "Order".into(),
            range: None,
            implicit: false,
        });
        let range = ast.add(Node::RangeDatabase {
            name: "o".into(),
            entity,
            join: None,
            required: true,
        });
        let value_expr = ident(&mut ast, "o");
        let value = ast.add(Node::Alias {
            name: "o".into(),
            expression: value_expr,
            visible_in_result: true,
            pattern: None,
        });
        let condition = ast.add(Node::Bool(true));
        let sort_expr = ast.add(Node::Number("1".into()));
        let macro_expr = ast.add(Node::Null);
        let retrieve = ast.add(Node::Retrieve(Retrieve {
            ranges: vec![range],
            values: vec![value],
            conditions: Some(condition),
            sort: vec![SortItem {
                expression: sort_expr,
                direction: SortDirection::Asc,
            }],
            window: None,
            unique: false,
            macros: vec![("m".into(), macro_expr)],
        }));

        let mut with = NodeCollector::default();
        accept(&ast, retrieve, &mut with).unwrap();
        assert_eq!(
            with.visited,
            vec![retrieve, range, entity, value, value_expr, condition, sort_expr, macro_expr]
        );

        let mut without = NodeCollector::default();
        accept_without_ranges(&ast, retrieve, &mut without).unwrap();
        assert_eq!(
            without.visited,
            vec![retrieve, value, value_expr, condition, sort_expr, macro_expr]
        );
    }

    #[test]
    fn test_contains_range_early_exit() {
        let mut ast = Ast::new();
        let left = ident(&mut ast, "o.total");
        let right = ident(&mut ast, "c.o");
        let cmp = ast.add(Node::Expression {
            op: CompareOp::Greater,
            left,
            right,
        });

        assert!(ContainsRange::check(&ast, cmp, "o"));
        assert!(ContainsRange::check(&ast, cmp, "c"));
        assert!(!ContainsRange::check(&ast, cmp, "total"));
        assert_eq!(walk(&ast, cmp, &mut ContainsRange::new("o")), Err(left));
    }

    #[test]
    fn test_contains_range_through_resolved_entity() {
        let mut ast = Ast::new();
        let entity = ast.add(Node::Entity {
            name: "Customer".into(),
            range: None,
            implicit: false,
        });
        let _range = ast.add(Node::RangeDatabase {
            name: "c".into(),
            entity,
            join: None,
            required: false,
        });
        let alias = ident(&mut ast, "customer");
        assert!(!ContainsRange::check(&ast, alias, "c"));

        ast.set_identifier_entity(alias, Some(entity));
        assert!(ContainsRange::check(&ast, alias, "c"));
    }
}
