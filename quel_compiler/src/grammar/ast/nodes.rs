//! ObjectQuel AST node definitions
//!
//! Nodes live in an [`Ast`](super::Ast) arena and refer to each other by
//! [`NodeId`]. Child links are owning (every node has exactly one parent);
//! `parent`, `Entity::range` and `Identifier::entity` are plain indices that
//! observe the tree without owning anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Statically known result type, a coercion hint for later passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Boolean,
    Integer,
    String,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }
}

// === OPERATORS ===

/// Boolean connectives (`BinaryOperator`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

/// Comparisons (`Expression`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

/// Additive operators (`Term`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermOp {
    Add,
    Subtract,
}

/// Multiplicative operators (`Factor`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorOp {
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringKind {
    Plain,
    /// `/pattern/flags`
    Regex,
}

macro_rules! operator_strings {
    ($($ty:ty { $($variant:ident => $text:expr),+ $(,)? })+) => {
        $(
            impl $ty {
                pub fn as_str(&self) -> &'static str {
                    match self {
                        $(Self::$variant => $text),+
                    }
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

operator_strings! {
    LogicalOp { And => "AND", Or => "OR" }
    CompareOp {
        Equal => "=",
        NotEqual => "!=",
        Less => "<",
        Greater => ">",
        LessEqual => "<=",
        GreaterEqual => ">=",
    }
    TermOp { Add => "+", Subtract => "-" }
    FactorOp { Multiply => "*", Divide => "/", Modulo => "%" }
    UnaryOp { Not => "NOT", Negate => "-" }
    AggregateFunction { Sum => "SUM", Avg => "AVG", Min => "MIN", Max => "MAX" }
    SortDirection { Asc => "ASC", Desc => "DESC" }
}

// === RETRIEVE PARTS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortItem {
    pub expression: NodeId,
    pub direction: SortDirection,
}

/// Pagination window: page `offset` of `size` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub offset: u64,
    pub size: u64,
}

/// Top-level query node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retrieve {
    pub ranges: Vec<NodeId>,
    /// `Alias` nodes in projection order
    pub values: Vec<NodeId>,
    pub conditions: Option<NodeId>,
    pub sort: Vec<SortItem>,
    pub window: Option<Window>,
    pub unique: bool,
    /// Named subexpressions in declaration order
    pub macros: Vec<(String, NodeId)>,
}

impl Retrieve {
    pub fn macro_named(&self, name: &str) -> Option<NodeId> {
        self.macros
            .iter()
            .find(|(macro_name, _)| macro_name == name)
            .map(|(_, id)| *id)
    }
}

// === NODES ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    // Literals
    Bool(bool),
    /// Raw numeric text; conversion is left to consumers
    Number(String),
    String {
        value: String,
        kind: StringKind,
    },
    /// Named query parameter (`:name`)
    Parameter(String),
    Null,

    /// One segment of a `.`-separated property path
    Identifier {
        name: String,
        /// Entity this segment was resolved against, set by later passes
        entity: Option<NodeId>,
        next: Option<NodeId>,
    },

    Entity {
        name: String,
        range: Option<NodeId>,
        /// Present only to satisfy a join, not projected
        implicit: bool,
    },
    RangeDatabase {
        name: String,
        entity: NodeId,
        join: Option<NodeId>,
        required: bool,
    },
    RangeJsonSource {
        name: String,
        path: String,
        expression: Option<String>,
    },

    // Operators
    BinaryOperator {
        op: LogicalOp,
        left: NodeId,
        right: NodeId,
    },
    UnaryOperation {
        op: UnaryOp,
        operand: NodeId,
    },
    Ternary {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    Expression {
        op: CompareOp,
        left: NodeId,
        right: NodeId,
    },
    Term {
        op: TermOp,
        left: NodeId,
        right: NodeId,
    },
    Factor {
        op: FactorOp,
        left: NodeId,
        right: NodeId,
    },

    // Aggregates and predicates
    Count {
        operand: NodeId,
        distinct: bool,
    },
    Aggregate {
        function: AggregateFunction,
        operand: NodeId,
    },
    In {
        operand: NodeId,
        list: Vec<NodeId>,
        negated: bool,
    },
    Exists {
        operand: NodeId,
    },
    IsNumeric {
        operand: NodeId,
    },
    IsFloat {
        operand: NodeId,
    },
    IsInteger {
        operand: NodeId,
    },
    CheckNull {
        operand: NodeId,
        negated: bool,
    },
    Concat {
        parts: Vec<NodeId>,
    },
    Search {
        fields: Vec<NodeId>,
        terms: NodeId,
    },

    Alias {
        name: String,
        expression: NodeId,
        visible_in_result: bool,
        /// Key used to find this value in a raw result row
        pattern: Option<String>,
    },

    Retrieve(Retrieve),
}

impl Node {
    /// Variant name
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Number(_) => "Number",
            Self::String { .. } => "String",
            Self::Parameter(_) => "Parameter",
            Self::Null => "Null",
            Self::Identifier { .. } => "Identifier",
            Self::Entity { .. } => "Entity",
            Self::RangeDatabase { .. } => "RangeDatabase",
            Self::RangeJsonSource { .. } => "RangeJsonSource",
            Self::BinaryOperator { .. } => "BinaryOperator",
            Self::UnaryOperation { .. } => "UnaryOperation",
            Self::Ternary { .. } => "Ternary",
            Self::Expression { .. } => "Expression",
            Self::Term { .. } => "Term",
            Self::Factor { .. } => "Factor",
            Self::Count { .. } => "Count",
            Self::Aggregate { .. } => "Aggregate",
            Self::In { .. } => "In",
            Self::Exists { .. } => "Exists",
            Self::IsNumeric { .. } => "IsNumeric",
            Self::IsFloat { .. } => "IsFloat",
            Self::IsInteger { .. } => "IsInteger",
            Self::CheckNull { .. } => "CheckNull",
            Self::Concat { .. } => "Concat",
            Self::Search { .. } => "Search",
            Self::Alias { .. } => "Alias",
            Self::Retrieve(_) => "Retrieve",
        }
    }

    /// Owned children in traversal order. Retrieve ranges come first.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Bool(_)
            | Self::Number(_)
            | Self::String { .. }
            | Self::Parameter(_)
            | Self::Null
            | Self::Entity { .. }
            | Self::RangeJsonSource { .. } => Vec::new(),

            Self::Identifier { next, .. } => next.iter().copied().collect(),
            Self::RangeDatabase { entity, join, .. } => {
                std::iter::once(*entity).chain(join.iter().copied()).collect()
            }

            Self::BinaryOperator { left, right, .. }
            | Self::Expression { left, right, .. }
            | Self::Term { left, right, .. }
            | Self::Factor { left, right, .. } => vec![*left, *right],

            Self::Ternary {
                condition,
                then_branch,
                else_branch,
            } => vec![*condition, *then_branch, *else_branch],

            Self::UnaryOperation { operand, .. }
            | Self::Count { operand, .. }
            | Self::Aggregate { operand, .. }
            | Self::Exists { operand }
            | Self::IsNumeric { operand }
            | Self::IsFloat { operand }
            | Self::IsInteger { operand }
            | Self::CheckNull { operand, .. } => vec![*operand],

            Self::In { operand, list, .. } => {
                std::iter::once(*operand).chain(list.iter().copied()).collect()
            }
            Self::Concat { parts } => parts.clone(),
            Self::Search { fields, terms } => {
                fields.iter().copied().chain(std::iter::once(*terms)).collect()
            }
            Self::Alias { expression, .. } => vec![*expression],

            Self::Retrieve(retrieve) => {
                let mut children = retrieve.ranges.clone();
                children.extend(retrieve_children_without_ranges(retrieve));
                children
            }
        }
    }

    /// Mutable access to every owned child slot, in traversal order
    pub(crate) fn child_slots_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            Self::Bool(_)
            | Self::Number(_)
            | Self::String { .. }
            | Self::Parameter(_)
            | Self::Null
            | Self::Entity { .. }
            | Self::RangeJsonSource { .. } => Vec::new(),

            Self::Identifier { next, .. } => next.iter_mut().collect(),
            Self::RangeDatabase { entity, join, .. } => {
                std::iter::once(entity).chain(join.iter_mut()).collect()
            }

            Self::BinaryOperator { left, right, .. }
            | Self::Expression { left, right, .. }
            | Self::Term { left, right, .. }
            | Self::Factor { left, right, .. } => vec![left, right],

            Self::Ternary {
                condition,
                then_branch,
                else_branch,
            } => vec![condition, then_branch, else_branch],

            Self::UnaryOperation { operand, .. }
            | Self::Count { operand, .. }
            | Self::Aggregate { operand, .. }
            | Self::Exists { operand }
            | Self::IsNumeric { operand }
            | Self::IsFloat { operand }
            | Self::IsInteger { operand }
            | Self::CheckNull { operand, .. } => vec![operand],

            Self::In { operand, list, .. } => {
                std::iter::once(operand).chain(list.iter_mut()).collect()
            }
            Self::Concat { parts } => parts.iter_mut().collect(),
            Self::Search { fields, terms } => {
                fields.iter_mut().chain(std::iter::once(terms)).collect()
            }
            Self::Alias { expression, .. } => vec![expression],

            Self::Retrieve(retrieve) => {
                let Retrieve {
                    ranges,
                    values,
                    conditions,
                    sort,
                    macros,
                    ..
                } = retrieve;
                ranges
                    .iter_mut()
                    .chain(values.iter_mut())
                    .chain(conditions.iter_mut())
                    .chain(sort.iter_mut().map(|item| &mut item.expression))
                    .chain(macros.iter_mut().map(|(_, id)| id))
                    .collect()
            }
        }
    }
}

/// Values, conditions, sort expressions, then macros
pub(crate) fn retrieve_children_without_ranges(retrieve: &Retrieve) -> Vec<NodeId> {
    retrieve
        .values
        .iter()
        .copied()
        .chain(retrieve.conditions)
        .chain(retrieve.sort.iter().map(|item| item.expression))
        .chain(retrieve.macros.iter().map(|(_, id)| *id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_strings() {
        assert_eq!(LogicalOp::And.as_str(), "AND");
        assert_eq!(CompareOp::Greater.to_string(), ">");
        assert_eq!(UnaryOp::Not.as_str(), "NOT");
        assert_eq!(SortDirection::Desc.as_str(), "DESC");
    }

    #[test]
    fn test_retrieve_child_order() {
        let retrieve = Retrieve {
            ranges: vec![NodeId(0)],
            values: vec![NodeId(1), NodeId(2)],
            conditions: Some(NodeId(3)),
            sort: vec![SortItem {
                expression: NodeId(4),
                direction: SortDirection::Asc,
            }],
            window: None,
            unique: false,
            macros: vec![("total".to_string(), NodeId(5))],
        };

        let ids: Vec<usize> = Node::Retrieve(retrieve.clone())
            .children()
            .into_iter()
            .map(NodeId::index)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);

        let without: Vec<usize> = retrieve_children_without_ranges(&retrieve)
            .into_iter()
            .map(NodeId::index)
            .collect();
        assert_eq!(without, vec![1, 2, 3, 4, 5]);
        assert_eq!(retrieve.macro_named("total"), Some(NodeId(5)));
    }

    #[test]
    fn test_slots_match_children() {
        let mut node = Node::Search {
            fields: vec![NodeId(1), NodeId(2)],
            terms: NodeId(3),
        };
        let expected = node.children();
        let slots: Vec<NodeId> = node.child_slots_mut().into_iter().map(|s| *s).collect();
        assert_eq!(slots, expected);
    }
}
