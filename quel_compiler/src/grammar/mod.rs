//! Syntax tree for ObjectQuel queries

pub mod ast;

pub use ast::{
    accept, accept_without_ranges, walk, AggregateFunction, Ast, CompareOp, ContainsRange,
    FactorOp, LogicalOp, Node, NodeCollector, NodeData, NodeId, Retrieve, ReturnType,
    SortDirection, SortItem, StringKind, TermOp, UnaryOp, Visitor, Window,
};
