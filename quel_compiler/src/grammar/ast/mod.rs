//! Arena-backed ObjectQuel syntax tree
//!
//! Every node of one parse lives in a single [`Ast`]. Child links, parent
//! links and the entity/range back-links are [`NodeId`] indices, so the
//! tree carries no reference cycles and is released as a whole with the
//! arena.

pub mod nodes;
pub mod visitor;

pub use nodes::*;
pub use visitor::{accept, accept_without_ranges, walk, ContainsRange, NodeCollector, Visitor};

use crate::utils::Span;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// A node together with its arena bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub node: Node,
    pub parent: Option<NodeId>,
    pub span: Span,
    /// Height of the subtree when the node was added
    #[serde(skip)]
    pub height: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ast {
    nodes: Vec<NodeData>,
}

impl Ast {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // === CONSTRUCTION ===

    /// Adds a node without source location
    pub fn add(&mut self, node: Node) -> NodeId {
        self.add_spanned(node, Span::dummy())
    }

    /// Adds a node and adopts its children.
    ///
    /// Children must already be in this arena and must not belong to
    /// another parent. A `RangeDatabase` also back-links its entity.
    pub fn add_spanned(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        let children = node.children();
        let entity = match &node {
            Node::RangeDatabase { entity, .. } => Some(*entity),
            _ => None,
        };
        let height = 1 + children.iter().map(|child| self.height(*child)).max().unwrap_or(0);

        self.nodes.push(NodeData {
            node,
            parent: None,
            span,
            height,
        });

        for child in children {
            self.adopt(id, child);
        }
        if let Some(entity) = entity {
            self.link_entity(entity, id);
        }

        id
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(data) = self.nodes.get_mut(child.0) {
            data.parent = Some(parent);
        }
    }

    fn release(&mut self, child: NodeId) {
        if let Some(data) = self.nodes.get_mut(child.0) {
            data.parent = None;
        }
    }

    fn link_entity(&mut self, entity: NodeId, range: NodeId) {
        if let Some(NodeData {
            node: Node::Entity { range: slot, .. },
            ..
        }) = self.nodes.get_mut(entity.0)
        {
            *slot = Some(range);
        }
    }

    // === ACCESS ===

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).map(|data| &data.node)
    }

    /// Node at `id`. Ids are only minted by this arena.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0].node
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes.get(id.0).map(|data| data.span).unwrap_or_default()
    }

    /// Height of the subtree at `id` as it was built. Rewrites through the
    /// setters below do not update it.
    pub fn height(&self, id: NodeId) -> usize {
        self.nodes.get(id.0).map(|data| data.height).unwrap_or(0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|data| data.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).map(Node::children).unwrap_or_default()
    }

    /// Ids of every node, in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Nearest ancestor (including `id` itself) that is a range
    pub fn enclosing_range(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if matches!(
                self.get(node_id),
                Some(Node::RangeDatabase { .. } | Node::RangeJsonSource { .. })
            ) {
                return Some(node_id);
            }
            current = self.parent(node_id);
        }
        None
    }

    /// Name declared by a range node
    pub fn range_name(&self, id: NodeId) -> Option<&str> {
        match self.get(id)? {
            Node::RangeDatabase { name, .. } | Node::RangeJsonSource { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Finds a range of a `Retrieve` by name
    pub fn find_range(&self, retrieve: NodeId, name: &str) -> Option<NodeId> {
        match self.get(retrieve)? {
            Node::Retrieve(r) => r
                .ranges
                .iter()
                .copied()
                .find(|range| self.range_name(*range) == Some(name)),
            _ => None,
        }
    }

    /// Names of the segments of an identifier chain, head first
    pub fn identifier_chain(&self, id: NodeId) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.get(node_id) {
                Some(Node::Identifier { name, next, .. }) => {
                    segments.push(name.as_str());
                    current = *next;
                }
                _ => break,
            }
        }
        segments
    }

    /// Dotted path of an identifier chain, or `None` for other nodes
    pub fn complete_name(&self, id: NodeId) -> Option<String> {
        let segments = self.identifier_chain(id);
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("."))
        }
    }

    /// Statically fixed result type of a node, if it has one
    pub fn return_type(&self, id: NodeId) -> Option<ReturnType> {
        match self.get(id)? {
            Node::Bool(_)
            | Node::BinaryOperator { .. }
            | Node::Expression { .. }
            | Node::In { .. }
            | Node::Exists { .. }
            | Node::IsNumeric { .. }
            | Node::IsFloat { .. }
            | Node::IsInteger { .. }
            | Node::CheckNull { .. }
            | Node::Search { .. } => Some(ReturnType::Boolean),
            Node::UnaryOperation {
                op: UnaryOp::Not, ..
            } => Some(ReturnType::Boolean),
            Node::Count { .. } => Some(ReturnType::Integer),
            Node::Number(text) if !text.contains('.') => Some(ReturnType::Integer),
            Node::String { .. } | Node::Concat { .. } => Some(ReturnType::String),
            Node::Alias { expression, .. } => self.return_type(*expression),
            _ => None,
        }
    }

    // === REWRITING ===

    /// Replaces the condition subtree of a `Retrieve`
    pub fn set_conditions(&mut self, retrieve: NodeId, conditions: Option<NodeId>) -> bool {
        let previous = match self.nodes.get_mut(retrieve.0) {
            Some(NodeData {
                node: Node::Retrieve(r),
                ..
            }) => std::mem::replace(&mut r.conditions, conditions),
            _ => return false,
        };
        if let Some(old) = previous {
            self.release(old);
        }
        if let Some(new) = conditions {
            self.adopt(retrieve, new);
        }
        true
    }

    /// Replaces the join condition of a database range
    pub fn set_join(&mut self, range: NodeId, join: Option<NodeId>) -> bool {
        let previous = match self.nodes.get_mut(range.0) {
            Some(NodeData {
                node: Node::RangeDatabase { join: slot, .. },
                ..
            }) => std::mem::replace(slot, join),
            _ => return false,
        };
        if let Some(old) = previous {
            self.release(old);
        }
        if let Some(new) = join {
            self.adopt(range, new);
        }
        true
    }

    /// Points an entity at the range that declares it
    pub fn set_entity_range(&mut self, entity: NodeId, range: Option<NodeId>) -> bool {
        match self.nodes.get_mut(entity.0) {
            Some(NodeData {
                node: Node::Entity { range: slot, .. },
                ..
            }) => {
                *slot = range;
                true
            }
            _ => false,
        }
    }

    /// Records which entity an identifier segment resolved to
    pub fn set_identifier_entity(&mut self, identifier: NodeId, entity: Option<NodeId>) -> bool {
        match self.nodes.get_mut(identifier.0) {
            Some(NodeData {
                node: Node::Identifier { entity: slot, .. },
                ..
            }) => {
                *slot = entity;
                true
            }
            _ => false,
        }
    }

    /// Swaps the child `old` of `parent` for `new`
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let replaced = match self.nodes.get_mut(parent.0) {
            Some(data) => match data.node.child_slots_mut().into_iter().find(|slot| **slot == old) {
                Some(slot) => {
                    *slot = new;
                    true
                }
                None => false,
            },
            None => false,
        };

        if replaced {
            self.release(old);
            self.adopt(parent, new);
        }
        replaced
    }

    /// Copies the subtree rooted at `id` into fresh nodes.
    ///
    /// Non-owning links (`Identifier::entity`, `Entity::range`) are kept
    /// as they are.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id.0].clone();
        let mut node = data.node;

        let originals: Vec<NodeId> = node.child_slots_mut().into_iter().map(|slot| *slot).collect();
        let copies: Vec<NodeId> = originals.into_iter().map(|child| self.deep_copy(child)).collect();
        for (slot, copy) in node.child_slots_mut().into_iter().zip(copies) {
            *slot = copy;
        }

        self.add_spanned(node, data.span)
    }

    // === RENDERING ===

    /// Compact S-expression rendering, mostly for diagnostics and tests
    pub fn describe(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return format!("<missing {}>", id);
        };

        match node {
            Node::Bool(value) => format!("Bool({})", value),
            Node::Number(text) => format!("Number({})", text),
            Node::String { value, kind } => match kind {
                StringKind::Plain => format!("String({:?})", value),
                StringKind::Regex => format!("Regex({:?})", value),
            },
            Node::Parameter(name) => format!("Parameter(:{})", name),
            Node::Null => "Null".to_string(),
            Node::Identifier { .. } => {
                format!("Identifier({})", self.complete_name(id).unwrap_or_default())
            }
            Node::Entity { name, .. } => format!("Entity({})", name),
            Node::RangeDatabase {
                name,
                entity,
                join,
                required,
            } => {
                let mut out = format!("RangeDatabase({}, {}", name, self.describe(*entity));
                if let Some(join) = join {
                    out.push_str(&format!(", via {}", self.describe(*join)));
                }
                if *required {
                    out.push_str(", required");
                }
                out.push(')');
                out
            }
            Node::RangeJsonSource { name, path, .. } => {
                format!("RangeJsonSource({}, {:?})", name, path)
            }
            Node::BinaryOperator { op, left, right } => self.describe_binary("BinaryOperator", op.as_str(), *left, *right),
            Node::Expression { op, left, right } => self.describe_binary("Expression", op.as_str(), *left, *right),
            Node::Term { op, left, right } => self.describe_binary("Term", op.as_str(), *left, *right),
            Node::Factor { op, left, right } => self.describe_binary("Factor", op.as_str(), *left, *right),
            Node::UnaryOperation { op, operand } => {
                format!("UnaryOperation({}, {})", op, self.describe(*operand))
            }
            Node::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "Ternary({}, {}, {})",
                self.describe(*condition),
                self.describe(*then_branch),
                self.describe(*else_branch)
            ),
            Node::Count { operand, distinct } => {
                let name = if *distinct { "CountUnique" } else { "Count" };
                format!("{}({})", name, self.describe(*operand))
            }
            Node::Aggregate { function, operand } => {
                format!("{}({})", function, self.describe(*operand))
            }
            Node::In {
                operand,
                list,
                negated,
            } => format!(
                "{}({}, [{}])",
                if *negated { "NotIn" } else { "In" },
                self.describe(*operand),
                self.describe_list(list)
            ),
            Node::Exists { operand } => format!("Exists({})", self.describe(*operand)),
            Node::IsNumeric { operand } => format!("IsNumeric({})", self.describe(*operand)),
            Node::IsFloat { operand } => format!("IsFloat({})", self.describe(*operand)),
            Node::IsInteger { operand } => format!("IsInteger({})", self.describe(*operand)),
            Node::CheckNull { operand, negated } => format!(
                "{}({})",
                if *negated { "CheckNotNull" } else { "CheckNull" },
                self.describe(*operand)
            ),
            Node::Concat { parts } => format!("Concat({})", self.describe_list(parts)),
            Node::Search { fields, terms } => format!(
                "Search([{}], {})",
                self.describe_list(fields),
                self.describe(*terms)
            ),
            Node::Alias {
                name, expression, ..
            } => format!("Alias({}, {})", name, self.describe(*expression)),
            Node::Retrieve(retrieve) => {
                let mut parts = vec![
                    format!("ranges=[{}]", self.describe_list(&retrieve.ranges)),
                    format!("values=[{}]", self.describe_list(&retrieve.values)),
                ];
                if let Some(conditions) = retrieve.conditions {
                    parts.push(format!("where={}", self.describe(conditions)));
                }
                if !retrieve.sort.is_empty() {
                    let sort: Vec<String> = retrieve
                        .sort
                        .iter()
                        .map(|item| format!("{} {}", self.describe(item.expression), item.direction))
                        .collect();
                    parts.push(format!("sort=[{}]", sort.join(", ")));
                }
                if let Some(window) = retrieve.window {
                    parts.push(format!("window={}/{}", window.offset, window.size));
                }
                if retrieve.unique {
                    parts.push("unique".to_string());
                }
                format!("Retrieve({})", parts.join(", "))
            }
        }
    }

    fn describe_binary(&self, kind: &str, op: &str, left: NodeId, right: NodeId) -> String {
        format!(
            "{}({}, {}, {})",
            kind,
            op,
            self.describe(left),
            self.describe(right)
        )
    }

    fn describe_list(&self, ids: &[NodeId]) -> String {
        ids.iter()
            .map(|id| self.describe(*id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Nested JSON rendering of the subtree rooted at `id`
    pub fn to_json(&self, id: NodeId) -> JsonValue {
        let Some(node) = self.get(id) else {
            return JsonValue::Null;
        };
        let kind = node.kind_name();

        let mut object = match node {
            Node::Bool(value) => json!({ "value": value }),
            Node::Number(text) => json!({ "value": text }),
            Node::String { value, kind } => json!({ "value": value, "kind": kind }),
            Node::Parameter(name) => json!({ "name": name }),
            Node::Null => json!({}),
            Node::Identifier { name, next, .. } => json!({
                "name": name,
                "next": next.map(|n| self.to_json(n)),
            }),
            Node::Entity { name, implicit, .. } => json!({ "name": name, "implicit": implicit }),
            Node::RangeDatabase {
                name,
                entity,
                join,
                required,
            } => json!({
                "name": name,
                "entity": self.to_json(*entity),
                "join": join.map(|j| self.to_json(j)),
                "required": required,
            }),
            Node::RangeJsonSource {
                name,
                path,
                expression,
            } => json!({ "name": name, "path": path, "expression": expression }),
            Node::BinaryOperator { op, left, right } => self.binary_json(op.as_str(), *left, *right),
            Node::Expression { op, left, right } => self.binary_json(op.as_str(), *left, *right),
            Node::Term { op, left, right } => self.binary_json(op.as_str(), *left, *right),
            Node::Factor { op, left, right } => self.binary_json(op.as_str(), *left, *right),
            Node::UnaryOperation { op, operand } => json!({
                "operator": op.as_str(),
                "operand": self.to_json(*operand),
            }),
            Node::Ternary {
                condition,
                then_branch,
                else_branch,
            } => json!({
                "condition": self.to_json(*condition),
                "then": self.to_json(*then_branch),
                "else": self.to_json(*else_branch),
            }),
            Node::Count { operand, distinct } => json!({
                "operand": self.to_json(*operand),
                "distinct": distinct,
            }),
            Node::Aggregate { function, operand } => json!({
                "function": function.as_str(),
                "operand": self.to_json(*operand),
            }),
            Node::In {
                operand,
                list,
                negated,
            } => json!({
                "operand": self.to_json(*operand),
                "list": self.list_json(list),
                "negated": negated,
            }),
            Node::Exists { operand }
            | Node::IsNumeric { operand }
            | Node::IsFloat { operand }
            | Node::IsInteger { operand } => json!({ "operand": self.to_json(*operand) }),
            Node::CheckNull { operand, negated } => json!({
                "operand": self.to_json(*operand),
                "negated": negated,
            }),
            Node::Concat { parts } => json!({ "parts": self.list_json(parts) }),
            Node::Search { fields, terms } => json!({
                "fields": self.list_json(fields),
                "terms": self.to_json(*terms),
            }),
            Node::Alias {
                name,
                expression,
                visible_in_result,
                pattern,
            } => json!({
                "name": name,
                "expression": self.to_json(*expression),
                "visible_in_result": visible_in_result,
                "pattern": pattern,
            }),
            Node::Retrieve(retrieve) => json!({
                "ranges": self.list_json(&retrieve.ranges),
                "values": self.list_json(&retrieve.values),
                "conditions": retrieve.conditions.map(|c| self.to_json(c)),
                "sort": retrieve.sort.iter().map(|item| json!({
                    "expression": self.to_json(item.expression),
                    "direction": item.direction.as_str(),
                })).collect::<Vec<_>>(),
                "window": retrieve.window,
                "unique": retrieve.unique,
                "macros": retrieve.macros.iter().map(|(name, id)| json!({
                    "name": name,
                    "expression": self.to_json(*id),
                })).collect::<Vec<_>>(),
            }),
        };

        if let Some(map) = object.as_object_mut() {
            map.insert("type".to_string(), JsonValue::from(kind));
            if let Some(rt) = self.return_type(id) {
                map.insert("return_type".to_string(), JsonValue::from(rt.as_str()));
            }
        }
        object
    }

    fn binary_json(&self, op: &str, left: NodeId, right: NodeId) -> JsonValue {
        json!({
            "operator": op,
            "left": self.to_json(left),
            "right": self.to_json(right),
        })
    }

    fn list_json(&self, ids: &[NodeId]) -> Vec<JsonValue> {
        ids.iter().map(|id| self.to_json(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn chain(ast: &mut Ast, names: &[&str]) -> NodeId {
        let mut next = None;
        for name in names.iter().rev() {
            next = Some(ast.add(Node::Identifier {
                name: name.to_string(),
                entity: None,
                next,
            }));
        }
        next.unwrap()
    }

    #[test]
    fn test_complete_name_round_trip() {
        let mut ast = Ast::new();
        let head = chain(&mut ast, &["a", "b", "c"]);

        assert_eq!(ast.complete_name(head).as_deref(), Some("a.b.c"));
        assert_eq!(ast.identifier_chain(head), vec!["a", "b", "c"]);
        assert_eq!(ast.len(), 3);
    }

    #[test]
    fn test_parent_links() {
        let mut ast = Ast::new();
        let left = ast.add(Node::Number("1".into()));
        let right = ast.add(Node::Number("2".into()));
        let sum = ast.add(Node::Term {
            op: TermOp::Add,
            left,
            right,
        });

        assert_eq!(ast.parent(left), Some(sum));
        assert_eq!(ast.parent(right), Some(sum));
        assert_eq!(ast.parent(sum), None);
        assert_eq!(ast.children(sum), vec![left, right]);
    }

    #[test]
    fn test_range_back_link() {
        let mut ast = Ast::new();
        let entity = ast.add(Node::Entity {
            name: "App\\Entity\\Order".into(),
            range: None,
            implicit: false,
        });
        let range = ast.add(Node::RangeDatabase {
            name: "o".into(),
            entity,
            join: None,
            required: true,
        });

        assert_matches!(ast.node(entity), Node::Entity { range: Some(r), .. } if *r == range);
        assert_eq!(ast.enclosing_range(entity), Some(range));
        assert_eq!(ast.range_name(range), Some("o"));
    }

    fn order_range(ast: &mut Ast, join: Option<NodeId>) -> (NodeId, NodeId) {
        let entity = ast.add(Node::Entity {
            name: "App\\Entity\\Order".into(),
            range: None,
            implicit: false,
        });
        let range = ast.add(Node::RangeDatabase {
            name: "o".into(),
            entity,
            join,
            required: join.is_none(),
        });
        (entity, range)
    }

    #[test]
    fn test_set_join_moves_parent() {
        let mut ast = Ast::new();
        let old = chain(&mut ast, &["o", "customerId"]);
        let (_, range) = order_range(&mut ast, Some(old));
        assert_eq!(ast.parent(old), Some(range));

        let new = chain(&mut ast, &["o", "id"]);
        assert!(ast.set_join(range, Some(new)));
        assert_eq!(ast.parent(new), Some(range));
        assert_eq!(ast.parent(old), None);
        assert_matches!(ast.node(range), Node::RangeDatabase { join: Some(j), .. } if *j == new);
        assert!(ast.children(range).contains(&new));
        assert!(!ast.children(range).contains(&old));

        assert!(ast.set_join(range, None));
        assert_eq!(ast.parent(new), None);
        assert_matches!(ast.node(range), Node::RangeDatabase { join: None, .. });

        // Only database ranges carry a join
        assert!(!ast.set_join(new, Some(old)));
        assert_eq!(ast.parent(old), None);
    }

    #[test]
    fn test_set_entity_range() {
        let mut ast = Ast::new();
        let (entity, range) = order_range(&mut ast, None);
        let (_, other) = order_range(&mut ast, None);

        assert!(ast.set_entity_range(entity, Some(other)));
        assert_matches!(ast.node(entity), Node::Entity { range: Some(r), .. } if *r == other);
        // The owning parent does not move with the back-link
        assert_eq!(ast.parent(entity), Some(range));

        assert!(ast.set_entity_range(entity, None));
        assert_matches!(ast.node(entity), Node::Entity { range: None, .. });
        assert!(!ast.set_entity_range(range, Some(other)));
    }

    #[test]
    fn test_height_tracks_construction() {
        let mut ast = Ast::new();
        let head = chain(&mut ast, &["o", "price"]);
        let two = ast.add(Node::Number("2".into()));
        let product = ast.add(Node::Factor {
            op: FactorOp::Multiply,
            left: head,
            right: two,
        });

        assert_eq!(ast.height(two), 1);
        assert_eq!(ast.height(head), 2);
        assert_eq!(ast.height(product), 3);
    }

    #[test]
    fn test_return_types() {
        let mut ast = Ast::new();
        let int = ast.add(Node::Number("18".into()));
        let float = ast.add(Node::Number("1.5".into()));
        let ident = chain(&mut ast, &["age"]);
        let count = ast.add(Node::Count {
            operand: ident,
            distinct: false,
        });
        let concat = ast.add(Node::Concat { parts: vec![] });
        let alias = ast.add(Node::Alias {
            name: "n".into(),
            expression: count,
            visible_in_result: true,
            pattern: None,
        });
        let cmp = ast.add(Node::Expression {
            op: CompareOp::Greater,
            left: int,
            right: float,
        });

        assert_eq!(ast.return_type(int), Some(ReturnType::Integer));
        assert_eq!(ast.return_type(float), None);
        assert_eq!(ast.return_type(ident), None);
        assert_eq!(ast.return_type(alias), Some(ReturnType::Integer));
        assert_eq!(ast.return_type(concat), Some(ReturnType::String));
        assert_eq!(ast.return_type(cmp), Some(ReturnType::Boolean));
    }

    #[test]
    fn test_set_conditions_moves_parent() {
        let mut ast = Ast::new();
        let first = ast.add(Node::Bool(true));
        let retrieve = ast.add(Node::Retrieve(Retrieve {
            conditions: Some(first),
            ..Retrieve::default()
        }));
        assert_eq!(ast.parent(first), Some(retrieve));

        let second = ast.add(Node::Bool(false));
        assert!(ast.set_conditions(retrieve, Some(second)));
        assert_eq!(ast.parent(first), None);
        assert_eq!(ast.parent(second), Some(retrieve));
        assert_matches!(ast.node(retrieve), Node::Retrieve(r) if r.conditions == Some(second));

        assert!(!ast.set_conditions(first, None));
    }

    #[test]
    fn test_replace_child() {
        let mut ast = Ast::new();
        let a = ast.add(Node::Number("1".into()));
        let b = ast.add(Node::Number("2".into()));
        let op = ast.add(Node::Factor {
            op: FactorOp::Multiply,
            left: a,
            right: b,
        });
        let c = ast.add(Node::Number("3".into()));

        assert!(ast.replace_child(op, b, c));
        assert_eq!(ast.children(op), vec![a, c]);
        assert_eq!(ast.parent(c), Some(op));
        assert_eq!(ast.parent(b), None);
        assert!(!ast.replace_child(op, b, c));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut ast = Ast::new();
        let left = chain(&mut ast, &["o", "price"]);
        let right = chain(&mut ast, &["o", "qty"]);
        let product = ast.add(Node::Factor {
            op: FactorOp::Multiply,
            left,
            right,
        });

        let copy = ast.deep_copy(product);
        assert_ne!(copy, product);
        assert_eq!(ast.describe(copy), ast.describe(product));

        let copied_children = ast.children(copy);
        assert!(copied_children.iter().all(|c| ast.parent(*c) == Some(copy)));
        assert_eq!(ast.parent(left), Some(product));
    }

    #[test]
    fn test_describe_and_json() {
        let mut ast = Ast::new();
        let age = chain(&mut ast, &["age"]);
        let eighteen = ast.add(Node::Number("18".into()));
        let cmp = ast.add(Node::Expression {
            op: CompareOp::Greater,
            left: age,
            right: eighteen,
        });

        assert_eq!(ast.describe(cmp), "Expression(>, Identifier(age), Number(18))");

        let json = ast.to_json(cmp);
        assert_eq!(json["type"], "Expression");
        assert_eq!(json["operator"], ">");
        assert_eq!(json["left"]["name"], "age");
        assert_eq!(json["return_type"], "boolean");
    }
}
