//! Graph intermediate representation
//!
//! An ordered list of named nodes. Arguments refer to earlier nodes by name,
//! so node order is also a valid evaluation order.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use strum::{Display, EnumString};

use super::constants::ConstantTable;
use super::module::ModuleTable;
use crate::error::GraphError;

/// Operation kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NodeOp {
    Placeholder,
    GetAttr,
    CallFunction,
    CallMethod,
    CallModule,
    Output,
}

/// Node argument: another node's result or a literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    Node(String),
    Value(Value),
}

impl Argument {
    pub fn node(name: impl Into<String>) -> Self {
        Self::Node(name.into())
    }

    pub fn as_node(&self) -> Option<&str> {
        match self {
            Self::Node(name) => Some(name),
            Self::Value(_) => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(name) => write!(f, "%{name}"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub op: NodeOp,
    /// Qualified module path, attribute path, function or method name.
    pub target: String,
    pub args: Vec<Argument>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        op: NodeOp,
        target: impl Into<String>,
        args: Vec<Argument>,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            target: target.into(),
            args,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<_> = self.args.iter().map(ToString::to_string).collect();
        write!(
            f,
            "%{} : {}[target={}](args = ({}))",
            self.name,
            self.op,
            self.target,
            args.join(", ")
        )
    }
}

/// Ordered computation graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    #[serde(skip)]
    names: HashSet<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Point the node at `index` to a new target. Names stay fixed.
    pub fn set_target(&mut self, index: usize, target: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.target = target.into();
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes of one kind, in graph order.
    pub fn nodes_of(&self, op: NodeOp) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.op == op)
    }

    pub fn push(&mut self, node: Node) {
        self.names.insert(node.name.clone());
        self.nodes.push(node);
    }

    /// Append a node named after its target, made unique with a numeric suffix.
    pub fn create_node(&mut self, op: NodeOp, target: &str, args: Vec<Argument>) -> String {
        let name = self.unique_name(&base_name(op, target));
        self.push(Node::new(name.clone(), op, target, args));
        name
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.names.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Names unique, arguments defined earlier, single trailing output node.
    pub fn check_structure(&self) -> Result<(), GraphError> {
        let mut defined = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for arg in node.args.iter().filter_map(Argument::as_node) {
                if !defined.contains(arg) {
                    return Err(GraphError::UnknownArgument {
                        node: node.name.clone(),
                        argument: arg.to_string(),
                    });
                }
            }
            if !defined.insert(node.name.as_str()) {
                return Err(GraphError::DuplicateNodeName(node.name.clone()));
            }
            if node.op == NodeOp::Output && i + 1 != self.nodes.len() {
                return Err(GraphError::OutputNotLast(node.name.clone()));
            }
        }
        match self.nodes.last() {
            Some(node) if node.op == NodeOp::Output => Ok(()),
            _ => Err(GraphError::MissingOutput),
        }
    }

    /// Every `call_module` target is in the module table.
    pub fn check_module_targets(&self, modules: &ModuleTable) -> Result<(), GraphError> {
        match self
            .nodes_of(NodeOp::CallModule)
            .find(|n| !modules.contains_key(&n.target))
        {
            Some(node) => Err(dangling(node)),
            None => Ok(()),
        }
    }

    /// Full consistency check against the tables a graph module owns.
    ///
    /// A `get_attr` target must be a constant or a tensor attribute of a
    /// module in the table.
    pub fn lint(&self, modules: &ModuleTable, constants: &ConstantTable) -> Result<(), GraphError> {
        self.check_structure()?;
        self.check_module_targets(modules)?;
        for node in self.nodes_of(NodeOp::GetAttr) {
            if constants.contains_key(&node.target) {
                continue;
            }
            let on_module = node
                .target
                .rsplit_once('.')
                .and_then(|(path, attr)| modules.get(path).and_then(|m| m.attr(attr)))
                .is_some_and(|attr| attr.as_tensor().is_some());
            if !on_module {
                return Err(dangling(node));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph():")?;
        for node in &self.nodes {
            writeln!(f, "    {node}")?;
        }
        Ok(())
    }
}

fn dangling(node: &Node) -> GraphError {
    GraphError::DanglingTarget {
        node: node.name.clone(),
        target: node.target.clone(),
    }
}

fn base_name(op: NodeOp, target: &str) -> String {
    match op {
        NodeOp::Output => "output".to_string(),
        _ => target.replace('.', "_"),
    }
}
