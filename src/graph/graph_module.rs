//! Graph module: a traced graph with the modules and constants it references

use std::collections::BTreeMap;

use super::constants::ConstantTable;
use super::ir::{Graph, NodeOp};
use super::module::{Attr, Module, ModuleTable};
use crate::error::GraphError;

/// Node shape metadata.
pub type Shape = Vec<usize>;

/// A traced graph that owns every module and constant it references.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphModule {
    name: String,
    graph: Graph,
    modules: ModuleTable,
    constants: ConstantTable,
    /// Submodule path (`""` for root) → attributes set after tracing.
    attributes: BTreeMap<String, BTreeMap<String, Attr>>,
    training: bool,
    shapes: BTreeMap<String, Shape>,
}

impl GraphModule {
    /// Build a graph module, linting the graph against its tables.
    pub fn new(
        name: impl Into<String>,
        graph: Graph,
        modules: ModuleTable,
        constants: ConstantTable,
        training: bool,
    ) -> Result<Self, GraphError> {
        graph.lint(&modules, &constants)?;
        Ok(Self {
            name: name.into(),
            graph,
            modules,
            constants,
            attributes: BTreeMap::new(),
            training,
            shapes: BTreeMap::new(),
        })
    }

    /// Deep copies of the model modules the graph calls.
    pub fn referenced_modules(graph: &Graph, model: &Module) -> Result<ModuleTable, GraphError> {
        let mut table = ModuleTable::new();
        for node in graph.nodes_of(NodeOp::CallModule) {
            if table.contains_key(&node.target) {
                continue;
            }
            let module = model
                .submodule(&node.target)
                .ok_or_else(|| GraphError::DanglingTarget {
                    node: node.name.clone(),
                    target: node.target.clone(),
                })?;
            table.insert(node.target.clone(), module.clone());
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleTable {
        &mut self.modules
    }

    pub fn module(&self, path: &str) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Re-run the full lint, e.g. after a quantizer rewrote the graph.
    pub fn lint(&self) -> Result<(), GraphError> {
        self.graph.lint(&self.modules, &self.constants)
    }

    /// Attribute on the root (`""`) or on a submodule path.
    ///
    /// Attributes set on this graph module shadow those of table modules.
    pub fn attr(&self, path: &str, name: &str) -> Option<&Attr> {
        self.attributes
            .get(path)
            .and_then(|attrs| attrs.get(name))
            .or_else(|| self.modules.get(path).and_then(|m| m.attr(name)))
    }

    /// Set an attribute on the root or on a submodule path.
    ///
    /// Table modules receive the attribute directly; other paths get a
    /// container entry, as when the path was only traced through.
    pub fn set_attr(&mut self, path: &str, name: impl Into<String>, attr: Attr) {
        match self.modules.get_mut(path) {
            Some(module) if !path.is_empty() => module.set_attr(name, attr),
            _ => {
                self.attributes
                    .entry(path.to_string())
                    .or_default()
                    .insert(name.into(), attr);
            }
        }
    }

    pub fn shape(&self, node: &str) -> Option<&Shape> {
        self.shapes.get(node)
    }

    pub fn shapes(&self) -> &BTreeMap<String, Shape> {
        &self.shapes
    }

    pub fn set_shape(&mut self, node: impl Into<String>, shape: Shape) {
        self.shapes.insert(node.into(), shape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ir::Argument;
    use serde_json::json;

    fn model() -> Module {
        Module::new("custom.Net").with_child(
            "backbone",
            Module::new("custom.Backbone").with_child("conv1", Module::new("nn.Conv2d")),
        )
    }

    fn graph() -> Graph {
        let mut graph = Graph::new();
        let x = graph.create_node(NodeOp::Placeholder, "x", vec![]);
        let y = graph.create_node(NodeOp::CallModule, "backbone.conv1", vec![Argument::node(x)]);
        graph.create_node(NodeOp::Output, "output", vec![Argument::node(y)]);
        graph
    }

    #[test]
    fn test_referenced_modules() {
        let table = GraphModule::referenced_modules(&graph(), &model()).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["backbone.conv1"]);
    }

    #[test]
    fn test_referenced_module_missing() {
        let err = GraphModule::referenced_modules(&graph(), &Module::new("custom.Net")).unwrap_err();
        assert!(matches!(err, GraphError::DanglingTarget { .. }));
    }

    #[test]
    fn test_new_lints() {
        let err = GraphModule::new("Net", graph(), ModuleTable::new(), ConstantTable::new(), true)
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingTarget { .. }));
    }

    #[test]
    fn test_attributes_on_root_container_and_table_module() {
        let modules = GraphModule::referenced_modules(&graph(), &model()).unwrap();
        let mut gm = GraphModule::new("Net", graph(), modules, ConstantTable::new(), false).unwrap();

        gm.set_attr("", "export", Attr::Value(json!(true)));
        gm.set_attr("backbone", "stride", Attr::Value(json!(2)));
        gm.set_attr("backbone.conv1", "tag", Attr::Value(json!("c1")));

        assert_eq!(gm.attr("", "export"), Some(&Attr::Value(json!(true))));
        assert_eq!(gm.attr("backbone", "stride"), Some(&Attr::Value(json!(2))));
        assert_eq!(
            gm.module("backbone.conv1").unwrap().attr("tag"),
            Some(&Attr::Value(json!("c1")))
        );
        assert_eq!(gm.attr("backbone.conv1", "tag"), Some(&Attr::Value(json!("c1"))));
        assert!(!gm.is_training());
    }
}
