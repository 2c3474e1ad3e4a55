//! Constant tensor materialization
//!
//! Every `get_attr` node addresses a tensor on the model by dotted path.
//! Extraction reads those tensors so the graph module can own them.

use std::collections::BTreeMap;
use tracing::debug;

use super::ir::{Graph, NodeOp};
use super::module::{Module, Tensor};
use crate::error::GraphError;

/// Dotted attribute path → tensor read from the model.
pub type ConstantTable = BTreeMap<String, Tensor>;

/// Read the tensor behind every `get_attr` target.
pub fn extract_constants(graph: &Graph, model: &Module) -> Result<ConstantTable, GraphError> {
    let mut constants = ConstantTable::new();
    for node in graph.nodes_of(NodeOp::GetAttr) {
        if constants.contains_key(&node.target) {
            continue;
        }
        let tensor = model.resolve_tensor(&node.target)?;
        debug!(target = %node.target, shape = ?tensor.shape(), "constant");
        constants.insert(node.target.clone(), tensor.clone());
    }
    Ok(constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ir::Argument;
    use crate::graph::module::Attr;
    use approx::assert_abs_diff_eq;
    use ndarray::{ArrayD, IxDyn};
    use serde_json::json;

    fn model() -> Module {
        let stat = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.5, 1.5, 2.5]).unwrap();
        let norm = Module::new("nn.BatchNorm2d").with_attr("running_stat", Attr::Buffer(stat));
        Module::new("custom.Net")
            .with_child("backbone", Module::new("custom.Backbone").with_child("norm", norm))
            .with_attr("scale", Attr::Parameter(Tensor::ones(IxDyn(&[1]))))
            .with_attr("name", Attr::Value(json!("net")))
    }

    fn graph_reading(paths: &[&str]) -> Graph {
        let mut graph = Graph::new();
        let args = paths
            .iter()
            .map(|p| Argument::node(graph.create_node(NodeOp::GetAttr, p, vec![])))
            .collect();
        graph.create_node(NodeOp::CallFunction, "stack", args);
        graph
    }

    #[test]
    fn test_nested_buffer_extracted() {
        let constants =
            extract_constants(&graph_reading(&["backbone.norm.running_stat"]), &model()).unwrap();
        assert_eq!(constants.len(), 1);
        let stat = &constants["backbone.norm.running_stat"];
        assert_abs_diff_eq!(stat[IxDyn(&[1])], 1.5);
        assert_abs_diff_eq!(stat.sum(), 4.5);
    }

    #[test]
    fn test_root_parameter_and_repeated_target() {
        let constants = extract_constants(&graph_reading(&["scale", "scale"]), &model()).unwrap();
        assert_eq!(constants.keys().collect::<Vec<_>>(), vec!["scale"]);
    }

    #[test]
    fn test_missing_attribute() {
        let err = extract_constants(&graph_reading(&["backbone.norm.running_mean"]), &model())
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::AttributePath {
                path: "backbone.norm.running_mean".into(),
                segment: "running_mean".into(),
            }
        );
    }

    #[test]
    fn test_non_tensor_attribute() {
        let err = extract_constants(&graph_reading(&["name"]), &model()).unwrap_err();
        assert!(matches!(err, GraphError::NotATensor { ref found, .. } if found == "value"));
    }

    #[test]
    fn test_graph_without_get_attr() {
        assert!(extract_constants(&Graph::new(), &model()).unwrap().is_empty());
    }
}
