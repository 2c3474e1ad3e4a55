//! Shape propagation
//!
//! Operator shape semantics live outside this crate. [`PlaceholderShapes`]
//! only seeds what is known without running anything: graph inputs and
//! constant tensors.

use super::graph_module::{GraphModule, Shape};
use super::ir::NodeOp;
use crate::error::ShapePropagationError;

/// Annotates graph nodes with tensor shapes.
pub trait ShapePropagator {
    fn propagate(
        &self,
        graph_module: &mut GraphModule,
        input_shapes: &[Shape],
    ) -> Result<(), ShapePropagationError>;
}

/// Seeds placeholder shapes from the inputs and `get_attr` shapes from constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderShapes;

impl ShapePropagator for PlaceholderShapes {
    fn propagate(
        &self,
        graph_module: &mut GraphModule,
        input_shapes: &[Shape],
    ) -> Result<(), ShapePropagationError> {
        let mut seeded = Vec::new();
        let mut placeholders = 0;
        for node in graph_module.graph().nodes() {
            match node.op {
                NodeOp::Placeholder => {
                    let shape = input_shapes.get(placeholders).ok_or_else(|| {
                        ShapePropagationError(format!(
                            "no input shape for placeholder '{}' ({} given)",
                            node.name,
                            input_shapes.len()
                        ))
                    })?;
                    placeholders += 1;
                    seeded.push((node.name.clone(), shape.clone()));
                }
                NodeOp::GetAttr => {
                    if let Some(tensor) = graph_module.constants().get(&node.target) {
                        seeded.push((node.name.clone(), tensor.shape().to_vec()));
                    }
                }
                _ => {}
            }
        }

        if placeholders != input_shapes.len() {
            return Err(ShapePropagationError(format!(
                "graph has {placeholders} inputs, {} shapes given",
                input_shapes.len()
            )));
        }
        for (node, shape) in seeded {
            graph_module.set_shape(node, shape);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::constants::ConstantTable;
    use crate::graph::ir::{Argument, Graph};
    use crate::graph::module::{ModuleTable, Tensor};
    use ndarray::IxDyn;

    fn graph_module() -> GraphModule {
        let mut graph = Graph::new();
        let x = graph.create_node(NodeOp::Placeholder, "x", vec![]);
        let w = graph.create_node(NodeOp::GetAttr, "scale", vec![]);
        let y = graph.create_node(
            NodeOp::CallFunction,
            "mul",
            vec![Argument::node(x), Argument::node(w)],
        );
        graph.create_node(NodeOp::Output, "output", vec![Argument::node(y)]);
        let constants = ConstantTable::from([("scale".to_string(), Tensor::ones(IxDyn(&[1, 3])))]);
        GraphModule::new("Net", graph, ModuleTable::new(), constants, true).unwrap()
    }

    #[test]
    fn test_seeds_inputs_and_constants() {
        let mut gm = graph_module();
        PlaceholderShapes.propagate(&mut gm, &[vec![2, 3]]).unwrap();
        assert_eq!(gm.shape("x"), Some(&vec![2, 3]));
        assert_eq!(gm.shape("scale"), Some(&vec![1, 3]));
        assert_eq!(gm.shape("mul"), None);
    }

    #[test]
    fn test_input_count_mismatch() {
        let mut gm = graph_module();
        assert!(PlaceholderShapes.propagate(&mut gm, &[]).is_err());
        assert!(PlaceholderShapes
            .propagate(&mut gm, &[vec![1], vec![2]])
            .is_err());
        // nothing recorded on failure
        assert!(gm.shapes().is_empty());
    }
}
