//! Graph preparation
//!
//! Tracing a model into a [`Graph`], giving every reused submodule its own
//! copy, and materializing the constant tensors the graph reads.

pub mod constants;
pub mod dedup;
pub mod graph_module;
pub mod ir;
pub mod module;
pub mod shape;
pub mod tracer;

pub use constants::{extract_constants, ConstantTable};
pub use dedup::deduplicate;
pub use graph_module::{GraphModule, Shape};
pub use ir::{Argument, Graph, Node, NodeOp};
pub use module::{
    Attr, BoundMethod, Forward, Module, ModuleTable, Operand, Receiver, Resolved, Step, Tensor,
};
pub use shape::{PlaceholderShapes, ShapePropagator};
pub use tracer::{swap_functional_modules, ForwardTracer, LeafModulePolicy, Tracer};
