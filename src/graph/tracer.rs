//! Symbolic tracing
//!
//! [`Tracer`] is the seam for any tracer implementation. [`ForwardTracer`]
//! interprets each module's declarative [`Forward`] program: leaf modules
//! become `call_module` nodes, other modules are inlined.

use tracing::debug;

use super::ir::{Argument, Graph, NodeOp};
use super::module::{qualify, Forward, Module, Operand, Step, FLOAT_FUNCTIONAL, FX_FLOAT_FUNCTIONAL};
use crate::config::ConcreteArgs;
use crate::error::TraceError;

const NN_NAMESPACE: &str = "nn.";
const NN_SEQUENTIAL: &str = "nn.Sequential";

/// Decides which modules stay opaque during tracing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafModulePolicy {
    custom: Vec<String>,
}

impl LeafModulePolicy {
    /// Policy with extra leaf module type paths.
    pub fn new(custom: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            custom: custom.into_iter().map(Into::into).collect(),
        }
    }

    pub fn custom(&self) -> &[String] {
        &self.custom
    }

    /// Custom leaf types, and `nn.` modules other than `nn.Sequential`.
    pub fn is_leaf(&self, module: &Module, _qualified_name: &str) -> bool {
        let kind = module.kind();
        if self.custom.iter().any(|c| c == kind) {
            return true;
        }
        kind.starts_with(NN_NAMESPACE) && kind != NN_SEQUENTIAL
    }
}

/// Converts a model into a graph.
pub trait Tracer {
    fn trace(
        &self,
        model: &Module,
        concrete_args: &ConcreteArgs,
        leaf: &LeafModulePolicy,
    ) -> Result<Graph, TraceError>;
}

/// Replace every `FloatFunctional` with its traceable counterpart.
///
/// Returns the number of modules swapped.
pub fn swap_functional_modules(model: &mut Module) -> usize {
    let mut swapped = 0;
    model.for_each_mut(&mut |module| {
        if module.kind() == FLOAT_FUNCTIONAL {
            module.set_kind(FX_FLOAT_FUNCTIONAL);
            swapped += 1;
        }
    });
    if swapped > 0 {
        debug!(swapped, "swapped FloatFunctional modules");
    }
    swapped
}

/// Tracer interpreting declarative forward programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardTracer;

impl Tracer for ForwardTracer {
    fn trace(
        &self,
        model: &Module,
        concrete_args: &ConcreteArgs,
        leaf: &LeafModulePolicy,
    ) -> Result<Graph, TraceError> {
        let forward = model
            .forward()
            .ok_or_else(|| TraceError::MissingForward(model.kind().to_string()))?;

        let mut graph = Graph::new();
        let inputs: Vec<Argument> = forward
            .inputs
            .iter()
            .map(|name| match concrete_args.get(name) {
                Some(value) => Argument::Value(value.clone()),
                None => Argument::node(graph.create_node(NodeOp::Placeholder, name, vec![])),
            })
            .collect();

        let mut session = Session { graph, leaf };
        let result = session.inline(model, "", forward, inputs)?;
        session
            .graph
            .create_node(NodeOp::Output, "output", vec![result]);
        Ok(session.graph)
    }
}

struct Session<'a> {
    graph: Graph,
    leaf: &'a LeafModulePolicy,
}

impl Session<'_> {
    /// Emit the nodes of one forward program, returning its result.
    fn inline(
        &mut self,
        module: &Module,
        prefix: &str,
        forward: &Forward,
        inputs: Vec<Argument>,
    ) -> Result<Argument, TraceError> {
        let mut results: Vec<Argument> = Vec::with_capacity(forward.steps.len());

        for step in &forward.steps {
            let args = step
                .args()
                .iter()
                .map(|op| self.operand(module, prefix, op, &inputs, &results))
                .collect::<Result<Vec<_>, _>>()?;

            let result = match step {
                Step::CallChild { child, .. } => self.call_child(module, prefix, child, args)?,
                Step::CallFunction { function, .. } => Argument::node(self.graph.create_node(
                    NodeOp::CallFunction,
                    function,
                    args,
                )),
                Step::CallMethod { method, .. } => Argument::node(self.graph.create_node(
                    NodeOp::CallMethod,
                    method,
                    args,
                )),
            };
            results.push(result);
        }

        self.operand(module, prefix, &forward.output, &inputs, &results)
    }

    fn call_child(
        &mut self,
        module: &Module,
        prefix: &str,
        name: &str,
        args: Vec<Argument>,
    ) -> Result<Argument, TraceError> {
        let qualified = qualify(prefix, name);
        let child = module.child(name).ok_or_else(|| TraceError::MissingChild {
            module: display_path(prefix, module),
            child: name.to_string(),
        })?;

        if self.leaf.is_leaf(child, &qualified) {
            return Ok(Argument::node(self.graph.create_node(
                NodeOp::CallModule,
                &qualified,
                args,
            )));
        }

        let forward = child
            .forward()
            .ok_or_else(|| TraceError::MissingForward(qualified.clone()))?;
        if forward.inputs.len() != args.len() {
            return Err(TraceError::Arity {
                module: qualified,
                expected: forward.inputs.len(),
                actual: args.len(),
            });
        }
        self.inline(child, &qualified, forward, args)
    }

    fn operand(
        &mut self,
        module: &Module,
        prefix: &str,
        operand: &Operand,
        inputs: &[Argument],
        results: &[Argument],
    ) -> Result<Argument, TraceError> {
        let bad = || TraceError::BadOperand {
            module: display_path(prefix, module),
            operand: operand.to_string(),
        };
        match operand {
            Operand::Input(i) => inputs.get(*i).cloned().ok_or_else(bad),
            Operand::Step(i) => results.get(*i).cloned().ok_or_else(bad),
            Operand::Attr(path) => {
                let target = qualify(prefix, path);
                Ok(Argument::node(self.graph.create_node(
                    NodeOp::GetAttr,
                    &target,
                    vec![],
                )))
            }
            Operand::Value(v) => Ok(Argument::Value(v.clone())),
        }
    }
}

fn display_path(prefix: &str, module: &Module) -> String {
    if prefix.is_empty() {
        module.kind().to_string()
    } else {
        prefix.to_string()
    }
}
