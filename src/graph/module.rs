//! Model representation consumed by the tracer.
//!
//! A [`Module`] is a tree: a type path (`nn.Conv2d`, `custom.Backbone`),
//! ordered named children, named attributes and an optional declarative
//! [`Forward`] program describing how inputs flow through the children.

use ndarray::ArrayD;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::GraphError;

/// Dense tensor type used for parameters, buffers and constants.
pub type Tensor = ArrayD<f32>;

/// Qualified module path → owned module.
pub type ModuleTable = BTreeMap<String, Module>;

/// Type path of the functional-op wrapper swapped before tracing.
pub const FLOAT_FUNCTIONAL: &str = "nn.quantized.FloatFunctional";
/// Traceable replacement for [`FLOAT_FUNCTIONAL`].
pub const FX_FLOAT_FUNCTIONAL: &str = "nn.quantized.FXFloatFunctional";

/// Object a bound method is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// A module of the original model, by qualified path.
    Model { path: String },
    /// A module of a prepared graph module, by qualified path.
    Prepared { graph_module: String, path: String },
}

/// Method defined on a module type and bound to one receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundMethod {
    /// Method name.
    pub name: String,
    /// Type path that defines the method.
    pub owner: String,
    pub receiver: Receiver,
}

impl BoundMethod {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, receiver: Receiver) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            receiver,
        }
    }

    /// Same method of the same type, bound to another receiver.
    #[must_use]
    pub fn rebind(&self, receiver: Receiver) -> Self {
        Self {
            receiver,
            ..self.clone()
        }
    }
}

/// Named module attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Parameter(Tensor),
    Buffer(Tensor),
    Value(Value),
    Method(BoundMethod),
}

impl Attr {
    /// The tensor behind a parameter or buffer.
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Parameter(t) | Self::Buffer(t) => Some(t),
            Self::Value(_) | Self::Method(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "parameter",
            Self::Buffer(_) => "buffer",
            Self::Value(_) => "value",
            Self::Method(_) => "method",
        }
    }
}

/// Operand of a forward step.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Positional input of the enclosing forward.
    Input(usize),
    /// Result of an earlier step.
    Step(usize),
    /// Attribute of the enclosing module, dotted path allowed (`norm.running_stat`).
    Attr(String),
    /// Literal.
    Value(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(i) => write!(f, "input#{i}"),
            Self::Step(i) => write!(f, "step#{i}"),
            Self::Attr(path) => write!(f, "attr '{path}'"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// One forward operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Invoke a direct child module.
    CallChild { child: String, args: Vec<Operand> },
    /// Free function (`add`, `torch.flatten`).
    CallFunction { function: String, args: Vec<Operand> },
    /// Method on the first operand (`view`, `permute`).
    CallMethod { method: String, args: Vec<Operand> },
}

impl Step {
    pub fn args(&self) -> &[Operand] {
        match self {
            Self::CallChild { args, .. }
            | Self::CallFunction { args, .. }
            | Self::CallMethod { args, .. } => args,
        }
    }
}

/// Declarative forward program.
#[derive(Debug, Clone, PartialEq)]
pub struct Forward {
    /// Input names, in call order.
    pub inputs: Vec<String>,
    pub steps: Vec<Step>,
    pub output: Operand,
}

impl Forward {
    pub fn new(inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            steps: Vec::new(),
            output: Operand::Input(0),
        }
    }

    /// Append a step; returns its operand.
    pub fn step(&mut self, step: Step) -> Operand {
        self.steps.push(step);
        Operand::Step(self.steps.len() - 1)
    }

    pub fn call(&mut self, child: &str, args: Vec<Operand>) -> Operand {
        self.step(Step::CallChild {
            child: child.to_string(),
            args,
        })
    }

    pub fn function(&mut self, function: &str, args: Vec<Operand>) -> Operand {
        self.step(Step::CallFunction {
            function: function.to_string(),
            args,
        })
    }

    pub fn method(&mut self, method: &str, args: Vec<Operand>) -> Operand {
        self.step(Step::CallMethod {
            method: method.to_string(),
            args,
        })
    }

    #[must_use]
    pub fn returning(mut self, output: Operand) -> Self {
        self.output = output;
        self
    }
}

/// Result of resolving a dotted attribute path.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Module(&'a Module),
    Attr(&'a Attr),
}

impl Resolved<'_> {
    fn kind(&self) -> String {
        match self {
            Self::Module(m) => format!("module {}", m.kind()),
            Self::Attr(a) => a.kind().to_string(),
        }
    }
}

/// Node of the model tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    kind: String,
    training: bool,
    children: Vec<(String, Module)>,
    attributes: BTreeMap<String, Attr>,
    forward: Option<Forward>,
}

impl Module {
    /// Module of the given type path, in training mode, with no children.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            training: true,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            forward: None,
        }
    }

    /// Add or replace a child, keeping its original position on replace.
    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>, child: Module) -> Self {
        self.set_child(name, child);
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, attr: Attr) -> Self {
        self.set_attr(name, attr);
        self
    }

    #[must_use]
    pub fn with_forward(mut self, forward: Forward) -> Self {
        self.forward = Some(forward);
        self
    }

    /// Set the training flag on this module and every descendant.
    #[must_use]
    pub fn train(mut self, training: bool) -> Self {
        self.for_each_mut(&mut |m| m.training = training);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = kind.into();
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn forward(&self) -> Option<&Forward> {
        self.forward.as_ref()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Module)> {
        self.children.iter().map(|(name, m)| (name.as_str(), m))
    }

    pub fn child(&self, name: &str) -> Option<&Module> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.children
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    pub fn set_child(&mut self, name: impl Into<String>, child: Module) {
        let name = name.into();
        match self.child_mut(&name) {
            Some(slot) => *slot = child,
            None => self.children.push((name, child)),
        }
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attr> {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attributes.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, attr: Attr) {
        self.attributes.insert(name.into(), attr);
    }

    /// Descendant by dotted path; `""` is this module.
    pub fn submodule(&self, path: &str) -> Option<&Module> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.')
            .try_fold(self, |module, segment| module.child(segment))
    }

    pub fn submodule_mut(&mut self, path: &str) -> Option<&mut Module> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.')
            .try_fold(self, |module, segment| module.child_mut(segment))
    }

    /// Every module with its dotted path, pre-order, root first as `""`.
    pub fn named_modules(&self) -> Vec<(String, &Module)> {
        let mut out = vec![(String::new(), self)];
        self.collect_named("", &mut out);
        out
    }

    fn collect_named<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Module)>) {
        for (name, child) in &self.children {
            let path = qualify(prefix, name);
            out.push((path.clone(), child));
            child.collect_named(&path, out);
        }
    }

    /// Visit this module and every descendant, pre-order.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Module)) {
        f(self);
        for (_, child) in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// Resolve a dotted path segment by segment: children first, then attributes.
    pub fn resolve(&self, path: &str) -> Result<Resolved<'_>, GraphError> {
        let mut current = Resolved::Module(self);
        if path.is_empty() {
            return Ok(current);
        }
        for segment in path.split('.') {
            let Resolved::Module(module) = current else {
                return Err(GraphError::AttributePath {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            };
            current = match (module.child(segment), module.attr(segment)) {
                (Some(child), _) => Resolved::Module(child),
                (None, Some(attr)) => Resolved::Attr(attr),
                (None, None) => {
                    return Err(GraphError::AttributePath {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };
        }
        Ok(current)
    }

    /// Resolve a dotted path that must end at a parameter or buffer.
    pub fn resolve_tensor(&self, path: &str) -> Result<&Tensor, GraphError> {
        let resolved = self.resolve(path)?;
        match resolved {
            Resolved::Attr(attr) => attr.as_tensor(),
            Resolved::Module(_) => None,
        }
        .ok_or_else(|| GraphError::NotATensor {
            path: path.to_string(),
            found: resolved.kind(),
        })
    }
}

/// Join a prefix and a name with `.`, skipping an empty prefix.
pub fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
