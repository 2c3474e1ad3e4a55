//! Attribute preservation across tracing
//!
//! Tracing keeps only what the forward program touches. Attributes listed in
//! `preserve_attr` are read from the model beforehand and written onto the
//! prepared graph module afterwards.

use std::collections::BTreeMap;
use tracing::info;

use crate::error::GraphError;
use crate::graph::module::qualify;
use crate::graph::{Attr, GraphModule, Module, Receiver};

#[derive(Debug, Clone, PartialEq)]
struct Preserved {
    /// Type path of the owning model module.
    owner: String,
    attrs: Vec<(String, Attr)>,
}

/// Snapshot of the attributes to carry over, keyed by submodule path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreservedAttrs {
    entries: BTreeMap<String, Preserved>,
}

impl PreservedAttrs {
    /// Read every requested attribute; `""` addresses the root module.
    pub fn snapshot(
        model: &Module,
        requested: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, GraphError> {
        let mut entries = BTreeMap::new();
        for (path, names) in requested {
            let module = model.submodule(path).ok_or_else(|| missing_segment(model, path))?;
            let mut attrs = Vec::with_capacity(names.len());
            for name in names {
                let attr = module.attr(name).ok_or_else(|| GraphError::AttributePath {
                    path: qualify(path, name),
                    segment: name.clone(),
                })?;
                attrs.push((name.clone(), attr.clone()));
            }
            entries.insert(
                path.clone(),
                Preserved {
                    owner: module.kind().to_string(),
                    attrs,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|p| p.attrs.len()).sum()
    }

    /// Write the snapshot onto a prepared graph module.
    ///
    /// Bound methods are rebound to the prepared receiver at the same path.
    pub fn restore(self, prepared: &mut GraphModule) {
        let graph_module = prepared.name().to_string();
        for (path, preserved) in self.entries {
            for (name, attr) in preserved.attrs {
                info!("Preserve attr: {path}.{name}");
                let attr = match attr {
                    Attr::Method(method) => {
                        let mut method = method.rebind(Receiver::Prepared {
                            graph_module: graph_module.clone(),
                            path: path.clone(),
                        });
                        method.owner.clone_from(&preserved.owner);
                        Attr::Method(method)
                    }
                    other => other,
                };
                prepared.set_attr(&path, name, attr);
            }
        }
    }
}

/// First segment of `path` that is not a child module.
fn missing_segment(model: &Module, path: &str) -> GraphError {
    let mut current = model;
    for segment in path.split('.') {
        match current.child(segment) {
            Some(child) => current = child,
            None => {
                return GraphError::AttributePath {
                    path: path.to_string(),
                    segment: segment.to_string(),
                }
            }
        }
    }
    GraphError::AttributePath {
        path: path.to_string(),
        segment: path.to_string(),
    }
}
