//! Shared-submodule deduplication
//!
//! A module invoked from several call sites would share one set of
//! quantization observers. Each extra call site gets its own deep copy.

use std::collections::BTreeMap;
use tracing::info;

use super::ir::{Graph, NodeOp};
use super::module::ModuleTable;
use crate::error::GraphError;

const DUP_SUFFIX: &str = "_dup";

/// Retarget repeated `call_module` nodes to fresh module copies.
///
/// The first call site keeps its target. The idx-th call site (counted from
/// zero over all call sites of that target) is renamed `<target>_dup<idx>`.
/// A name already held by a module is skipped by bumping the index.
/// Returns the rewritten graph and a table holding only the new copies.
pub fn deduplicate(
    mut graph: Graph,
    modules: &ModuleTable,
) -> Result<(Graph, ModuleTable), GraphError> {
    graph.check_module_targets(modules)?;

    let mut call_sites: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, node) in graph.nodes().iter().enumerate() {
        if node.op == NodeOp::CallModule {
            call_sites.entry(node.target.clone()).or_default().push(i);
        }
    }

    let mut fresh = ModuleTable::new();
    for (target, sites) in call_sites.iter().filter(|(_, sites)| sites.len() > 1) {
        let Some(module) = modules.get(target) else {
            continue;
        };
        for (idx, &site) in sites.iter().enumerate().skip(1) {
            let dup_target = free_name(target, idx, |name| {
                modules.contains_key(name) || fresh.contains_key(name)
            });
            info!("duplicate reused module {target} as {dup_target}");
            graph.set_target(site, dup_target.clone());
            fresh.insert(dup_target, module.clone());
        }
    }

    let mut merged = modules.clone();
    merged.extend(fresh.iter().map(|(k, v)| (k.clone(), v.clone())));
    graph.check_structure()?;
    graph.check_module_targets(&merged)?;

    Ok((graph, fresh))
}

/// First `<target>_dup<n>` with `n >= idx` that is not taken.
fn free_name(target: &str, idx: usize, taken: impl Fn(&str) -> bool) -> String {
    (idx..)
        .map(|n| format!("{target}{DUP_SUFFIX}{n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| format!("{target}{DUP_SUFFIX}{idx}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ir::Argument;
    use crate::graph::module::{Attr, Module, Tensor};
    use ndarray::IxDyn;

    fn conv() -> Module {
        Module::new("nn.Conv2d").with_attr("weight", Attr::Parameter(Tensor::ones(IxDyn(&[2]))))
    }

    fn graph_calling(targets: &[&str]) -> Graph {
        let mut graph = Graph::new();
        let mut last = graph.create_node(NodeOp::Placeholder, "x", vec![]);
        for target in targets {
            last = graph.create_node(NodeOp::CallModule, target, vec![Argument::node(last)]);
        }
        graph.create_node(NodeOp::Output, "output", vec![Argument::node(last)]);
        graph
    }

    #[test]
    fn test_three_calls_to_one_module() {
        let modules = ModuleTable::from([("conv1".to_string(), conv())]);
        let (graph, fresh) =
            deduplicate(graph_calling(&["conv1", "conv1", "conv1"]), &modules).unwrap();

        let targets: Vec<_> = graph
            .nodes_of(NodeOp::CallModule)
            .map(|n| n.target.as_str())
            .collect();
        assert_eq!(targets, vec!["conv1", "conv1_dup1", "conv1_dup2"]);
        assert_eq!(fresh.keys().collect::<Vec<_>>(), vec!["conv1_dup1", "conv1_dup2"]);
        // node names are untouched
        assert!(graph.node("conv1_1").is_some());
    }

    #[test]
    fn test_copies_are_independent() {
        let modules = ModuleTable::from([("conv1".to_string(), conv())]);
        let (_, mut fresh) =
            deduplicate(graph_calling(&["conv1", "conv1", "conv1"]), &modules).unwrap();

        fresh
            .get_mut("conv1_dup1")
            .unwrap()
            .set_attr("weight", Attr::Parameter(Tensor::zeros(IxDyn(&[2]))));
        assert_eq!(fresh["conv1_dup2"], conv());
        assert_eq!(modules["conv1"], conv());
    }

    #[test]
    fn test_single_use_modules_untouched() {
        let modules = ModuleTable::from([
            ("conv1".to_string(), conv()),
            ("conv2".to_string(), conv()),
        ]);
        let original = graph_calling(&["conv1", "conv2"]);
        let (graph, fresh) = deduplicate(original.clone(), &modules).unwrap();
        assert_eq!(graph, original);
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_dup_index_counts_all_call_sites() {
        let modules = ModuleTable::from([
            ("a".to_string(), conv()),
            ("b".to_string(), conv()),
        ]);
        let (graph, _) = deduplicate(graph_calling(&["a", "b", "a", "b"]), &modules).unwrap();
        let targets: Vec<_> = graph
            .nodes_of(NodeOp::CallModule)
            .map(|n| n.target.as_str())
            .collect();
        assert_eq!(targets, vec!["a", "b", "a_dup1", "b_dup1"]);
    }

    #[test]
    fn test_missing_module_is_dangling() {
        let err = deduplicate(graph_calling(&["conv1", "conv1"]), &ModuleTable::new()).unwrap_err();
        assert!(matches!(err, GraphError::DanglingTarget { ref target, .. } if target == "conv1"));
    }

    #[test]
    fn test_copy_name_skips_existing_module() {
        let relu = Module::new("nn.ReLU");
        let modules = ModuleTable::from([
            ("conv1".to_string(), conv()),
            ("conv1_dup1".to_string(), relu.clone()),
        ]);
        let (graph, fresh) =
            deduplicate(graph_calling(&["conv1", "conv1_dup1", "conv1"]), &modules).unwrap();

        let targets: Vec<_> = graph
            .nodes_of(NodeOp::CallModule)
            .map(|n| n.target.as_str())
            .collect();
        assert_eq!(targets, vec!["conv1", "conv1_dup1", "conv1_dup2"]);
        assert_eq!(fresh.keys().collect::<Vec<_>>(), vec!["conv1_dup2"]);

        let mut merged = modules.clone();
        merged.extend(fresh);
        assert_eq!(merged["conv1_dup1"], relu);
        assert_eq!(merged["conv1_dup2"], conv());
    }

    #[test]
    fn test_copy_names_never_collide_across_targets() {
        // "a_dup1" is itself reused, and "a" would also produce "a_dup1"
        let modules = ModuleTable::from([
            ("a".to_string(), conv()),
            ("a_dup1".to_string(), Module::new("nn.ReLU")),
        ]);
        let (graph, fresh) =
            deduplicate(graph_calling(&["a", "a_dup1", "a", "a_dup1"]), &modules).unwrap();

        let targets: Vec<_> = graph
            .nodes_of(NodeOp::CallModule)
            .map(|n| n.target.as_str())
            .collect();
        let unique: std::collections::BTreeSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), targets.len());
        assert_eq!(fresh.len(), 2);
        assert!(!fresh.contains_key("a_dup1"));
    }
}
