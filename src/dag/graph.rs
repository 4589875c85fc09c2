// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::tasks::{TaskGroup, TaskKind};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    kind: TaskKind,
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// Simple in-memory DAG representation keyed by task name.
///
/// Built from a [`TaskGroup`]: members of a `Parallel` are independent, and
/// the first tasks of each `Series` element depend on the last tasks of the
/// element before it.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
    /// Task names in a dependency-respecting order.
    order: Vec<TaskName>,
}

/// First and last tasks of a compiled sub-group.
#[derive(Debug, Default)]
struct Ends {
    roots: Vec<TaskName>,
    leaves: Vec<TaskName>,
}

impl DagGraph {
    /// Compile a group into a graph.
    ///
    /// A task referenced twice in the same group is rejected: its position
    /// in the ordering would be ambiguous.
    pub fn from_group(group: &TaskGroup) -> Result<Self> {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();
        let mut declared: Vec<TaskName> = Vec::new();
        compile(group, &mut nodes, &mut declared)?;

        for node in nodes.values_mut() {
            node.deps.sort();
            node.deps.dedup();
        }

        // Second pass: populate dependents based on deps.
        let mut edges: Vec<(TaskName, TaskName)> = Vec::new();
        for (name, node) in nodes.iter() {
            for dep in node.deps.iter() {
                edges.push((dep.clone(), name.clone()));
            }
        }
        edges.sort();
        for (dep, task) in edges.iter() {
            if let Some(dep_node) = nodes.get_mut(dep) {
                dep_node.dependents.push(task.clone());
            }
        }

        let order = topological_order(&declared, &edges)?;
        Ok(Self { nodes, order })
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Task names ordered so that every task follows its dependencies.
    pub fn topological_order(&self) -> &[TaskName] {
        &self.order
    }

    pub fn kind_of(&self, name: &str) -> Option<TaskKind> {
        self.nodes.get(name).map(|n| n.kind)
    }

    /// Tasks without dependencies; triggering these runs the whole graph.
    pub fn roots(&self) -> Vec<TaskName> {
        self.order
            .iter()
            .filter(|name| self.dependencies_of(name).is_empty())
            .cloned()
            .collect()
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}

fn compile(
    group: &TaskGroup,
    nodes: &mut HashMap<TaskName, DagNode>,
    declared: &mut Vec<TaskName>,
) -> Result<Ends> {
    match group {
        TaskGroup::Task(kind) => {
            let name = kind.name().to_string();
            if nodes.contains_key(&name) {
                return Err(AssetdagError::ConfigError(format!(
                    "task '{name}' appears more than once in the group"
                )));
            }
            nodes.insert(
                name.clone(),
                DagNode {
                    kind: *kind,
                    deps: Vec::new(),
                    dependents: Vec::new(),
                },
            );
            declared.push(name.clone());
            Ok(Ends {
                roots: vec![name.clone()],
                leaves: vec![name],
            })
        }
        TaskGroup::Parallel(items) => {
            let mut ends = Ends::default();
            for item in items {
                let item_ends = compile(item, nodes, declared)?;
                ends.roots.extend(item_ends.roots);
                ends.leaves.extend(item_ends.leaves);
            }
            Ok(ends)
        }
        TaskGroup::Series(items) => {
            let mut ends = Ends::default();
            for item in items {
                let item_ends = compile(item, nodes, declared)?;
                if item_ends.roots.is_empty() {
                    // Empty element: nothing to order against.
                    continue;
                }
                for root in item_ends.roots.iter() {
                    if let Some(node) = nodes.get_mut(root) {
                        node.deps.extend(ends.leaves.iter().cloned());
                    }
                }
                if ends.roots.is_empty() {
                    ends.roots = item_ends.roots;
                }
                ends.leaves = item_ends.leaves;
            }
            Ok(ends)
        }
    }
}

/// Order tasks with petgraph, failing on a cycle.
///
/// Edge direction: dep -> task.
fn topological_order(declared: &[TaskName], edges: &[(TaskName, TaskName)]) -> Result<Vec<TaskName>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in declared.iter() {
        graph.add_node(name.as_str());
    }
    for (dep, task) in edges.iter() {
        graph.add_edge(dep.as_str(), task.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(AssetdagError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
