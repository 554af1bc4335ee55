// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::task::{TaskDef, TaskName};
use crate::errors::{DagrunError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// Incrementally builds a [`DagGraph`], validating every mutation.
///
/// - `add_task` rejects duplicate names.
/// - `add_edge` rejects edges whose endpoints are unknown, and edges that
///   would close a cycle (self-edges included). The offending edge is never
///   retained, so a builder stays usable after a rejected call.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    tasks: BTreeMap<TaskName, TaskDef>,
    edges: Vec<(TaskName, TaskName)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task definition.
    pub fn add_task(&mut self, def: TaskDef) -> Result<&mut Self> {
        if self.tasks.contains_key(&def.name) {
            return Err(DagrunError::DuplicateTask(def.name.clone()));
        }
        debug!(task = %def.name, "task added to graph builder");
        self.tasks.insert(def.name.clone(), def);
        Ok(self)
    }

    /// Add a dependency edge: `downstream` runs only after `upstream`
    /// succeeds.
    pub fn add_edge(
        &mut self,
        upstream: impl Into<TaskName>,
        downstream: impl Into<TaskName>,
    ) -> Result<&mut Self> {
        let upstream = upstream.into();
        let downstream = downstream.into();

        for endpoint in [&upstream, &downstream] {
            if !self.tasks.contains_key(endpoint) {
                return Err(DagrunError::UnknownTask(endpoint.clone()));
            }
        }

        // A self-edge is the smallest possible cycle.
        if upstream == downstream {
            return Err(DagrunError::DependencyCycle(upstream));
        }

        self.edges.push((upstream.clone(), downstream.clone()));
        if let Err(err) = self.check_acyclic() {
            self.edges.pop();
            return Err(err);
        }

        debug!(upstream = %upstream, downstream = %downstream, "edge added");
        Ok(self)
    }

    /// Finalise the graph.
    pub fn build(self) -> Result<DagGraph> {
        self.check_acyclic()?;

        let mut nodes: BTreeMap<TaskName, DagNode> = self
            .tasks
            .keys()
            .map(|name| (name.clone(), DagNode::default()))
            .collect();

        // Endpoints were validated in add_edge, so these entries exist.
        for (upstream, downstream) in &self.edges {
            nodes
                .entry(downstream.clone())
                .or_default()
                .deps
                .push(upstream.clone());
            nodes
                .entry(upstream.clone())
                .or_default()
                .dependents
                .push(downstream.clone());
        }

        Ok(DagGraph {
            tasks: self.tasks,
            nodes,
        })
    }

    /// A topological sort fails exactly when there is a cycle.
    ///
    /// Edge direction: upstream -> downstream.
    fn check_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }
        for (upstream, downstream) in &self.edges {
            graph.add_edge(upstream.as_str(), downstream.as_str(), ());
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(DagrunError::DependencyCycle(
                cycle.node_id().to_string(),
            )),
        }
    }
}

/// Immutable task graph: definitions plus adjacency in both directions.
///
/// Construction goes through [`GraphBuilder`], so a `DagGraph` is always
/// acyclic and every referenced dependency exists.
#[derive(Clone)]
pub struct DagGraph {
    tasks: BTreeMap<TaskName, TaskDef>,
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Return all task names in deterministic (sorted) order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a task definition.
    pub fn task(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
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

    /// Tasks with no dependencies (the roots of the DAG).
    pub fn roots(&self) -> Vec<TaskName> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl std::fmt::Debug for DagGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagGraph")
            .field("tasks", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}
