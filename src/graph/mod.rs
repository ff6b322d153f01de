//! The immutable graph model the code generator reads.

mod builder;

pub use builder::build;

use crate::document::{NodeKind, WorkflowNode};
use ahash::AHashMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::Serialize;

/// An edge resolved to arena indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowEdge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub condition: Option<String>,
    /// Position of the edge in the document's edge list.
    pub position: usize,
}

impl WorkflowEdge {
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

/// The routing table of one conditional node: a total mapping from each
/// declared label to the node it leads to, in edge declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTable {
    pub node: NodeIndex,
    pub routes: Vec<(String, NodeIndex)>,
}

impl BranchTable {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(label, _)| label.as_str())
    }
}

/// A structurally sound workflow graph.
///
/// Only [`build`] creates one, and nothing mutates it afterwards. Node and edge
/// indices follow document declaration order.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) graph: DiGraph<WorkflowNode, WorkflowEdge>,
    pub(crate) ids: AHashMap<String, NodeIndex>,
    pub(crate) entry: NodeIndex,
    pub(crate) terminals: Vec<NodeIndex>,
    pub(crate) outgoing: Vec<Vec<EdgeIndex>>,
    pub(crate) branch_tables: Vec<BranchTable>,
}

impl WorkflowGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, index: NodeIndex) -> &WorkflowNode {
        &self.graph[index]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &WorkflowNode)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Edges in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = &WorkflowEdge> {
        self.graph.edge_indices().map(move |idx| &self.graph[idx])
    }

    /// Outgoing edges of a node, in declaration order.
    pub fn outgoing(&self, node: NodeIndex) -> impl Iterator<Item = &WorkflowEdge> {
        self.outgoing[node.index()]
            .iter()
            .map(move |idx| &self.graph[*idx])
    }

    pub fn entry(&self) -> NodeIndex {
        self.entry
    }

    pub fn terminals(&self) -> &[NodeIndex] {
        &self.terminals
    }

    pub fn branch_tables(&self) -> &[BranchTable] {
        &self.branch_tables
    }

    pub fn branch_table(&self, node: NodeIndex) -> Option<&BranchTable> {
        self.branch_tables.iter().find(|t| t.node == node)
    }

    pub fn summary(&self) -> GraphSummary {
        let mut kinds: Vec<(NodeKind, usize)> = Vec::new();
        for (_, node) in self.nodes() {
            match kinds.iter_mut().find(|(k, _)| *k == node.kind()) {
                Some((_, count)) => *count += 1,
                None => kinds.push((node.kind(), 1)),
            }
        }
        kinds.sort();
        GraphSummary {
            name: self.name.clone(),
            entry: self.node(self.entry).id.clone(),
            terminals: self
                .terminals
                .iter()
                .map(|idx| self.node(*idx).id.clone())
                .collect(),
            nodes: self.node_count(),
            edges: self.edge_count(),
            conditional_nodes: self.branch_tables.len(),
            kinds,
        }
    }
}

/// A printable overview of a built graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub name: String,
    pub entry: String,
    pub terminals: Vec<String>,
    pub nodes: usize,
    pub edges: usize,
    pub conditional_nodes: usize,
    pub kinds: Vec<(NodeKind, usize)>,
}
