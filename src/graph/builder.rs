use super::{BranchTable, WorkflowEdge, WorkflowGraph};
use crate::document::{NodeKind, ValidatedDocument};
use crate::validator::{IssueCode, IssuePath, ValidationIssue, ValidationReport};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::Bfs;
use tracing::instrument;

/// Builds the graph model of a validated document.
///
/// Every structural defect is collected into the returned report; a graph is
/// only returned when there are none. Cycles are allowed as long as every node
/// stays reachable from the entry.
#[instrument(skip_all, fields(workflow = %document.name))]
pub fn build(document: &ValidatedDocument) -> Result<WorkflowGraph, ValidationReport> {
    GraphBuilder::new(document).build()
}

struct GraphBuilder<'a> {
    document: &'a ValidatedDocument,
    graph: DiGraph<crate::document::WorkflowNode, WorkflowEdge>,
    ids: AHashMap<String, NodeIndex>,
    outgoing: Vec<Vec<EdgeIndex>>,
    /// Edges leaving each node as declared, including ones whose target is unknown.
    declared_out: Vec<usize>,
    issues: Vec<ValidationIssue>,
}

impl<'a> GraphBuilder<'a> {
    fn new(document: &'a ValidatedDocument) -> Self {
        Self {
            document,
            graph: DiGraph::with_capacity(document.nodes.len(), document.edges.len()),
            ids: AHashMap::with_capacity(document.nodes.len()),
            outgoing: Vec::new(),
            declared_out: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn build(mut self) -> Result<WorkflowGraph, ValidationReport> {
        self.add_nodes();
        self.check_state_keys();
        self.resolve_edges();
        let entry = self.resolve_entry();
        if let Some(root) = entry.or_else(|| self.fallback_root()) {
            self.check_reachability(root);
        }
        let branch_tables = self.check_branches();
        let terminals = self.check_terminals();

        if !self.issues.is_empty() {
            tracing::debug!(issues = self.issues.len(), "graph build rejected");
            return Err(ValidationReport::new(self.issues, false));
        }
        let Some(entry) = entry else {
            // resolve_entry records an issue whenever it returns None
            return Err(ValidationReport::new(self.issues, false));
        };

        tracing::debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            branches = branch_tables.len(),
            "graph built"
        );
        Ok(WorkflowGraph {
            name: self.document.name.clone(),
            description: self.document.description.clone(),
            graph: self.graph,
            ids: self.ids,
            entry,
            terminals,
            outgoing: self.outgoing,
            branch_tables,
        })
    }

    fn push(&mut self, code: IssueCode, path: IssuePath, message: String) {
        self.issues.push(ValidationIssue::new(code, path, message));
    }

    fn node_path(index: NodeIndex) -> IssuePath {
        IssuePath::root().key("nodes").index(index.index())
    }

    fn edge_path(position: usize) -> IssuePath {
        IssuePath::root().key("edges").index(position)
    }

    fn id(&self, index: NodeIndex) -> &str {
        &self.graph[index].id
    }

    /// Phase 1: every node gets a stable arena index.
    fn add_nodes(&mut self) {
        for node in &self.document.nodes {
            let idx = self.graph.add_node(node.clone());
            self.ids.insert(node.id.clone(), idx);
        }
        self.outgoing = vec![Vec::new(); self.graph.node_count()];
        self.declared_out = vec![0; self.graph.node_count()];
    }

    /// Node ids and state keys share one namespace in the generated graph.
    fn check_state_keys(&mut self) {
        let keys: AHashSet<String> = self
            .document
            .nodes
            .iter()
            .flat_map(|node| node.spec.state_fields())
            .map(|field| field.name)
            .collect();
        for idx in self.graph.node_indices().collect::<Vec<_>>() {
            if keys.contains(self.id(idx)) {
                let message = format!(
                    "node id '{}' is also a state key; rename the node or the key",
                    self.id(idx)
                );
                self.push(IssueCode::StateKeyCollision, Self::node_path(idx).key("id"), message);
            }
        }
    }

    /// Phase 2: edges are resolved to indices once, in declaration order.
    fn resolve_edges(&mut self) {
        for (position, decl) in self.document.edges.iter().enumerate() {
            let source = self.ids.get(&decl.source).copied();
            let target = self.ids.get(&decl.target).copied();
            let path = Self::edge_path(position);
            if source.is_none() {
                self.push(
                    IssueCode::DanglingReference,
                    path.key("source"),
                    format!("edge source references unknown node '{}'", decl.source),
                );
            }
            if target.is_none() {
                self.push(
                    IssueCode::DanglingReference,
                    path.key("target"),
                    format!("edge target references unknown node '{}'", decl.target),
                );
            }
            if let Some(source) = source {
                self.declared_out[source.index()] += 1;
            }
            if let (Some(source), Some(target)) = (source, target) {
                let edge = self.graph.add_edge(
                    source,
                    target,
                    WorkflowEdge {
                        source,
                        target,
                        condition: decl.condition.clone(),
                        position,
                    },
                );
                self.outgoing[source.index()].push(edge);
            }
        }
    }

    /// Finds the single start node and checks the document's `entry` agrees with it.
    fn resolve_entry(&mut self) -> Option<NodeIndex> {
        let starts: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| self.graph[*idx].kind() == NodeKind::Start)
            .collect();
        let declared = self.ids.get(&self.document.entry).copied();
        if declared.is_none() {
            self.push(
                IssueCode::DanglingReference,
                IssuePath::root().key("entry"),
                format!("entry references unknown node '{}'", self.document.entry),
            );
        }

        match starts.as_slice() {
            [] => {
                self.push(
                    IssueCode::MissingEntry,
                    IssuePath::root().key("nodes"),
                    "workflow has no start node".to_string(),
                );
                None
            }
            [start] => {
                let start = *start;
                if let Some(declared) = declared.filter(|d| *d != start) {
                    let message = format!(
                        "entry names '{}' ({}) but the start node is '{}'",
                        self.id(declared),
                        self.graph[declared].kind(),
                        self.id(start)
                    );
                    self.push(IssueCode::EntryMismatch, IssuePath::root().key("entry"), message);
                    return None;
                }
                declared.map(|_| start)
            }
            many => {
                let message = format!(
                    "workflow has {} start nodes ({}), exactly one is allowed",
                    many.len(),
                    many.iter().map(|idx| format!("'{}'", self.id(*idx))).join(", ")
                );
                self.push(IssueCode::MultipleEntries, IssuePath::root().key("nodes"), message);
                None
            }
        }
    }

    /// Where to start the reachability walk when the entry itself is in doubt:
    /// the first start node, else whatever `entry` names.
    fn fallback_root(&self) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|idx| self.graph[*idx].kind() == NodeKind::Start)
            .or_else(|| self.ids.get(&self.document.entry).copied())
    }

    /// Breadth-first walk from the entry. Unreached nodes that form a cycle of
    /// their own are reported once per cycle rather than once per node.
    fn check_reachability(&mut self, root: NodeIndex) {
        let mut reached = vec![false; self.graph.node_count()];
        let mut bfs = Bfs::new(&self.graph, root);
        while let Some(idx) = bfs.next(&self.graph) {
            reached[idx.index()] = true;
        }

        let unreached: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| !reached[idx.index()])
            .collect();
        if unreached.is_empty() {
            return;
        }

        let mut island: DiGraph<NodeIndex, ()> = DiGraph::new();
        let mut local: AHashMap<NodeIndex, NodeIndex> = AHashMap::new();
        for idx in &unreached {
            local.insert(*idx, island.add_node(*idx));
        }
        for edge in self.graph.edge_indices() {
            let w = &self.graph[edge];
            if let (Some(a), Some(b)) = (local.get(&w.source), local.get(&w.target)) {
                island.add_edge(*a, *b, ());
            }
        }

        let entry_id = self.id(root).to_string();
        let mut found: Vec<(usize, ValidationIssue)> = Vec::new();
        for component in tarjan_scc(&island) {
            let is_cycle = component.len() > 1
                || island.contains_edge(component[0], component[0]);
            let mut members: Vec<NodeIndex> = component.iter().map(|l| island[*l]).collect();
            members.sort();
            if is_cycle {
                let first = members[0];
                found.push((
                    first.index(),
                    ValidationIssue::new(
                        IssueCode::IsolatedCycle,
                        Self::node_path(first),
                        format!(
                            "nodes {} form a cycle that is not reachable from entry '{}'",
                            members.iter().map(|idx| format!("'{}'", self.id(*idx))).join(", "),
                            entry_id
                        ),
                    ),
                ));
            } else {
                for idx in members {
                    found.push((
                        idx.index(),
                        ValidationIssue::new(
                            IssueCode::UnreachableNode,
                            Self::node_path(idx),
                            format!(
                                "node '{}' is not reachable from entry '{}'",
                                self.id(idx),
                                entry_id
                            ),
                        ),
                    ));
                }
            }
        }
        found.sort_by_key(|(position, _)| *position);
        self.issues.extend(found.into_iter().map(|(_, issue)| issue));
    }

    /// Checks each conditional node's edge labels against its declared labels
    /// and builds the routing tables.
    fn check_branches(&mut self) -> Vec<BranchTable> {
        let mut tables = Vec::new();
        for idx in self.graph.node_indices().collect::<Vec<_>>() {
            let edges: Vec<WorkflowEdge> = self.outgoing[idx.index()]
                .iter()
                .map(|e| self.graph[*e].clone())
                .collect();
            let declared = self.graph[idx].spec.branch_labels().map(<[String]>::to_vec);

            let Some(declared) = declared else {
                for edge in edges.iter().filter(|e| e.is_conditional()) {
                    let message = format!(
                        "edge '{}' -> '{}' has condition '{}' but '{}' is a {} node, not a conditional-branch",
                        self.id(edge.source),
                        self.id(edge.target),
                        edge.condition.as_deref().unwrap_or_default(),
                        self.id(idx),
                        self.graph[idx].kind()
                    );
                    self.push(
                        IssueCode::ConditionOnPlainNode,
                        Self::edge_path(edge.position).key("condition"),
                        message,
                    );
                }
                continue;
            };

            let before = self.issues.len();
            let mut seen: AHashSet<&str> = AHashSet::new();
            let mut routes = Vec::new();
            for edge in &edges {
                let Some(label) = edge.condition.as_deref() else {
                    let message = format!(
                        "conditional-branch node '{}' has an unconditional edge to '{}'",
                        self.id(idx),
                        self.id(edge.target)
                    );
                    self.push(
                        IssueCode::UnconditionalFromBranch,
                        Self::edge_path(edge.position),
                        message,
                    );
                    continue;
                };
                if !declared.iter().any(|d| d == label) {
                    let message = format!(
                        "branch label '{}' on edge to '{}' is not declared by node '{}' (declared: {})",
                        label,
                        self.id(edge.target),
                        self.id(idx),
                        declared.iter().join(", ")
                    );
                    self.push(
                        IssueCode::BranchUnexpected,
                        Self::edge_path(edge.position).key("condition"),
                        message,
                    );
                } else if !seen.insert(label) {
                    let message = format!(
                        "branch label '{}' of node '{}' is used by more than one edge",
                        label,
                        self.id(idx)
                    );
                    self.push(
                        IssueCode::DuplicateBranch,
                        Self::edge_path(edge.position).key("condition"),
                        message,
                    );
                } else {
                    routes.push((label.to_string(), edge.target));
                }
            }

            let missing: Vec<&String> = declared.iter().filter(|d| !seen.contains(d.as_str())).collect();
            if !missing.is_empty() {
                let message = format!(
                    "conditional-branch node '{}' has no edge for declared label(s): {}",
                    self.id(idx),
                    missing.iter().join(", ")
                );
                self.push(
                    IssueCode::BranchMissing,
                    Self::node_path(idx).key("config").key("branches"),
                    message,
                );
            }

            if self.issues.len() == before {
                tables.push(BranchTable { node: idx, routes });
            }
        }
        tables
    }

    /// End nodes must be sinks and every sink must be an end node.
    fn check_terminals(&mut self) -> Vec<NodeIndex> {
        let mut terminals = Vec::new();
        for idx in self.graph.node_indices().collect::<Vec<_>>() {
            let kind = self.graph[idx].kind();
            let out = self.declared_out[idx.index()];
            if kind.is_terminal() {
                terminals.push(idx);
                if out > 0 {
                    let message = format!(
                        "end node '{}' has {} outgoing edge(s); end nodes must be terminal",
                        self.id(idx),
                        out
                    );
                    self.push(IssueCode::TerminalHasSuccessor, Self::node_path(idx), message);
                }
            } else if out == 0 {
                let message = format!(
                    "dead end: {} node '{}' has no outgoing edges and is not an end node",
                    kind,
                    self.id(idx)
                );
                self.push(IssueCode::DeadEnd, Self::node_path(idx), message);
            }
        }
        if terminals.is_empty() && self.graph.node_count() > 0 {
            self.push(
                IssueCode::NoTerminal,
                IssuePath::root().key("nodes"),
                "workflow has no end node".to_string(),
            );
        }
        terminals
    }
}
