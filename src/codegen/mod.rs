//! Emits a Python package that rebuilds a [`WorkflowGraph`] as a framework `StateGraph`.

mod modules;
pub mod naming;
pub mod options;
mod python;

pub use options::{FrameworkVersion, GeneratorOptions, GeneratorOptionsBuilder};

use crate::error::GenerateError;
use crate::graph::WorkflowGraph;
use itertools::Itertools;
use naming::{IdentifierTable, pascal_case, python_identifier};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// One generated source file, addressed relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedArtifact {
    fn new(path: PathBuf, contents: String) -> Self {
        Self { path, contents }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }
}

/// Names shared by every emitted file.
pub(crate) struct Layout {
    pub(crate) module: String,
    pub(crate) state_class: String,
    /// Python identifier of each node, indexed like the graph's nodes.
    pub(crate) slugs: Vec<String>,
}

impl Layout {
    fn new(graph: &WorkflowGraph, options: &GeneratorOptions) -> Self {
        let module = python_identifier(
            options.module_name.as_deref().unwrap_or(graph.name()),
            "workflow",
        );
        let state_class = format!("{}State", pascal_case(&module));

        let mut table = IdentifierTable::default();
        let slugs = graph
            .nodes()
            .map(|(_, node)| table.claim(python_identifier(&node.id, "node")))
            .collect();

        Self {
            module,
            state_class,
            slugs,
        }
    }

    pub(crate) fn slug(&self, node: NodeIndex) -> &str {
        &self.slugs[node.index()]
    }

    fn file(&self, parts: &[&str]) -> PathBuf {
        parts.iter().fold(PathBuf::from(&self.module), |path, part| path.join(part))
    }
}

/// Generates the source package for a built graph.
///
/// Output is a pure function of the graph and the options: the same inputs
/// always yield byte-identical artifacts in the same order.
#[instrument(skip_all, fields(workflow = %graph.name()))]
pub fn generate(
    graph: &WorkflowGraph,
    options: &GeneratorOptions,
) -> Result<Vec<GeneratedArtifact>, GenerateError> {
    check_invariants(graph)?;

    let layout = Layout::new(graph, options);
    let mut artifacts = vec![
        GeneratedArtifact::new(
            layout.file(&["__init__.py"]),
            modules::package_init(graph, &layout, options),
        ),
        GeneratedArtifact::new(
            layout.file(&["state.py"]),
            modules::state(graph, &layout, options),
        ),
        GeneratedArtifact::new(layout.file(&["runtime.py"]), modules::runtime(graph, options)),
        GeneratedArtifact::new(
            layout.file(&["nodes", "__init__.py"]),
            modules::nodes_init(graph, &layout, options),
        ),
    ];
    for (idx, _) in graph.nodes() {
        let file_name = format!("{}.py", layout.slug(idx));
        artifacts.push(GeneratedArtifact::new(
            layout.file(&["nodes", &file_name]),
            modules::node(graph, idx, &layout, options),
        ));
    }
    artifacts.push(GeneratedArtifact::new(
        layout.file(&["graph.py"]),
        modules::graph(graph, &layout, options),
    ));

    tracing::info!(
        artifacts = artifacts.len(),
        module = %layout.module,
        "generated workflow package"
    );
    Ok(artifacts)
}

/// Re-checks the builder guarantees the emitters rely on.
fn check_invariants(graph: &WorkflowGraph) -> Result<(), GenerateError> {
    let entry = graph.node(graph.entry());
    if entry.kind() != crate::document::NodeKind::Start {
        return Err(GenerateError::EntryNotStart {
            node_id: entry.id.clone(),
        });
    }

    for (idx, node) in graph.nodes() {
        if let Some(declared) = node.spec.branch_labels() {
            let found: Vec<&str> = graph
                .branch_table(idx)
                .map(|t| t.labels().collect())
                .unwrap_or_default();
            let matches = found.len() == declared.len()
                && declared.iter().all(|label| found.contains(&label.as_str()));
            if !matches {
                return Err(GenerateError::BranchTableMismatch {
                    node_id: node.id.clone(),
                    declared: declared.iter().join(", "),
                    found: found.iter().join(", "),
                });
            }
        }

        let has_successor = graph.outgoing(idx).next().is_some();
        if node.kind().is_terminal() && has_successor {
            return Err(GenerateError::TerminalHasSuccessor {
                node_id: node.id.clone(),
            });
        }
        if !node.kind().is_terminal() && !has_successor {
            return Err(GenerateError::DanglingNode {
                node_id: node.id.clone(),
            });
        }
    }
    Ok(())
}
