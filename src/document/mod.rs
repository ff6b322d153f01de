//! Typed workflow document, produced by the validator and consumed by the graph builder.

pub mod kind;

pub use kind::*;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Node ids the target framework reserves for its virtual start and end nodes.
pub const RESERVED_IDS: [&str; 2] = ["__start__", "__end__"];

/// A node as declared in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowNode {
    pub id: String,
    pub spec: NodeSpec,
    /// Designer metadata (position, label, ...). Carried through untouched.
    pub display: Option<JsonValue>,
}

impl WorkflowNode {
    pub fn kind(&self) -> NodeKind {
        self.spec.kind()
    }
}

/// An edge as declared in the document, still referring to nodes by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeDecl {
    pub source: String,
    pub target: String,
    pub condition: Option<String>,
}

/// A document that passed schema validation.
///
/// Node ids are unique and every node carries a well-formed, kind-specific
/// config. Edge endpoints and the entry designation are not resolved yet;
/// that is the graph builder's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedDocument {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub entry: String,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<EdgeDecl>,
}
