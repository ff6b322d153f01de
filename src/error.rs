use crate::validator::ValidationReport;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed input text, raised by the document loader.
#[derive(Error, Debug, Clone)]
pub enum SyntaxError {
    #[error("YAML syntax error at line {line}, column {column}: {message}")]
    At {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("YAML syntax error: {0}")]
    Unlocated(String),
}

impl From<serde_yaml::Error> for SyntaxError {
    fn from(err: serde_yaml::Error) -> Self {
        match err.location() {
            Some(loc) => SyntaxError::At {
                line: loc.line(),
                column: loc.column(),
                message: err.to_string(),
            },
            None => SyntaxError::Unlocated(err.to_string()),
        }
    }
}

/// Errors raised by the code generator.
///
/// Generation only fails when the graph it was handed breaks an invariant the
/// builder is supposed to guarantee, so every variant points at a builder
/// defect rather than at the input document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("internal error: entry node '{node_id}' is not a start node")]
    EntryNotStart { node_id: String },

    #[error(
        "internal error: branch table of node '{node_id}' covers [{found}] but the node declares [{declared}]"
    )]
    BranchTableMismatch {
        node_id: String,
        declared: String,
        found: String,
    },

    #[error("internal error: terminal node '{node_id}' has outgoing edges")]
    TerminalHasSuccessor { node_id: String },

    #[error("internal error: node '{node_id}' has no outgoing edges and is not terminal")]
    DanglingNode { node_id: String },
}

/// Errors raised while writing generated artifacts to disk.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("artifact path '{0}' must be relative and stay inside the output directory")]
    UnsafePath(PathBuf),

    #[error("artifacts do not share a single top-level directory")]
    MixedRoots,

    #[error("could not write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by the end-to-end compilation pipeline.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("workflow rejected with {} error(s) and {} warning(s)", .0.error_count(), .0.warning_count())]
    Rejected(ValidationReport),

    #[error(transparent)]
    Internal(#[from] GenerateError),
}

impl CompileError {
    /// The report behind a rejection, if this error is one.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            CompileError::Rejected(report) => Some(report),
            _ => None,
        }
    }

    /// Whether this error signals a compiler defect rather than a bad document.
    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Internal(_))
    }
}
