//! Prelude module for convenient imports
//!
//! Re-exports the types needed to run the pipeline end to end.
//!
//! ```rust,no_run
//! use flowc::prelude::*;
//!
//! # fn run() -> Result<()> {
//! let text = std::fs::read_to_string("workflow.yaml")?;
//! let report = Compiler::default().validate_str(&text)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

// Pipeline
pub use crate::compiler::{Compilation, Compiler, CompilerBuilder};
pub use crate::output::write_artifacts;

// Code generation
pub use crate::codegen::{FrameworkVersion, GeneratedArtifact, GeneratorOptions};

// Model
pub use crate::document::{NodeKind, ValidatedDocument};
pub use crate::graph::{GraphSummary, WorkflowGraph};

// Diagnostics
pub use crate::error::{CompileError, GenerateError, OutputError, SyntaxError};
pub use crate::validator::{IssueCode, Severity, ValidationIssue, ValidationReport};

pub use std::path::Path;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
