//! # flowc - Workflow Compiler
//!
//! **flowc** compiles declarative YAML workflow definitions into runnable Python
//! packages built on a graph-orchestration framework (`StateGraph`). A workflow
//! is a set of typed nodes (`start`, `llm-call`, `tool-call`,
//! `conditional-branch`, `transform`, `end`) joined by optionally labelled edges.
//!
//! ## Pipeline
//!
//! Every stage is a pure function of its input, so compiling the same document
//! with the same options always produces byte-identical output.
//!
//! 1.  **Load**: [`loader::load`] turns YAML text into a raw document tree.
//! 2.  **Validate**: [`validator::check`] checks the tree against the workflow
//!     schema and yields a typed [`document::ValidatedDocument`] plus a
//!     [`validator::ValidationReport`] of every problem found.
//! 3.  **Build**: [`graph::build`] resolves edges, the entry point and branch
//!     tables into an immutable [`graph::WorkflowGraph`], reporting structural
//!     problems in the same report format.
//! 4.  **Generate**: [`codegen::generate`] emits the Python package as a list of
//!     [`codegen::GeneratedArtifact`]s, which [`output::write_artifacts`] puts on disk.
//!
//! [`compiler::Compiler`] chains all of this behind one call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowc::prelude::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let text = std::fs::read_to_string("triage.yaml")?;
//!
//!     let options = GeneratorOptions::builder()
//!         .module_name("triage")
//!         .framework_version(FrameworkVersion::V0_2)
//!         .build();
//!     let compiler = Compiler::builder().strict(false).options(options).build();
//!
//!     match compiler.compile_str(&text) {
//!         Ok(compilation) => {
//!             for warning in compilation.report.warnings() {
//!                 eprintln!("{}", warning);
//!             }
//!             write_artifacts(Path::new("out"), &compilation.artifacts)?;
//!         }
//!         Err(CompileError::Rejected(report)) => eprintln!("{}", report),
//!         Err(other) => return Err(other.into()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod codegen;
pub mod compiler;
pub mod document;
pub mod error;
pub mod graph;
pub mod loader;
pub mod output;
pub mod prelude;
pub mod validator;

#[cfg(feature = "python-bindings")]
mod python;
