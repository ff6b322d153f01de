//! End-to-end pipeline: load, validate, build, generate.

use crate::codegen::{self, GeneratedArtifact, GeneratorOptions};
use crate::error::{CompileError, SyntaxError};
use crate::graph::{self, GraphSummary};
use crate::loader;
use crate::validator::{self, ValidationReport};
use tracing::instrument;

/// Everything a successful compilation produces.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub artifacts: Vec<GeneratedArtifact>,
    pub summary: GraphSummary,
    /// Warnings found along the way. Never contains errors.
    pub report: ValidationReport,
}

/// A configured workflow compiler. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    strict: bool,
    options: GeneratorOptions,
}

#[derive(Debug, Default)]
pub struct CompilerBuilder {
    strict: bool,
    options: GeneratorOptions,
}

impl CompilerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat warnings as fatal.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            strict: self.strict,
            options: self.options,
        }
    }
}

impl Compiler {
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::new()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Runs schema validation and, when the schema is sound, the structural
    /// checks. Only a YAML syntax error short-circuits.
    pub fn validate_str(&self, text: &str) -> Result<ValidationReport, SyntaxError> {
        let raw = loader::load(text)?;
        let report = match validator::check(&raw, self.strict) {
            Ok(validated) => match graph::build(&validated.document) {
                Ok(_) => validated.report,
                Err(structural) => validated.report.extend(structural),
            },
            // Structural checks need a typed document, so a failed schema stops here.
            Err(report) => report,
        };
        Ok(report)
    }

    /// Compiles a YAML workflow into the artifacts of a Python package.
    #[instrument(skip_all, fields(strict = self.strict))]
    pub fn compile_str(&self, text: &str) -> Result<Compilation, CompileError> {
        let raw = loader::load(text)?;
        let validated = validator::check(&raw, self.strict).map_err(CompileError::Rejected)?;
        let graph = graph::build(&validated.document)
            .map_err(|structural| CompileError::Rejected(validated.report.clone().extend(structural)))?;
        if !validated.report.passed() {
            return Err(CompileError::Rejected(validated.report));
        }

        let artifacts = codegen::generate(&graph, &self.options)?;
        let summary = graph.summary();
        tracing::info!(
            workflow = %summary.name,
            nodes = summary.nodes,
            edges = summary.edges,
            artifacts = artifacts.len(),
            "compiled workflow"
        );
        Ok(Compilation {
            artifacts,
            summary,
            report: validated.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::IssueCode;

    const TWO_NODES: &str = r#"
name: hello
entry: start
nodes:
  - id: start
    kind: start
  - id: done
    kind: end
edges:
  - { source: start, target: done }
"#;

    #[test]
    fn test_compile_two_nodes() {
        let compilation = Compiler::default().compile_str(TWO_NODES).unwrap();
        assert_eq!(compilation.summary.nodes, 2);
        assert!(compilation.report.is_empty());
        assert!(!compilation.artifacts.is_empty());
    }

    #[test]
    fn test_syntax_error_short_circuits() {
        let err = Compiler::default().compile_str("nodes: [").unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
        assert!(Compiler::default().validate_str("nodes: [").is_err());
    }

    #[test]
    fn test_validate_reports_structural_issues() {
        let text = TWO_NODES.replace("target: done", "target: nowhere");
        let report = Compiler::default().validate_str(&text).unwrap();
        assert!(!report.passed());
        assert!(report.has_code(IssueCode::DanglingReference));
    }

    #[test]
    fn test_strict_rejects_warnings() {
        let text = TWO_NODES.replace("kind: end", "kind: end\n    display: { shape: box }");
        assert!(Compiler::default().compile_str(&text).is_ok());

        let strict = Compiler::builder().strict(true).build();
        let err = strict.compile_str(&text).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_strict_still_runs_structural_checks() {
        let text = TWO_NODES
            .replace("kind: end", "kind: end\n    display: { shape: box }")
            .replace("target: done", "target: nowhere");
        let strict = Compiler::builder().strict(true).build();

        let report = strict.validate_str(&text).unwrap();
        assert!(report.has_code(IssueCode::UnusedDisplay));
        assert!(report.has_code(IssueCode::DanglingReference));

        let err = strict.compile_str(&text).unwrap_err();
        let rejected = err.report().unwrap();
        assert!(rejected.has_code(IssueCode::DanglingReference));
        assert_eq!(rejected.warning_count(), 1);
    }
}
