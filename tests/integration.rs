//! Integration tests for flowc
//!
//! End-to-end runs from YAML text to a package on disk.
//!
mod common;
use common::*;
use flowc::prelude::*;
use std::fs;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_compile_and_write_triage() {
        let compilation = compile(TRIAGE_YAML);
        assert_eq!(compilation.summary.name, "Support Triage");
        assert_eq!(compilation.summary.entry, "intake");
        assert_eq!(compilation.summary.nodes, 6);
        assert_eq!(compilation.summary.edges, 6);
        assert!(compilation.report.is_empty());

        let dir = tempfile::tempdir().expect("temp dir");
        let written = write_artifacts(dir.path(), &compilation.artifacts).expect("write");
        assert_eq!(written.len(), compilation.artifacts.len());

        let package = dir.path().join("support_triage");
        for file in ["__init__.py", "state.py", "runtime.py", "graph.py", "nodes/__init__.py", "nodes/route.py"] {
            assert!(package.join(file).is_file(), "missing {}", file);
        }
        let graph = fs::read_to_string(package.join("graph.py")).unwrap();
        assert_eq!(graph, artifact(&compilation, "support_triage/graph.py"));
    }

    #[test]
    fn test_rewrite_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let first = compile(TRIAGE_YAML);
        write_artifacts(dir.path(), &first.artifacts).unwrap();

        let options = GeneratorOptions::builder().module_name("support_triage").build();
        let second = compile_with(TWO_NODE_YAML, options);
        write_artifacts(dir.path(), &second.artifacts).unwrap();

        let nodes = dir.path().join("support_triage").join("nodes");
        assert!(nodes.join("start.py").is_file());
        assert!(!nodes.join("classify.py").exists());
    }

    #[test]
    fn test_rejected_document_carries_full_report() {
        let err = Compiler::default().compile_str(DEAD_END_YAML).unwrap_err();
        assert!(!err.is_internal());
        let report = err.report().expect("rejection report");
        assert!(report.has_code(IssueCode::DeadEnd));
        assert!(err.to_string().starts_with("workflow rejected with 1 error(s)"));
    }

    #[test]
    fn test_warnings_survive_successful_compilation() {
        let compilation = compile(WARNINGS_ONLY_YAML);
        assert_eq!(compilation.report.warning_count(), 2);
        assert!(compilation.report.passed());
    }

    #[test]
    fn test_strict_compilation_produces_no_artifacts() {
        let strict = Compiler::builder().strict(true).build();
        match strict.compile_str(WARNINGS_ONLY_YAML) {
            Err(CompileError::Rejected(report)) => {
                assert!(report.is_strict());
                assert_eq!(report.error_count(), 0);
            }
            other => panic!("expected a strict rejection, got {:?}", other.map(|c| c.summary)),
        }
    }

    #[test]
    fn test_empty_input_is_rejected_not_a_syntax_error() {
        let err = Compiler::default().compile_str("   \n").unwrap_err();
        let report = err.report().expect("rejection");
        assert!(report.has_code(IssueCode::NotAMapping));
    }

    #[test]
    fn test_summary_serializes() {
        let compilation = compile(CYCLE_YAML);
        let json = serde_json::to_value(&compilation.summary).unwrap();
        assert_eq!(json["entry"], "a");
        assert_eq!(json["conditional_nodes"], 1);
    }
}
