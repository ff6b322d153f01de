//! Common workflow fixtures and helpers shared by the integration tests.
use flowc::prelude::*;

/// `start -> done`, the smallest workflow that compiles.
#[allow(dead_code)]
pub const TWO_NODE_YAML: &str = r#"
name: hello
entry: start
nodes:
  - id: start
    kind: start
  - id: done
    kind: end
edges:
  - source: start
    target: done
"#;

/// A support triage flow: classify with an LLM, route on the category, run a
/// tool for billing and a transform for tech.
#[allow(dead_code)]
pub const TRIAGE_YAML: &str = r#"
name: Support Triage
description: Routes incoming tickets to the right team.
version: 1
entry: intake
nodes:
  - id: intake
    kind: start
    config:
      inputs:
        ticket: string
        priority: integer
  - id: classify
    kind: llm-call
    config:
      prompt: "Classify this ticket: {ticket}"
      model: small
      temperature: 0
      output_key: category
    display: { x: 120, y: 40, label: Classify }
  - id: route
    kind: conditional-branch
    config:
      on: category
      branches: [billing, tech]
  - id: refund
    kind: tool-call
    config:
      tool: issue_refund
      arguments: { reason: triage }
      output_key: refund_id
  - id: escalate
    kind: transform
    config:
      assign: { team: platform }
  - id: finish
    kind: end
    config:
      outputs: [refund_id, team]
edges:
  - { source: intake, target: classify }
  - { source: classify, target: route }
  - { source: route, target: refund, condition: billing }
  - { source: route, target: escalate, condition: tech }
  - { source: refund, target: finish }
  - { source: escalate, target: finish }
"#;

/// `a -> b -> c -> b` loops; `b` also exits to `d`, the end node.
#[allow(dead_code)]
pub const CYCLE_YAML: &str = r#"
name: looping
entry: a
nodes:
  - { id: a, kind: start }
  - id: b
    kind: conditional-branch
    config: { on: done, branches: ["yes", "no"] }
  - id: c
    kind: transform
    config: { assign: { attempts: 1 } }
  - { id: d, kind: end }
edges:
  - { source: a, target: b }
  - { source: b, target: c, condition: "no" }
  - { source: c, target: b }
  - { source: b, target: d, condition: "yes" }
"#;

/// `step` has no outgoing edge and is not an end node.
#[allow(dead_code)]
pub const DEAD_END_YAML: &str = r#"
name: dead end
entry: start
nodes:
  - { id: start, kind: start }
  - id: step
    kind: transform
    config: { assign: { x: 1 } }
  - { id: done, kind: end }
edges:
  - { source: start, target: step }
  - { source: start, target: done }
"#;

/// Valid apart from two warnings: a deprecated field and unknown display metadata.
#[allow(dead_code)]
pub const WARNINGS_ONLY_YAML: &str = r#"
name: warned
entry_point: start
nodes:
  - id: start
    kind: start
    display: { shape: circle }
  - id: done
    kind: end
edges:
  - { source: start, target: done }
"#;

/// Compiles with default settings and panics on failure.
#[allow(dead_code)]
pub fn compile(yaml: &str) -> Compilation {
    Compiler::default()
        .compile_str(yaml)
        .unwrap_or_else(|e| panic!("compilation failed: {}", e))
}

#[allow(dead_code)]
pub fn compile_with(yaml: &str, options: GeneratorOptions) -> Compilation {
    Compiler::builder()
        .options(options)
        .build()
        .compile_str(yaml)
        .unwrap_or_else(|e| panic!("compilation failed: {}", e))
}

/// Contents of the artifact whose path ends with `suffix` (forward slashes).
#[allow(dead_code)]
pub fn artifact<'a>(compilation: &'a Compilation, suffix: &str) -> &'a str {
    compilation
        .artifacts
        .iter()
        .find(|a| a.path().to_string_lossy().replace('\\', "/").ends_with(suffix))
        .map(|a| a.contents())
        .unwrap_or_else(|| panic!("no artifact ending in '{}'", suffix))
}

/// Validation report for `yaml` with default settings.
#[allow(dead_code)]
pub fn report(yaml: &str) -> ValidationReport {
    Compiler::default()
        .validate_str(yaml)
        .unwrap_or_else(|e| panic!("unexpected syntax error: {}", e))
}
