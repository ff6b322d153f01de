//! Generated package layout and contents.
mod common;
use common::*;
use flowc::prelude::*;

fn paths(compilation: &Compilation) -> Vec<String> {
    compilation
        .artifacts
        .iter()
        .map(|a| a.path().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_output_is_deterministic() {
    let first = compile(TRIAGE_YAML);
    let second = compile(TRIAGE_YAML);
    assert_eq!(first.artifacts, second.artifacts);
}

#[test]
fn test_two_node_graph_wiring() {
    let compilation = compile(TWO_NODE_YAML);
    assert_eq!(
        paths(&compilation),
        vec![
            "hello/__init__.py",
            "hello/state.py",
            "hello/runtime.py",
            "hello/nodes/__init__.py",
            "hello/nodes/start.py",
            "hello/nodes/done.py",
            "hello/graph.py",
        ]
    );

    let graph = artifact(&compilation, "hello/graph.py");
    assert!(graph.contains("from langgraph.graph import END, START, StateGraph"));
    assert!(graph.contains("builder = StateGraph(HelloState)"));
    assert!(graph.contains("builder.add_node(\"start\", nodes.start.run)"));
    assert!(graph.contains("builder.add_node(\"done\", nodes.done.run)"));
    assert!(graph.contains("builder.add_edge(START, \"start\")"));
    assert!(graph.contains("builder.add_edge(\"start\", \"done\")"));
    assert!(graph.contains("builder.add_edge(\"done\", END)"));
    assert!(graph.ends_with("graph = build_graph().compile()\n"));
    assert!(!graph.contains("add_conditional_edges"));
    assert!(!graph.contains("Literal"));

    let state = artifact(&compilation, "hello/state.py");
    assert!(state.contains("class HelloState(TypedDict, total=False):\n    pass\n"));
}

#[test]
fn test_edges_follow_declaration_order() {
    let compilation = compile(TRIAGE_YAML);
    let graph = artifact(&compilation, "graph.py");
    let positions: Vec<usize> = [
        "builder.add_edge(\"intake\", \"classify\")",
        "builder.add_edge(\"classify\", \"route\")",
        "builder.add_conditional_edges(",
        "builder.add_edge(\"refund\", \"finish\")",
        "builder.add_edge(\"escalate\", \"finish\")",
        "builder.add_edge(\"finish\", END)",
    ]
    .iter()
    .map(|needle| graph.find(needle).unwrap_or_else(|| panic!("missing {}", needle)))
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_branch_routing() {
    let compilation = compile(TRIAGE_YAML);
    let graph = artifact(&compilation, "support_triage/graph.py");
    assert!(graph.contains(
        "def route_route(state: SupportTriageState) -> Literal[\"billing\", \"tech\"]:"
    ));
    assert!(graph.contains("    value = state.get(\"category\")\n"));
    assert!(graph.contains(
        "    builder.add_conditional_edges(\n        \"route\",\n        route_route,\n        {\n            \"billing\": \"refund\",\n            \"tech\": \"escalate\",\n        },\n    )\n"
    ));
    assert_eq!(graph.matches("add_conditional_edges").count(), 1);
}

#[test]
fn test_state_schema_collects_keys_sorted() {
    let compilation = compile(TRIAGE_YAML);
    let state = artifact(&compilation, "support_triage/state.py");
    let expected = "class SupportTriageState(TypedDict, total=False):\n    category: str\n    priority: int\n    refund_id: Any\n    team: Any\n    ticket: str\n";
    assert!(state.contains(expected), "state.py was:\n{}", state);
    assert!(state.contains("from typing import Any, TypedDict"));
}

#[test]
fn test_node_modules_embed_config() {
    let compilation = compile(TRIAGE_YAML);

    let classify = artifact(&compilation, "nodes/classify.py");
    assert!(classify.contains("NODE_ID = \"classify\""));
    assert!(classify.contains("KIND = \"llm-call\""));
    assert!(classify.contains("\"prompt\": \"Classify this ticket: {ticket}\","));
    assert!(classify.contains("prompt = render_prompt(CONFIG, dict(state))"));
    assert!(classify.contains("return {CONFIG[\"output_key\"]: result}"));
    assert!(classify.contains("\"label\": \"Classify\","));

    let refund = artifact(&compilation, "nodes/refund.py");
    assert!(refund.contains("import copy"));
    assert!(refund.contains("from ..runtime import call_tool"));
    assert!(refund.contains("DISPLAY = None"));

    let escalate = artifact(&compilation, "nodes/escalate.py");
    assert!(escalate.contains("return copy.deepcopy(CONFIG[\"assign\"])"));

    let intake = artifact(&compilation, "nodes/intake.py");
    assert!(intake.contains("raise ValueError(\"missing workflow input(s): \""));
}

#[test]
fn test_runtime_never_calls_out() {
    let compilation = compile(TRIAGE_YAML);
    let runtime = artifact(&compilation, "support_triage/runtime.py");
    for hook in ["def register_llm(", "def register_tool(", "def call_llm(", "def call_tool(", "def render_prompt("] {
        assert!(runtime.contains(hook), "missing {}", hook);
    }
    assert!(!runtime.contains("import requests"));
    assert!(!runtime.contains("http"));
}

#[test]
fn test_prompt_rendering_only_touches_identifier_placeholders() {
    let compilation = compile(TRIAGE_YAML);
    let runtime = artifact(&compilation, "runtime.py");
    assert!(runtime.contains("_PLACEHOLDER = re.compile(r\"\\{([A-Za-z_][A-Za-z0-9_]*)\\}\")"));
    assert!(runtime.contains("return _PLACEHOLDER.sub("));
    assert!(!runtime.contains("format_map"));
}

#[test]
fn test_framework_version_switches_entry_and_finish() {
    let options = GeneratorOptions::builder()
        .framework_version(FrameworkVersion::V0_1)
        .build();
    let compilation = compile_with(TWO_NODE_YAML, options);
    let graph = artifact(&compilation, "graph.py");
    assert!(graph.contains("from langgraph.graph import StateGraph\n"));
    assert!(graph.contains("builder.set_entry_point(\"start\")"));
    assert!(graph.contains("builder.set_finish_point(\"done\")"));
    assert!(!graph.contains("START"));
    assert!(!graph.contains("END"));
}

#[test]
fn test_comments_toggle() {
    let with = compile(TWO_NODE_YAML);
    let graph = artifact(&with, "graph.py");
    assert!(graph.contains("# Source node 'start' (start)."));
    assert!(graph.starts_with("# Graph assembly for workflow 'hello'."));

    let options = GeneratorOptions::builder().include_comments(false).build();
    let without = compile_with(TWO_NODE_YAML, options);
    for artifact in &without.artifacts {
        assert!(
            !artifact.contents().contains('#'),
            "{} still has comments",
            artifact.path().display()
        );
    }
}

#[test]
fn test_module_name_override() {
    let options = GeneratorOptions::builder().module_name("TicketFlow").build();
    let compilation = compile_with(TWO_NODE_YAML, options);
    assert!(paths(&compilation).iter().all(|p| p.starts_with("ticket_flow/")));
    assert!(artifact(&compilation, "__init__.py").contains("from .state import TicketFlowState"));
}

#[test]
fn test_identifier_collisions_get_suffixes() {
    let yaml = r#"
name: 2 clashing names
entry: begin
nodes:
  - { id: begin, kind: start }
  - id: fetch-data
    kind: transform
    config: { assign: { a: 1 } }
  - id: fetch_data
    kind: transform
    config: { assign: { b: 2 } }
  - { id: class, kind: end }
edges:
  - { source: begin, target: fetch-data }
  - { source: fetch-data, target: fetch_data }
  - { source: fetch_data, target: class }
"#;
    let compilation = compile(yaml);
    let paths = paths(&compilation);
    assert_eq!(paths[0], "n_2_clashing_names/__init__.py");
    assert!(paths.contains(&"n_2_clashing_names/nodes/fetch_data.py".to_string()));
    assert!(paths.contains(&"n_2_clashing_names/nodes/fetch_data_2.py".to_string()));
    assert!(paths.contains(&"n_2_clashing_names/nodes/class_.py".to_string()));

    let graph = artifact(&compilation, "graph.py");
    // Graph identifiers stay the document ids.
    assert!(graph.contains("builder.add_node(\"fetch-data\", nodes.fetch_data.run)"));
    assert!(graph.contains("builder.add_node(\"fetch_data\", nodes.fetch_data_2.run)"));
    assert!(graph.contains("builder.add_node(\"class\", nodes.class_.run)"));
}

#[test]
fn test_non_identifier_state_keys_use_functional_form() {
    let yaml = r#"
name: odd keys
entry: s
nodes:
  - id: s
    kind: start
    config:
      inputs: { user-name: string }
  - { id: e, kind: end }
edges:
  - { source: s, target: e }
"#;
    let compilation = compile(yaml);
    let state = artifact(&compilation, "state.py");
    assert!(state.contains("OddKeysState = TypedDict(\n    \"OddKeysState\",\n    {\n        \"user-name\": str,\n    },\n    total=False,\n)\n"));
}
