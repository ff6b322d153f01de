//! One emitter per generated file.

use super::Layout;
use super::naming::is_identifier;
use super::options::GeneratorOptions;
use super::python::{Emitter, literal, string_literal};
use crate::document::{FieldType, NodeKind, NodeSpec};
use crate::graph::WorkflowGraph;
use ahash::AHashSet;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;

const GENERATOR: &str = "flowc";

/// Folds whitespace so arbitrary text fits on one comment line.
fn comment_text(text: &str) -> String {
    text.split_whitespace().join(" ")
}

fn header(e: &mut Emitter, graph: &WorkflowGraph, options: &GeneratorOptions, what: &str) {
    if !options.include_comments {
        return;
    }
    e.line(format!(
        "# {} for workflow '{}'.",
        what,
        comment_text(graph.name())
    ));
    e.line(format!(
        "# Generated by {} (framework API {}). Do not edit by hand.",
        GENERATOR, options.framework_version
    ));
    e.blank();
}

pub fn package_init(graph: &WorkflowGraph, layout: &Layout, options: &GeneratorOptions) -> String {
    let mut e = Emitter::new();
    header(&mut e, graph, options, "Package entry point");
    if options.include_comments {
        if let Some(description) = graph.description() {
            e.line(format!("# {}", comment_text(description)));
            e.blank();
        }
    }
    e.line("from .graph import build_graph, graph");
    e.line(format!("from .state import {}", layout.state_class));
    e.blank();
    let mut exported = vec![layout.state_class.as_str(), "build_graph", "graph"];
    exported.sort_unstable();
    e.line(format!(
        "__all__ = [{}]",
        exported.iter().map(|name| string_literal(name)).join(", ")
    ));
    e.finish()
}

/// Union of every node's state keys. A concrete type beats `Any`; among
/// concrete types the first declaration wins.
fn state_schema(graph: &WorkflowGraph) -> BTreeMap<String, FieldType> {
    let mut fields = BTreeMap::new();
    for (_, node) in graph.nodes() {
        for field in node.spec.state_fields() {
            let slot = fields.entry(field.name).or_insert(field.ty);
            if *slot == FieldType::Any {
                *slot = field.ty;
            }
        }
    }
    fields
}

pub fn state(graph: &WorkflowGraph, layout: &Layout, options: &GeneratorOptions) -> String {
    let fields = state_schema(graph);
    let uses_any = fields.values().any(|ty| *ty == FieldType::Any);

    let mut e = Emitter::new();
    header(&mut e, graph, options, "Shared state schema");
    if uses_any {
        e.line("from typing import Any, TypedDict");
    } else {
        e.line("from typing import TypedDict");
    }
    e.blank();
    e.blank();

    let class = &layout.state_class;
    if fields.keys().all(|key| is_identifier(key)) {
        e.line(format!("class {}(TypedDict, total=False):", class));
        e.indent();
        if fields.is_empty() {
            e.line("pass");
        }
        for (key, ty) in &fields {
            e.line(format!("{}: {}", key, ty.python_annotation()));
        }
        e.dedent();
    } else {
        // Keys that are not identifiers need the functional form.
        e.line(format!("{} = TypedDict(", class));
        e.indent();
        e.line(format!("{},", string_literal(class)));
        e.line("{");
        e.indent();
        for (key, ty) in &fields {
            e.line(format!("{}: {},", string_literal(key), ty.python_annotation()));
        }
        e.dedent();
        e.line("},");
        e.line("total=False,");
        e.dedent();
        e.line(")");
    }
    e.finish()
}

const RUNTIME_BODY: &str = r#"import re
from typing import Any, Callable, Dict, Optional

_PLACEHOLDER = re.compile(r"\{([A-Za-z_][A-Za-z0-9_]*)\}")

_llm_handler: Optional[Callable[[dict, str, dict], Any]] = None
_prompt_renderer: Optional[Callable[[dict, dict], str]] = None
_tool_handlers: Dict[str, Callable[[dict, dict], Any]] = {}


def register_llm(handler: Callable[[dict, str, dict], Any]) -> None:
    """Installs the callable that serves every llm-call node."""
    global _llm_handler
    _llm_handler = handler


def register_prompt_renderer(renderer: Callable[[dict, dict], str]) -> None:
    global _prompt_renderer
    _prompt_renderer = renderer


def register_tool(name: str, handler: Callable[[dict, dict], Any]) -> None:
    """Installs the callable that serves tool-call nodes naming `name`."""
    _tool_handlers[name] = handler


def render_prompt(config: dict, state: dict) -> str:
    """Fills `{key}` placeholders of the prompt from state unless a renderer is registered.

    Only identifier placeholders are replaced; any other braces are kept as written.
    """
    if _prompt_renderer is not None:
        return _prompt_renderer(config, state)
    return _PLACEHOLDER.sub(lambda m: str(state.get(m.group(1), "")), str(config["prompt"]))


def call_llm(config: dict, prompt: str, state: dict) -> Any:
    if _llm_handler is None:
        raise RuntimeError("no LLM handler registered; call register_llm() first")
    return _llm_handler(config, prompt, state)


def call_tool(name: str, arguments: dict, state: dict) -> Any:
    handler = _tool_handlers.get(name)
    if handler is None:
        raise RuntimeError(f"no handler registered for tool {name!r}")
    return handler(arguments, state)"#;

pub fn runtime(graph: &WorkflowGraph, options: &GeneratorOptions) -> String {
    let mut e = Emitter::new();
    header(&mut e, graph, options, "Runtime hooks");
    e.line(RUNTIME_BODY);
    e.finish()
}

pub fn nodes_init(graph: &WorkflowGraph, layout: &Layout, options: &GeneratorOptions) -> String {
    let mut e = Emitter::new();
    header(&mut e, graph, options, "Node modules");
    for (idx, _) in graph.nodes() {
        e.line(format!("from . import {}", layout.slug(idx)));
    }
    e.finish()
}

pub fn node(
    graph: &WorkflowGraph,
    idx: NodeIndex,
    layout: &Layout,
    options: &GeneratorOptions,
) -> String {
    let node = graph.node(idx);
    let mut e = Emitter::new();
    if options.include_comments {
        e.line(format!(
            "# Source node '{}' ({}).",
            comment_text(&node.id),
            node.kind()
        ));
    }
    header(&mut e, graph, options, "Node module");

    if matches!(node.kind(), NodeKind::ToolCall | NodeKind::Transform) {
        e.line("import copy");
    }
    e.line("from typing import Any, Dict");
    e.blank();
    match node.kind() {
        NodeKind::LlmCall => {
            e.line("from ..runtime import call_llm, render_prompt");
        }
        NodeKind::ToolCall => {
            e.line("from ..runtime import call_tool");
        }
        _ => {}
    }
    e.line(format!("from ..state import {}", layout.state_class));
    e.blank();

    e.line(format!("NODE_ID = {}", string_literal(&node.id)));
    e.line(format!("KIND = {}", string_literal(node.kind().as_str())));
    e.line(format!("CONFIG = {}", literal(&node.spec.payload(), 0)));
    let display = node
        .display
        .as_ref()
        .map(|d| literal(d, 0))
        .unwrap_or_else(|| "None".to_string());
    e.line(format!("DISPLAY = {}", display));
    e.blank();
    e.blank();

    e.line(format!(
        "def run(state: {}) -> Dict[str, Any]:",
        layout.state_class
    ));
    e.indent();
    match &node.spec {
        NodeSpec::Start { .. } => {
            e.line("missing = [key for key in CONFIG[\"inputs\"] if key not in state]");
            e.line("if missing:");
            e.indent();
            e.line("raise ValueError(\"missing workflow input(s): \" + \", \".join(missing))");
            e.dedent();
            e.line("return {}");
        }
        NodeSpec::LlmCall(cfg) => {
            e.line("prompt = render_prompt(CONFIG, dict(state))");
            match &cfg.output_key {
                Some(_) => {
                    e.line("result = call_llm(CONFIG, prompt, dict(state))");
                    e.line("return {CONFIG[\"output_key\"]: result}");
                }
                None => {
                    e.line("call_llm(CONFIG, prompt, dict(state))");
                    e.line("return {}");
                }
            }
        }
        NodeSpec::ToolCall(cfg) => {
            let call =
                "call_tool(CONFIG[\"tool\"], copy.deepcopy(CONFIG[\"arguments\"]), dict(state))";
            match &cfg.output_key {
                Some(_) => {
                    e.line(format!("result = {}", call));
                    e.line("return {CONFIG[\"output_key\"]: result}");
                }
                None => {
                    e.line(call);
                    e.line("return {}");
                }
            }
        }
        NodeSpec::ConditionalBranch(_) => {
            // Routing lives in graph.py; the node itself leaves state untouched.
            e.line("return {}");
        }
        NodeSpec::Transform(_) => {
            e.line("return copy.deepcopy(CONFIG[\"assign\"])");
        }
        NodeSpec::End { .. } => {
            e.line("return {}");
        }
    }
    e.dedent();
    e.finish()
}

fn route_function(slug: &str) -> String {
    format!("route_{}", slug)
}

pub fn graph(graph: &WorkflowGraph, layout: &Layout, options: &GeneratorOptions) -> String {
    let sentinels = options.framework_version.uses_sentinels();
    let mut e = Emitter::new();
    header(&mut e, graph, options, "Graph assembly");

    if !graph.branch_tables().is_empty() {
        e.line("from typing import Literal");
        e.blank();
    }
    if sentinels {
        e.line("from langgraph.graph import END, START, StateGraph");
    } else {
        e.line("from langgraph.graph import StateGraph");
    }
    e.blank();
    e.line("from . import nodes");
    e.line(format!("from .state import {}", layout.state_class));

    for table in graph.branch_tables() {
        let node = graph.node(table.node);
        let on = match &node.spec {
            NodeSpec::ConditionalBranch(cfg) => cfg.on.as_str(),
            _ => continue,
        };
        let labels = table.labels().map(string_literal).join(", ");
        e.blank();
        e.blank();
        e.line(format!(
            "def {}(state: {}) -> Literal[{}]:",
            route_function(layout.slug(table.node)),
            layout.state_class,
            labels
        ));
        e.indent();
        e.line(format!("value = state.get({})", string_literal(on)));
        e.line(format!("if value in ({}):", labels));
        e.indent();
        e.line("return value");
        e.dedent();
        e.line(format!(
            "raise ValueError({} + repr(value))",
            string_literal(&format!("no branch of node '{}' matches ", node.id))
        ));
        e.dedent();
    }

    e.blank();
    e.blank();
    e.line("def build_graph() -> StateGraph:");
    e.indent();
    e.line(format!("builder = StateGraph({})", layout.state_class));
    for (idx, node) in graph.nodes() {
        if options.include_comments {
            e.line(format!(
                "# Source node '{}' ({}).",
                comment_text(&node.id),
                node.kind()
            ));
        }
        e.line(format!(
            "builder.add_node({}, nodes.{}.run)",
            string_literal(&node.id),
            layout.slug(idx)
        ));
    }
    e.blank();

    let entry = string_literal(&graph.node(graph.entry()).id);
    if sentinels {
        e.line(format!("builder.add_edge(START, {})", entry));
    } else {
        e.line(format!("builder.set_entry_point({})", entry));
    }

    let mut routed: AHashSet<NodeIndex> = AHashSet::new();
    for edge in graph.edges() {
        let source = string_literal(&graph.node(edge.source).id);
        if !edge.is_conditional() {
            e.line(format!(
                "builder.add_edge({}, {})",
                source,
                string_literal(&graph.node(edge.target).id)
            ));
            continue;
        }
        if !routed.insert(edge.source) {
            continue;
        }
        let Some(table) = graph.branch_table(edge.source) else {
            continue;
        };
        e.line("builder.add_conditional_edges(");
        e.indent();
        e.line(format!("{},", source));
        e.line(format!("{},", route_function(layout.slug(edge.source))));
        e.line("{");
        e.indent();
        for (label, target) in &table.routes {
            e.line(format!(
                "{}: {},",
                string_literal(label),
                string_literal(&graph.node(*target).id)
            ));
        }
        e.dedent();
        e.line("},");
        e.dedent();
        e.line(")");
    }

    for terminal in graph.terminals() {
        let id = string_literal(&graph.node(*terminal).id);
        if sentinels {
            e.line(format!("builder.add_edge({}, END)", id));
        } else {
            e.line(format!("builder.set_finish_point({})", id));
        }
    }
    e.line("return builder");
    e.dedent();
    e.blank();
    e.blank();
    e.line("graph = build_graph().compile()");
    e.finish()
}
