//! Schema validation: turns a [`RawDocument`] into a [`ValidatedDocument`] or a
//! report explaining why it cannot be one.

mod fields;
pub mod report;

pub use report::*;

use crate::document::{
    BranchConfig, EdgeDecl, FieldType, LlmCallConfig, NodeKind, NodeSpec, RESERVED_IDS,
    StateField, ToolCallConfig, TransformConfig, ValidatedDocument, WorkflowNode,
};
use crate::loader::RawDocument;
use ahash::AHashMap;
use fields::*;
use itertools::Itertools;
use serde_yaml::{Mapping, Value};

const TOP_LEVEL_KEYS: &[&str] = &["name", "description", "version", "entry", "entry_point", "nodes", "edges"];
const NODE_KEYS: &[&str] = &["id", "kind", "type", "config", "display"];
const EDGE_KEYS: &[&str] = &["id", "source", "target", "from", "to", "condition", "display"];
const DISPLAY_KEYS: &[&str] = &["x", "y", "width", "height", "label", "color", "icon", "collapsed"];

/// A validated document together with the warnings found on the way.
#[derive(Debug, Clone)]
pub struct Validated {
    pub document: ValidatedDocument,
    pub report: ValidationReport,
}

/// Checks a raw document against the workflow schema.
///
/// Pure: the input is only read, and validating the same document twice
/// yields the same report.
pub fn validate(raw: &RawDocument, strict: bool) -> ValidationReport {
    let (_, issues) = walk(raw.root());
    ValidationReport::new(issues, strict)
}

/// Like [`validate`], but also hands back the typed document.
///
/// Returns `Ok` whenever the schema has no errors, so the structural pass can
/// still run in strict mode. Whether warnings fail the document is left to
/// [`ValidationReport::passed`] once every report is merged.
pub fn check(raw: &RawDocument, strict: bool) -> Result<Validated, ValidationReport> {
    let (document, issues) = walk(raw.root());
    let report = ValidationReport::new(issues, strict);
    tracing::debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        strict,
        "schema validation finished"
    );
    match document {
        Some(document) => Ok(Validated { document, report }),
        _ => Err(report),
    }
}

fn walk(root: &Value) -> (Option<ValidatedDocument>, Vec<ValidationIssue>) {
    let mut issues = Issues::default();
    let document = SchemaWalker { issues: &mut issues }.document(root);
    let document = document.filter(|_| issues.error_count() == 0);
    (document, issues.list)
}

struct SchemaWalker<'i> {
    issues: &'i mut Issues,
}

impl SchemaWalker<'_> {
    fn document(&mut self, root: &Value) -> Option<ValidatedDocument> {
        let path = IssuePath::root();
        let Value::Mapping(map) = root else {
            self.issues.push(
                IssueCode::NotAMapping,
                path,
                format!("document root must be a mapping, found {}", type_name(root)),
            );
            return None;
        };

        unknown_keys(map, TOP_LEVEL_KEYS, &path, IssueCode::UnknownField, "top-level field", self.issues);

        let name = required_str(map, "name", &path, self.issues);
        let description = optional_str(map, "description", &path, self.issues);
        let version = self.version(map, &path);
        let entry = self.entry(map, &path);
        let nodes = self.nodes(map, &path);
        let edges = self.edges(map, &path);

        Some(ValidatedDocument {
            name: name?,
            description,
            version,
            entry: entry?,
            nodes: nodes?,
            edges: edges?,
        })
    }

    fn version(&mut self, map: &Mapping, path: &IssuePath) -> Option<String> {
        match map.get("version") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => string_value(other, &path.key("version"), self.issues),
        }
    }

    fn entry(&mut self, map: &Mapping, path: &IssuePath) -> Option<String> {
        if map.contains_key("entry") {
            return required_str(map, "entry", path, self.issues);
        }
        if map.contains_key("entry_point") {
            self.issues.push(
                IssueCode::DeprecatedField,
                path.key("entry_point"),
                "'entry_point' is deprecated, use 'entry'",
            );
            return required_str(map, "entry_point", path, self.issues);
        }
        required_str(map, "entry", path, self.issues)
    }

    fn required_sequence<'v>(
        &mut self,
        map: &'v Mapping,
        key: &str,
        path: &IssuePath,
    ) -> Option<&'v Vec<Value>> {
        match map.get(key) {
            None => {
                self.issues.push(
                    IssueCode::MissingField,
                    path.key(key),
                    format!("required field '{}' is missing", key),
                );
                None
            }
            Some(Value::Sequence(items)) => Some(items),
            Some(other) => {
                self.issues.push(
                    IssueCode::InvalidType,
                    path.key(key),
                    format!("expected a sequence, found {}", type_name(other)),
                );
                None
            }
        }
    }

    fn nodes(&mut self, map: &Mapping, path: &IssuePath) -> Option<Vec<WorkflowNode>> {
        let items = self.required_sequence(map, "nodes", path)?;
        let path = path.key("nodes");
        let mut first_seen: AHashMap<String, usize> = AHashMap::new();
        let mut nodes = Vec::with_capacity(items.len());
        let mut complete = true;

        for (i, item) in items.iter().enumerate() {
            let node_path = path.index(i);
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                if let Some(first) = first_seen.get(id) {
                    self.issues.push(
                        IssueCode::DuplicateId,
                        node_path.key("id"),
                        format!(
                            "duplicate node id '{}': declared at nodes[{}] and nodes[{}]",
                            id, first, i
                        ),
                    );
                    complete = false;
                } else {
                    first_seen.insert(id.to_string(), i);
                }
            }
            match self.node(item, &node_path) {
                Some(node) => nodes.push(node),
                None => complete = false,
            }
        }

        complete.then_some(nodes)
    }

    fn node(&mut self, item: &Value, path: &IssuePath) -> Option<WorkflowNode> {
        let map = expect_mapping(item, path, self.issues)?;
        unknown_keys(map, NODE_KEYS, path, IssueCode::UnknownField, "node field", self.issues);

        let id = self.node_id(map, path);
        let kind = self.node_kind(map, path);
        let display = self.display(map, path);

        let empty = Mapping::new();
        let config_path = path.key("config");
        let config = match map.get("config") {
            None | Some(Value::Null) => Some(&empty),
            Some(value) => expect_mapping(value, &config_path, self.issues),
        };

        let spec = match (kind, config) {
            (Some(kind), Some(config)) => self.spec(kind, config, &config_path),
            _ => None,
        };

        Some(WorkflowNode {
            id: id?,
            spec: spec?,
            display: display?,
        })
    }

    fn node_id(&mut self, map: &Mapping, path: &IssuePath) -> Option<String> {
        let id_path = path.key("id");
        let id = match map.get("id") {
            None => {
                self.issues.push(IssueCode::MissingField, id_path, "node is missing its 'id'");
                return None;
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                self.issues.push(
                    IssueCode::InvalidType,
                    id_path,
                    format!("node id must be a string, found {}", type_name(other)),
                );
                return None;
            }
        };
        if id.trim().is_empty() || id.trim() != id {
            self.issues.push(
                IssueCode::InvalidId,
                id_path,
                format!("node id '{}' must be non-empty and carry no surrounding whitespace", id),
            );
            return None;
        }
        if RESERVED_IDS.contains(&id.as_str()) {
            self.issues.push(
                IssueCode::ReservedId,
                id_path,
                format!("node id '{}' is reserved by the target framework", id),
            );
            return None;
        }
        Some(id)
    }

    fn node_kind(&mut self, map: &Mapping, path: &IssuePath) -> Option<NodeKind> {
        let (key, value) = match (map.get("kind"), map.get("type")) {
            (Some(kind), legacy) => {
                if legacy.is_some() {
                    self.issues.push(
                        IssueCode::DeprecatedField,
                        path.key("type"),
                        "'type' is deprecated and ignored because 'kind' is set",
                    );
                }
                ("kind", kind)
            }
            (None, Some(legacy)) => {
                self.issues.push(
                    IssueCode::DeprecatedField,
                    path.key("type"),
                    "'type' is deprecated, use 'kind'",
                );
                ("type", legacy)
            }
            (None, None) => {
                self.issues.push(
                    IssueCode::MissingField,
                    path.key("kind"),
                    "required field 'kind' is missing",
                );
                return None;
            }
        };
        let kind_path = path.key(key);
        let name = string_value(value, &kind_path, self.issues)?;
        match name.parse::<NodeKind>() {
            Ok(kind) => Some(kind),
            Err(()) => {
                self.issues.push(
                    IssueCode::UnknownKind,
                    kind_path,
                    format!(
                        "unknown node kind '{}' (expected one of: {})",
                        name,
                        NodeKind::ALL.iter().map(NodeKind::as_str).join(", ")
                    ),
                );
                None
            }
        }
    }

    /// Returns `Some(None)` when no display metadata is present.
    fn display(&mut self, map: &Mapping, path: &IssuePath) -> Option<Option<serde_json::Value>> {
        let value = match map.get("display") {
            None | Some(Value::Null) => return Some(None),
            Some(value) => value,
        };
        let display_path = path.key("display");
        let display = expect_mapping(value, &display_path, self.issues)?;
        unknown_keys(
            display,
            DISPLAY_KEYS,
            &display_path,
            IssueCode::UnusedDisplay,
            "display metadata",
            self.issues,
        );
        match to_json(value) {
            Ok(json) => Some(Some(json)),
            Err(message) => {
                self.issues.push(IssueCode::InvalidType, display_path, message);
                None
            }
        }
    }

    fn spec(&mut self, kind: NodeKind, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        unknown_keys(
            config,
            kind.config_keys(),
            path,
            IssueCode::UnusedConfig,
            &format!("config key for a {} node", kind),
            self.issues,
        );
        match kind {
            NodeKind::Start => self.start(config, path),
            NodeKind::LlmCall => self.llm_call(config, path),
            NodeKind::ToolCall => self.tool_call(config, path),
            NodeKind::ConditionalBranch => self.branch(config, path),
            NodeKind::Transform => self.transform(config, path),
            NodeKind::End => self.end(config, path),
        }
    }

    fn missing_config(&mut self, kind: NodeKind, key: &str, path: &IssuePath) {
        self.issues.push(
            IssueCode::MissingConfig,
            path.key(key),
            format!("a {} node requires config.{}", kind, key),
        );
    }

    fn start(&mut self, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        let Some(value) = config.get("inputs").filter(|v| !v.is_null()) else {
            return Some(NodeSpec::Start { inputs: Vec::new() });
        };
        let inputs_path = path.key("inputs");
        let inputs = expect_mapping(value, &inputs_path, self.issues)?;
        let mut fields = Vec::with_capacity(inputs.len());
        let mut ok = true;
        for (key, ty) in inputs {
            let Some(name) = key.as_str() else {
                self.issues.push(
                    IssueCode::InvalidType,
                    inputs_path.clone(),
                    format!("input names must be strings, found {}", type_name(key)),
                );
                ok = false;
                continue;
            };
            let field_path = inputs_path.key(name);
            let ty = match ty {
                Value::Null => Some(FieldType::Any),
                Value::String(s) => FieldType::parse(s).or_else(|| {
                    self.issues.push(
                        IssueCode::InvalidConfig,
                        field_path.clone(),
                        format!(
                            "unknown input type '{}' (expected one of: {})",
                            s,
                            FieldType::NAMES.join(", ")
                        ),
                    );
                    None
                }),
                other => {
                    self.issues.push(
                        IssueCode::InvalidType,
                        field_path.clone(),
                        format!("input type must be a string, found {}", type_name(other)),
                    );
                    None
                }
            };
            match ty {
                Some(ty) => fields.push(StateField {
                    name: name.to_string(),
                    ty,
                }),
                None => ok = false,
            }
        }
        ok.then_some(NodeSpec::Start { inputs: fields })
    }

    fn llm_call(&mut self, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        let prompt = if config.contains_key("prompt") {
            if config.contains_key("prompt_template") {
                self.issues.push(
                    IssueCode::DeprecatedField,
                    path.key("prompt_template"),
                    "'prompt_template' is deprecated and ignored because 'prompt' is set",
                );
            }
            required_str(config, "prompt", path, self.issues)
        } else if config.contains_key("prompt_template") {
            self.issues.push(
                IssueCode::DeprecatedField,
                path.key("prompt_template"),
                "'prompt_template' is deprecated, use 'prompt'",
            );
            required_str(config, "prompt_template", path, self.issues)
        } else {
            self.missing_config(NodeKind::LlmCall, "prompt", path);
            None
        };
        let system = optional_str(config, "system", path, self.issues);
        let model = optional_str(config, "model", path, self.issues);
        let temperature = optional_number(config, "temperature", path, self.issues);
        let output_key = optional_str(config, "output_key", path, self.issues);

        if let Some(t) = temperature.filter(|t| !(0.0..=2.0).contains(t)) {
            self.issues.push(
                IssueCode::InvalidConfig,
                path.key("temperature"),
                format!("temperature {} is outside 0.0..=2.0", t),
            );
            return None;
        }

        Some(NodeSpec::LlmCall(LlmCallConfig {
            prompt: prompt?,
            system,
            model,
            temperature,
            output_key,
        }))
    }

    fn tool_call(&mut self, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        let tool = if config.contains_key("tool") {
            required_str(config, "tool", path, self.issues)
        } else {
            self.missing_config(NodeKind::ToolCall, "tool", path);
            None
        };
        let arguments = match config.get("arguments") {
            None | Some(Value::Null) => Some(Default::default()),
            Some(value) => {
                let args_path = path.key("arguments");
                expect_mapping(value, &args_path, self.issues)
                    .and_then(|map| json_object(map, &args_path, self.issues))
            }
        };
        let output_key = optional_str(config, "output_key", path, self.issues);

        Some(NodeSpec::ToolCall(ToolCallConfig {
            tool: tool?,
            arguments: arguments?,
            output_key,
        }))
    }

    fn branch(&mut self, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        let on = if config.contains_key("on") {
            required_str(config, "on", path, self.issues)
        } else {
            self.missing_config(NodeKind::ConditionalBranch, "on", path);
            None
        };
        let branches = match config.get("branches") {
            None => {
                self.missing_config(NodeKind::ConditionalBranch, "branches", path);
                None
            }
            Some(value) => self.branch_labels(value, &path.key("branches")),
        };

        Some(NodeSpec::ConditionalBranch(BranchConfig {
            on: on?,
            branches: branches?,
        }))
    }

    fn branch_labels(&mut self, value: &Value, path: &IssuePath) -> Option<Vec<String>> {
        let labels = string_list(value, path, self.issues)?;
        if labels.len() < 2 {
            self.issues.push(
                IssueCode::InvalidConfig,
                path.clone(),
                format!(
                    "a conditional-branch node needs at least two labeled outcomes, found {}",
                    labels.len()
                ),
            );
            return None;
        }
        let duplicates: Vec<&String> = labels.iter().duplicates().collect();
        if !duplicates.is_empty() {
            self.issues.push(
                IssueCode::InvalidConfig,
                path.clone(),
                format!(
                    "branch labels must be distinct, repeated: {}",
                    duplicates.iter().join(", ")
                ),
            );
            return None;
        }
        Some(labels)
    }

    fn transform(&mut self, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        let Some(value) = config.get("assign") else {
            self.missing_config(NodeKind::Transform, "assign", path);
            return None;
        };
        let assign_path = path.key("assign");
        let map = expect_mapping(value, &assign_path, self.issues)?;
        if map.is_empty() {
            self.issues.push(
                IssueCode::InvalidConfig,
                assign_path,
                "a transform node must assign at least one state key",
            );
            return None;
        }
        let assign = json_object(map, &assign_path, self.issues)?;
        Some(NodeSpec::Transform(TransformConfig { assign }))
    }

    fn end(&mut self, config: &Mapping, path: &IssuePath) -> Option<NodeSpec> {
        let outputs = match config.get("outputs") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => string_list(value, &path.key("outputs"), self.issues)?,
        };
        Some(NodeSpec::End { outputs })
    }

    fn edges(&mut self, map: &Mapping, path: &IssuePath) -> Option<Vec<EdgeDecl>> {
        let items = self.required_sequence(map, "edges", path)?;
        let path = path.key("edges");
        let mut edges = Vec::with_capacity(items.len());
        let mut complete = true;
        for (i, item) in items.iter().enumerate() {
            match self.edge(item, &path.index(i)) {
                Some(edge) => edges.push(edge),
                None => complete = false,
            }
        }
        complete.then_some(edges)
    }

    fn edge(&mut self, item: &Value, path: &IssuePath) -> Option<EdgeDecl> {
        let map = expect_mapping(item, path, self.issues)?;
        unknown_keys(map, EDGE_KEYS, path, IssueCode::UnknownField, "edge field", self.issues);

        let source = self.endpoint(map, "source", "from", path);
        let target = self.endpoint(map, "target", "to", path);
        let condition = optional_str(map, "condition", path, self.issues);

        if let Some(value) = map.get("display").filter(|v| !v.is_null()) {
            let display_path = path.key("display");
            if let Some(display) = expect_mapping(value, &display_path, self.issues) {
                unknown_keys(
                    display,
                    DISPLAY_KEYS,
                    &display_path,
                    IssueCode::UnusedDisplay,
                    "display metadata",
                    self.issues,
                );
            }
        }

        Some(EdgeDecl {
            source: source?,
            target: target?,
            condition,
        })
    }

    fn endpoint(&mut self, map: &Mapping, key: &str, legacy: &str, path: &IssuePath) -> Option<String> {
        if !map.contains_key(key) && map.contains_key(legacy) {
            self.issues.push(
                IssueCode::DeprecatedField,
                path.key(legacy),
                format!("'{}' is deprecated, use '{}'", legacy, key),
            );
            return required_str(map, legacy, path, self.issues);
        }
        required_str(map, key, path, self.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;

    fn report_for(yaml: &str) -> ValidationReport {
        validate(&load(yaml).expect("test yaml parses"), false)
    }

    const MINIMAL: &str = r#"
name: minimal
entry: begin
nodes:
  - id: begin
    kind: start
  - id: finish
    kind: end
edges:
  - source: begin
    target: finish
"#;

    #[test]
    fn test_minimal_document_is_clean() {
        let report = report_for(MINIMAL);
        assert!(report.passed());
        assert!(report.is_empty(), "unexpected issues: {}", report);
    }

    #[test]
    fn test_root_must_be_mapping() {
        let report = report_for("- just\n- a list\n");
        assert!(report.has_code(IssueCode::NotAMapping));
    }

    #[test]
    fn test_missing_top_level_fields() {
        let report = report_for("name: x\n");
        let missing: Vec<String> = report
            .with_code(IssueCode::MissingField)
            .map(|i| i.path.to_string())
            .collect();
        assert_eq!(missing, vec!["entry", "nodes", "edges"]);
    }

    #[test]
    fn test_unknown_kind_fails_closed() {
        let yaml = MINIMAL.replace("kind: end", "kind: teleport");
        let raw = load(&yaml).unwrap();
        let report = validate(&raw, false);
        let issue = report.with_code(IssueCode::UnknownKind).next().expect("unknown kind issue");
        assert_eq!(issue.path.to_string(), "nodes[1].kind");
        assert!(issue.message.contains("teleport"));
        assert!(check(&raw, false).is_err());
    }

    #[test]
    fn test_branch_needs_two_labels() {
        let yaml = r#"
name: b
entry: s
nodes:
  - id: s
    kind: start
  - id: r
    kind: conditional-branch
    config: { on: choice, branches: [only] }
edges: []
"#;
        let report = report_for(yaml);
        let issue = report.with_code(IssueCode::InvalidConfig).next().expect("invalid config");
        assert_eq!(issue.path.to_string(), "nodes[1].config.branches");
    }

    #[test]
    fn test_llm_call_requires_prompt() {
        let yaml = r#"
name: l
entry: s
nodes:
  - id: s
    kind: start
  - id: ask
    kind: llm-call
    config: { model: small }
edges: []
"#;
        let report = report_for(yaml);
        let issue = report.with_code(IssueCode::MissingConfig).next().expect("missing prompt");
        assert_eq!(issue.path.to_string(), "nodes[1].config.prompt");
    }

    #[test]
    fn test_deprecated_prompt_template_is_a_warning() {
        let yaml = r#"
name: l
entry: s
nodes:
  - id: s
    kind: start
  - id: ask
    kind: llm-call
    config: { prompt_template: greet }
edges: []
"#;
        let raw = load(yaml).unwrap();
        let validated = check(&raw, false).expect("warnings pass outside strict mode");
        assert_eq!(validated.report.warning_count(), 1);
        match &validated.document.nodes[1].spec {
            NodeSpec::LlmCall(cfg) => assert_eq!(cfg.prompt, "greet"),
            other => panic!("expected llm-call, got {:?}", other),
        }
        let strict = check(&raw, true).expect("warnings keep the typed document");
        assert!(!strict.report.passed());
        assert_eq!(strict.report.warning_count(), 1);
    }

    #[test]
    fn test_duplicate_ids_name_both_occurrences() {
        let yaml = MINIMAL.replace("id: finish", "id: begin");
        let report = report_for(&yaml);
        let issue = report.with_code(IssueCode::DuplicateId).next().expect("duplicate id");
        assert!(issue.message.contains("nodes[0]"));
        assert!(issue.message.contains("nodes[1]"));
    }

    #[test]
    fn test_reserved_id_rejected() {
        let yaml = MINIMAL.replace("id: finish", "id: __end__").replace("target: finish", "target: __end__");
        assert!(report_for(&yaml).has_code(IssueCode::ReservedId));
    }

    #[test]
    fn test_unknown_display_keys_warn() {
        let yaml = MINIMAL.replace(
            "    kind: end",
            "    kind: end\n    display: { x: 1, y: 2, sparkle: true }",
        );
        let report = report_for(&yaml);
        assert!(report.passed());
        let issue = report.with_code(IssueCode::UnusedDisplay).next().expect("display warning");
        assert_eq!(issue.path.to_string(), "nodes[1].display.sparkle");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let raw = load(MINIMAL).unwrap();
        let before = raw.clone();
        let first = validate(&raw, true);
        let second = validate(&raw, true);
        assert_eq!(first, second);
        assert_eq!(raw, before);
    }
}
