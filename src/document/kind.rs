use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of node categories a workflow may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Start,
    LlmCall,
    ToolCall,
    ConditionalBranch,
    Transform,
    End,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Start,
        NodeKind::LlmCall,
        NodeKind::ToolCall,
        NodeKind::ConditionalBranch,
        NodeKind::Transform,
        NodeKind::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::LlmCall => "llm-call",
            NodeKind::ToolCall => "tool-call",
            NodeKind::ConditionalBranch => "conditional-branch",
            NodeKind::Transform => "transform",
            NodeKind::End => "end",
        }
    }

    /// Config keys each kind understands. Anything else is flagged as unused.
    pub fn config_keys(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Start => &["inputs"],
            NodeKind::LlmCall => &[
                "prompt",
                "prompt_template",
                "system",
                "model",
                "temperature",
                "output_key",
            ],
            NodeKind::ToolCall => &["tool", "arguments", "output_key"],
            NodeKind::ConditionalBranch => &["on", "branches"],
            NodeKind::Transform => &["assign"],
            NodeKind::End => &["outputs"],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::End)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Declared type of a state key, as written in a start node's `inputs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    List,
    Object,
    Any,
}

impl FieldType {
    pub const NAMES: [&'static str; 7] = [
        "string", "number", "integer", "boolean", "list", "object", "any",
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" | "str" => Some(FieldType::String),
            "number" | "float" => Some(FieldType::Number),
            "integer" | "int" => Some(FieldType::Integer),
            "boolean" | "bool" => Some(FieldType::Boolean),
            "list" | "array" => Some(FieldType::List),
            "object" | "dict" => Some(FieldType::Object),
            "any" => Some(FieldType::Any),
            _ => None,
        }
    }

    /// The Python annotation used in the generated state schema.
    pub fn python_annotation(&self) -> &'static str {
        match self {
            FieldType::String => "str",
            FieldType::Number => "float",
            FieldType::Integer => "int",
            FieldType::Boolean => "bool",
            FieldType::List => "list",
            FieldType::Object => "dict",
            FieldType::Any => "Any",
        }
    }
}

/// A named state key with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateField {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmCallConfig {
    /// Reference to the prompt template the runtime renders.
    pub prompt: String,
    pub system: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub output_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallConfig {
    pub tool: String,
    pub arguments: BTreeMap<String, JsonValue>,
    pub output_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchConfig {
    /// State key the routing function reads.
    pub on: String,
    /// Declared outcome labels, in declaration order.
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformConfig {
    pub assign: BTreeMap<String, JsonValue>,
}

/// Kind-specific node configuration. Each variant only carries what its kind needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeSpec {
    Start { inputs: Vec<StateField> },
    LlmCall(LlmCallConfig),
    ToolCall(ToolCallConfig),
    ConditionalBranch(BranchConfig),
    Transform(TransformConfig),
    End { outputs: Vec<String> },
}

impl NodeSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeSpec::Start { .. } => NodeKind::Start,
            NodeSpec::LlmCall(_) => NodeKind::LlmCall,
            NodeSpec::ToolCall(_) => NodeKind::ToolCall,
            NodeSpec::ConditionalBranch(_) => NodeKind::ConditionalBranch,
            NodeSpec::Transform(_) => NodeKind::Transform,
            NodeSpec::End { .. } => NodeKind::End,
        }
    }

    /// Declared branch labels, for conditional nodes only.
    pub fn branch_labels(&self) -> Option<&[String]> {
        match self {
            NodeSpec::ConditionalBranch(cfg) => Some(&cfg.branches),
            _ => None,
        }
    }

    /// State keys this node reads or writes, with their type when known.
    pub fn state_fields(&self) -> Vec<StateField> {
        let any = |name: &str| StateField {
            name: name.to_string(),
            ty: FieldType::Any,
        };
        match self {
            NodeSpec::Start { inputs } => inputs.clone(),
            NodeSpec::LlmCall(cfg) => cfg
                .output_key
                .as_deref()
                .map(|k| StateField {
                    name: k.to_string(),
                    ty: FieldType::String,
                })
                .into_iter()
                .collect(),
            NodeSpec::ToolCall(cfg) => cfg.output_key.as_deref().map(any).into_iter().collect(),
            NodeSpec::ConditionalBranch(cfg) => vec![any(&cfg.on)],
            NodeSpec::Transform(cfg) => cfg.assign.keys().map(|k| any(k)).collect(),
            NodeSpec::End { outputs } => outputs.iter().map(|k| any(k)).collect(),
        }
    }

    /// The JSON payload embedded as `CONFIG` in the generated node module.
    pub fn payload(&self) -> JsonValue {
        match self {
            NodeSpec::Start { inputs } => {
                let fields: Map<String, JsonValue> = inputs
                    .iter()
                    .map(|f| (f.name.clone(), json!(f.ty)))
                    .collect();
                json!({ "inputs": fields })
            }
            NodeSpec::LlmCall(cfg) => json!({
                "prompt": cfg.prompt,
                "system": cfg.system,
                "model": cfg.model,
                "temperature": cfg.temperature,
                "output_key": cfg.output_key,
            }),
            NodeSpec::ToolCall(cfg) => json!({
                "tool": cfg.tool,
                "arguments": cfg.arguments,
                "output_key": cfg.output_key,
            }),
            NodeSpec::ConditionalBranch(cfg) => json!({
                "on": cfg.on,
                "branches": cfg.branches,
            }),
            NodeSpec::Transform(cfg) => json!({ "assign": cfg.assign }),
            NodeSpec::End { outputs } => json!({ "outputs": outputs }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("llm_call".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_field_type_aliases() {
        assert_eq!(FieldType::parse("str"), Some(FieldType::String));
        assert_eq!(FieldType::parse("array"), Some(FieldType::List));
        assert_eq!(FieldType::parse("uuid"), None);
    }

    #[test]
    fn test_branch_labels_only_for_conditionals() {
        let branch = NodeSpec::ConditionalBranch(BranchConfig {
            on: "category".into(),
            branches: vec!["a".into(), "b".into()],
        });
        assert_eq!(branch.branch_labels().map(|l| l.len()), Some(2));
        assert!(NodeSpec::End { outputs: vec![] }.branch_labels().is_none());
    }
}
