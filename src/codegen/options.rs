use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor API variants of the target orchestration framework.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameworkVersion {
    /// Entry and finish declared with `set_entry_point` / `set_finish_point`.
    #[serde(rename = "0.1")]
    V0_1,
    /// Entry and finish wired through the `START` / `END` sentinels.
    #[default]
    #[serde(rename = "0.2")]
    V0_2,
}

impl FrameworkVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameworkVersion::V0_1 => "0.1",
            FrameworkVersion::V0_2 => "0.2",
        }
    }

    pub(crate) fn uses_sentinels(&self) -> bool {
        matches!(self, FrameworkVersion::V0_2)
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameworkVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('v') {
            "0.1" => Ok(FrameworkVersion::V0_1),
            "0.2" => Ok(FrameworkVersion::V0_2),
            other => Err(format!(
                "unsupported framework version '{}' (expected 0.1 or 0.2)",
                other
            )),
        }
    }
}

/// Settings that shape the generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Name of the generated package. Derived from the workflow name when unset.
    pub module_name: Option<String>,
    /// Emit a provenance comment per node naming its source id.
    pub include_comments: bool,
    pub framework_version: FrameworkVersion,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            module_name: None,
            include_comments: true,
            framework_version: FrameworkVersion::default(),
        }
    }
}

impl GeneratorOptions {
    pub fn builder() -> GeneratorOptionsBuilder {
        GeneratorOptionsBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct GeneratorOptionsBuilder {
    options: GeneratorOptions,
}

impl GeneratorOptionsBuilder {
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.options.module_name = Some(name.into());
        self
    }

    pub fn include_comments(mut self, include: bool) -> Self {
        self.options.include_comments = include;
        self
    }

    pub fn framework_version(mut self, version: FrameworkVersion) -> Self {
        self.options.framework_version = version;
        self
    }

    pub fn build(self) -> GeneratorOptions {
        self.options
    }
}
