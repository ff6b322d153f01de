use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::fmt;

/// One step of a path into the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of an element inside the workflow document, e.g. `nodes[2].config.prompt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IssuePath(Vec<PathSegment>);

impl IssuePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IssuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<document>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Which stage found the problem: the schema walk or the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Validation,
    Structural,
}

/// Every diagnostic the compiler can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    // Schema errors
    NotAMapping,
    MissingField,
    InvalidType,
    UnknownKind,
    MissingConfig,
    InvalidConfig,
    DuplicateId,
    ReservedId,
    InvalidId,

    // Schema warnings
    UnknownField,
    DeprecatedField,
    UnusedDisplay,
    UnusedConfig,

    // Structural errors
    DanglingReference,
    MissingEntry,
    MultipleEntries,
    EntryMismatch,
    UnreachableNode,
    IsolatedCycle,
    BranchMissing,
    BranchUnexpected,
    DuplicateBranch,
    ConditionOnPlainNode,
    UnconditionalFromBranch,
    DeadEnd,
    TerminalHasSuccessor,
    NoTerminal,
    StateKeyCollision,
}

impl IssueCode {
    pub fn code(&self) -> &'static str {
        match self {
            IssueCode::NotAMapping => "V001",
            IssueCode::MissingField => "V002",
            IssueCode::InvalidType => "V003",
            IssueCode::UnknownKind => "V004",
            IssueCode::MissingConfig => "V005",
            IssueCode::InvalidConfig => "V006",
            IssueCode::DuplicateId => "V007",
            IssueCode::ReservedId => "V008",
            IssueCode::InvalidId => "V009",
            IssueCode::UnknownField => "W001",
            IssueCode::DeprecatedField => "W002",
            IssueCode::UnusedDisplay => "W003",
            IssueCode::UnusedConfig => "W004",
            IssueCode::DanglingReference => "S001",
            IssueCode::MissingEntry => "S002",
            IssueCode::MultipleEntries => "S003",
            IssueCode::EntryMismatch => "S004",
            IssueCode::UnreachableNode => "S005",
            IssueCode::IsolatedCycle => "S006",
            IssueCode::BranchMissing => "S007",
            IssueCode::BranchUnexpected => "S008",
            IssueCode::DuplicateBranch => "S009",
            IssueCode::ConditionOnPlainNode => "S010",
            IssueCode::UnconditionalFromBranch => "S011",
            IssueCode::DeadEnd => "S012",
            IssueCode::TerminalHasSuccessor => "S013",
            IssueCode::NoTerminal => "S014",
            IssueCode::StateKeyCollision => "S015",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IssueCode::UnknownField
            | IssueCode::DeprecatedField
            | IssueCode::UnusedDisplay
            | IssueCode::UnusedConfig => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn category(&self) -> IssueCategory {
        if self.code().starts_with('S') {
            IssueCategory::Structural
        } else {
            IssueCategory::Validation
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for IssueCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A single finding, located by its path in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: IssuePath,
    pub code: IssueCode,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, path: IssuePath, message: impl Into<String>) -> Self {
        Self {
            path,
            code,
            message: message.into(),
            severity: code.severity(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn category(&self) -> IssueCategory {
        self.code.category()
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity, self.code, self.path, self.message
        )
    }
}

/// All findings of one validation or build pass, in discovery order.
///
/// Errors always fail the report. Warnings only fail it when it was computed
/// in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    passed: bool,
    strict: bool,
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(issues: Vec<ValidationIssue>, strict: bool) -> Self {
        let passed = issues.iter().all(|i| !i.is_error()) && (!strict || issues.is_empty());
        Self {
            passed,
            strict,
            issues,
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    /// Appends the issues of a later pass, keeping this report's mode.
    pub fn extend(self, later: ValidationReport) -> Self {
        let mut issues = self.issues;
        issues.extend(later.issues);
        Self::new(issues, self.strict)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{}", issue)?;
        }
        let verdict = if self.passed { "passed" } else { "failed" };
        let mode = if self.strict { " (strict)" } else { "" };
        write!(
            f,
            "validation {}{}: {}",
            verdict,
            mode,
            [
                format!("{} error(s)", self.error_count()),
                format!("{} warning(s)", self.warning_count()),
            ]
            .iter()
            .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning() -> ValidationIssue {
        ValidationIssue::new(IssueCode::UnknownField, IssuePath::root().key("colour"), "x")
    }

    #[test]
    fn test_path_display() {
        let path = IssuePath::root().key("nodes").index(2).key("config").key("prompt");
        assert_eq!(path.to_string(), "nodes[2].config.prompt");
        assert_eq!(IssuePath::root().to_string(), "<document>");
    }

    #[test]
    fn test_severity_follows_code() {
        assert_eq!(IssueCode::DeadEnd.severity(), Severity::Error);
        assert_eq!(IssueCode::DeprecatedField.severity(), Severity::Warning);
        assert_eq!(IssueCode::DeadEnd.category(), IssueCategory::Structural);
        assert_eq!(IssueCode::UnknownKind.category(), IssueCategory::Validation);
    }

    #[test]
    fn test_warnings_fail_only_in_strict_mode() {
        assert!(ValidationReport::new(vec![warning()], false).passed());
        assert!(!ValidationReport::new(vec![warning()], true).passed());
        assert!(ValidationReport::new(vec![], true).passed());
    }

    #[test]
    fn test_errors_always_fail() {
        let err = ValidationIssue::new(IssueCode::DeadEnd, IssuePath::root(), "stuck");
        let report = ValidationReport::new(vec![err], false);
        assert!(!report.passed());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_report_serializes_codes() {
        let report = ValidationReport::new(vec![warning()], false);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["code"], "W001");
        assert_eq!(json["issues"][0]["severity"], "warning");
        assert_eq!(json["issues"][0]["path"][0], "colour");
    }
}
