use crate::codegen::{FrameworkVersion, GeneratorOptions};
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::validator::{ValidationIssue, ValidationReport};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

fn issue_to_dict<'py>(py: Python<'py>, issue: &ValidationIssue) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("code", issue.code.code())?;
    dict.set_item("severity", issue.severity.to_string())?;
    dict.set_item("path", issue.path.to_string())?;
    dict.set_item("message", issue.message.as_str())?;
    Ok(dict)
}

fn report_to_dict<'py>(py: Python<'py>, report: &ValidationReport) -> PyResult<Bound<'py, PyDict>> {
    let issues = PyList::empty(py);
    for issue in report.issues() {
        issues.append(issue_to_dict(py, issue)?)?;
    }
    let dict = PyDict::new(py);
    dict.set_item("passed", report.passed())?;
    dict.set_item("strict", report.is_strict())?;
    dict.set_item("errors", report.error_count())?;
    dict.set_item("warnings", report.warning_count())?;
    dict.set_item("issues", issues)?;
    Ok(dict)
}

/// Validates a YAML workflow without generating code.
///
/// Args:
///     yaml (str): The workflow document.
///     strict (bool): Treat warnings as failures.
///
/// Returns:
///     dict: `passed`, `strict`, `errors`, `warnings` and `issues`, where each
///         issue is a dict with `code`, `severity`, `path` and `message`.
///
/// Raises:
///     ValueError: If the text is not valid YAML.
#[pyfunction]
#[pyo3(signature = (yaml, strict = false))]
fn validate<'py>(py: Python<'py>, yaml: &str, strict: bool) -> PyResult<Bound<'py, PyDict>> {
    let report = Compiler::builder()
        .strict(strict)
        .build()
        .validate_str(yaml)
        .map_err(|e| PyErr::new::<PyValueError, _>(e.to_string()))?;
    report_to_dict(py, &report)
}

/// Compiles a YAML workflow into Python source files.
///
/// Returns:
///     dict: Relative file path (str) to generated source (str).
///
/// Raises:
///     ValueError: If the YAML is malformed or the workflow is rejected. The
///         message carries the full validation report.
///     RuntimeError: If the compiler hits an internal error.
#[pyfunction]
#[pyo3(signature = (yaml, module_name = None, include_comments = true, framework_version = "0.2", strict = false))]
fn convert<'py>(
    py: Python<'py>,
    yaml: &str,
    module_name: Option<String>,
    include_comments: bool,
    framework_version: &str,
    strict: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let version: FrameworkVersion = framework_version
        .parse()
        .map_err(|e: String| PyErr::new::<PyValueError, _>(e))?;
    let mut options = GeneratorOptions::builder()
        .include_comments(include_comments)
        .framework_version(version);
    if let Some(name) = module_name {
        options = options.module_name(name);
    }

    let compiler = Compiler::builder().strict(strict).options(options.build()).build();
    let compilation = compiler.compile_str(yaml).map_err(|e| match &e {
        CompileError::Syntax(_) => PyErr::new::<PyValueError, _>(e.to_string()),
        CompileError::Rejected(report) => PyErr::new::<PyValueError, _>(report.to_string()),
        CompileError::Internal(_) => PyErr::new::<PyRuntimeError, _>(e.to_string()),
    })?;

    let files = PyDict::new(py);
    for artifact in &compilation.artifacts {
        let path = artifact.path().to_string_lossy().replace('\\', "/");
        files.set_item(path, artifact.contents())?;
    }
    Ok(files)
}

/// Compiles declarative YAML workflows into Python graph packages.
#[pymodule]
fn flowc(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(validate, m)?)?;
    m.add_function(wrap_pyfunction!(convert, m)?)?;
    Ok(())
}
