use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use flowc::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: u8 = 1;
const EXIT_INPUT: u8 = 2;
const EXIT_INTERNAL: u8 = 3;

/// Compiles declarative YAML workflows into Python graph packages
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check one or more workflow files without generating code
    Validate {
        /// Workflow YAML files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Generate a Python package from a workflow file
    Convert {
        /// Workflow YAML file
        path: PathBuf,

        /// Directory the package is written into
        #[arg(short, long)]
        output: PathBuf,

        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,

        /// Package name (defaults to the snake-cased workflow name)
        #[arg(long)]
        module_name: Option<String>,

        /// Omit provenance comments and file headers
        #[arg(long)]
        no_comments: bool,

        /// Target framework API
        #[arg(long, default_value_t = FrameworkVersion::V0_2)]
        framework_version: FrameworkVersion,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Validate {
            paths,
            strict,
            format,
        } => run_validate(&paths, strict, format),
        Command::Convert {
            path,
            output,
            strict,
            module_name,
            no_comments,
            framework_version,
        } => {
            let mut options = GeneratorOptions::builder()
                .include_comments(!no_comments)
                .framework_version(framework_version);
            if let Some(name) = module_name {
                options = options.module_name(name);
            }
            let compiler = Compiler::builder()
                .strict(strict)
                .options(options.build())
                .build();
            run_convert(&compiler, &path, &output)
        }
    }
}

fn print_report(report: &ValidationReport) {
    for issue in report.issues() {
        let tag = match issue.severity {
            Severity::Error => format!("error[{}]", issue.code).red().bold(),
            Severity::Warning => format!("warning[{}]", issue.code).yellow().bold(),
        };
        eprintln!("  {} {}: {}", tag, issue.path.to_string().cyan(), issue.message);
    }
}

fn run_validate(paths: &[PathBuf], strict: bool, format: Format) -> ExitCode {
    let compiler = Compiler::builder().strict(strict).build();
    let mut failed = false;
    let mut unreadable = false;
    let mut json_reports = Vec::new();

    for path in paths {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("{} could not read '{}': {}", "Error:".red().bold(), path.display(), e);
                unreadable = true;
                continue;
            }
        };
        let report = match compiler.validate_str(&text) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{} {}: {}", "Error:".red().bold(), path.display(), e);
                unreadable = true;
                continue;
            }
        };
        failed |= !report.passed();

        match format {
            Format::Json => json_reports.push(serde_json::json!({
                "path": path.display().to_string(),
                "report": report,
            })),
            Format::Text => {
                if report.passed() {
                    println!("{} {} is valid", "✓".green(), path.display());
                } else {
                    println!("{} {} is invalid", "✗".red(), path.display());
                }
                print_report(&report);
            }
        }
    }

    if format == Format::Json {
        match serde_json::to_string_pretty(&json_reports) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                return ExitCode::from(EXIT_INTERNAL);
            }
        }
    }

    if unreadable {
        ExitCode::from(EXIT_INPUT)
    } else if failed {
        ExitCode::from(EXIT_FAILED)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_convert(compiler: &Compiler, path: &Path, output: &Path) -> ExitCode {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{} could not read '{}': {}", "Error:".red().bold(), path.display(), e);
            return ExitCode::from(EXIT_INPUT);
        }
    };

    let compilation = match compiler.compile_str(&text) {
        Ok(compilation) => compilation,
        Err(CompileError::Rejected(report)) => {
            eprintln!(
                "{} {} was rejected",
                "Error:".red().bold(),
                path.display()
            );
            print_report(&report);
            return ExitCode::from(EXIT_FAILED);
        }
        Err(e) if e.is_internal() => {
            eprintln!("{} {}", "Internal error:".red().bold(), e);
            return ExitCode::from(EXIT_INTERNAL);
        }
        Err(e) => {
            eprintln!("{} {}: {}", "Error:".red().bold(), path.display(), e);
            return ExitCode::from(EXIT_INPUT);
        }
    };
    print_report(&compilation.report);

    match write_artifacts(output, &compilation.artifacts) {
        Ok(written) => {
            let summary = &compilation.summary;
            println!(
                "{} '{}' compiled: {} nodes, {} edges, {} files written to {}",
                "✓".green(),
                summary.name,
                summary.nodes,
                summary.edges,
                written.len(),
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::from(EXIT_INPUT)
        }
    }
}
