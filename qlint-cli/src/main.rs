use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use qlint_core::{Diagnostic, LintConfig, Severity, check_file, check_source};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

/// Name printed for diagnostics read from standard input.
const STDIN_NAME: &str = "<stdin>";

const SOURCE_EXTENSIONS: [&str; 2] = ["q", "k"];

/// Static analysis for q/kdb+ source files.
#[derive(Parser, Debug)]
#[command(name = "qlint", version, about, long_about = None)]
struct Cli {
    /// Files or directories to lint. Reads one unit from stdin when empty.
    paths: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[arg(long, value_name = "N", help = "Longest allowed line (default 200)")]
    max_line_length: Option<usize>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Log more (-v debug, -vv trace)")]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    diagnostics: Vec<Diagnostic>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_ansi(false))
        .with(filter)
        .init();
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "qlint_cli=debug,qlint_core=debug",
        _ => "qlint_cli=trace,qlint_core=trace",
    }
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = LintConfig::default();
    if let Some(max) = cli.max_line_length {
        config.max_line_length = max;
    }

    let mut reports = Vec::new();
    let mut failed = false;

    if cli.paths.is_empty() {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        match check_source(&source, &config) {
            Ok(diagnostics) => reports.push(FileReport {
                path: STDIN_NAME.to_string(),
                diagnostics,
            }),
            Err(err) => {
                eprintln!("cannot analyze: {STDIN_NAME}: {err}");
                failed = true;
            }
        }
    } else {
        for path in collect_sources(&cli.paths) {
            let result = check_file(&path, &config).with_context(|| path.display().to_string());
            match result {
                Ok(diagnostics) => reports.push(FileReport {
                    path: path.display().to_string(),
                    diagnostics,
                }),
                Err(err) => {
                    eprintln!("cannot analyze: {err:#}");
                    failed = true;
                }
            }
        }
    }

    match cli.format {
        Format::Text => {
            for report in &reports {
                for diagnostic in &report.diagnostics {
                    println!("{}:{diagnostic}", report.path);
                }
            }
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(&reports).context("failed to encode report")?;
            println!("{json}");
        }
    }

    let has_errors = reports
        .iter()
        .flat_map(|report| &report.diagnostics)
        .any(|diagnostic| diagnostic.severity == Severity::Error);
    debug!(files = reports.len(), failed, has_errors, "finished");
    Ok(if failed || has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Expand directories into the q/k sources below them. Explicit file
/// paths are kept whatever their extension.
fn collect_sources(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for path in paths {
        if !path.is_dir() {
            sources.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && is_source(entry.path()) {
                sources.push(entry.into_path());
            }
        }
    }
    sources
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
