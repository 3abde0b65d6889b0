//! CLI front door: run analysis and refactoring over files or stdin.
//!
//! The command functions return the text to print; the binary decides
//! how to exit. Analysis and refactoring failures are part of the
//! printed report (see the error-handling policy in the engine crates),
//! never process failures; only I/O problems reading input or writing
//! `--write` output surface as [`CliError`].

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::ValueEnum;
use thiserror::Error;
use tracing::info;

use codeshift_core::error::ShiftError;
use codeshift_core::output::{to_json, AnalyzeOutput, RefactorOutput};
use codeshift_python::{Analyzer, RefactorEngine};

/// Output rendering for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text: exactly the engine boundary strings.
    #[default]
    Text,
    /// JSON envelopes with findings and stable error codes.
    Json,
}

/// I/O failures around the engines.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Read source from a path, or stdin when the path is `-`.
pub fn read_source(path: &str) -> Result<String, CliError> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| CliError::Read {
                path: path.to_string(),
                source,
            })?;
        return Ok(buf);
    }
    fs::read_to_string(Path::new(path)).map_err(|source| CliError::Read {
        path: path.to_string(),
        source,
    })
}

/// Run analysis over `source`, rendering per `format`.
pub fn run_analyze(source: &str, format: OutputFormat) -> String {
    let mut analyzer = Analyzer::new();
    analyzer.initialize();
    let result = match format {
        OutputFormat::Text => analyzer.analyze_code(source),
        OutputFormat::Json => match analyzer.analyze_source(source) {
            Ok(findings) => {
                let report = analyzer.analyze_code(source);
                to_json(&AnalyzeOutput::ok(findings, report))
            }
            Err(err) => to_json(&AnalyzeOutput::error(&ShiftError::from(err))),
        },
    };
    analyzer.shutdown();
    result
}

/// Run refactoring over `source`, rendering per `format`.
///
/// When `write_path` is set and at least one rewrite happened, the
/// regenerated source is written back to that path. Nothing is written
/// when refactoring fails or no rule matched.
pub fn run_refactor(
    source: &str,
    format: OutputFormat,
    write_path: Option<&str>,
) -> Result<String, CliError> {
    let mut engine = RefactorEngine::new();
    engine.initialize();
    let outcome = engine.refactor_source(source);
    engine.shutdown();

    if let (Ok(outcome), Some(path)) = (&outcome, write_path) {
        if outcome.rewrites > 0 {
            fs::write(path, &outcome.code).map_err(|source| CliError::Write {
                path: path.to_string(),
                source,
            })?;
            info!(path, rewrites = outcome.rewrites, "wrote refactored file");
        }
    }

    Ok(match format {
        OutputFormat::Text => match outcome {
            Ok(outcome) => outcome.code,
            Err(err) => format!("Refactoring error: {}", err),
        },
        OutputFormat::Json => match outcome {
            Ok(outcome) => to_json(&RefactorOutput::ok(outcome.code, outcome.rewrites)),
            Err(err) => to_json(&RefactorOutput::error(&ShiftError::from(err))),
        },
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_text_matches_engine_boundary() {
        let report = run_analyze("def f():\n    pass\n", OutputFormat::Text);
        assert_eq!(report, "Empty function found: f");
    }

    #[test]
    fn analyze_json_carries_findings_and_report() {
        let json = run_analyze("def f():\n    pass\n", OutputFormat::Json);
        assert!(json.contains("\"status\": \"ok\""));
        assert!(json.contains("Empty function found: f"));
    }

    #[test]
    fn analyze_json_error_carries_code() {
        let json = run_analyze("def f(:", OutputFormat::Json);
        assert!(json.contains("\"status\": \"error\""));
        assert!(json.contains("\"code\": 2"));
    }

    #[test]
    fn refactor_text_matches_engine_boundary() {
        let out = run_refactor("print(1)\n", OutputFormat::Text, None).unwrap();
        assert_eq!(out, "logging.info(1)\n");
    }

    #[test]
    fn refactor_error_is_report_not_failure() {
        let out = run_refactor("def f(:", OutputFormat::Text, None).unwrap();
        assert!(out.starts_with("Refactoring error:"));
    }

    #[test]
    fn refactor_write_updates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.py");
        fs::write(&path, "print(1)\n").unwrap();
        let path_str = path.to_string_lossy().into_owned();

        let source = read_source(&path_str).unwrap();
        run_refactor(&source, OutputFormat::Text, Some(&path_str)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "logging.info(1)\n");
    }

    #[test]
    fn refactor_write_skips_untouched_and_failed_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.py");
        fs::write(&path, "x = 1\n").unwrap();
        let path_str = path.to_string_lossy().into_owned();

        run_refactor("x = 1\n", OutputFormat::Text, Some(&path_str)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");

        run_refactor("def f(:", OutputFormat::Text, Some(&path_str)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");
    }

    #[test]
    fn read_source_reports_missing_files() {
        let err = read_source("/no/such/file.py").unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
