//! JSON output types for CLI responses.
//!
//! Every CLI command can render its result as a JSON envelope with a
//! `status` discriminator. Errors carry the stable code from
//! [`OutputErrorCode`](crate::error::OutputErrorCode) alongside the message.

use serde::Serialize;

use crate::error::ShiftError;
use crate::types::Finding;

/// JSON envelope for `analyze` results.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzeOutput {
    /// Analysis completed; findings may be empty.
    Ok {
        findings: Vec<Finding>,
        report: String,
    },
    /// Analysis could not complete.
    Error { code: u8, message: String },
}

impl AnalyzeOutput {
    /// Successful analysis with the plain-text report alongside findings.
    pub fn ok(findings: Vec<Finding>, report: impl Into<String>) -> Self {
        AnalyzeOutput::Ok {
            findings,
            report: report.into(),
        }
    }

    /// Failed analysis from a unified error.
    pub fn error(err: &ShiftError) -> Self {
        AnalyzeOutput::Error {
            code: err.error_code().code(),
            message: err.to_string(),
        }
    }
}

/// JSON envelope for `refactor` results.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefactorOutput {
    /// Refactoring completed; `code` is the regenerated source.
    Ok { code: String, rewrites: usize },
    /// Refactoring could not complete.
    Error { code: u8, message: String },
}

impl RefactorOutput {
    /// Successful refactor with the regenerated source.
    pub fn ok(code: impl Into<String>, rewrites: usize) -> Self {
        RefactorOutput::Ok {
            code: code.into(),
            rewrites,
        }
    }

    /// Failed refactor from a unified error.
    pub fn error(err: &ShiftError) -> Self {
        RefactorOutput::Error {
            code: err.error_code().code(),
            message: err.to_string(),
        }
    }
}

/// Render any serializable output as pretty JSON.
///
/// Serialization of these envelopes cannot fail in practice; if it somehow
/// does, a minimal hand-built error object is returned instead so the CLI
/// always emits valid JSON.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        format!(
            "{{\"status\":\"error\",\"code\":10,\"message\":\"JSON encoding failed: {}\"}}",
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    #[test]
    fn analyze_ok_envelope() {
        let findings = vec![Finding::new("Empty function found: f")
            .with_location(Location::new(1, 5))];
        let out = AnalyzeOutput::ok(findings, "Empty function found: f");
        let json = to_json(&out);
        assert!(json.contains("\"status\": \"ok\""));
        assert!(json.contains("Empty function found: f"));
        assert!(json.contains("\"line\": 1"));
    }

    #[test]
    fn analyze_error_envelope_carries_code() {
        let err = ShiftError::parse("bad token", 2, 1);
        let json = to_json(&AnalyzeOutput::error(&err));
        assert!(json.contains("\"status\": \"error\""));
        assert!(json.contains("\"code\": 2"));
        assert!(json.contains("bad token"));
    }

    #[test]
    fn refactor_ok_envelope() {
        let out = RefactorOutput::ok("logging.info(1)\n", 1);
        let json = to_json(&out);
        assert!(json.contains("\"rewrites\": 1"));
        assert!(json.contains("logging.info"));
    }

    #[test]
    fn refactor_error_envelope_carries_code() {
        let err = ShiftError::refactor("no parent");
        let json = to_json(&RefactorOutput::error(&err));
        assert!(json.contains("\"code\": 4"));
    }
}
