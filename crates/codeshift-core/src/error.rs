//! Unified error type and stable error codes.
//!
//! This module provides a single error type (`ShiftError`) that bridges
//! domain-specific errors from the language crates into a common format
//! suitable for JSON output.
//!
//! ## Design
//!
//! - **Unified type**: `ShiftError` is the single error type for CLI output
//! - **Bridging**: `impl From<X> for ShiftError` lives next to each domain
//!   error in the language crates
//! - **Code mapping**: `OutputErrorCode` provides stable integer codes for
//!   JSON responses
//!
//! Engine boundaries (`analyze_code` / `refactor_code`) never surface these
//! as errors to the collaborator; they render them into descriptive result
//! strings. `ShiftError` exists for structured consumers (the CLI's JSON
//! mode) that want a code alongside the message.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Malformed source (tokenizer or parser rejection).
    ParseError = 2,
    /// Analysis rule evaluation failure.
    AnalysisError = 3,
    /// Transformation or regeneration failure.
    RefactorError = 4,
    /// Regenerated source failed syntax verification.
    VerificationFailed = 5,
    /// Internal errors (bugs, unexpected state, IO).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for structured output.
#[derive(Debug, Error)]
pub enum ShiftError {
    /// Malformed source text.
    #[error("parse error: {message}")]
    Parse {
        message: String,
        line: u32,
        col: u32,
    },

    /// An analysis rule failed while evaluating.
    #[error("analysis error: {message}")]
    Analysis { message: String },

    /// A transformation or regeneration step failed.
    #[error("refactoring error: {message}")]
    Refactor { message: String },

    /// Regenerated source did not re-parse.
    #[error("verification failed: {message}")]
    Verification { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ShiftError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>, line: u32, col: u32) -> Self {
        ShiftError::Parse {
            message: message.into(),
            line,
            col,
        }
    }

    /// Create an analysis error.
    pub fn analysis(message: impl Into<String>) -> Self {
        ShiftError::Analysis {
            message: message.into(),
        }
    }

    /// Create a refactoring error.
    pub fn refactor(message: impl Into<String>) -> Self {
        ShiftError::Refactor {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ShiftError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

impl From<&ShiftError> for OutputErrorCode {
    fn from(err: &ShiftError) -> Self {
        match err {
            ShiftError::Parse { .. } => OutputErrorCode::ParseError,
            ShiftError::Analysis { .. } => OutputErrorCode::AnalysisError,
            ShiftError::Refactor { .. } => OutputErrorCode::RefactorError,
            ShiftError::Verification { .. } => OutputErrorCode::VerificationFailed,
            ShiftError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ShiftError> for OutputErrorCode {
    fn from(err: ShiftError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<std::io::Error> for ShiftError {
    fn from(err: std::io::Error) -> Self {
        ShiftError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
