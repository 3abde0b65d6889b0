//! Common types shared across the workspace.

use serde::{Deserialize, Serialize};

/// A 1-indexed line:column position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, counts chars).
    pub col: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(line: u32, col: u32) -> Self {
        Location { line, col }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A single analysis result describing a located issue.
///
/// The `message` is the user-visible report line; `location` points at the
/// offending construct when the producing rule can name one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Human-readable description of the issue.
    pub message: String,
    /// Position of the offending construct, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Finding {
    /// Create a finding with no location.
    pub fn new(message: impl Into<String>) -> Self {
        Finding {
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location to this finding.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
